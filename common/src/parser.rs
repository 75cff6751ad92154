//! LLMレスポンスパーサー
//!
//! 前後に説明文を含むレスポンスからJSONオブジェクトを取り出し、
//! 構造化所見に変換する

use crate::error::{Error, Result};
use crate::types::{EnhancementPattern, StructuredFinding};
use serde_json::{Map, Value};

/// レスポンスからJSONオブジェクト部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 最初の `{` から最後の `}` まで
/// 3. エラー
///
/// # Examples
/// ```
/// use ct_reward_common::extract_json_object;
///
/// let response = "Here you go: {\"location\": null} done";
/// assert_eq!(extract_json_object(response).unwrap(), "{\"location\": null}");
/// ```
pub fn extract_json_object(response: &str) -> Result<&str> {
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end > start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Parse("JSONオブジェクトが見つかりません".into()))
}

/// 抽出レスポンスをパース
///
/// 型の揺れには寛容に対応する（数値が文字列で返る、等）。
/// 解釈できないフィールドは記載なし扱い。
///
/// # Returns
/// * `Ok(StructuredFinding)` - パース成功
/// * `Err` - JSONが見つからないか、オブジェクトでない場合
pub fn parse_extraction_response(response: &str) -> Result<StructuredFinding> {
    let json_str = extract_json_object(response)?;
    let value: Value = serde_json::from_str(json_str.trim())?;
    let Value::Object(fields) = value else {
        return Err(Error::Parse("JSONオブジェクトではありません".into()));
    };

    Ok(StructuredFinding {
        tumor_presence: bool_field(&fields, "tumor_presence").unwrap_or(false),
        location: string_field(&fields, "location"),
        size: string_field(&fields, "size"),
        hu_value: number_field(&fields, "hu_value"),
        enhancement_pattern: string_field(&fields, "enhancement_pattern")
            .and_then(|s| s.parse::<EnhancementPattern>().ok()),
        volume: number_field(&fields, "volume"),
    })
}

fn bool_field(fields: &Map<String, Value>, key: &str) -> Option<bool> {
    match fields.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_field(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    match fields.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_end_matches(|c: char| c.is_ascii_alphabetic() || c.is_whitespace())
            .parse::<f64>()
            .ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_object_with_block() {
        let response = "Result:\n```json\n{\"location\": \"segment 7\"}\n```\nThanks.";
        assert_eq!(extract_json_object(response).unwrap(), "{\"location\": \"segment 7\"}");
    }

    #[test]
    fn test_extract_json_object_with_surrounding_text() {
        let response = r#"Sure! {"tumor_presence": true} Hope this helps."#;
        assert_eq!(extract_json_object(response).unwrap(), r#"{"tumor_presence": true}"#);
    }

    #[test]
    fn test_extract_json_object_error() {
        let result = extract_json_object("No JSON here.");
        if let Err(Error::Parse(msg)) = result {
            assert!(msg.contains("JSONオブジェクトが見つかりません"));
        } else {
            panic!("Expected Parse error");
        }
    }

    #[test]
    fn test_parse_extraction_response_full() {
        let response = r#"Here is the extraction:
{
    "tumor_presence": true,
    "location": "hepatic segment 7",
    "size": "3.3 x 2.6 cm",
    "hu_value": 112.1,
    "enhancement_pattern": "hypoattenuating",
    "volume": 7.1
}"#;
        let finding = parse_extraction_response(response).unwrap();
        assert!(finding.tumor_presence);
        assert_eq!(finding.location.as_deref(), Some("hepatic segment 7"));
        assert_eq!(finding.size.as_deref(), Some("3.3 x 2.6 cm"));
        assert_eq!(finding.hu_value, Some(112.1));
        assert_eq!(finding.enhancement_pattern, Some(EnhancementPattern::Hypoattenuating));
        assert_eq!(finding.volume, Some(7.1));
    }

    #[test]
    fn test_parse_extraction_response_lenient_types() {
        let response = r#"{"tumor_presence": "yes", "location": null, "size": "", "hu_value": "45 HU", "enhancement_pattern": "shiny", "volume": "12.5cc"}"#;
        let finding = parse_extraction_response(response).unwrap();
        assert!(finding.tumor_presence);
        assert_eq!(finding.location, None);
        assert_eq!(finding.size, None);
        assert_eq!(finding.hu_value, Some(45.0));
        assert_eq!(finding.enhancement_pattern, None);
        assert_eq!(finding.volume, Some(12.5));
    }

    #[test]
    fn test_parse_extraction_response_missing_fields_default() {
        let finding = parse_extraction_response("{}").unwrap();
        assert_eq!(finding, StructuredFinding::default());
    }

    #[test]
    fn test_parse_extraction_response_invalid_json() {
        let result = parse_extraction_response("{tumor_presence: maybe}");
        assert!(matches!(result, Err(Error::Json(_))));
    }
}
