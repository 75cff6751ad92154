//! LLMによる所見抽出
//!
//! 外部のテキスト生成サービスは `Completion` トレイトで抽象化する。
//! 呼び出し側が自分のクライアントをこのトレイトに適合させる。
//! どの段階で失敗しても正規表現抽出にフォールバックし、エラーは返さない。

use crate::error::Result;
use crate::extractor::extract_finding;
use crate::parser::parse_extraction_response;
use crate::prompts::build_extraction_prompt;
use crate::types::StructuredFinding;

/// テキスト補完サービス
pub trait Completion: Send + Sync {
    /// プロンプトを送り、応答テキストを返す
    fn complete(&self, prompt: &str) -> Result<String>;
}

impl<F> Completion for F
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn complete(&self, prompt: &str) -> Result<String> {
        self(prompt)
    }
}

/// 所見抽出の方式
#[derive(Clone, Copy)]
pub enum Extraction<'a> {
    /// 正規表現のみ
    Regex,
    /// LLM（失敗時は正規表現）
    Llm(&'a dyn Completion),
}

impl Extraction<'_> {
    pub fn extract(&self, report_text: &str) -> StructuredFinding {
        match self {
            Extraction::Regex => extract_finding(report_text),
            Extraction::Llm(client) => extract_finding_with_llm(report_text, Some(*client)),
        }
    }
}

impl std::fmt::Debug for Extraction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Extraction::Regex => write!(f, "Regex"),
            Extraction::Llm(_) => write!(f, "Llm"),
        }
    }
}

/// LLMで所見を抽出
///
/// クライアントがない、呼び出しに失敗、JSONが見つからない・解析できない
/// いずれの場合も正規表現抽出の結果を返す。
pub fn extract_finding_with_llm(
    report_text: &str,
    client: Option<&dyn Completion>,
) -> StructuredFinding {
    let Some(client) = client else {
        return extract_finding(report_text);
    };

    let prompt = build_extraction_prompt(report_text);
    let parsed = client
        .complete(&prompt)
        .and_then(|response| parse_extraction_response(&response));

    match parsed {
        Ok(finding) => finding,
        Err(e) => {
            tracing::warn!(error = %e, "LLM抽出に失敗、正規表現抽出にフォールバック");
            extract_finding(report_text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::EnhancementPattern;

    const REPORT: &str = "A hypoattenuating mass in hepatic segment 7 measuring 3.3 x 2.6 cm.";

    #[test]
    fn test_extract_without_client_uses_regex() {
        let finding = extract_finding_with_llm(REPORT, None);
        assert_eq!(finding, extract_finding(REPORT));
    }

    #[test]
    fn test_extract_with_client_uses_response() {
        let client = |prompt: &str| -> Result<String> {
            assert!(prompt.contains("hepatic segment 7"));
            Ok(r#"Extraction: {"tumor_presence": true, "location": "liver segment VII", "enhancement_pattern": "isoattenuating"}"#.to_string())
        };

        let finding = extract_finding_with_llm(REPORT, Some(&client));
        assert!(finding.tumor_presence);
        assert_eq!(finding.location.as_deref(), Some("liver segment VII"));
        assert_eq!(finding.enhancement_pattern, Some(EnhancementPattern::Isoattenuating));
        assert_eq!(finding.size, None);
    }

    #[test]
    fn test_extract_falls_back_on_client_error() {
        let client = |_: &str| -> Result<String> { Err(Error::Completion("timeout".into())) };
        let finding = extract_finding_with_llm(REPORT, Some(&client));
        assert_eq!(finding, extract_finding(REPORT));
    }

    #[test]
    fn test_extract_falls_back_on_malformed_response() {
        let no_json = |_: &str| -> Result<String> { Ok("I cannot help with that.".into()) };
        assert_eq!(extract_finding_with_llm(REPORT, Some(&no_json)), extract_finding(REPORT));

        let bad_json = |_: &str| -> Result<String> { Ok("{location: }".into()) };
        assert_eq!(extract_finding_with_llm(REPORT, Some(&bad_json)), extract_finding(REPORT));
    }

    #[test]
    fn test_extraction_mode_dispatch() {
        let client = |_: &str| -> Result<String> { Ok(r#"{"tumor_presence": false}"#.into()) };
        assert!(Extraction::Regex.extract(REPORT).tumor_presence);
        assert!(!Extraction::Llm(&client).extract(REPORT).tumor_presence);
    }
}
