//! プロンプト生成モジュール
//!
//! LLMによる所見抽出用の固定テンプレート

/// 抽出対象フィールド（JSONキー）
pub const FINDING_FIELDS: &[&str] = &[
    "tumor_presence",
    "location",
    "size",
    "hu_value",
    "enhancement_pattern",
    "volume",
];

/// 所見抽出プロンプト生成
///
/// # Arguments
/// * `report_text` - 抽出対象の報告テキスト
///
/// # Returns
/// 6フィールドのJSONオブジェクトを要求するプロンプト文字列
pub fn build_extraction_prompt(report_text: &str) -> String {
    format!(
        r#"Extract structured information from the following medical imaging report and return it as JSON.

Report:
{report_text}

Extract the following fields:
1. tumor_presence: whether a tumor is present (true/false)
2. location: the specific anatomical location (e.g. "hepatic segment 7")
3. size: the lesion size (e.g. "3.3 x 2.6 cm")
4. hu_value: the HU value (a number, if mentioned)
5. enhancement_pattern: one of "hypoattenuating", "hyperattenuating", "isoattenuating", "enhancing", "non-enhancing"
6. volume: the volume in cc (a number, if mentioned)

Return a JSON object in exactly this format:
{{
    "tumor_presence": true/false,
    "location": "location string or null",
    "size": "size string or null",
    "hu_value": number or null,
    "enhancement_pattern": "pattern string or null",
    "volume": number or null
}}"#
    )
}
