//! 正規表現による所見抽出
//!
//! 各フィールドは独立した純粋関数（テキスト → Option）として実装し、
//! `extract_finding` で1つのレコードにまとめる。
//! 抽出順: 腫瘍有無 → 位置 → 大きさ → HU値 → 強化パターン → 体積
//!
//! 数値はASCII数字のみを対象とする（全角数字などは記載なし扱い）。

use crate::types::{EnhancementPattern, StructuredFinding};
use regex::Regex;

/// 病変を示す語彙
pub const TUMOR_KEYWORDS: &[&str] = &["tumor", "mass", "lesion", "nodule", "carcinoma"];

lazy_static::lazy_static! {
    static ref TUMOR_RE: Regex = Regex::new(&format!("(?i){}", TUMOR_KEYWORDS.join("|"))).unwrap();
    static ref LOCATION_RE: Regex =
        Regex::new(r"(?i)(hepatic segment|segment|hepatic)\s*([0-9]+[/0-9]*)").unwrap();
    static ref SIZE_RE: Regex = Regex::new(r"(?i)([0-9]+\.?[0-9]*)\s*x\s*([0-9]+\.?[0-9]*)\s*cm").unwrap();
    // 優先順位順
    static ref HU_RES: [Regex; 3] = [
        Regex::new(r"(?i)HU\s*value\s*of\s*([0-9]+\.?[0-9]*)").unwrap(),
        Regex::new(r"(?i)([0-9]+\.?[0-9]*)\s*\+/-\s*[0-9]+\.?[0-9]*\s*HU").unwrap(),
        Regex::new(r"(?i)mean\s*HU\s*value\s*of\s*([0-9]+\.?[0-9]*)").unwrap(),
    ];
    static ref HYPO_RE: Regex = Regex::new(r"(?i)hypoattenuat").unwrap();
    static ref HYPER_RE: Regex = Regex::new(r"(?i)hyperattenuat").unwrap();
    static ref ISO_RE: Regex = Regex::new(r"(?i)isoattenuat").unwrap();
    static ref ENHANCING_RE: Regex = Regex::new(r"(?i)(non[-\s]?)?enhancing").unwrap();
    static ref NON_ENHANCING_RE: Regex = Regex::new(r"(?i)non[-\s]?enhancing").unwrap();
    static ref VOLUME_RE: Regex =
        Regex::new(r"(?i)([0-9]+\.?[0-9]*)\s*cc\s*(?:in volume|volume)").unwrap();
}

/// 病変語彙がいずれか1つでも含まれていれば true
pub fn detect_tumor_presence(text: &str) -> bool {
    TUMOR_RE.is_match(text)
}

/// 解剖学的位置（例: "hepatic segment 7"）。最初のマッチを小文字で返す
pub fn extract_location(text: &str) -> Option<String> {
    LOCATION_RE.find(text).map(|m| m.as_str().to_lowercase())
}

/// 大きさ（"W x H cm" に正規化）。最初のマッチを採用
pub fn extract_size(text: &str) -> Option<String> {
    SIZE_RE
        .captures(text)
        .map(|cap| format!("{} x {} cm", &cap[1], &cap[2]))
}

/// HU値
///
/// 3つの表記を優先順に試し、マッチかつ数値として解釈できた最初のものを返す。
pub fn extract_hu_value(text: &str) -> Option<f64> {
    HU_RES
        .iter()
        .find_map(|re| re.captures(text).and_then(|cap| parse_number(&cap[1])))
}

/// 強化パターン。固定順の語彙で最初にヒットしたものを返す
///
/// "non-enhancing" は enhancing としては数えず、NonEnhancing にのみ対応する。
/// そのため non-enhancing と enhancing の比較は不一致になる。
pub fn extract_enhancement_pattern(text: &str) -> Option<EnhancementPattern> {
    EnhancementPattern::ALL
        .iter()
        .copied()
        .find(|pattern| mentions_pattern(text, *pattern))
}

fn mentions_pattern(text: &str, pattern: EnhancementPattern) -> bool {
    match pattern {
        EnhancementPattern::Hypoattenuating => HYPO_RE.is_match(text),
        EnhancementPattern::Hyperattenuating => HYPER_RE.is_match(text),
        EnhancementPattern::Isoattenuating => ISO_RE.is_match(text),
        EnhancementPattern::Enhancing => ENHANCING_RE
            .captures_iter(text)
            .any(|cap| cap.get(1).is_none()),
        EnhancementPattern::NonEnhancing => NON_ENHANCING_RE.is_match(text),
    }
}

/// 体積（cc）。"in volume" / "volume" が続くもののみ
pub fn extract_volume(text: &str) -> Option<f64> {
    VOLUME_RE
        .captures(text)
        .and_then(|cap| parse_number(&cap[1]))
}

/// 全フィールドを抽出して構造化所見を組み立てる
pub fn extract_finding(text: &str) -> StructuredFinding {
    StructuredFinding {
        tumor_presence: detect_tumor_presence(text),
        location: extract_location(text),
        size: extract_size(text),
        hu_value: extract_hu_value(text),
        enhancement_pattern: extract_enhancement_pattern(text),
        volume: extract_volume(text),
    }
}

/// 数値として解釈できないもの（有限でないものを含む）は記載なし扱い
fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}
