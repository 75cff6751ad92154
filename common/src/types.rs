//! スコア計算の型定義
//!
//! すべて1回のスコア計算の中で生成・消費される値:
//! - EnhancementPattern: 強化パターン（5分類）
//! - StructuredFinding: 報告テキストから抽出した構造化所見
//! - GroundTruth: 正解（報告テキスト or 構造化レコード）
//! - ScoreRecord: 1件分のスコア

use serde::{Deserialize, Serialize};

/// 強化パターン（周囲組織に対する病変の濃度）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnhancementPattern {
    Hypoattenuating,
    Hyperattenuating,
    Isoattenuating,
    Enhancing,
    NonEnhancing,
}

impl EnhancementPattern {
    /// 抽出時の優先順（先にマッチしたものを採用）
    pub const ALL: [EnhancementPattern; 5] = [
        EnhancementPattern::Hypoattenuating,
        EnhancementPattern::Hyperattenuating,
        EnhancementPattern::Isoattenuating,
        EnhancementPattern::Enhancing,
        EnhancementPattern::NonEnhancing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnhancementPattern::Hypoattenuating => "hypoattenuating",
            EnhancementPattern::Hyperattenuating => "hyperattenuating",
            EnhancementPattern::Isoattenuating => "isoattenuating",
            EnhancementPattern::Enhancing => "enhancing",
            EnhancementPattern::NonEnhancing => "non-enhancing",
        }
    }
}

impl std::fmt::Display for EnhancementPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EnhancementPattern {
    type Err = String;

    /// 正式名のほか、抽出器の語彙で認識できる表記（"hypoattenuation" 等）も受け付ける
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(pattern) = Self::ALL
            .iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(trimmed))
        {
            return Ok(*pattern);
        }
        crate::extractor::extract_enhancement_pattern(trimmed)
            .ok_or_else(|| format!("Unknown enhancement pattern: {}", s))
    }
}

/// 報告テキストから抽出した構造化所見
///
/// 各フィールドは独立してオプション。`None` は「記載なし」であり、不一致とは区別される。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredFinding {
    pub tumor_presence: bool,
    pub location: Option<String>,
    /// "W x H cm" 形式
    pub size: Option<String>,
    pub hu_value: Option<f64>,
    pub enhancement_pattern: Option<EnhancementPattern>,
    /// 体積（cc）
    pub volume: Option<f64>,
}

/// 構造化済みの正解レコード
///
/// 明示されたフィールド（null以外）はテキストからの再抽出結果より優先される。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredGroundTruth {
    /// 正解の報告テキスト
    pub single_organ_report: String,
    pub tumor_presence: Option<bool>,
    pub location: Option<String>,
    pub size: Option<String>,
    pub hu_value: Option<f64>,
    pub enhancement_pattern: Option<EnhancementPattern>,
    pub volume: Option<f64>,
}

/// 正解（報告テキスト or 構造化レコード）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroundTruth {
    Report(String),
    Structured(StructuredGroundTruth),
}

impl GroundTruth {
    /// 抽出対象となる報告テキスト
    pub fn report_text(&self) -> &str {
        match self {
            GroundTruth::Report(text) => text,
            GroundTruth::Structured(gt) => &gt.single_organ_report,
        }
    }

    /// 明示された腫瘍有無フラグ（構造化レコードのみ）
    pub fn explicit_tumor_presence(&self) -> Option<bool> {
        match self {
            GroundTruth::Report(_) => None,
            GroundTruth::Structured(gt) => gt.tumor_presence,
        }
    }

    /// 明示フィールドで抽出結果を上書き
    ///
    /// null・空文字列・空白のみの文字列は記載なしとして扱い、上書きしない。
    pub fn apply_overrides(&self, finding: &mut StructuredFinding) {
        let GroundTruth::Structured(gt) = self else {
            return;
        };

        if let Some(presence) = gt.tumor_presence {
            finding.tumor_presence = presence;
        }
        if let Some(location) = non_blank(gt.location.as_deref()) {
            finding.location = Some(location);
        }
        if let Some(size) = non_blank(gt.size.as_deref()) {
            finding.size = Some(size);
        }
        if gt.hu_value.is_some() {
            finding.hu_value = gt.hu_value;
        }
        if gt.enhancement_pattern.is_some() {
            finding.enhancement_pattern = gt.enhancement_pattern;
        }
        if gt.volume.is_some() {
            finding.volume = gt.volume;
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl From<&str> for GroundTruth {
    fn from(text: &str) -> Self {
        GroundTruth::Report(text.to_string())
    }
}

impl From<String> for GroundTruth {
    fn from(text: String) -> Self {
        GroundTruth::Report(text)
    }
}

impl From<StructuredGroundTruth> for GroundTruth {
    fn from(gt: StructuredGroundTruth) -> Self {
        GroundTruth::Structured(gt)
    }
}

/// 1件分のスコア
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub tumor_presence: f64,
    pub key_frame_verification: f64,
    /// 解決できなかった場合は null
    pub key_frame_index: Option<u32>,
    pub location: f64,
    pub enhancement_pattern: f64,
    pub size: f64,
    pub hu_value: f64,
    pub fine_grained_accuracy: f64,
    pub overall: f64,
    /// キーフレーム検証が失敗した場合の診断メッセージ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_frame_error: Option<String>,
}
