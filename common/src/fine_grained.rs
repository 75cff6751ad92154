//! 細粒度正確性スコア
//!
//! 位置・強化パターン・大きさ・HU値の4項目を独立に評価する。
//! 腫瘍有無は別の報酬次元（`tumor` モジュール）。
//!
//! 共通ルール: 両方とも記載なし → 1.0、片方のみ記載なし → 0.0

use crate::llm::Extraction;
use crate::types::{EnhancementPattern, GroundTruth, StructuredFinding};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// 大きさの相対誤差の分母の下限（cm）
const SIZE_REFERENCE_FLOOR: f64 = 0.1;
/// HU値の相対誤差の分母の下限
const HU_REFERENCE_FLOOR: f64 = 1.0;
/// HU値の誤差ペナルティの減衰係数
const HU_ERROR_DAMPING: f64 = 0.1;
/// 位置が一致しない場合の部分点
const LOCATION_PARTIAL_CREDIT: f64 = 0.5;
/// 大きさが解析できない場合の部分点
const SIZE_UNPARSABLE_CREDIT: f64 = 0.5;

lazy_static::lazy_static! {
    static ref SEGMENT_RE: Regex = Regex::new(r"(?i)segment\s*([0-9]+)").unwrap();
    static ref DIMENSIONS_RE: Regex = Regex::new(r"([0-9]+\.?[0-9]*)\s*[xX]\s*([0-9]+\.?[0-9]*)").unwrap();
}

/// 4項目のスコア
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FineGrainedScores {
    pub location: f64,
    pub enhancement_pattern: f64,
    pub size: f64,
    pub hu_value: f64,
}

impl FineGrainedScores {
    /// 等重みの算術平均
    pub fn mean(&self) -> f64 {
        (self.location + self.enhancement_pattern + self.size + self.hu_value) / 4.0
    }
}

/// 位置スコア
///
/// 両方からsegment番号が取れれば番号の完全一致で判定。
/// 取れなければ大文字小文字を無視した文字列比較で、不一致でも部分点 0.5。
pub fn score_location(generated: Option<&str>, reference: Option<&str>) -> f64 {
    match (generated, reference) {
        (Some(generated), Some(reference)) => {
            match (segment_number(generated), segment_number(reference)) {
                (Some(g), Some(r)) => {
                    if g == r {
                        1.0
                    } else {
                        0.0
                    }
                }
                _ => {
                    if generated.to_lowercase() == reference.to_lowercase() {
                        1.0
                    } else {
                        LOCATION_PARTIAL_CREDIT
                    }
                }
            }
        }
        (None, None) => 1.0,
        _ => 0.0,
    }
}

/// 強化パターンスコア（完全一致のみ）
pub fn score_enhancement_pattern(
    generated: Option<EnhancementPattern>,
    reference: Option<EnhancementPattern>,
) -> f64 {
    match (generated, reference) {
        (Some(g), Some(r)) if g == r => 1.0,
        (None, None) => 1.0,
        _ => 0.0,
    }
}

/// 大きさスコア
///
/// 幅・高さそれぞれの相対誤差（分母は正解値、下限0.1）の平均を1から引く。
/// 値はあるが解析できない場合は 0.5。
pub fn score_size(generated: Option<&str>, reference: Option<&str>) -> f64 {
    match (generated, reference) {
        (Some(generated), Some(reference)) => {
            match (parse_dimensions(generated), parse_dimensions(reference)) {
                (Some((gen_w, gen_h)), Some((ref_w, ref_h))) => {
                    let error_w = (gen_w - ref_w).abs() / ref_w.max(SIZE_REFERENCE_FLOOR);
                    let error_h = (gen_h - ref_h).abs() / ref_h.max(SIZE_REFERENCE_FLOOR);
                    let mean_error = (error_w + error_h) / 2.0;
                    (1.0 - mean_error).max(0.0)
                }
                _ => SIZE_UNPARSABLE_CREDIT,
            }
        }
        (None, None) => 1.0,
        _ => 0.0,
    }
}

/// HU値スコア
///
/// 相対誤差のペナルティを10分の1に減衰（誤差1000%で0点）。
pub fn score_hu_value(generated: Option<f64>, reference: Option<f64>) -> f64 {
    match (generated, reference) {
        (Some(generated), Some(reference)) => {
            let error = (generated - reference).abs() / reference.abs().max(HU_REFERENCE_FLOOR);
            (1.0 - error * HU_ERROR_DAMPING).max(0.0)
        }
        (None, None) => 1.0,
        _ => 0.0,
    }
}

/// 構造化所見同士を比較して4項目を評価
pub fn score_findings(generated: &StructuredFinding, reference: &StructuredFinding) -> FineGrainedScores {
    FineGrainedScores {
        location: score_location(generated.location.as_deref(), reference.location.as_deref()),
        enhancement_pattern: score_enhancement_pattern(
            generated.enhancement_pattern,
            reference.enhancement_pattern,
        ),
        size: score_size(generated.size.as_deref(), reference.size.as_deref()),
        hu_value: score_hu_value(generated.hu_value, reference.hu_value),
    }
}

/// 細粒度正確性報酬
///
/// 生成報告と正解の両方から所見を抽出し（正解の明示フィールドは優先）、4項目を評価する。
pub fn fine_grained_accuracy_reward(
    generated_report: &str,
    ground_truth: &GroundTruth,
    extraction: Extraction<'_>,
) -> FineGrainedScores {
    let generated = extraction.extract(generated_report);

    let mut reference = extraction.extract(ground_truth.report_text());
    ground_truth.apply_overrides(&mut reference);

    score_findings(&generated, &reference)
}

fn segment_number(location: &str) -> Option<&str> {
    SEGMENT_RE
        .captures(location)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}

fn parse_dimensions(size: &str) -> Option<(f64, f64)> {
    let cap = DIMENSIONS_RE.captures(size)?;
    let width = cap[1].parse::<f64>().ok().filter(|v| v.is_finite())?;
    let height = cap[2].parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some((width, height))
}
