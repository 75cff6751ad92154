//! 腫瘍有無の一致判定
//!
//! 最も基本的な判断なので独立した報酬次元として扱う。部分点はない。

use crate::extractor::detect_tumor_presence;
use crate::types::GroundTruth;

/// 腫瘍有無報酬
///
/// 生成報告と正解の「腫瘍あり」判定が一致すれば 1.0、不一致なら 0.0。
/// 構造化された正解に明示フラグがあればそれを使う。
pub fn tumor_presence_reward(generated_report: &str, ground_truth: &GroundTruth) -> f64 {
    let generated_has_tumor = detect_tumor_presence(generated_report);
    let reference_has_tumor = ground_truth
        .explicit_tumor_presence()
        .unwrap_or_else(|| detect_tumor_presence(ground_truth.report_text()));

    if generated_has_tumor == reference_has_tumor {
        1.0
    } else {
        0.0
    }
}
