//! バッチのスコア計算
//!
//! 各件は独立なので、指定した並列数の rayon プールでスコアラーの並列計算を実行する（結果は入力順）。

use crate::ai_provider::CliCompletion;
use crate::batch::BatchItem;
use crate::config::Config;
use crate::error::{RewardCliError, Result};
use ct_reward_common::{Completion, GroundTruth, RewardScorer, ScoreRecord};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

/// 設定からスコアラーを構築
///
/// LLM抽出が有効な場合のみAI CLIクライアントを用意する。
pub fn build_scorer(config: &Config) -> Result<RewardScorer> {
    let llm: Option<Arc<dyn Completion>> = if config.reward.use_llm_for_fine_grained {
        let client = CliCompletion::new(config.ai_provider, config.model.clone(), config.timeout_seconds)?;
        Some(Arc::new(client))
    } else {
        None
    };

    Ok(RewardScorer::new(config.reward.clone(), llm)?)
}

/// バッチ全件のスコアを計算
///
/// # Arguments
/// * `items` - 入力
/// * `scorer` - スコアラー
/// * `jobs` - 並列数（0ならCPU数）
/// * `show_progress` - 進捗バーを表示する
pub fn score_batch(
    items: &[BatchItem],
    scorer: &RewardScorer,
    jobs: usize,
    show_progress: bool,
) -> Result<Vec<ScoreRecord>> {
    let progress = if show_progress {
        let pb = ProgressBar::new(items.len() as u64);
        if let Ok(style) = ProgressStyle::with_template("  {bar:40} {pos}/{len} ({eta})") {
            pb.set_style(style);
        }
        pb
    } else {
        ProgressBar::hidden()
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| RewardCliError::Config(format!("スレッドプールの作成に失敗: {}", e)))?;

    let predicts: Vec<String> = items.iter().map(|item| item.predict.clone()).collect();
    let ground_truths: Vec<GroundTruth> = items.iter().map(|item| item.ground_truth.clone()).collect();
    let questions: Vec<String> = items.iter().map(|item| item.question.clone()).collect();
    // 検証テキストのない件は空文字列（スコアラー側で記載なし扱い）
    let descriptions: Vec<String> = items
        .iter()
        .map(|item| item.description_answer.clone().unwrap_or_default())
        .collect();

    let scores = pool.install(|| {
        scorer.compute_score_parallel_with(
            &predicts,
            &ground_truths,
            &questions,
            Some(&descriptions),
            |_| progress.inc(1),
        )
    });

    progress.finish_and_clear();
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(predict: &str, ground_truth: &str, description: Option<&str>) -> BatchItem {
        BatchItem {
            predict: predict.to_string(),
            ground_truth: GroundTruth::from(ground_truth),
            question: String::new(),
            description_answer: description.map(str::to_string),
        }
    }

    #[test]
    fn test_build_scorer_without_llm() {
        let scorer = build_scorer(&Config::default()).unwrap();
        assert!(!scorer.config().use_llm_for_fine_grained);
    }

    #[test]
    fn test_score_batch_preserves_order() {
        let items = vec![
            item("A mass in segment 7.", "A mass in segment 7.", None),
            item("Normal liver.", "A mass in segment 7.", None),
            item("A mass in segment 7.", "A mass in segment 7.", Some("mass in segment 7")),
        ];
        let scorer = build_scorer(&Config::default()).unwrap();

        let scores = score_batch(&items, &scorer, 2, false).unwrap();

        assert_eq!(scores.len(), 3);
        assert_eq!(scores[0].tumor_presence, 1.0);
        assert_eq!(scores[1].tumor_presence, 0.0);
        assert_eq!(scores[2].key_frame_verification, 1.0);
        assert_eq!(scores[0].key_frame_verification, 0.0);
    }

    #[test]
    fn test_score_batch_matches_library_compute_score() {
        let items = vec![
            item("A mass in segment 7, 3.0 x 2.0 cm.", "A mass in segment 7, 3.3 x 2.6 cm.", None),
            item("A nodule, HU value of 40.", "A nodule, HU value of 50.", None),
        ];
        let scorer = build_scorer(&Config::default()).unwrap();

        let predicts: Vec<String> = items.iter().map(|i| i.predict.clone()).collect();
        let gts: Vec<GroundTruth> = items.iter().map(|i| i.ground_truth.clone()).collect();
        let expected = scorer.compute_score(&predicts, &gts, &[], None);

        assert_eq!(score_batch(&items, &scorer, 0, false).unwrap(), expected);
    }

    #[test]
    fn test_score_batch_with_progress_bar() {
        let items = vec![item("A mass in segment 7.", "A mass in segment 7.", None); 4];
        let scorer = build_scorer(&Config::default()).unwrap();
        assert_eq!(score_batch(&items, &scorer, 1, true).unwrap().len(), 4);
    }
}
