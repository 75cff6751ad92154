//! スコア計算の結合テスト
//!
//! バッチファイル読み込み → スコア計算 → 集計 の一連の流れを検証

use ct_report_reward::batch::{load_batch, BatchSummary};
use ct_report_reward::config::Config;
use ct_report_reward::runner::{build_scorer, score_batch};
use tempfile::tempdir;

const PREDICT: &str = "<ct_type>large_tumor</ct_type>\n<findings>A hypoattenuating liver lesion is identified in hepatic segment 7, measuring 3.3 x 2.6 cm in size and 7.1 cc in volume, with a mean HU value of 112.1 +/- 17.3.</findings>\nThe largest liver lesion is in <key_slice>image 18</key_slice>\n<impression>A hypoattenuating liver mass in hepatic segment 7, measuring 3.3 x 2.6 cm.</impression>";

const DESCRIPTION: &str = "In image 18, there is a hypoattenuating liver lesion in hepatic segment 7, measuring approximately 3.3 x 2.6 cm, with a mean HU value of 112.1. The lesion shows low density compared to surrounding liver tissue.";

fn write_jsonl(lines: &[serde_json::Value]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("batch.jsonl");
    let content = lines
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    std::fs::write(&path, content).unwrap();
    (dir, path)
}

#[test]
fn test_end_to_end_batch() {
    let smaller = PREDICT.replacen("3.3 x 2.6 cm", "4.0 x 2.6 cm", 1);
    let (_dir, path) = write_jsonl(&[
        serde_json::json!({"predict": PREDICT, "ground_truth": PREDICT, "description_answer": DESCRIPTION}),
        serde_json::json!({"predict": smaller, "ground_truth": PREDICT, "description_answer": DESCRIPTION}),
        serde_json::json!({"predict": PREDICT, "ground_truth": PREDICT}),
    ]);

    let items = load_batch(&path).unwrap();
    let scorer = build_scorer(&Config::default()).unwrap();
    let scores = score_batch(&items, &scorer, 0, false).unwrap();

    assert_eq!(scores.len(), 3);

    let exact = &scores[0];
    assert_eq!(exact.tumor_presence, 1.0);
    assert_eq!(exact.location, 1.0);
    assert_eq!(exact.size, 1.0);
    assert_eq!(exact.hu_value, 1.0);
    assert_eq!(exact.enhancement_pattern, 1.0);
    assert_eq!(exact.fine_grained_accuracy, 1.0);
    assert_eq!(exact.key_frame_index, Some(18));
    assert_eq!(exact.key_frame_verification, 1.0);

    let partial = &scores[1];
    assert!(partial.size > 0.0 && partial.size < 1.0);
    assert!(partial.overall < exact.overall);

    let no_verification = &scores[2];
    assert_eq!(no_verification.key_frame_verification, 0.0);
    assert_eq!(no_verification.key_frame_index, None);
    assert!(no_verification.key_frame_error.is_none());

    let summary = BatchSummary::from_scores(&scores);
    assert_eq!(summary.count, 3);
    assert_eq!(summary.mean_tumor_presence, 1.0);
    assert_eq!(summary.key_frame_errors, 0);
}

#[test]
fn test_disabled_key_frame_via_config() {
    let (_dir, path) = write_jsonl(&[serde_json::json!({
        "predict": PREDICT,
        "ground_truth": PREDICT,
        "description_answer": DESCRIPTION,
    })]);

    let mut config = Config::default();
    config.reward.enable_key_frame_verification = false;

    let items = load_batch(&path).unwrap();
    let scorer = build_scorer(&config).unwrap();
    let scores = score_batch(&items, &scorer, 1, false).unwrap();

    assert_eq!(scores[0].key_frame_verification, 0.0);
    assert_eq!(scores[0].key_frame_index, None);
    assert!((scores[0].overall - 0.7).abs() < 1e-9);
}

#[test]
fn test_invalid_config_rejected_before_scoring() {
    let mut config = Config::default();
    config.reward.consistency_threshold = 2.0;
    assert!(build_scorer(&config).is_err());
}
