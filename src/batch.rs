//! バッチファイル入出力
//!
//! 入力は JSON配列（.json）または 1行1件の JSONL（.jsonl）。
//! 学習データ由来の余分なフィールド（images 等）は無視する。

use crate::error::{RewardCliError, Result};
use ct_reward_common::{GroundTruth, ScoreRecord};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::Path;

/// スコア計算の1件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    /// モデルの生成テキスト
    #[serde(alias = "prediction", alias = "response")]
    pub predict: String,

    pub ground_truth: GroundTruth,

    #[serde(default)]
    pub question: String,

    /// キーフレーム検証用の再推論テキスト
    #[serde(default, alias = "verification")]
    pub description_answer: Option<String>,
}

/// バッチファイルを読み込む
///
/// 拡張子が `.jsonl` なら行単位、それ以外はJSON配列として解析する。
pub fn load_batch(path: &Path) -> Result<Vec<BatchItem>> {
    if !path.is_file() {
        return Err(RewardCliError::FileNotFound(path.display().to_string()));
    }

    let is_jsonl = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jsonl"))
        .unwrap_or(false);

    if is_jsonl {
        load_jsonl(path)
    } else {
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader).map_err(|e| RewardCliError::InputParse {
            line: e.line(),
            message: e.to_string(),
        })
    }
}

fn load_jsonl(path: &Path) -> Result<Vec<BatchItem>> {
    let reader = BufReader::new(File::open(path)?);
    let mut items = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let item: BatchItem = serde_json::from_str(&line).map_err(|e| RewardCliError::InputParse {
            line: idx + 1,
            message: e.to_string(),
        })?;
        items.push(item);
    }

    Ok(items)
}

/// スコアをJSON配列として書き出す
pub fn write_scores(path: &Path, scores: &[ScoreRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, scores)?;
    Ok(())
}

/// 集計値
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatchSummary {
    pub count: usize,
    pub mean_overall: f64,
    pub mean_tumor_presence: f64,
    pub mean_key_frame_verification: f64,
    pub mean_fine_grained_accuracy: f64,
    pub key_frame_errors: usize,
}

impl BatchSummary {
    pub fn from_scores(scores: &[ScoreRecord]) -> Self {
        if scores.is_empty() {
            return Self::default();
        }

        let n = scores.len() as f64;
        let mean = |f: fn(&ScoreRecord) -> f64| scores.iter().map(f).sum::<f64>() / n;

        Self {
            count: scores.len(),
            mean_overall: mean(|s| s.overall),
            mean_tumor_presence: mean(|s| s.tumor_presence),
            mean_key_frame_verification: mean(|s| s.key_frame_verification),
            mean_fine_grained_accuracy: mean(|s| s.fine_grained_accuracy),
            key_frame_errors: scores.iter().filter(|s| s.key_frame_error.is_some()).count(),
        }
    }
}
