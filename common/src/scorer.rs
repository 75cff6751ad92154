//! 報酬の集計
//!
//! 1件ごとに 腫瘍有無 → キーフレーム検証 → 細粒度正確性 を順に評価し、
//! 重み付き和を `overall` とする。各件は独立しており、1件の失敗でバッチ全体を
//! 失敗させることはない。

use crate::error::{Error, Result};
use crate::fine_grained::fine_grained_accuracy_reward;
use crate::key_frame::{verify_key_frame, DEFAULT_CONSISTENCY_THRESHOLD};
use crate::llm::{Completion, Extraction};
use crate::tumor::tumor_presence_reward;
use crate::types::{GroundTruth, ScoreRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// 報酬計算の設定
///
/// 重みの合計が1である必要はない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// 予約（未使用）
    pub format_weight: f64,
    pub tumor_presence_weight: f64,
    pub key_frame_weight: f64,
    pub fine_grained_weight: f64,
    pub enable_tumor_presence: bool,
    pub enable_key_frame_verification: bool,
    pub enable_fine_grained_accuracy: bool,
    /// 細粒度の所見抽出にLLMを使う（クライアント未指定なら正規表現）
    pub use_llm_for_fine_grained: bool,
    /// キーフレーム一致度の閾値（以上なら満点）
    pub consistency_threshold: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            format_weight: 0.1,
            tumor_presence_weight: 0.2,
            key_frame_weight: 0.3,
            fine_grained_weight: 0.5,
            enable_tumor_presence: true,
            enable_key_frame_verification: true,
            enable_fine_grained_accuracy: true,
            use_llm_for_fine_grained: false,
            consistency_threshold: DEFAULT_CONSISTENCY_THRESHOLD,
        }
    }
}

impl RewardConfig {
    /// 重みは有限かつ非負、閾値は [0, 1]
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("format_weight", self.format_weight),
            ("tumor_presence_weight", self.tumor_presence_weight),
            ("key_frame_weight", self.key_frame_weight),
            ("fine_grained_weight", self.fine_grained_weight),
        ];
        for (name, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::Config(format!(
                    "{} は0以上の有限値である必要があります: {}",
                    name, weight
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.consistency_threshold) {
            return Err(Error::Config(format!(
                "consistency_threshold は0.0〜1.0である必要があります: {}",
                self.consistency_threshold
            )));
        }

        Ok(())
    }
}

/// 報酬スコアラー
///
/// 設定は構築時に検証され、以降変更されない。
pub struct RewardScorer {
    config: RewardConfig,
    llm: Option<Arc<dyn Completion>>,
}

impl std::fmt::Debug for RewardScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewardScorer")
            .field("config", &self.config)
            .field("llm", &self.llm.is_some())
            .finish()
    }
}

impl RewardScorer {
    pub fn new(config: RewardConfig, llm: Option<Arc<dyn Completion>>) -> Result<Self> {
        config.validate()?;
        if config.use_llm_for_fine_grained && llm.is_none() {
            warn!("LLM抽出が有効ですがクライアントがありません。正規表現抽出を使用します");
        }
        Ok(Self { config, llm })
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    fn extraction(&self) -> Extraction<'_> {
        match (&self.llm, self.config.use_llm_for_fine_grained) {
            (Some(client), true) => Extraction::Llm(&**client),
            _ => Extraction::Regex,
        }
    }

    /// 1件分のスコアを計算
    ///
    /// `verification` はキーフレーム検証用の再推論テキスト。ない場合（空文字列を含む）は検証スコア0。
    pub fn score_item(
        &self,
        predict: &str,
        ground_truth: &GroundTruth,
        verification: Option<&str>,
    ) -> ScoreRecord {
        let config = &self.config;
        let mut record = ScoreRecord::default();

        if config.enable_tumor_presence {
            record.tumor_presence = tumor_presence_reward(predict, ground_truth);
        }

        if config.enable_key_frame_verification {
            match verification.filter(|text| !text.trim().is_empty()) {
                Some(verification) => {
                    let result = verify_key_frame(predict, verification, config.consistency_threshold);
                    record.key_frame_verification = result.score;
                    record.key_frame_index = result.index;
                    if let Some(e) = result.index_error {
                        warn!(error = %e, "キーフレーム番号の解析に失敗");
                        record.key_frame_error = Some(format!("キーフレーム番号の解析に失敗: {}", e));
                    }
                }
                None => debug!("検証テキストがないためキーフレーム検証をスキップ"),
            }
        }

        if config.enable_fine_grained_accuracy {
            let scores = fine_grained_accuracy_reward(predict, ground_truth, self.extraction());
            record.location = scores.location;
            record.enhancement_pattern = scores.enhancement_pattern;
            record.size = scores.size;
            record.hu_value = scores.hu_value;
            record.fine_grained_accuracy = scores.mean();
        }

        record.overall = config.tumor_presence_weight * record.tumor_presence
            + config.key_frame_weight * record.key_frame_verification
            + config.fine_grained_weight * record.fine_grained_accuracy;

        record
    }

    /// バッチのスコアを入力順に計算
    ///
    /// 件数は `predicts` と `ground_truths` の短い方。`questions` は互換性のために受け取るが使わない。
    pub fn compute_score(
        &self,
        predicts: &[String],
        ground_truths: &[GroundTruth],
        questions: &[String],
        description_answers: Option<&[String]>,
    ) -> Vec<ScoreRecord> {
        let count = batch_len(predicts, ground_truths, questions);
        (0..count)
            .map(|i| self.score_indexed(i, predicts, ground_truths, description_answers))
            .collect()
    }

    /// `compute_score` の並列版（結果と順序は同一）
    #[cfg(feature = "parallel")]
    pub fn compute_score_parallel(
        &self,
        predicts: &[String],
        ground_truths: &[GroundTruth],
        questions: &[String],
        description_answers: Option<&[String]>,
    ) -> Vec<ScoreRecord> {
        self.compute_score_parallel_with(predicts, ground_truths, questions, description_answers, |_| {})
    }

    /// 並列計算し、1件終わるごとに `on_scored` を呼ぶ（進捗表示用）
    ///
    /// 現在の rayon スレッドプールで実行される。
    #[cfg(feature = "parallel")]
    pub fn compute_score_parallel_with<F>(
        &self,
        predicts: &[String],
        ground_truths: &[GroundTruth],
        questions: &[String],
        description_answers: Option<&[String]>,
        on_scored: F,
    ) -> Vec<ScoreRecord>
    where
        F: Fn(&ScoreRecord) + Sync,
    {
        use rayon::prelude::*;

        let count = batch_len(predicts, ground_truths, questions);
        (0..count)
            .into_par_iter()
            .map(|i| {
                let record = self.score_indexed(i, predicts, ground_truths, description_answers);
                on_scored(&record);
                record
            })
            .collect()
    }

    fn score_indexed(
        &self,
        index: usize,
        predicts: &[String],
        ground_truths: &[GroundTruth],
        description_answers: Option<&[String]>,
    ) -> ScoreRecord {
        let verification = description_answers
            .and_then(|answers| answers.get(index))
            .map(String::as_str);
        debug!(index, has_verification = verification.is_some(), "スコア計算");
        self.score_item(&predicts[index], &ground_truths[index], verification)
    }
}

/// 報酬スコアを計算（RL学習ループとの統合用）
///
/// # Arguments
/// * `predicts` - モデルの生成テキスト
/// * `ground_truths` - 正解
/// * `questions` - 質問（未使用）
/// * `description_answers` - キーフレーム検証用の再推論テキスト
/// * `config` - 重みと有効化フラグ
/// * `llm` - LLM抽出用クライアント
///
/// # Returns
/// * `Ok(Vec<ScoreRecord>)` - 入力順のスコア
/// * `Err` - 設定が不正な場合のみ
pub fn compute_score(
    predicts: &[String],
    ground_truths: &[GroundTruth],
    questions: &[String],
    description_answers: Option<&[String]>,
    config: &RewardConfig,
    llm: Option<Arc<dyn Completion>>,
) -> Result<Vec<ScoreRecord>> {
    let scorer = RewardScorer::new(config.clone(), llm)?;
    Ok(scorer.compute_score(predicts, ground_truths, questions, description_answers))
}

fn batch_len(predicts: &[String], ground_truths: &[GroundTruth], questions: &[String]) -> usize {
    if predicts.len() != ground_truths.len() || (!questions.is_empty() && questions.len() != predicts.len()) {
        warn!(
            predicts = predicts.len(),
            ground_truths = ground_truths.len(),
            questions = questions.len(),
            "バッチの長さが一致しません"
        );
    }
    predicts.len().min(ground_truths.len())
}
