//! CT Report Reward Common Library
//!
//! CT報告生成の強化学習用の多次元報酬計算:
//! - 腫瘍有無の一致
//! - キーフレーム検証（再推論テキストとの一致度）
//! - 細粒度正確性（位置・強化パターン・大きさ・HU値）

pub mod types;
pub mod error;
pub mod extractor;
pub mod key_frame;
pub mod tumor;
pub mod fine_grained;
pub mod prompts;
pub mod parser;
pub mod llm;
pub mod scorer;

pub use types::{EnhancementPattern, GroundTruth, ScoreRecord, StructuredFinding, StructuredGroundTruth};
pub use error::{Error, Result};
pub use extractor::extract_finding;
pub use key_frame::{parse_key_slice_index, verify_report_consistency, KeyFrameVerification};
pub use tumor::tumor_presence_reward;
pub use fine_grained::{fine_grained_accuracy_reward, FineGrainedScores};
pub use parser::{extract_json_object, parse_extraction_response};
pub use llm::{extract_finding_with_llm, Completion, Extraction};
pub use scorer::{compute_score, RewardConfig, RewardScorer};
