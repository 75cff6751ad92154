use thiserror::Error;

#[derive(Error, Debug)]
pub enum RewardCliError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("入力の解析に失敗 (行 {line}): {message}")]
    InputParse { line: usize, message: String },

    #[error("入力が空です: {0}")]
    EmptyInput(String),

    #[error("CLI実行エラー: {0}")]
    CliExecution(String),

    #[error("AI応答がタイムアウトしました ({0}秒)")]
    Timeout(u64),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("スコア計算エラー: {0}")]
    Scoring(#[from] ct_reward_common::Error),
}

pub type Result<T> = std::result::Result<T, RewardCliError>;
