//! エラー型定義
//!
//! スコア計算そのものは失敗しない。エラーになるのは設定の検証、
//! 外部LLM呼び出し、レスポンス解析、キーフレーム番号の解釈のみ。

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("Completion error: {0}")]
    Completion(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Config error: {0}")]
    Config(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
