//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use ct_report_reward::error::RewardCliError;

/// RewardCliErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        RewardCliError::Config("テスト設定エラー".to_string()),
        RewardCliError::FileNotFound("batch.jsonl".to_string()),
        RewardCliError::InputParse { line: 3, message: "missing field".to_string() },
        RewardCliError::EmptyInput("batch.jsonl".to_string()),
        RewardCliError::CliExecution("claude failed".to_string()),
        RewardCliError::Timeout(120),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

#[test]
fn test_input_parse_display_includes_line() {
    let err = RewardCliError::InputParse { line: 7, message: "expected value".to_string() };
    assert_eq!(format!("{}", err), "入力の解析に失敗 (行 7): expected value");
}

#[test]
fn test_timeout_display() {
    assert_eq!(format!("{}", RewardCliError::Timeout(30)), "AI応答がタイムアウトしました (30秒)");
}

/// IOエラーからの変換
#[test]
fn test_error_from_io() {
    let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
    let error: RewardCliError = io_error.into();
    assert!(matches!(error, RewardCliError::Io(_)));
}

/// 共通ライブラリのエラーからの変換
#[test]
fn test_error_from_scoring() {
    let error: RewardCliError = ct_reward_common::Error::Config("bad weight".to_string()).into();
    assert!(matches!(error, RewardCliError::Scoring(_)));
    assert!(format!("{}", error).contains("bad weight"));
}
