use clap::{Parser, Subcommand};
use crate::ai_provider::AiProvider;
use crate::config::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ct-reward")]
#[command(about = "CT画像報告の報酬スコアリングツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// AIプロバイダ (claude/codex/gemini)。LLM抽出時のみ使用
    #[arg(long, global = true)]
    pub ai_provider: Option<AiProvider>,

    /// AIモデル名
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// 設定ファイル（デフォルト: ~/.config/ct-report-reward/config.json）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// バッチファイルのスコアを計算
    Score {
        /// 入力ファイル（.json: 配列 / .jsonl: 1行1件）
        #[arg(required = true)]
        input: PathBuf,

        /// 出力JSONファイル（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: ScoreOptions,

        /// 並列数（0ならCPU数）
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// 報告テキストから所見を抽出して表示
    Extract {
        /// 報告テキスト
        #[arg(required_unless_present = "file")]
        text: Option<String>,

        /// 報告テキストのファイル
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// LLMで抽出（失敗時は正規表現）
        #[arg(long)]
        use_llm: bool,
    },

    /// 設定を表示/初期化
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// 既定値で設定ファイルを作成
        #[arg(long)]
        init: bool,
    },
}

/// スコア計算の上書きオプション
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ScoreOptions {
    /// 細粒度の所見抽出にLLMを使う
    #[arg(long)]
    pub use_llm: bool,

    /// 腫瘍有無の評価を無効化
    #[arg(long)]
    pub no_tumor_presence: bool,

    /// キーフレーム検証を無効化
    #[arg(long)]
    pub no_key_frame: bool,

    /// 細粒度正確性の評価を無効化
    #[arg(long)]
    pub no_fine_grained: bool,

    /// 腫瘍有無の重み
    #[arg(long)]
    pub tumor_weight: Option<f64>,

    /// キーフレーム検証の重み
    #[arg(long)]
    pub key_frame_weight: Option<f64>,

    /// 細粒度正確性の重み
    #[arg(long)]
    pub fine_grained_weight: Option<f64>,

    /// キーフレーム一致度の閾値 (0.0-1.0)
    #[arg(long)]
    pub threshold: Option<f64>,
}

impl ScoreOptions {
    /// 設定ファイルの値をコマンドライン引数で上書き
    pub fn apply(&self, config: &mut Config) {
        let reward = &mut config.reward;

        if self.use_llm {
            reward.use_llm_for_fine_grained = true;
        }
        if self.no_tumor_presence {
            reward.enable_tumor_presence = false;
        }
        if self.no_key_frame {
            reward.enable_key_frame_verification = false;
        }
        if self.no_fine_grained {
            reward.enable_fine_grained_accuracy = false;
        }
        if let Some(w) = self.tumor_weight {
            reward.tumor_presence_weight = w;
        }
        if let Some(w) = self.key_frame_weight {
            reward.key_frame_weight = w;
        }
        if let Some(w) = self.fine_grained_weight {
            reward.fine_grained_weight = w;
        }
        if let Some(t) = self.threshold {
            reward.consistency_threshold = t;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_score_command() {
        let cli = Cli::try_parse_from([
            "ct-reward", "score", "batch.jsonl", "--no-key-frame", "--tumor-weight", "0.4", "-j", "4",
        ])
        .unwrap();

        match cli.command {
            Commands::Score { input, options, jobs, .. } => {
                assert_eq!(input, PathBuf::from("batch.jsonl"));
                assert!(options.no_key_frame);
                assert_eq!(options.tumor_weight, Some(0.4));
                assert_eq!(jobs, Some(4));
            }
            _ => panic!("Expected Score command"),
        }
    }

    #[test]
    fn test_parse_extract_requires_text_or_file() {
        assert!(Cli::try_parse_from(["ct-reward", "extract"]).is_err());
        assert!(Cli::try_parse_from(["ct-reward", "extract", "A mass."]).is_ok());
        assert!(Cli::try_parse_from(["ct-reward", "extract", "--file", "report.txt"]).is_ok());
    }

    #[test]
    fn test_parse_global_provider() {
        let cli = Cli::try_parse_from(["ct-reward", "--ai-provider", "gemini", "config", "--show"]).unwrap();
        assert_eq!(cli.ai_provider, Some(AiProvider::Gemini));
    }

    #[test]
    fn test_score_options_apply() {
        let mut config = Config::default();
        let options = ScoreOptions {
            use_llm: true,
            no_fine_grained: true,
            key_frame_weight: Some(0.7),
            threshold: Some(0.8),
            ..Default::default()
        };

        options.apply(&mut config);

        assert!(config.reward.use_llm_for_fine_grained);
        assert!(!config.reward.enable_fine_grained_accuracy);
        assert!(config.reward.enable_tumor_presence);
        assert_eq!(config.reward.key_frame_weight, 0.7);
        assert_eq!(config.reward.consistency_threshold, 0.8);
        assert_eq!(config.reward.tumor_presence_weight, 0.2);
    }
}
