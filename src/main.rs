use anyhow::{Context, Result};
use clap::Parser;
use ct_report_reward::{ai_provider, batch, cli, config, runner};
use ct_report_reward::error::RewardCliError;
use ct_reward_common::{extract_finding_with_llm, parse_key_slice_index, Completion};
use cli::{Cli, Commands};
use config::Config;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    let mut config = Config::load_from(&config_path)
        .with_context(|| format!("設定ファイルの読み込みに失敗: {}", config_path.display()))?;
    if let Some(provider) = cli.ai_provider {
        config.ai_provider = provider;
    }
    if cli.model.is_some() {
        config.model = cli.model.clone();
    }

    match cli.command {
        Commands::Score { input, output, options, jobs } => {
            eprintln!("🩻 ct-reward - スコア計算\n");

            options.apply(&mut config);
            if let Some(jobs) = jobs {
                config.jobs = jobs;
            }

            // 1. 入力読み込み
            eprintln!("[1/3] 入力を読み込み中...");
            let items = batch::load_batch(&input)?;
            eprintln!("✔ {}件を読み込み\n", items.len());

            if items.is_empty() {
                return Err(RewardCliError::EmptyInput(
                    input.display().to_string(),
                )
                .into());
            }

            // 2. スコア計算
            eprintln!(
                "[2/3] スコア計算中...{}",
                if config.reward.use_llm_for_fine_grained {
                    format!(" (LLM抽出: {})", config.ai_provider)
                } else {
                    String::new()
                }
            );
            let scorer = runner::build_scorer(&config)?;
            let scores = runner::score_batch(&items, &scorer, config.jobs, !cli.verbose)?;
            let summary = batch::BatchSummary::from_scores(&scores);
            eprintln!("✔ 計算完了\n");

            // 3. 結果出力
            eprintln!("[3/3] 結果を出力中...");
            match output {
                Some(path) => {
                    batch::write_scores(&path, &scores)?;
                    eprintln!("✔ 結果を保存: {}", path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&scores)?),
            }

            eprintln!("\n集計:");
            eprintln!("  件数: {}", summary.count);
            eprintln!("  overall 平均: {:.3}", summary.mean_overall);
            eprintln!("  tumor_presence 平均: {:.3}", summary.mean_tumor_presence);
            eprintln!("  key_frame_verification 平均: {:.3}", summary.mean_key_frame_verification);
            eprintln!("  fine_grained_accuracy 平均: {:.3}", summary.mean_fine_grained_accuracy);
            if summary.key_frame_errors > 0 {
                eprintln!("  キーフレーム検証エラー: {}件", summary.key_frame_errors);
            }

            eprintln!("\n✅ 完了");
        }

        Commands::Extract { text, file, use_llm } => {
            let report = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("報告ファイルの読み込みに失敗: {}", path.display()))?,
                (None, None) => anyhow::bail!("報告テキストまたは --file を指定してください"),
            };

            let client = if use_llm {
                Some(ai_provider::CliCompletion::new(
                    config.ai_provider,
                    config.model.clone(),
                    config.timeout_seconds,
                )?)
            } else {
                None
            };

            let finding = extract_finding_with_llm(
                &report,
                client.as_ref().map(|c| c as &dyn Completion),
            );
            let key_frame_index = parse_key_slice_index(&report)?;

            let output = serde_json::json!({
                "finding": finding,
                "key_frame_index": key_frame_index,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Commands::Config { show, init } => {
            if init {
                config.save_to(&config_path)?;
                println!("✔ 設定ファイルを作成しました: {}", config_path.display());
            }

            if show || !init {
                println!("設定 ({}):", config_path.display());
                println!("  AIプロバイダ: {}", config.ai_provider);
                println!("  モデル: {}", config.model.as_deref().unwrap_or("(CLI既定)"));
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  並列数: {}", if config.jobs == 0 { "自動".to_string() } else { config.jobs.to_string() });
                println!("  報酬設定:");
                println!("{}", serde_json::to_string_pretty(&config.reward)?);
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
