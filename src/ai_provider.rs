//! AI CLI連携
//!
//! claude / codex / gemini の各CLIをサブプロセスとして呼び出し、
//! `Completion` として所見抽出に使えるようにする。
//! 呼び出しごとにタイムアウトを適用し、超過はエラー（→ 正規表現抽出へフォールバック）。

use crate::error::{RewardCliError, Result};
use clap::ValueEnum;
use ct_reward_common::Completion;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::process::Command;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    Claude,
    Codex,
    Gemini,
}

impl AiProvider {
    pub fn command_name(&self) -> &'static str {
        match self {
            AiProvider::Claude => "claude",
            AiProvider::Codex => "codex",
            AiProvider::Gemini => "gemini",
        }
    }

    /// 非対話モードでプロンプトを渡す引数
    pub fn build_args(&self, prompt: &str, model: Option<&str>) -> Vec<String> {
        let mut args: Vec<String> = match self {
            AiProvider::Claude => vec!["-p".into(), prompt.into(), "--output-format".into(), "text".into()],
            AiProvider::Codex => vec!["exec".into(), prompt.into()],
            AiProvider::Gemini => vec!["-p".into(), prompt.into()],
        };

        if let Some(model) = model {
            let flag = match self {
                AiProvider::Claude => "--model",
                AiProvider::Codex | AiProvider::Gemini => "-m",
            };
            args.push(flag.into());
            args.push(model.into());
        }

        args
    }
}

impl std::fmt::Display for AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command_name())
    }
}

/// AI CLIを使う補完クライアント
pub struct CliCompletion {
    provider: AiProvider,
    program: String,
    model: Option<String>,
    timeout: Duration,
    runtime: tokio::runtime::Runtime,
}

impl std::fmt::Debug for CliCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliCompletion")
            .field("provider", &self.provider)
            .field("program", &self.program)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CliCompletion {
    pub fn new(provider: AiProvider, model: Option<String>, timeout_seconds: u64) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            provider,
            program: provider.command_name().to_string(),
            model,
            timeout: Duration::from_secs(timeout_seconds),
            runtime,
        })
    }

    /// 実行ファイルを差し替える（PATH外のCLIを使う場合）
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn run(&self, prompt: &str) -> Result<String> {
        let args = self.provider.build_args(prompt, self.model.as_deref());

        // Windowsではcmd /c経由（改行はスペースに置換）
        #[cfg(windows)]
        let mut command = {
            let mut command = Command::new("cmd");
            command.arg("/c").arg(&self.program);
            command.args(args.iter().map(|a| a.replace('\n', " ")));
            command
        };

        #[cfg(not(windows))]
        let mut command = {
            let mut command = Command::new(&self.program);
            command.args(&args);
            command
        };

        command.kill_on_drop(true);

        tracing::debug!(program = %self.program, prompt_len = prompt.len(), "AI CLI呼び出し");

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| RewardCliError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| RewardCliError::CliExecution(format!("{} 実行エラー: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RewardCliError::CliExecution(format!(
                "{} failed (code {:?}): {}",
                self.program,
                output.status.code(),
                stderr
            )));
        }

        let response = String::from_utf8_lossy(&output.stdout).to_string();
        tracing::debug!(response_len = response.len(), "AI CLI応答");
        Ok(response)
    }
}

impl Completion for CliCompletion {
    fn complete(&self, prompt: &str) -> ct_reward_common::Result<String> {
        self.runtime
            .block_on(self.run(prompt))
            .map_err(|e| ct_reward_common::Error::Completion(e.to_string()))
    }
}
