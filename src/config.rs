use crate::ai_provider::AiProvider;
use crate::error::{RewardCliError, Result};
use ct_reward_common::RewardConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ai_provider: AiProvider,
    /// AI CLIに渡すモデル名（省略時はCLIの既定）
    pub model: Option<String>,
    pub timeout_seconds: u64,
    /// 並列数（0ならCPU数）
    pub jobs: usize,
    pub reward: RewardConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ai_provider: AiProvider::Claude,
            model: None,
            timeout_seconds: 120,
            jobs: 0,
            reward: RewardConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// 設定ファイルを読み込む（存在しなければ既定値）
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.reward.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| RewardCliError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("ct-report-reward").join("config.json"))
    }
}
