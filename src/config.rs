use serde::Deserialize;

use crate::services::BanditSettings;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Directory holding bandit model artifacts
    #[serde(default = "default_models_dir")]
    pub models_dir: String,

    /// LinUCB exploration strength for new models
    #[serde(default = "default_bandit_alpha")]
    pub bandit_alpha: f64,

    /// Feedback a user needs before their own model is blended in
    #[serde(default = "default_min_user_updates")]
    pub min_user_updates: u64,

    /// Hub repository with a pre-trained global model
    pub hf_repo_id: Option<String>,

    /// Hub base URL
    #[serde(default = "default_hf_hub_url")]
    pub hf_hub_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_models_dir() -> String {
    "models/bandit".to_string()
}

fn default_bandit_alpha() -> f64 {
    1.0
}

fn default_min_user_updates() -> u64 {
    10
}

fn default_hf_hub_url() -> String {
    "https://huggingface.co".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn bandit_settings(&self) -> BanditSettings {
        BanditSettings {
            alpha: self.bandit_alpha,
            min_user_updates: self.min_user_updates,
        }
    }

    /// Remote repository, ignoring a blank `HF_REPO_ID`
    pub fn hub_repo(&self) -> Option<&str> {
        self.hf_repo_id
            .as_deref()
            .map(str::trim)
            .filter(|repo| !repo.is_empty())
    }
}
