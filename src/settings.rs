use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::features::FeatureConfig;
use crate::problem::CODEFORCES_URL;

const CONFIG_FILE: &str = "cf_features";
const ENV_PREFIX: &str = "CF";

/// Runtime settings: optional `cf_features.toml`, overridden by `CF_*`
/// environment variables (`CF_REQUEST_DELAY_MS=500`, nested keys with `__`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub db_path: PathBuf,
    pub base_url: String,
    pub user_agent: String,
    /// Pause after every fetch, successful or not.
    pub request_delay_ms: u64,
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Statements processed (and committed) per batch.
    pub chunk_size: usize,
    pub features: FeatureConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            db_path: PathBuf::from("data/cf.sqlite"),
            base_url: CODEFORCES_URL.to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36"
                .to_string(),
            request_delay_ms: 1500,
            timeout_secs: 60,
            max_retries: 3,
            chunk_size: 500,
            features: FeatureConfig::default(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")?;
        settings
            .features
            .validate()
            .context("Invalid feature configuration")?;
        Ok(settings)
    }
}
