use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::session::DEFAULT_REFRESH_INTERVAL;

pub const DEFAULT_API_URL: &str = "https://api.bundle-admin.app";
pub const DEFAULT_TOKEN_URL: &str = "https://api.bundle-admin.app/api/session/token";

#[derive(Serialize, Deserialize)]
pub struct Config {
    pub api_key: String,
    pub api_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub shop: Option<String>,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("token_url", &self.token_url)
            .field("shop", &self.shop)
            .field("refresh_interval_secs", &self.refresh_interval_secs)
            .finish()
    }
}

#[derive(Deserialize)]
pub struct ConfigEnv {
    pub bundle_api_key: Option<String>,
    pub bundle_api_url: Option<String>,
    pub bundle_token_url: Option<String>,
    pub bundle_shop: Option<String>,
    pub bundle_refresh_interval_secs: Option<u64>,
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL.as_secs()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).context("Failed to read config file")?;

        serde_json::from_str(&contents).context("Failed to parse config file")
    }

    pub fn load_with_env(path: &Path) -> Result<Self> {
        load_dotenv();

        let env_config = envy::from_env::<ConfigEnv>().ok();

        let mut config = if path.exists() {
            Self::load(path)?
        } else if let Some(ref env) = env_config {
            let api_key = env
                .bundle_api_key
                .as_ref()
                .context("No config file found and BUNDLE_API_KEY not set")?
                .clone();
            let api_url = env
                .bundle_api_url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_URL.to_string());

            Self::new(api_key, api_url)
        } else {
            return Err(anyhow::anyhow!(
                "No config file found and no environment variables set"
            ));
        };

        if let Some(env_config) = env_config {
            if let Some(api_key) = env_config.bundle_api_key {
                config.api_key = api_key;
            }
            if let Some(api_url) = env_config.bundle_api_url {
                config.api_url = api_url;
            }
            if let Some(token_url) = env_config.bundle_token_url {
                config.token_url = token_url;
            }
            if env_config.bundle_shop.is_some() {
                config.shop = env_config.bundle_shop;
            }
            if let Some(secs) = env_config.bundle_refresh_interval_secs {
                config.refresh_interval_secs = secs;
            }
        }

        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            api_key,
            api_url,
            token_url: default_token_url(),
            shop: None,
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    /// Never zero, so the refresh task cannot spin.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

/// Loads `.env` from the working directory if there is one.
pub fn load_dotenv() {
    if let Ok(dotenv_path) = std::env::current_dir().map(|mut p| {
        p.push(".env");
        p
    }) {
        if dotenv_path.exists() {
            dotenvy::from_path(&dotenv_path).ok();
        }
    }
}
