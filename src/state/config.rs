use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::provider::{oauth, youtube};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    /// `maxResults` per listing request (1..=50)
    pub page_size: u32,
    pub api_base: String,
    pub auth_url: String,
    pub token_url: String,
    pub request_timeout_secs: u64,
    /// Pause after a commit batch before re-fetching, so the store's
    /// re-indexing has settled.
    pub settle_delay_ms: u64,
    pub redirect_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".plsort"),
            page_size: youtube::MAX_PAGE_SIZE,
            api_base: youtube::API_BASE.to_string(),
            auth_url: oauth::AUTH_URL.to_string(),
            token_url: oauth::TOKEN_URL.to_string(),
            request_timeout_secs: 30,
            settle_delay_ms: 3000,
            redirect_port: 8888,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config TOML from {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `<data_dir>/config.toml` if it exists, defaults otherwise. The
    /// directory that was asked for always wins over the one stored in the file.
    pub fn load_or_default(data_dir: &Path) -> anyhow::Result<Self> {
        let path = data_dir.join("config.toml");
        let mut config = if path.exists() {
            Self::load(&path)?
        } else {
            Self::default()
        };
        config.data_dir = data_dir.to_path_buf();
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content =
            toml::to_string_pretty(&self).with_context(|| "Failed to serialize config to TOML")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        fs::write(path, content).with_context(|| format!("Failed to write config to {:?}", path))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.page_size == 0 || self.page_size > youtube::MAX_PAGE_SIZE {
            bail!(
                "page_size must be between 1 and {}, got {}",
                youtube::MAX_PAGE_SIZE,
                self.page_size
            );
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be positive");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/callback", self.redirect_port)
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }

    pub fn credentials_dir(&self) -> PathBuf {
        self.data_dir.join("credentials")
    }
}
