//! Configuration loaded from `~/.config/medialink/config.toml`.
//!
//! Every field has a default, so a missing file (or a partial one) is fine.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub soundcloud: SoundCloudConfig,
    pub youtube: YouTubeConfig,
}

/// Gateway listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Upper bound on a whole gateway request, upstream calls included.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8787)),
            request_timeout_secs: 30,
        }
    }
}

/// Outbound HTTP client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Fixed user agent. A random desktop browser UA is used when unset.
    pub user_agent: Option<String>,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            connect_timeout_secs: 10,
            timeout_secs: 20,
        }
    }
}

/// SoundCloud scraping and API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SoundCloudConfig {
    /// Public page whose script bundles embed the `client_id`.
    pub landing_url: String,
    /// Only scripts served from this host are searched.
    pub cdn_host: String,
    pub api_base: String,
    pub credential_ttl_secs: u64,
    /// Extra attempts for network errors and 5xx responses. Zero disables.
    pub transient_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for SoundCloudConfig {
    fn default() -> Self {
        Self {
            landing_url: "https://soundcloud.com".into(),
            cdn_host: "a-v2.sndcdn.com".into(),
            api_base: "https://api-v2.soundcloud.com".into(),
            credential_ttl_secs: 3600,
            transient_retries: 0,
            retry_backoff_ms: 250,
        }
    }
}

/// YouTube player endpoint settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct YouTubeConfig {
    pub player_endpoint: String,
    pub client_name: String,
    pub client_version: String,
    pub android_sdk_version: u32,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            player_endpoint: "https://www.youtube.com/youtubei/v1/player".into(),
            client_name: "ANDROID".into(),
            client_version: "19.09.37".into(),
            android_sdk_version: 30,
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing default file yields defaults; an explicitly given path must
    /// exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (default_path(), false),
        };

        if !path.exists() {
            if required {
                anyhow::bail!("config file not found: {}", path.display());
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        Self::from_toml(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Return the path to the default config file.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("medialink")
        .join("config.toml")
}
