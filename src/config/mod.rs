// src/config/mod.rs
//! Runtime configuration: TOML file with every field defaulted, then env
//! overrides, then sanitizing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::content::news::{FeedFormat, DEFAULT_REDDIT_LABEL, DEFAULT_REDDIT_URL};
use crate::content::poem::DEFAULT_POETRYDB_URL;
use crate::detector::DetectorSelectors;
use crate::prefs::file_store::DEFAULT_PREFS_PATH;
use crate::prefs::DEFAULT_PREFS_TIMEOUT;

pub const DEFAULT_CONFIG_PATH: &str = "config/adlapse.toml";
pub const ENV_CONFIG_PATH: &str = "ADLAPSE_CONFIG_PATH";

const ENV_POLL_MS: &str = "ADLAPSE_POLL_MS";
const ENV_ROTATION_SECS: &str = "ADLAPSE_ROTATION_SECS";
const ENV_PREFS_TIMEOUT_MS: &str = "ADLAPSE_PREFS_TIMEOUT_MS";
const ENV_FETCH_TIMEOUT_MS: &str = "ADLAPSE_FETCH_TIMEOUT_MS";
const ENV_BIND: &str = "ADLAPSE_BIND";
const ENV_CONTENT_URL: &str = "ADLAPSE_CONTENT_URL";
const ENV_PREFS_PATH: &str = "ADLAPSE_PREFS_PATH";

fn default_poll_ms() -> u64 {
    500
}
fn default_rotation_secs() -> u64 {
    20
}
fn default_prefs_timeout_ms() -> u64 {
    DEFAULT_PREFS_TIMEOUT.as_millis() as u64
}
fn default_fetch_timeout_ms() -> u64 {
    10_000
}
fn default_http_timeout_secs() -> u64 {
    8
}
fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}
fn default_endpoint() -> String {
    "http://127.0.0.1:8787".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdLapseConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub preferences: PreferencesConfig,
    #[serde(default)]
    pub selectors: DetectorSelectors,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_poll_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_rotation_secs")]
    pub rotation_interval_secs: u64,
    /// Startup wait for the preferences store.
    #[serde(default = "default_prefs_timeout_ms")]
    pub prefs_timeout_ms: u64,
    /// A content request with no answer after this long counts as failed.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_ms(),
            rotation_interval_secs: default_rotation_secs(),
            prefs_timeout_ms: default_prefs_timeout_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

impl DetectionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
    pub fn rotation_interval(&self) -> Duration {
        Duration::from_secs(self.rotation_interval_secs)
    }
    pub fn prefs_timeout(&self) -> Duration {
        Duration::from_millis(self.prefs_timeout_ms)
    }
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default)]
    pub news_format: FeedFormat,
    #[serde(default = "ContentConfig::default_news_url")]
    pub news_url: String,
    #[serde(default = "ContentConfig::default_news_label")]
    pub news_label: String,
    #[serde(default = "ContentConfig::default_poem_url")]
    pub poem_url: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl ContentConfig {
    fn default_news_url() -> String {
        DEFAULT_REDDIT_URL.to_string()
    }
    fn default_news_label() -> String {
        DEFAULT_REDDIT_LABEL.to_string()
    }
    fn default_poem_url() -> String {
        DEFAULT_POETRYDB_URL.to_string()
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            news_format: FeedFormat::default(),
            news_url: Self::default_news_url(),
            news_label: Self::default_news_label(),
            poem_url: Self::default_poem_url(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Where the content service listens.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Where page-side clients reach it.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            endpoint: default_endpoint(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesConfig {
    #[serde(default = "PreferencesConfig::default_path")]
    pub path: PathBuf,
}

impl PreferencesConfig {
    fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_PREFS_PATH)
    }
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
        }
    }
}

impl AdLapseConfig {
    /// Parse a TOML file, then apply env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: AdLapseConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config at {}", path.display()))?;
        Ok(cfg.with_env_overrides().sanitized())
    }

    /// Resolution order:
    /// 1) $ADLAPSE_CONFIG_PATH (must exist)
    /// 2) config/adlapse.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            return Self::load_from(&default_path);
        }
        Ok(Self::default().with_env_overrides().sanitized())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_u64(ENV_POLL_MS) {
            self.detection.poll_interval_ms = v;
        }
        if let Some(v) = env_u64(ENV_ROTATION_SECS) {
            self.detection.rotation_interval_secs = v;
        }
        if let Some(v) = env_u64(ENV_PREFS_TIMEOUT_MS) {
            self.detection.prefs_timeout_ms = v;
        }
        if let Some(v) = env_u64(ENV_FETCH_TIMEOUT_MS) {
            self.detection.fetch_timeout_ms = v;
        }
        if let Some(v) = env_string(ENV_BIND) {
            self.service.bind = v;
        }
        if let Some(v) = env_string(ENV_CONTENT_URL) {
            self.service.endpoint = v;
        }
        if let Some(v) = env_string(ENV_PREFS_PATH) {
            self.preferences.path = PathBuf::from(v);
        }
        self
    }

    /// Zero periods would spin the loop; fall back to defaults instead.
    fn sanitized(mut self) -> Self {
        let d = &mut self.detection;
        if d.poll_interval_ms == 0 {
            d.poll_interval_ms = default_poll_ms();
        }
        if d.rotation_interval_secs == 0 {
            d.rotation_interval_secs = default_rotation_secs();
        }
        if d.prefs_timeout_ms == 0 {
            d.prefs_timeout_ms = default_prefs_timeout_ms();
        }
        if d.fetch_timeout_ms == 0 {
            d.fetch_timeout_ms = default_fetch_timeout_ms();
        }
        if self.content.http_timeout_secs == 0 {
            self.content.http_timeout_secs = default_http_timeout_secs();
        }
        self.service.endpoint = self.service.endpoint.trim_end_matches('/').to_string();
        self
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: AdLapseConfig = toml::from_str(
            r#"
[detection]
poll_interval_ms = 250

[content]
news_format = "rss"
news_url = "https://example.test/feed.xml"
"#,
        )
        .unwrap();
        assert_eq!(cfg.detection.poll_interval(), Duration::from_millis(250));
        assert_eq!(cfg.detection.rotation_interval(), Duration::from_secs(20));
        assert_eq!(cfg.content.news_format, FeedFormat::Rss);
        assert_eq!(cfg.content.poem_url, DEFAULT_POETRYDB_URL);
        assert_eq!(cfg.service.bind, "127.0.0.1:8787");
    }

    #[test]
    fn zero_periods_are_sanitized() {
        let mut cfg = AdLapseConfig::default();
        cfg.detection.poll_interval_ms = 0;
        cfg.detection.rotation_interval_secs = 0;
        cfg.service.endpoint = "http://localhost:9000/".into();
        let cfg = cfg.sanitized();
        assert_eq!(cfg.detection.poll_interval_ms, 500);
        assert_eq!(cfg.detection.rotation_interval_secs, 20);
        assert_eq!(cfg.service.endpoint, "http://localhost:9000");
    }
}
