// src/prefs/mod.rs
//! User preferences: the `{enabled, contentType}` pair the settings UI writes
//! and the detection loop caches.

pub mod file_store;
pub mod memory;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

pub use file_store::FilePreferencesStore;
pub use memory::MemoryPreferencesStore;

/// How long startup waits for the store before falling back to defaults.
pub const DEFAULT_PREFS_TIMEOUT: Duration = Duration::from_secs(2);

/// Capacity of the change fan-out; slow subscribers resync on lag.
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 32;

/// What the overlay shows while an ad runs.
///
/// Deserialization is lenient: unknown or malformed values resolve to
/// [`ContentType::News`], so a stale settings file never leaves the loop
/// without a provider. Use [`str::parse`] where a typo should be an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ContentType {
    #[default]
    News,
    Poem,
    Language,
}

impl ContentType {
    pub const ALL: [ContentType; 3] = [ContentType::News, ContentType::Poem, ContentType::Language];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::News => "news",
            ContentType::Poem => "poem",
            ContentType::Language => "language",
        }
    }

    /// Lenient resolution: missing or unknown tags become `news`.
    pub fn resolve(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or_default()
    }

    /// Confirmation line the settings UI shows after a switch.
    pub fn status_label(self) -> &'static str {
        match self {
            ContentType::News => "News headlines selected",
            ContentType::Poem => "Poems selected",
            ContentType::Language => "Language learning selected",
        }
    }
}

impl FromStr for ContentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "news" => Ok(ContentType::News),
            "poem" => Ok(ContentType::Poem),
            "language" => Ok(ContentType::Language),
            other => Err(anyhow!("unknown content type: {other:?}")),
        }
    }
}

impl From<String> for ContentType {
    fn from(s: String) -> Self {
        ContentType::resolve(Some(&s))
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub enabled: bool,
    pub content_type: ContentType,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            enabled: true,
            content_type: ContentType::News,
        }
    }
}

/// One `{key, newValue}` change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "key", content = "newValue", rename_all = "camelCase")]
pub enum PreferenceChange {
    Enabled(bool),
    ContentType(ContentType),
}

/// On-disk / in-memory shape. Every field is optional; only an explicit
/// `enabled: false` turns the extension off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
}

impl StoredPreferences {
    pub fn resolve(&self) -> Preferences {
        Preferences {
            enabled: self.enabled != Some(false),
            content_type: self.content_type.unwrap_or_default(),
        }
    }

    pub fn apply(&mut self, change: PreferenceChange) {
        match change {
            PreferenceChange::Enabled(v) => self.enabled = Some(v),
            PreferenceChange::ContentType(t) => self.content_type = Some(t),
        }
    }
}

#[async_trait]
pub trait PreferencesStore: Send + Sync {
    /// Current preferences with defaults applied.
    async fn get(&self) -> Result<Preferences>;

    /// Persist one change, then notify subscribers.
    async fn set(&self, change: PreferenceChange) -> Result<()>;

    /// Change notifications written after this call.
    fn subscribe(&self) -> broadcast::Receiver<PreferenceChange>;
}

/// Read preferences, giving up after `wait`. Failure and timeout both fall
/// back to [`Preferences::default`] so detection still starts.
pub async fn load_or_default(store: &dyn PreferencesStore, wait: Duration) -> Preferences {
    match tokio::time::timeout(wait, store.get()).await {
        Ok(Ok(prefs)) => {
            info!(target: "adlapse::prefs", ?prefs, "settings loaded");
            prefs
        }
        Ok(Err(e)) => {
            warn!(target: "adlapse::prefs", error = ?e, "settings read failed, starting with defaults");
            Preferences::default()
        }
        Err(_) => {
            warn!(target: "adlapse::prefs", ?wait, "settings read timed out, starting with defaults");
            Preferences::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_content_type_resolves_to_news() {
        assert_eq!(ContentType::resolve(Some("podcast")), ContentType::News);
        assert_eq!(ContentType::resolve(None), ContentType::News);
        assert_eq!(ContentType::resolve(Some(" Poem ")), ContentType::Poem);
        assert!("podcast".parse::<ContentType>().is_err());
        for t in ContentType::ALL {
            assert_eq!(t.as_str().parse::<ContentType>().unwrap(), t);
        }
    }

    #[test]
    fn stored_preferences_only_disable_on_explicit_false() {
        let empty: StoredPreferences = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.resolve(), Preferences::default());

        let off: StoredPreferences =
            serde_json::from_str(r#"{"enabled":false,"contentType":"weather"}"#).unwrap();
        let p = off.resolve();
        assert!(!p.enabled);
        assert_eq!(p.content_type, ContentType::News);
    }

    #[test]
    fn change_uses_key_new_value_shape() {
        let json = serde_json::to_string(&PreferenceChange::ContentType(ContentType::Poem)).unwrap();
        assert_eq!(json, r#"{"key":"contentType","newValue":"poem"}"#);

        let back: PreferenceChange =
            serde_json::from_str(r#"{"key":"enabled","newValue":false}"#).unwrap();
        assert_eq!(back, PreferenceChange::Enabled(false));
    }
}
