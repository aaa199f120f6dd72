// src/prefs/file_store.rs
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::{fs, sync::broadcast, sync::Mutex};

use super::{
    PreferenceChange, Preferences, PreferencesStore, StoredPreferences, CHANGE_CHANNEL_CAPACITY,
};

pub const DEFAULT_PREFS_PATH: &str = "state/preferences.json";

/// JSON-file store. A missing file means "never configured" and yields the
/// defaults; a corrupt file is an error so the caller applies its fallback.
pub struct FilePreferencesStore {
    path: PathBuf,
    tx: broadcast::Sender<PreferenceChange>,
    // Serializes read-modify-write cycles from concurrent `set`s.
    write_lock: Mutex<()>,
}

impl FilePreferencesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            path: path.into(),
            tx,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_stored(&self) -> Result<StoredPreferences> {
        match fs::read_to_string(&self.path).await {
            Ok(s) if s.trim().is_empty() => Ok(StoredPreferences::default()),
            Ok(s) => serde_json::from_str(&s)
                .with_context(|| format!("parsing preferences at {}", self.path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(StoredPreferences::default()),
            Err(e) => {
                Err(e).with_context(|| format!("reading preferences at {}", self.path.display()))
            }
        }
    }

    async fn write_stored(&self, stored: &StoredPreferences) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let body = serde_json::to_vec_pretty(stored).context("serializing preferences")?;
        fs::write(&self.path, body)
            .await
            .with_context(|| format!("writing preferences to {}", self.path.display()))
    }
}

#[async_trait]
impl PreferencesStore for FilePreferencesStore {
    async fn get(&self) -> Result<Preferences> {
        Ok(self.read_stored().await?.resolve())
    }

    async fn set(&self, change: PreferenceChange) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut stored = match self.read_stored().await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(target: "adlapse::prefs", error = ?e, "overwriting unreadable preferences file");
                StoredPreferences::default()
            }
        };
        stored.apply(change);
        self.write_stored(&stored).await?;
        let _ = self.tx.send(change);
        tracing::debug!(target: "adlapse::prefs", ?change, "preference saved");
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<PreferenceChange> {
        self.tx.subscribe()
    }
}
