// src/prefs/memory.rs
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{
    PreferenceChange, Preferences, PreferencesStore, StoredPreferences, CHANGE_CHANNEL_CAPACITY,
};

/// Process-local store. Also doubles as a test double: reads can be delayed
/// or made to fail to exercise the startup fallback path.
pub struct MemoryPreferencesStore {
    inner: Mutex<StoredPreferences>,
    tx: broadcast::Sender<PreferenceChange>,
    read_delay: Option<Duration>,
    fail_reads: bool,
}

impl MemoryPreferencesStore {
    pub fn new() -> Self {
        Self::with_preferences(Preferences::default())
    }

    pub fn with_preferences(prefs: Preferences) -> Self {
        let (tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Mutex::new(StoredPreferences {
                enabled: Some(prefs.enabled),
                content_type: Some(prefs.content_type),
            }),
            tx,
            read_delay: None,
            fail_reads: false,
        }
    }

    /// Every `get` sleeps this long before answering.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Every `get` returns an error.
    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn snapshot(&self) -> Preferences {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .resolve()
    }
}

impl Default for MemoryPreferencesStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PreferencesStore for MemoryPreferencesStore {
    async fn get(&self) -> Result<Preferences> {
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads {
            bail!("preferences storage unavailable");
        }
        Ok(self.snapshot())
    }

    async fn set(&self, change: PreferenceChange) -> Result<()> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(change);
        // No subscribers is fine; the value is still stored.
        let _ = self.tx.send(change);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<PreferenceChange> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::ContentType;

    #[tokio::test]
    async fn set_stores_and_notifies() {
        let store = MemoryPreferencesStore::new();
        let mut rx = store.subscribe();

        store
            .set(PreferenceChange::ContentType(ContentType::Language))
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            PreferenceChange::ContentType(ContentType::Language)
        );
        assert_eq!(
            store.get().await.unwrap().content_type,
            ContentType::Language
        );
    }
}
