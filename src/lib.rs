// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod content;
pub mod detection;
pub mod detector;
pub mod metrics;
pub mod overlay;
pub mod page;
pub mod prefs;
pub mod schedule;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::config::AdLapseConfig;
pub use crate::content::{ContentClient, ContentPayload, ContentService};
pub use crate::detection::{DetectionLoop, DetectionState, LoopHandle, LoopMode, LoopStatus};
pub use crate::detector::{AdDetector, AdSignal};
pub use crate::overlay::OverlayController;
pub use crate::prefs::{ContentType, PreferenceChange, Preferences, PreferencesStore};
