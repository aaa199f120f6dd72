// src/detector.rs
//! Ad detection heuristics over the player's DOM.
//!
//! Each signal is checked independently in priority order and the first hit
//! wins. Visibility (non-zero rendered width) gates every signal because the
//! player leaves hidden ad nodes behind across navigations.

use serde::{Deserialize, Serialize};

use crate::page::PageInspector;

/// Which page marker revealed the ad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdSignal {
    /// Countdown/timer text containing the "ad" marker.
    AdTimer,
    /// "Seek unavailable during ads" notice.
    SeekUnavailable,
    /// "Go ad free" upsell inside the player.
    AdFreeButton,
    /// "Your video continues here after the break".
    ResumeMessage,
}

fn default_ad_timer() -> Vec<String> {
    vec![
        ".atvwebplayersdk-ad-timer-text".into(),
        ".atvwebplayersdk-ad-timer".into(),
        ".atvwebplayersdk-ad-timer-countdown".into(),
    ]
}
fn default_seek_unavailable() -> String {
    ".atvwebplayersdk-seek-unavailable-text".into()
}
fn default_ad_free_button() -> String {
    ".atvwebplayersdk-go-ad-free-button".into()
}
fn default_resume_message() -> String {
    ".atvwebplayersdk-ad-resume-message".into()
}

/// CSS selectors for each signal; the player renames classes now and then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorSelectors {
    #[serde(default = "default_ad_timer")]
    pub ad_timer: Vec<String>,
    #[serde(default = "default_seek_unavailable")]
    pub seek_unavailable: String,
    #[serde(default = "default_ad_free_button")]
    pub ad_free_button: String,
    #[serde(default = "default_resume_message")]
    pub resume_message: String,
}

impl Default for DetectorSelectors {
    fn default() -> Self {
        Self {
            ad_timer: default_ad_timer(),
            seek_unavailable: default_seek_unavailable(),
            ad_free_button: default_ad_free_button(),
            resume_message: default_resume_message(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdDetector {
    selectors: DetectorSelectors,
    timer_query: String,
}

impl Default for AdDetector {
    fn default() -> Self {
        Self::new(DetectorSelectors::default())
    }
}

impl AdDetector {
    pub fn new(selectors: DetectorSelectors) -> Self {
        let timer_query = selectors.ad_timer.join(", ");
        Self {
            selectors,
            timer_query,
        }
    }

    pub fn selectors(&self) -> &DetectorSelectors {
        &self.selectors
    }

    /// Is an ad playing right now?
    pub fn detect(&self, page: &dyn PageInspector) -> bool {
        self.classify(page).is_some()
    }

    /// Like [`detect`](Self::detect) but reports which signal matched.
    pub fn classify(&self, page: &dyn PageInspector) -> Option<AdSignal> {
        if self.timer_shows_ad(page) {
            return Some(AdSignal::AdTimer);
        }
        let single = [
            (&self.selectors.seek_unavailable, AdSignal::SeekUnavailable),
            (&self.selectors.ad_free_button, AdSignal::AdFreeButton),
            (&self.selectors.resume_message, AdSignal::ResumeMessage),
        ];
        single
            .into_iter()
            .find(|(sel, _)| page.query_first(sel).is_some_and(|el| el.is_visible()))
            .map(|(_, signal)| signal)
    }

    fn timer_shows_ad(&self, page: &dyn PageInspector) -> bool {
        if self.timer_query.is_empty() {
            return false;
        }
        page.query_all(&self.timer_query).iter().any(|el| {
            let text = el.text.trim();
            // Countdown containers also render plain "0:15" between ads.
            el.is_visible() && !text.is_empty() && text.to_lowercase().contains("ad")
        })
    }
}
