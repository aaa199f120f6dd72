// src/page/simulated.rs
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{ElementSnapshot, PageInspector, PageSurface, VideoId, VideoState};
use crate::overlay::{DismissSignal, OverlayMarkup};

/// In-memory player page. Tests and the demo script it: toggle ad markers,
/// add videos, click the overlay's close button.
#[derive(Default)]
pub struct SimulatedPage {
    inner: Mutex<PageState>,
}

#[derive(Default)]
struct PageState {
    elements: Vec<ElementSnapshot>,
    videos: BTreeMap<VideoId, bool>,
    next_video: u64,
    overlay: Option<MountedOverlay>,
    mounts: usize,
    updates: usize,
}

struct MountedOverlay {
    markup: OverlayMarkup,
    html: String,
    on_close: DismissSignal,
}

impl SimulatedPage {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, PageState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_element(&self, element: ElementSnapshot) {
        self.state().elements.push(element);
    }

    pub fn set_elements(&self, elements: Vec<ElementSnapshot>) {
        self.state().elements = elements;
    }

    pub fn clear_elements(&self) {
        self.state().elements.clear();
    }

    /// Visible ad countdown, the most common ad marker.
    pub fn show_ad_timer(&self, text: &str) {
        self.set_elements(vec![ElementSnapshot::new(
            "atvwebplayersdk-ad-timer-text",
            text,
            120,
        )]);
    }

    pub fn add_video(&self, muted: bool) -> VideoId {
        let mut st = self.state();
        let id = VideoId(st.next_video);
        st.next_video += 1;
        st.videos.insert(id, muted);
        id
    }

    pub fn remove_video(&self, id: VideoId) {
        self.state().videos.remove(&id);
    }

    pub fn is_muted(&self, id: VideoId) -> Option<bool> {
        self.state().videos.get(&id).copied()
    }

    /// User-side mute toggle, bypassing the controller.
    pub fn user_set_muted(&self, id: VideoId, muted: bool) {
        if let Some(m) = self.state().videos.get_mut(&id) {
            *m = muted;
        }
    }

    pub fn overlay(&self) -> Option<OverlayMarkup> {
        self.state().overlay.as_ref().map(|o| o.markup.clone())
    }

    /// Container markup as it would sit in the player DOM.
    pub fn overlay_html(&self) -> Option<String> {
        self.state().overlay.as_ref().map(|o| o.html.clone())
    }

    pub fn has_overlay(&self) -> bool {
        self.state().overlay.is_some()
    }

    /// How many times an overlay was mounted since the page was created.
    pub fn mount_count(&self) -> usize {
        self.state().mounts
    }

    pub fn update_count(&self) -> usize {
        self.state().updates
    }

    /// Activate the close affordance. Returns false when no overlay is mounted.
    pub fn click_close(&self) -> bool {
        let signal = self.state().overlay.as_ref().map(|o| o.on_close.clone());
        match signal {
            Some(s) => {
                s.fire();
                true
            }
            None => false,
        }
    }
}

fn class_matches(class_name: &str, selector: &str) -> bool {
    let Some(compound) = selector.trim().strip_prefix('.') else {
        return false;
    };
    let have: Vec<&str> = class_name.split_whitespace().collect();
    compound
        .split('.')
        .all(|want| !want.is_empty() && have.contains(&want))
}

impl PageInspector for SimulatedPage {
    fn query_all(&self, selector: &str) -> Vec<ElementSnapshot> {
        self.state()
            .elements
            .iter()
            .filter(|el| selector.split(',').any(|s| class_matches(&el.class_name, s)))
            .cloned()
            .collect()
    }
}

impl PageSurface for SimulatedPage {
    fn videos(&self) -> Vec<VideoState> {
        self.state()
            .videos
            .iter()
            .map(|(&id, &muted)| VideoState { id, muted })
            .collect()
    }

    fn set_muted(&self, id: VideoId, muted: bool) -> bool {
        match self.state().videos.get_mut(&id) {
            Some(m) => {
                *m = muted;
                true
            }
            None => false,
        }
    }

    fn mount_overlay(&self, markup: &OverlayMarkup, on_close: DismissSignal) {
        let mut st = self.state();
        st.overlay = Some(MountedOverlay {
            markup: markup.clone(),
            html: markup.to_html(),
            on_close,
        });
        st.mounts += 1;
    }

    fn update_overlay(&self, markup: &OverlayMarkup) {
        let mut st = self.state();
        if let Some(o) = st.overlay.as_mut() {
            o.markup = markup.clone();
            o.html = markup.to_html();
            st.updates += 1;
        }
    }

    fn remove_overlay(&self) {
        self.state().overlay = None;
    }
}
