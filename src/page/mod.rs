// src/page/mod.rs
//! What the core needs from a player page, split in two seams: reading
//! element state (detection) and mutating the page (mute + overlay).

pub mod html;
pub mod simulated;

use crate::overlay::{DismissSignal, OverlayMarkup};

pub use html::HtmlSnapshotPage;
pub use simulated::SimulatedPage;

/// Point-in-time view of one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    pub class_name: String,
    pub text: String,
    /// Rendered width in CSS pixels; zero for hidden or detached nodes.
    pub rendered_width: u32,
}

impl ElementSnapshot {
    pub fn new(class_name: impl Into<String>, text: impl Into<String>, rendered_width: u32) -> Self {
        Self {
            class_name: class_name.into(),
            text: text.into(),
            rendered_width,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.rendered_width > 0
    }
}

/// Read-only element lookup. Implementations return an empty list for
/// selectors they cannot evaluate.
pub trait PageInspector: Send + Sync {
    fn query_all(&self, selector: &str) -> Vec<ElementSnapshot>;

    fn query_first(&self, selector: &str) -> Option<ElementSnapshot> {
        self.query_all(selector).into_iter().next()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VideoId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoState {
    pub id: VideoId,
    pub muted: bool,
}

/// Page mutations owned by the overlay controller.
pub trait PageSurface: Send + Sync {
    fn videos(&self) -> Vec<VideoState>;

    /// Returns false when the video is gone from the page.
    fn set_muted(&self, id: VideoId, muted: bool) -> bool;

    fn mount_overlay(&self, markup: &OverlayMarkup, on_close: DismissSignal);

    fn update_overlay(&self, markup: &OverlayMarkup);

    fn remove_overlay(&self);
}
