// src/overlay/mod.rs
//! Overlay lifecycle: the single overlay handle, the set of videos this
//! controller muted, and the generation counter that tells current fetch
//! results from stale ones.
//!
//! The controller never awaits. `show` and `rotation_tick` hand back a
//! [`FetchTicket`]; whoever runs the fetch reports back through
//! [`OverlayController::complete`], and the ticket's generation decides
//! whether the result still applies.

pub mod render;

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;
use metrics::counter;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::content::ContentPayload;
use crate::page::{PageSurface, VideoId};
use crate::prefs::ContentType;

pub use render::OverlayMarkup;

/// Bumped on every show cycle and every hide.
pub type Generation = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPurpose {
    /// First content for a new overlay.
    Show,
    /// Periodic refresh of a visible overlay.
    Rotate,
}

/// A content request issued by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: Generation,
    pub purpose: FetchPurpose,
    pub content_type: ContentType,
}

/// Close affordance wiring: firing reports the generation of the overlay
/// the button belonged to.
#[derive(Debug, Clone)]
pub struct DismissSignal {
    generation: Generation,
    tx: mpsc::UnboundedSender<Generation>,
}

impl DismissSignal {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn fire(&self) {
        // Receiver gone means the loop shut down; nothing left to dismiss.
        let _ = self.tx.send(self.generation);
    }
}

/// What a completed fetch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Overlay created. `rotate` is false when only the loading placeholder
    /// could be shown.
    Rendered { rotate: bool },
    /// Visible overlay got fresh content.
    Updated,
    /// Rotation fetch failed; current content stays.
    Kept,
    /// Result belonged to an older generation and was dropped.
    Stale,
}

#[derive(Debug)]
struct OverlayHandle {
    generation: Generation,
    rotating: bool,
}

pub struct OverlayController {
    surface: Arc<dyn PageSurface>,
    dismiss_tx: mpsc::UnboundedSender<Generation>,
    generation: Generation,
    handle: Option<OverlayHandle>,
    show_pending: bool,
    rotation_in_flight: bool,
    muted: BTreeSet<VideoId>,
}

impl OverlayController {
    pub fn new(surface: Arc<dyn PageSurface>, dismiss_tx: mpsc::UnboundedSender<Generation>) -> Self {
        Self {
            surface,
            dismiss_tx,
            generation: 0,
            handle: None,
            show_pending: false,
            rotation_in_flight: false,
            muted: BTreeSet::new(),
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_visible(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.show_pending
    }

    pub fn is_rotating(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| h.rotating)
    }

    pub fn rotation_in_flight(&self) -> bool {
        self.rotation_in_flight
    }

    pub fn muted_videos(&self) -> &BTreeSet<VideoId> {
        &self.muted
    }

    /// Start a show cycle: mute the player and ask for content. No-op while
    /// an overlay exists, a show is already pending, or the user dismissed
    /// the overlay for the current ad.
    pub fn show(&mut self, content_type: ContentType, user_dismissed: bool) -> Option<FetchTicket> {
        if self.handle.is_some() {
            debug!(target: "adlapse::overlay", "overlay already showing");
            return None;
        }
        if self.show_pending {
            debug!(target: "adlapse::overlay", generation = self.generation, "show already pending");
            return None;
        }
        if user_dismissed {
            debug!(target: "adlapse::overlay", "dismissed by user, not showing until next ad");
            return None;
        }

        self.mute_videos();
        self.generation += 1;
        self.show_pending = true;
        info!(target: "adlapse::overlay", generation = self.generation, %content_type, "showing overlay");
        counter!("overlay_show_total").increment(1);
        Some(FetchTicket {
            generation: self.generation,
            purpose: FetchPurpose::Show,
            content_type,
        })
    }

    /// Apply a fetch result. Results from an older generation are dropped.
    pub fn complete(&mut self, ticket: FetchTicket, result: Result<ContentPayload>) -> Completion {
        if ticket.generation != self.generation {
            trace!(
                target: "adlapse::overlay",
                ticket = ticket.generation,
                current = self.generation,
                purpose = ?ticket.purpose,
                "discarding stale content"
            );
            counter!("overlay_stale_results_total").increment(1);
            return Completion::Stale;
        }

        match ticket.purpose {
            FetchPurpose::Show => {
                if !self.show_pending || self.handle.is_some() {
                    return Completion::Stale;
                }
                self.show_pending = false;
                let (payload, rotate) = match result {
                    Ok(p) => (p, true),
                    Err(e) => {
                        warn!(target: "adlapse::overlay", error = ?e, "content request failed, showing placeholder");
                        (ContentPayload::Loading, false)
                    }
                };
                self.mount(&payload, rotate);
                Completion::Rendered { rotate }
            }
            FetchPurpose::Rotate => {
                self.rotation_in_flight = false;
                match result {
                    Ok(payload) if self.update(&payload) => Completion::Updated,
                    Ok(_) => Completion::Stale,
                    Err(e) => {
                        warn!(target: "adlapse::overlay", error = ?e, "content refresh failed");
                        Completion::Kept
                    }
                }
            }
        }
    }

    /// Replace header and body of the visible overlay. Returns false (and
    /// does nothing) when no overlay exists.
    pub fn update(&mut self, payload: &ContentPayload) -> bool {
        if self.handle.is_none() {
            return false;
        }
        self.surface.update_overlay(&OverlayMarkup::from_payload(payload));
        debug!(target: "adlapse::overlay", kind = payload.kind(), "content refreshed");
        true
    }

    /// Ask for fresh content for the visible overlay. Skipped while a
    /// previous refresh is outstanding, after a dismissal, and for
    /// placeholder overlays.
    pub fn rotation_tick(&mut self, content_type: ContentType, user_dismissed: bool) -> Option<FetchTicket> {
        if user_dismissed || self.rotation_in_flight || !self.is_rotating() {
            trace!(target: "adlapse::overlay", in_flight = self.rotation_in_flight, "rotation tick skipped");
            return None;
        }
        self.rotation_in_flight = true;
        Some(FetchTicket {
            generation: self.generation,
            purpose: FetchPurpose::Rotate,
            content_type,
        })
    }

    /// Tear down the current show cycle: invalidate in-flight fetches,
    /// remove the overlay and unmute what this controller muted. Returns
    /// whether an overlay was actually removed.
    pub fn hide(&mut self) -> bool {
        let had_cycle = self.handle.is_some() || self.show_pending;
        if had_cycle {
            self.generation += 1;
        }
        self.show_pending = false;
        self.rotation_in_flight = false;

        let removed = match self.handle.take() {
            Some(h) => {
                self.surface.remove_overlay();
                info!(target: "adlapse::overlay", generation = h.generation, "overlay removed");
                counter!("overlay_hide_total").increment(1);
                true
            }
            None => {
                trace!(target: "adlapse::overlay", "no overlay to remove");
                false
            }
        };
        self.unmute_videos();
        removed
    }

    fn mount(&mut self, payload: &ContentPayload, rotate: bool) {
        let markup = OverlayMarkup::from_payload(payload);
        let on_close = DismissSignal {
            generation: self.generation,
            tx: self.dismiss_tx.clone(),
        };
        self.surface.mount_overlay(&markup, on_close);
        self.handle = Some(OverlayHandle {
            generation: self.generation,
            rotating: rotate,
        });
        info!(target: "adlapse::overlay", kind = payload.kind(), rotate, "overlay added to page");
    }

    fn mute_videos(&mut self) {
        for v in self.surface.videos() {
            if !v.muted && self.surface.set_muted(v.id, true) {
                self.muted.insert(v.id);
                debug!(target: "adlapse::overlay", video = v.id.0, "video muted");
            }
        }
    }

    fn unmute_videos(&mut self) {
        for id in std::mem::take(&mut self.muted) {
            if self.surface.set_muted(id, false) {
                debug!(target: "adlapse::overlay", video = id.0, "video unmuted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::SimulatedPage;
    use anyhow::anyhow;

    fn controller() -> (OverlayController, Arc<SimulatedPage>, mpsc::UnboundedReceiver<Generation>) {
        let page = Arc::new(SimulatedPage::new());
        let (tx, rx) = mpsc::unbounded_channel();
        (OverlayController::new(page.clone(), tx), page, rx)
    }

    fn poem() -> ContentPayload {
        ContentPayload::Poem {
            title: "Fog".into(),
            author: "Carl Sandburg".into(),
            lines: "The fog comes\non little cat feet.".into(),
        }
    }

    #[test]
    fn second_show_while_pending_is_a_noop() {
        let (mut c, page, _rx) = controller();
        let first = c.show(ContentType::Poem, false);
        assert!(first.is_some());
        assert!(c.show(ContentType::Poem, false).is_none());

        c.complete(first.unwrap(), Ok(poem()));
        assert!(c.show(ContentType::Poem, false).is_none());
        assert_eq!(page.mount_count(), 1);
    }

    #[test]
    fn dismissed_show_does_nothing() {
        let (mut c, page, _rx) = controller();
        let v = page.add_video(false);
        assert!(c.show(ContentType::News, true).is_none());
        assert_eq!(page.is_muted(v), Some(false));
        assert_eq!(c.generation(), 0);
    }

    #[test]
    fn failed_show_renders_placeholder_without_rotation() {
        let (mut c, page, _rx) = controller();
        let t = c.show(ContentType::News, false).unwrap();
        assert_eq!(c.complete(t, Err(anyhow!("boom"))), Completion::Rendered { rotate: false });
        assert_eq!(page.overlay().unwrap().kind, "loading");
        assert!(c.rotation_tick(ContentType::News, false).is_none());
    }

    #[test]
    fn hide_during_pending_show_discards_result_and_unmutes() {
        let (mut c, page, _rx) = controller();
        let v = page.add_video(false);
        let t = c.show(ContentType::Poem, false).unwrap();
        assert_eq!(page.is_muted(v), Some(true));

        assert!(!c.hide());
        assert_eq!(page.is_muted(v), Some(false));

        assert_eq!(c.complete(t, Ok(poem())), Completion::Stale);
        assert!(!page.has_overlay());
        assert!(!c.is_visible());
    }

    #[test]
    fn rotation_is_single_flight_and_dies_with_hide() {
        let (mut c, page, _rx) = controller();
        let t = c.show(ContentType::Poem, false).unwrap();
        c.complete(t, Ok(poem()));

        let r1 = c.rotation_tick(ContentType::Poem, false).unwrap();
        assert!(c.rotation_tick(ContentType::Poem, false).is_none());
        assert_eq!(c.complete(r1, Ok(poem())), Completion::Updated);
        assert_eq!(page.update_count(), 1);

        let r2 = c.rotation_tick(ContentType::Poem, false).unwrap();
        assert!(c.hide());
        assert_eq!(c.complete(r2, Ok(poem())), Completion::Stale);
        assert_eq!(page.update_count(), 1);
        assert!(c.rotation_tick(ContentType::Poem, false).is_none());
    }

    #[test]
    fn only_videos_we_muted_are_released() {
        let (mut c, page, _rx) = controller();
        let playing = page.add_video(false);
        let user_muted = page.add_video(true);

        let t = c.show(ContentType::News, false).unwrap();
        c.complete(t, Ok(poem()));
        assert_eq!(c.muted_videos().len(), 1);

        c.hide();
        assert_eq!(page.is_muted(playing), Some(false));
        assert_eq!(page.is_muted(user_muted), Some(true));
    }

    #[test]
    fn close_button_reports_overlay_generation() {
        let (mut c, page, mut rx) = controller();
        let t = c.show(ContentType::News, false).unwrap();
        c.complete(t, Ok(poem()));
        assert!(page.click_close());
        assert_eq!(rx.try_recv().unwrap(), c.generation());
    }
}
