// src/detection/mod.rs
//! The detection loop: one task that owns the detection state, the cached
//! preferences and the overlay controller, and multiplexes the poll ticker,
//! the rotation ticker, user dismissals, preference changes and content
//! fetch completions.
//!
//! Fetches run as separate tasks and report back over a channel with the
//! ticket they were issued under, so a result that lands after its overlay
//! is gone is recognized by generation and dropped.

pub mod state;

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use metrics::counter;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::{AdLapseConfig, DetectionConfig};
use crate::content::{ContentClient, ContentPayload};
use crate::detector::AdDetector;
use crate::overlay::{Completion, FetchPurpose, FetchTicket, Generation, OverlayController};
use crate::page::{PageInspector, PageSurface};
use crate::prefs::{self, PreferenceChange, Preferences, PreferencesStore};
use crate::schedule::Ticker;

pub use state::{DetectionState, Transition};

/// Polls between heartbeat logs (10 s at the default cadence).
const HEARTBEAT_POLLS: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Not polling.
    Idle,
    /// Polling the page on the configured cadence.
    Watching,
}

/// Observable snapshot, republished after every event the loop handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopStatus {
    /// Startup preference read finished (or fell back).
    pub ready: bool,
    pub mode: LoopMode,
    pub state: DetectionState,
    pub preferences: Preferences,
    pub generation: Generation,
    pub overlay_pending: bool,
    pub polls: u64,
}

#[derive(Debug)]
enum Command {
    Enable,
    Disable,
    Shutdown,
}

struct FetchDone {
    ticket: FetchTicket,
    result: Result<ContentPayload>,
}

/// Control side of a spawned [`DetectionLoop`].
pub struct LoopHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<LoopStatus>,
    task: JoinHandle<()>,
}

impl LoopHandle {
    /// Start polling (no-op when already watching). Does not persist.
    pub fn enable(&self) {
        let _ = self.commands.send(Command::Enable);
    }

    /// Stop polling and hide any overlay. Does not persist.
    pub fn disable(&self) {
        let _ = self.commands.send(Command::Disable);
    }

    pub fn status(&self) -> LoopStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoopStatus> {
        self.status.clone()
    }

    /// Hide the overlay, release muted videos and end the loop task.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.commands.send(Command::Shutdown);
        self.task.await.context("detection loop task failed")
    }
}

pub struct DetectionLoop {
    cfg: DetectionConfig,
    inspector: Arc<dyn PageInspector>,
    detector: AdDetector,
    overlay: OverlayController,
    client: Arc<dyn ContentClient>,
    store: Arc<dyn PreferencesStore>,
    prefs: Preferences,
    state: DetectionState,
    mode: LoopMode,
    ready: bool,
    polls: u64,
    poll: Ticker,
    rotation: Ticker,
    dismiss_rx: mpsc::UnboundedReceiver<Generation>,
    fetch_tx: mpsc::UnboundedSender<FetchDone>,
    fetch_rx: mpsc::UnboundedReceiver<FetchDone>,
    status_tx: watch::Sender<LoopStatus>,
}

impl DetectionLoop {
    pub fn new<P>(
        cfg: DetectionConfig,
        page: Arc<P>,
        client: Arc<dyn ContentClient>,
        store: Arc<dyn PreferencesStore>,
    ) -> Self
    where
        P: PageInspector + PageSurface + 'static,
    {
        let (dismiss_tx, dismiss_rx) = mpsc::unbounded_channel();
        let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();
        let inspector: Arc<dyn PageInspector> = page.clone();
        let surface: Arc<dyn PageSurface> = page;

        let mut this = Self {
            poll: Ticker::new(cfg.poll_interval()),
            rotation: Ticker::new(cfg.rotation_interval()),
            cfg,
            inspector,
            detector: AdDetector::default(),
            overlay: OverlayController::new(surface, dismiss_tx),
            client,
            store,
            prefs: Preferences::default(),
            state: DetectionState::default(),
            mode: LoopMode::Idle,
            ready: false,
            polls: 0,
            dismiss_rx,
            fetch_tx,
            fetch_rx,
            status_tx: watch::channel(LoopStatus {
                ready: false,
                mode: LoopMode::Idle,
                state: DetectionState::default(),
                preferences: Preferences::default(),
                generation: 0,
                overlay_pending: false,
                polls: 0,
            })
            .0,
        };
        this.publish();
        this
    }

    /// Loop with the configured cadence, timeouts and selector table.
    pub fn from_config<P>(
        cfg: &AdLapseConfig,
        page: Arc<P>,
        client: Arc<dyn ContentClient>,
        store: Arc<dyn PreferencesStore>,
    ) -> Self
    where
        P: PageInspector + PageSurface + 'static,
    {
        Self::new(cfg.detection.clone(), page, client, store)
            .with_detector(AdDetector::new(cfg.selectors.clone()))
    }

    pub fn with_detector(mut self, detector: AdDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn spawn(self) -> LoopHandle {
        let (commands, rx) = mpsc::unbounded_channel();
        let status = self.status_tx.subscribe();
        let task = tokio::spawn(self.run(rx));
        LoopHandle {
            commands,
            status,
            task,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        // Subscribe before reading so a change racing startup is not lost.
        let mut changes = self.store.subscribe();
        let mut changes_open = true;

        self.prefs = prefs::load_or_default(self.store.as_ref(), self.cfg.prefs_timeout()).await;
        self.ready = true;
        if self.prefs.enabled {
            self.enable();
        } else {
            warn!(target: "adlapse::loop", "extension is disabled in settings");
        }
        self.publish();

        loop {
            tokio::select! {
                biased;

                cmd = commands.recv() => match cmd {
                    Some(Command::Enable) => self.enable(),
                    Some(Command::Disable) => self.disable(),
                    Some(Command::Shutdown) | None => break,
                },
                change = changes.recv(), if changes_open => match change {
                    Ok(c) => self.on_preference_change(c),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(target: "adlapse::loop", missed, "preference changes lagged, resyncing");
                        self.resync_preferences().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(target: "adlapse::loop", "preference store closed its change feed");
                        changes_open = false;
                    }
                },
                Some(generation) = self.dismiss_rx.recv() => self.on_user_dismiss(generation),
                Some(done) = self.fetch_rx.recv() => self.on_fetch_done(done),
                _ = self.poll.tick() => self.on_poll(),
                _ = self.rotation.tick() => self.on_rotation_tick(),
            }
            self.publish();
        }

        self.poll.stop();
        self.mode = LoopMode::Idle;
        self.hide_overlay();
        self.publish();
        info!(target: "adlapse::loop", polls = self.polls, "detection loop stopped");
    }

    fn enable(&mut self) {
        if self.mode == LoopMode::Watching {
            return;
        }
        self.mode = LoopMode::Watching;
        self.poll.start();
        info!(
            target: "adlapse::loop",
            period_ms = self.poll.period().as_millis() as u64,
            "ad detection started"
        );
    }

    /// Stop polling and drop everything tied to the current ad, so a later
    /// enable during the same ad shows the overlay again.
    fn disable(&mut self) {
        if self.mode == LoopMode::Watching {
            info!(target: "adlapse::loop", "ad detection stopped");
        }
        self.mode = LoopMode::Idle;
        self.poll.stop();
        self.hide_overlay();
        self.state.reset();
    }

    fn on_poll(&mut self) {
        if self.mode != LoopMode::Watching {
            return;
        }
        self.polls += 1;
        counter!("detection_polls_total").increment(1);

        let signal = self.detector.classify(self.inspector.as_ref());
        match self.state.observe(signal.is_some()) {
            Transition::Show => {
                info!(target: "adlapse::loop", ?signal, "ad detected");
                counter!("detection_ads_total").increment(1);
                if let Some(ticket) = self
                    .overlay
                    .show(self.prefs.content_type, self.state.user_dismissed)
                {
                    self.dispatch(ticket);
                }
            }
            Transition::Hide => {
                info!(target: "adlapse::loop", "ad ended, no ad indicators found");
                self.hide_overlay();
            }
            Transition::None => {
                if self.polls % HEARTBEAT_POLLS == 0 {
                    if self.state.ad_playing && self.state.user_dismissed {
                        debug!(target: "adlapse::loop", "ad still playing but user closed overlay");
                    } else {
                        trace!(
                            target: "adlapse::loop",
                            polls = self.polls,
                            ad_playing = self.state.ad_playing,
                            "detection heartbeat"
                        );
                    }
                }
            }
        }
    }

    fn on_rotation_tick(&mut self) {
        if let Some(ticket) = self
            .overlay
            .rotation_tick(self.prefs.content_type, self.state.user_dismissed)
        {
            debug!(target: "adlapse::loop", content_type = %ticket.content_type, "refreshing overlay content");
            self.dispatch(ticket);
        }
    }

    fn on_user_dismiss(&mut self, generation: Generation) {
        if generation != self.overlay.generation() || !self.overlay.is_visible() {
            trace!(target: "adlapse::loop", generation, "ignoring close from a previous overlay");
            return;
        }
        info!(target: "adlapse::loop", "user closed overlay");
        counter!("overlay_dismissed_total").increment(1);
        self.state.dismiss();
        self.hide_overlay();
    }

    fn on_fetch_done(&mut self, done: FetchDone) {
        if let Completion::Rendered { rotate: true } = self.overlay.complete(done.ticket, done.result) {
            self.rotation.start();
            info!(
                target: "adlapse::loop",
                period_secs = self.rotation.period().as_secs(),
                "content rotation started"
            );
        }
    }

    fn on_preference_change(&mut self, change: PreferenceChange) {
        match change {
            PreferenceChange::ContentType(t) => {
                if t != self.prefs.content_type {
                    info!(target: "adlapse::loop", content_type = %t, "content type changed");
                }
                self.prefs.content_type = t;
            }
            PreferenceChange::Enabled(on) => self.apply_enabled(on),
        }
    }

    fn apply_enabled(&mut self, on: bool) {
        self.prefs.enabled = on;
        if on {
            self.enable();
        } else {
            self.disable();
        }
    }

    /// Missed change events: take the store's current view, but keep what we
    /// have if the store cannot answer.
    async fn resync_preferences(&mut self) {
        match tokio::time::timeout(self.cfg.prefs_timeout(), self.store.get()).await {
            Ok(Ok(fresh)) => {
                self.prefs.content_type = fresh.content_type;
                self.apply_enabled(fresh.enabled);
            }
            Ok(Err(e)) => warn!(target: "adlapse::loop", error = ?e, "preference resync failed"),
            Err(_) => warn!(target: "adlapse::loop", "preference resync timed out"),
        }
    }

    fn hide_overlay(&mut self) {
        self.overlay.hide();
        self.rotation.stop();
    }

    fn dispatch(&self, ticket: FetchTicket) {
        let purpose = match ticket.purpose {
            FetchPurpose::Show => "show",
            FetchPurpose::Rotate => "rotate",
        };
        counter!("content_requests_total", "purpose" => purpose).increment(1);

        let client = Arc::clone(&self.client);
        let tx = self.fetch_tx.clone();
        let limit = self.cfg.fetch_timeout();
        tokio::spawn(async move {
            let result = match tokio::time::timeout(limit, client.request(ticket.content_type)).await {
                Ok(r) => r,
                Err(_) => Err(anyhow!("no content response within {limit:?}")),
            };
            // Loop gone means nobody wants the result.
            let _ = tx.send(FetchDone { ticket, result });
        });
    }

    fn publish(&mut self) {
        self.state.overlay_visible = self.overlay.is_visible();
        let status = LoopStatus {
            ready: self.ready,
            mode: self.mode,
            state: self.state,
            preferences: self.prefs,
            generation: self.overlay.generation(),
            overlay_pending: self.overlay.is_pending(),
            polls: self.polls,
        };
        self.status_tx.send_replace(status);
    }
}
