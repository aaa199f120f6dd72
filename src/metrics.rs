// src/metrics.rs
use anyhow::{Context, Result};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("detection_polls_total", "Ad detector polls.");
        describe_counter!("detection_ads_total", "No-ad to ad transitions.");
        describe_counter!("overlay_show_total", "Show cycles started.");
        describe_counter!("overlay_hide_total", "Overlays removed from the page.");
        describe_counter!("overlay_dismissed_total", "Overlays closed by the user.");
        describe_counter!(
            "overlay_stale_results_total",
            "Content results dropped because their overlay was gone."
        );
        describe_counter!(
            "content_requests_total",
            "Content requests issued by the loop, by purpose."
        );
        describe_counter!("content_fetch_total", "Live provider fetches, by provider.");
        describe_counter!(
            "content_fallback_total",
            "Provider failures answered with the static fallback."
        );
        describe_histogram!("content_parse_ms", "News feed parse time in milliseconds.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if one is already installed.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }
}
