//! AdLapse content service, binary entrypoint.
//! Serves the `getContent` message boundary over HTTP so page-side loops can
//! fetch news, poems and vocabulary without holding provider credentials.

use std::sync::Arc;

use adlapse::api::{self, AppState};
use adlapse::metrics::Metrics;
use adlapse::{AdLapseConfig, ContentService};
use anyhow::Context;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    adlapse::telemetry::init_tracing();

    let cfg = AdLapseConfig::load_default().context("loading adlapse config")?;
    let service = ContentService::from_config(&cfg.content)?;

    let mut state = AppState::new(Arc::new(service));
    match Metrics::init() {
        Ok(m) => state = state.with_metrics(m.handle),
        Err(e) => warn!(error = ?e, "metrics disabled"),
    }

    let listener = tokio::net::TcpListener::bind(&cfg.service.bind)
        .await
        .with_context(|| format!("binding {}", cfg.service.bind))?;
    info!(addr = %cfg.service.bind, news = %cfg.content.news_url, "content service listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("content service stopped with error")
}
