//! Scripted ad break against a simulated player page (stdout/log only).
//!
//! Runs with the regular config (`config/adlapse.toml` or
//! `$ADLAPSE_CONFIG_PATH`): its cadence, selectors and preferences file.
//! Content comes from the offline providers unless `--remote` is passed, in
//! which case the configured service endpoint answers.

use std::sync::Arc;

use adlapse::content::{ContentClient, HttpContentClient, LocalContentClient};
use adlapse::page::SimulatedPage;
use adlapse::prefs::FilePreferencesStore;
use adlapse::{
    AdLapseConfig, ContentService, ContentType, DetectionLoop, PreferenceChange, PreferencesStore,
};
use anyhow::Context;
use tokio::time::sleep;
use tracing::info;

fn print_overlay(step: &str, page: &SimulatedPage) {
    match page.overlay() {
        Some(m) => println!("[{step}] overlay: {} | {}", m.header, m.body_html),
        None => println!("[{step}] no overlay"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    adlapse::telemetry::init_tracing();

    let cfg = AdLapseConfig::load_default().context("loading adlapse config")?;
    let remote = std::env::args().skip(1).any(|a| a == "--remote");

    let client: Arc<dyn ContentClient> = if remote {
        info!(endpoint = %cfg.service.endpoint, "demo using content service");
        Arc::new(
            HttpContentClient::new(&cfg.service.endpoint).with_timeout(cfg.detection.fetch_timeout()),
        )
    } else {
        Arc::new(LocalContentClient::new(Arc::new(ContentService::offline())))
    };

    let store = Arc::new(FilePreferencesStore::new(&cfg.preferences.path));
    info!(path = %store.path().display(), "demo preferences");

    let page = Arc::new(SimulatedPage::new());
    let video = page.add_video(false);
    let handle = DetectionLoop::from_config(&cfg, page.clone(), client, store.clone()).spawn();

    // A few polls per step; a full rotation plus one step to see a refresh.
    let step = cfg.detection.poll_interval() * 3;
    let rotation = cfg.detection.rotation_interval() + step;
    println!(
        "poll every {:?}, rotate every {:?}",
        cfg.detection.poll_interval(),
        cfg.detection.rotation_interval()
    );

    sleep(step).await;
    print_overlay("content", &page);

    page.show_ad_timer("Ad 1 of 2 · 0:30");
    sleep(step).await;
    print_overlay("ad started", &page);
    println!("video muted: {:?}", page.is_muted(video));

    store
        .set(PreferenceChange::ContentType(ContentType::Language))
        .await?;
    println!("{}", ContentType::Language.status_label());
    sleep(rotation).await;
    print_overlay("after rotation", &page);
    if let Some(html) = page.overlay_html() {
        println!("{html}");
    }

    page.click_close();
    sleep(step).await;
    print_overlay("user closed", &page);

    page.clear_elements();
    sleep(step).await;
    print_overlay("ad ended", &page);
    println!("video muted: {:?}", page.is_muted(video));

    let status = handle.status();
    println!("polls={} generation={}", status.polls, status.generation);
    handle.shutdown().await?;
    println!("adlapse-demo done");
    Ok(())
}
