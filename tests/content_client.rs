// tests/content_client.rs
//
// Page-side clients against a real content service on an ephemeral port.

use std::sync::Arc;
use std::time::Duration;

use adlapse::api::{self, AppState};
use adlapse::content::{ContentClient, HttpContentClient, LocalContentClient};
use adlapse::{ContentPayload, ContentService, ContentType};

async fn serve_offline() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = api::router(AppState::new(Arc::new(ContentService::offline())));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

#[tokio::test]
async fn http_client_round_trips_get_content() {
    let base = serve_offline().await;
    let client = HttpContentClient::new(&base).with_timeout(Duration::from_secs(2));
    assert!(client.endpoint().ends_with("/message"));
    assert!(!client.endpoint().contains("//message"));

    let news = client.request(ContentType::News).await.unwrap();
    assert_eq!(news.kind(), "news");

    let word = client.request(ContentType::Language).await.unwrap();
    assert!(matches!(word, ContentPayload::Language { .. }));
}

#[tokio::test]
async fn http_client_reports_unreachable_service() {
    // grab a free port, then close it again
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpContentClient::new(&format!("http://{addr}"))
        .with_timeout(Duration::from_millis(500))
        .with_retries(2);
    let err = client.request(ContentType::Poem).await.unwrap_err();
    assert!(err.to_string().contains("/message"), "error was {err}");
}

#[tokio::test]
async fn local_client_matches_service() {
    let client = LocalContentClient::new(Arc::new(ContentService::offline()));
    let poem = client.request(ContentType::Poem).await.unwrap();
    let ContentPayload::Poem { author, .. } = poem else {
        panic!("expected poem");
    };
    assert_eq!(author, "Robert Frost");
}

#[tokio::test(start_paused = true)]
async fn retries_against_a_dead_service_stay_bounded() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpContentClient::new(&format!("http://{addr}"))
        .with_timeout(Duration::from_millis(500))
        .with_retries(70);
    let started = tokio::time::Instant::now();
    assert!(client.request(ContentType::News).await.is_err());
    // at most 8 attempts: 250 + 500 + 1000 + 2000 + 3 * 4000 ms of backoff
    assert!(
        started.elapsed() <= Duration::from_millis(15_750 + 8 * 500),
        "took {:?}",
        started.elapsed()
    );
}
