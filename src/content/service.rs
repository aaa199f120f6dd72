// src/content/service.rs
//! Background side of the message boundary: answers `getContent` requests
//! by dispatching to the provider for the requested type.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::news::NewsProvider;
use super::poem::PoemProvider;
use super::vocabulary::VocabularyProvider;
use super::{fetch_or_fallback, ContentPayload, ContentProvider};
use crate::config::ContentConfig;
use crate::prefs::ContentType;

pub const ACTION_GET_CONTENT: &str = "getContent";

/// `{action: "getContent", contentType}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRequest {
    pub action: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl ContentRequest {
    pub fn get_content(content_type: ContentType) -> Self {
        Self {
            action: ACTION_GET_CONTENT.to_string(),
            content_type: Some(content_type.as_str().to_string()),
        }
    }
}

/// `{content: ContentPayload}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentResponse {
    pub content: ContentPayload,
}

pub struct ContentService {
    news: Arc<dyn ContentProvider>,
    poem: Arc<dyn ContentProvider>,
    language: Arc<dyn ContentProvider>,
}

impl ContentService {
    pub fn new(
        news: Arc<dyn ContentProvider>,
        poem: Arc<dyn ContentProvider>,
        language: Arc<dyn ContentProvider>,
    ) -> Self {
        Self {
            news,
            poem,
            language,
        }
    }

    /// Live providers talking to the configured upstreams.
    pub fn from_config(cfg: &ContentConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .user_agent(concat!("adlapse/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building content http client")?;
        Ok(Self::new(
            Arc::new(NewsProvider::from_url(
                cfg.news_url.clone(),
                cfg.news_format,
                cfg.news_label.clone(),
                client.clone(),
            )),
            Arc::new(PoemProvider::from_url(cfg.poem_url.clone(), client)),
            Arc::new(VocabularyProvider),
        ))
    }

    /// No network: news and poems serve their fallbacks, vocabulary works as usual.
    pub fn offline() -> Self {
        Self::new(
            Arc::new(NewsProvider::offline()),
            Arc::new(PoemProvider::offline()),
            Arc::new(VocabularyProvider),
        )
    }

    fn provider(&self, content_type: ContentType) -> &dyn ContentProvider {
        match content_type {
            ContentType::News => self.news.as_ref(),
            ContentType::Poem => self.poem.as_ref(),
            ContentType::Language => self.language.as_ref(),
        }
    }

    pub async fn get_content(&self, content_type: ContentType) -> ContentPayload {
        fetch_or_fallback(self.provider(content_type)).await
    }

    /// Answer one boundary message. `None` for actions this service does not
    /// handle; an unknown content type yields the `loading` payload.
    pub async fn handle(&self, req: &ContentRequest) -> Option<ContentResponse> {
        if req.action != ACTION_GET_CONTENT {
            tracing::debug!(target: "adlapse::content", action = %req.action, "ignoring unknown action");
            return None;
        }
        let content = match req.content_type.as_deref().map(str::parse::<ContentType>) {
            Some(Ok(t)) => self.get_content(t).await,
            _ => {
                tracing::debug!(
                    target: "adlapse::content",
                    content_type = ?req.content_type,
                    "unknown content type, answering loading"
                );
                ContentPayload::Loading
            }
        };
        Some(ContentResponse { content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_service_serves_fallbacks() {
        let svc = ContentService::offline();
        let news = svc.get_content(ContentType::News).await;
        assert!(matches!(news, ContentPayload::News { ref source, .. } if source == "Prime Overlay"));
        let poem = svc.get_content(ContentType::Poem).await;
        assert!(matches!(poem, ContentPayload::Poem { ref author, .. } if author == "Robert Frost"));
    }

    #[tokio::test]
    async fn unknown_action_and_type() {
        let svc = ContentService::offline();
        let bogus = ContentRequest {
            action: "ping".into(),
            content_type: None,
        };
        assert!(svc.handle(&bogus).await.is_none());

        let weather = ContentRequest {
            action: ACTION_GET_CONTENT.into(),
            content_type: Some("weather".into()),
        };
        assert_eq!(
            svc.handle(&weather).await.unwrap().content,
            ContentPayload::Loading
        );
    }
}
