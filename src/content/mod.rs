// src/content/mod.rs
pub mod client;
pub mod news;
pub mod poem;
pub mod service;
pub mod vocabulary;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};


pub use client::{ContentClient, HttpContentClient, LocalContentClient};
pub use service::{ContentRequest, ContentResponse, ContentService, ACTION_GET_CONTENT};

/// What the overlay renders. The wire form is tagged by `type`, e.g.
/// `{"type":"poem","title":"…","author":"…","lines":"…"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPayload {
    Loading,
    News {
        title: String,
        description: String,
        source: String,
    },
    Poem {
        title: String,
        author: String,
        lines: String,
    },
    Language {
        word: String,
        translation: String,
        example: String,
    },
}

impl ContentPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            ContentPayload::Loading => "loading",
            ContentPayload::News { .. } => "news",
            ContentPayload::Poem { .. } => "poem",
            ContentPayload::Language { .. } => "language",
        }
    }
}

/// One content source. `fetch_live` may fail; callers go through
/// [`fetch_or_fallback`] so nothing upstream ever sees the error.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn fetch_live(&self) -> Result<ContentPayload>;

    /// Static payload served when the live source is unreachable or malformed.
    fn fallback(&self) -> ContentPayload;

    fn name(&self) -> &'static str;
}

pub async fn fetch_or_fallback(provider: &dyn ContentProvider) -> ContentPayload {
    match provider.fetch_live().await {
        Ok(payload) => {
            counter!("content_fetch_total", "provider" => provider.name()).increment(1);
            payload
        }
        Err(e) => {
            tracing::warn!(
                target: "adlapse::content",
                error = ?e,
                provider = provider.name(),
                "provider error, serving fallback"
            );
            counter!("content_fallback_total", "provider" => provider.name()).increment(1);
            provider.fallback()
        }
    }
}

/// Normalize feed text for display: decode entities, strip tags, unify
/// typographic quotes, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();

    let decoded = html_escape::decode_html_entities(s);
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    let out = re_tags.replace_all(&decoded, "");

    let out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// First `max` characters (not bytes) of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
