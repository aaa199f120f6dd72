// src/content/news.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use super::{clean_text, truncate_chars, ContentPayload, ContentProvider};

pub const DEFAULT_REDDIT_URL: &str = "https://www.reddit.com/r/worldnews/top.json?limit=10";
pub const DEFAULT_REDDIT_LABEL: &str = "Reddit r/worldnews";

const DESCRIPTION_MAX_CHARS: usize = 200;
const EMPTY_DESCRIPTION: &str = "Click to read more...";
/// Random pick happens among this many newest headlines.
pub const PICK_WINDOW: usize = 5;

/// Which wire format a news source speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, serde::Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    /// Reddit listing JSON (`/top.json`).
    #[default]
    Reddit,
    /// RSS 2.0 channel.
    Rss,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    pub description: String,
    pub published_at: Option<i64>,
}

// --- Reddit listing ---

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}
#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}
#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}
#[derive(Debug, Deserialize)]
struct Post {
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    created_utc: Option<f64>,
}

pub fn parse_reddit_listing(body: &str) -> Result<Vec<NewsItem>> {
    let listing: Listing = serde_json::from_str(body).context("parsing reddit listing json")?;
    Ok(listing
        .data
        .children
        .into_iter()
        .filter_map(|c| {
            let title = clean_text(&c.data.title);
            if title.is_empty() {
                return None;
            }
            Some(NewsItem {
                title,
                description: truncate_chars(&c.data.selftext, DESCRIPTION_MAX_CHARS),
                published_at: c.data.created_utc.map(|t| t as i64),
            })
        })
        .collect())
}

// --- RSS ---

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> Option<i64> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.unix_timestamp())
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

pub fn parse_rss(body: &str) -> Result<Vec<NewsItem>> {
    let xml = scrub_html_entities_for_xml(body);
    let rss: Rss = from_str(&xml).context("parsing rss xml")?;
    Ok(rss
        .channel
        .item
        .into_iter()
        .filter_map(|it| {
            let title = clean_text(it.title.as_deref().unwrap_or_default());
            if title.is_empty() {
                return None;
            }
            let description = clean_text(it.description.as_deref().unwrap_or_default());
            Some(NewsItem {
                title,
                description: truncate_chars(&description, DESCRIPTION_MAX_CHARS),
                published_at: it.pub_date.as_deref().and_then(parse_rfc2822_to_unix),
            })
        })
        .collect())
}

/// Up to `n` items, newest first. Undated items sort after dated ones and
/// keep their feed order.
pub fn freshest(items: &[NewsItem], n: usize) -> Vec<&NewsItem> {
    let mut sorted: Vec<&NewsItem> = items.iter().collect();
    sorted.sort_by_key(|it| std::cmp::Reverse(it.published_at));
    sorted.truncate(n);
    sorted
}

// --- provider ---

enum Mode {
    Http {
        url: String,
        client: reqwest::Client,
    },
    Fixture(String),
    Offline,
}

/// Picks one random headline from a Reddit listing or an RSS feed.
pub struct NewsProvider {
    mode: Mode,
    format: FeedFormat,
    label: String,
}

impl NewsProvider {
    pub fn from_url(
        url: impl Into<String>,
        format: FeedFormat,
        label: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                client,
            },
            format,
            label: label.into(),
        }
    }

    pub fn from_fixture(body: &str, format: FeedFormat, label: impl Into<String>) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
            format,
            label: label.into(),
        }
    }

    /// Never reaches the network; always serves the fallback.
    pub fn offline() -> Self {
        Self {
            mode: Mode::Offline,
            format: FeedFormat::default(),
            label: DEFAULT_REDDIT_LABEL.to_string(),
        }
    }

    fn parse(&self, body: &str) -> Result<Vec<NewsItem>> {
        let t0 = std::time::Instant::now();
        let items = match self.format {
            FeedFormat::Reddit => parse_reddit_listing(body),
            FeedFormat::Rss => parse_rss(body),
        };
        histogram!("content_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        items
    }

    fn to_payload(&self, item: &NewsItem) -> ContentPayload {
        let description = if item.description.trim().is_empty() {
            EMPTY_DESCRIPTION.to_string()
        } else {
            item.description.clone()
        };
        ContentPayload::News {
            title: item.title.clone(),
            description,
            source: self.label.clone(),
        }
    }

    fn pick(&self, items: &[NewsItem]) -> Result<ContentPayload> {
        let item = freshest(items, PICK_WINDOW)
            .choose(&mut rand::rng())
            .copied()
            .ok_or_else(|| anyhow!("news source returned no items"))?;
        Ok(self.to_payload(item))
    }
}

#[async_trait]
impl ContentProvider for NewsProvider {
    async fn fetch_live(&self) -> Result<ContentPayload> {
        let body = match &self.mode {
            Mode::Fixture(s) => s.clone(),
            Mode::Offline => return Err(anyhow!("news provider is offline")),
            Mode::Http { url, client } => client
                .get(url.as_str())
                .send()
                .await
                .context("news http get()")?
                .error_for_status()
                .context("news http status")?
                .text()
                .await
                .context("news http .text()")?,
        };
        let items = self.parse(&body)?;
        self.pick(&items)
    }

    fn fallback(&self) -> ContentPayload {
        ContentPayload::News {
            title: "Stay curious and keep learning!".to_string(),
            description: "Unable to fetch live news at the moment. Check your connection."
                .to_string(),
            source: "Prime Overlay".to_string(),
        }
    }

    fn name(&self) -> &'static str {
        "news"
    }
}
