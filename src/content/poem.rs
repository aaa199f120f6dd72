// src/content/poem.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{ContentPayload, ContentProvider};

pub const DEFAULT_POETRYDB_URL: &str = "https://poetrydb.org/random/1";

/// Lines shown before the excerpt is cut with `...`.
pub const MAX_LINES: usize = 8;

#[derive(Debug, Deserialize)]
struct PoemEntry {
    title: String,
    author: String,
    #[serde(default)]
    lines: Vec<String>,
}

/// Parse a PoetryDB `random/N` response and take the first poem.
pub fn parse_poetrydb(body: &str) -> Result<ContentPayload> {
    let entries: Vec<PoemEntry> = serde_json::from_str(body).context("parsing poetrydb json")?;
    let poem = entries
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("poetrydb returned no poems"))?;
    Ok(excerpt(poem))
}

fn excerpt(poem: PoemEntry) -> ContentPayload {
    let mut lines = poem
        .lines
        .iter()
        .take(MAX_LINES)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n");
    if poem.lines.len() > MAX_LINES {
        lines.push_str("\n...");
    }
    ContentPayload::Poem {
        title: poem.title,
        author: poem.author,
        lines,
    }
}

enum Mode {
    Http {
        url: String,
        client: reqwest::Client,
    },
    Fixture(String),
    Offline,
}

pub struct PoemProvider {
    mode: Mode,
}

impl PoemProvider {
    pub fn from_url(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        }
    }

    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn offline() -> Self {
        Self { mode: Mode::Offline }
    }
}

#[async_trait]
impl ContentProvider for PoemProvider {
    async fn fetch_live(&self) -> Result<ContentPayload> {
        match &self.mode {
            Mode::Fixture(s) => parse_poetrydb(s),
            Mode::Offline => Err(anyhow!("poem provider is offline")),
            Mode::Http { url, client } => {
                let body = client
                    .get(url.as_str())
                    .send()
                    .await
                    .context("poetrydb http get()")?
                    .error_for_status()
                    .context("poetrydb http status")?
                    .text()
                    .await
                    .context("poetrydb http .text()")?;
                parse_poetrydb(&body)
            }
        }
    }

    fn fallback(&self) -> ContentPayload {
        ContentPayload::Poem {
            title: "The Road Not Taken".to_string(),
            author: "Robert Frost".to_string(),
            lines: [
                "Two roads diverged in a yellow wood,",
                "And sorry I could not travel both",
                "And be one traveler, long I stood",
                "And looked down one as far as I could",
                "To where it bent in the undergrowth;",
            ]
            .join("\n"),
        }
    }

    fn name(&self) -> &'static str {
        "poem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_poems_are_cut_after_eight_lines() {
        let lines: Vec<String> = (1..=12).map(|i| format!("line {i}")).collect();
        let body = serde_json::json!([{ "title": "T", "author": "A", "lines": lines }]).to_string();
        let ContentPayload::Poem { lines, .. } = parse_poetrydb(&body).unwrap() else {
            panic!("expected poem");
        };
        assert_eq!(lines.lines().count(), MAX_LINES + 1);
        assert!(lines.ends_with("line 8\n..."));
    }

    #[test]
    fn short_poems_are_kept_whole() {
        let body = r#"[{"title":"Fog","author":"Carl Sandburg","lines":["The fog comes","on little cat feet."]}]"#;
        assert_eq!(
            parse_poetrydb(body).unwrap(),
            ContentPayload::Poem {
                title: "Fog".into(),
                author: "Carl Sandburg".into(),
                lines: "The fog comes\non little cat feet.".into(),
            }
        );
    }

    #[test]
    fn empty_response_is_an_error() {
        assert!(parse_poetrydb("[]").is_err());
        assert!(parse_poetrydb(r#"{"status":404,"reason":"Not found"}"#).is_err());
    }
}
