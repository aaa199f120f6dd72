// src/overlay/render.rs
use html_escape::encode_text;

use crate::content::ContentPayload;

pub const CONTAINER_CLASS: &str = "prime-overlay-container";

pub const FOOTER_TEXT: &str =
    "Ad playing in background • Click ✕ to close and hear ad • Content rotates every 20s";

/// Header, body and footer of one overlay frame. Everything payload-derived
/// is already HTML-escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayMarkup {
    pub kind: &'static str,
    pub header: String,
    pub body_html: String,
    pub footer: String,
}

impl OverlayMarkup {
    pub fn from_payload(payload: &ContentPayload) -> Self {
        Self {
            kind: payload.kind(),
            header: header_text(payload).to_string(),
            body_html: body_html(payload),
            footer: FOOTER_TEXT.to_string(),
        }
    }

    /// Full container markup, close affordance included.
    pub fn to_html(&self) -> String {
        format!(
            r#"<div class="{CONTAINER_CLASS}">
  <button class="prime-overlay-close" aria-label="Close overlay">✕</button>
  <div class="prime-overlay-content">
    <div class="prime-overlay-header">{header}</div>
    <div class="prime-overlay-main">{body}</div>
    <div class="prime-overlay-footer">{footer}</div>
  </div>
</div>"#,
            header = encode_text(&self.header),
            body = self.body_html,
            footer = encode_text(&self.footer),
        )
    }
}

pub fn header_text(payload: &ContentPayload) -> &'static str {
    match payload {
        ContentPayload::News { .. } => "📰 Latest News",
        ContentPayload::Poem { .. } => "📖 Poetry Corner",
        ContentPayload::Language { .. } => "🌍 Learn Something New",
        ContentPayload::Loading => "⏳ Loading...",
    }
}

pub fn body_html(payload: &ContentPayload) -> String {
    match payload {
        ContentPayload::Loading => r#"<div class="loading">Loading content</div>"#.to_string(),
        ContentPayload::News {
            title,
            description,
            source,
        } => format!(
            r#"<div class="news-headline">{}</div><div class="news-description">{}</div><div class="news-source">Source: {}</div>"#,
            encode_text(title),
            encode_text(description),
            encode_text(source),
        ),
        ContentPayload::Poem {
            title,
            author,
            lines,
        } => format!(
            r#"<div class="poem-title">{}</div><div class="poem-author">by {}</div><div class="poem-lines">{}</div>"#,
            encode_text(title),
            encode_text(author),
            encode_text(lines),
        ),
        ContentPayload::Language {
            word,
            translation,
            example,
        } => format!(
            r#"<div class="language-word">{}</div><div class="language-translation">{}</div><div class="language-example">"{}"</div>"#,
            encode_text(word),
            encode_text(translation),
            encode_text(example),
        ),
    }
}
