// src/content/vocabulary.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::seq::IndexedRandom;

use super::{ContentPayload, ContentProvider};

/// (word, meaning, example)
pub const WORDS: &[(&str, &str, &str)] = &[
    (
        "Serendipity",
        "Finding something good without looking for it",
        "Meeting my best friend was pure serendipity.",
    ),
    (
        "Ephemeral",
        "Lasting for a very short time",
        "The beauty of cherry blossoms is ephemeral.",
    ),
    (
        "Resilience",
        "The ability to recover quickly from difficulties",
        "Her resilience helped her overcome many challenges.",
    ),
    (
        "Eloquent",
        "Fluent and persuasive in speaking or writing",
        "The speaker gave an eloquent presentation.",
    ),
    (
        "Ubiquitous",
        "Present or appearing everywhere",
        "Smartphones have become ubiquitous in modern life.",
    ),
    (
        "Meticulous",
        "Showing great attention to detail; very careful",
        "She was meticulous in her research.",
    ),
    (
        "Paradigm",
        "A typical example or pattern of something",
        "The discovery shifted the scientific paradigm.",
    ),
    (
        "Ambiguous",
        "Open to more than one interpretation; unclear",
        "His answer was deliberately ambiguous.",
    ),
];

fn entry(&(word, translation, example): &(&str, &str, &str)) -> ContentPayload {
    ContentPayload::Language {
        word: word.to_string(),
        translation: translation.to_string(),
        example: example.to_string(),
    }
}

/// Curated word list; no network involved.
#[derive(Debug, Clone, Copy, Default)]
pub struct VocabularyProvider;

#[async_trait]
impl ContentProvider for VocabularyProvider {
    async fn fetch_live(&self) -> Result<ContentPayload> {
        WORDS
            .choose(&mut rand::rng())
            .map(entry)
            .ok_or_else(|| anyhow!("vocabulary list is empty"))
    }

    fn fallback(&self) -> ContentPayload {
        entry(&WORDS[0])
    }

    fn name(&self) -> &'static str {
        "language"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn picks_from_curated_list() {
        let ContentPayload::Language { word, .. } = VocabularyProvider.fetch_live().await.unwrap()
        else {
            panic!("expected language payload");
        };
        assert!(WORDS.iter().any(|(w, _, _)| *w == word));
    }
}
