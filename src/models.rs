//! Data models for collected articles and the digest handed to renderers.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`Article`]: a news item, created as a stub by a source adapter and
//!   enriched in place by later stages
//! - [`SourceReport`]: what a single source contributed to a run
//! - [`Digest`]: the ranked article list plus run metadata, serialized for
//!   the external renderer

use crate::utils::{humanize_source, truncate_chars};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hard cap on the length of [`Article::content`], in characters.
pub const MAX_CONTENT_CHARS: usize = 5000;

/// Maximum number of topic tags kept on an article.
pub const MAX_TOPICS: usize = 5;

/// A news item moving through the pipeline.
///
/// Adapters create stubs with `title`, `url`, `excerpt`, `source` and
/// `fetched_at` populated. `content` stays empty until the content enricher
/// runs; `relevance_score`, `topics` and `summary` stay `None` until their
/// stages attach them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Headline. Never empty on a retained article.
    pub title: String,
    /// Absolute URL of the story.
    pub url: String,
    /// Teaser text from the listing page or feed. May be empty.
    pub excerpt: String,
    /// Full-text body, at most [`MAX_CONTENT_CHARS`] characters.
    pub content: String,
    /// Identifier of the registry entry that produced this article.
    pub source: String,
    /// Human-readable form of `source`, e.g. `"Techcrunch Ai"`.
    pub source_label: String,
    /// When the stub was created.
    pub fetched_at: DateTime<Utc>,
    /// Publication time, when the adapter could parse one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    /// Topical relevance in `[0.0, 1.0]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    /// Coarse topic tags, at most [`MAX_TOPICS`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Article {
    /// Create a stub with empty content.
    pub fn stub(
        title: impl Into<String>,
        url: impl Into<String>,
        excerpt: impl Into<String>,
        source: &str,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            excerpt: excerpt.into(),
            content: String::new(),
            source: source.to_string(),
            source_label: humanize_source(source),
            fetched_at,
            published_at: None,
            relevance_score: None,
            topics: None,
            summary: None,
        }
    }

    pub fn with_published_at(mut self, published_at: Option<DateTime<Utc>>) -> Self {
        self.published_at = published_at;
        self
    }

    /// Replace the body, enforcing the content cap.
    pub fn set_content(&mut self, content: &str) {
        self.content = truncate_chars(content, MAX_CONTENT_CHARS);
    }

    /// Replace the topic tags, enforcing the topic cap.
    pub fn set_topics(&mut self, mut topics: Vec<String>) {
        topics.truncate(MAX_TOPICS);
        self.topics = Some(topics);
    }

    /// Attach a relevance score, clamped into `[0.0, 1.0]`.
    pub fn set_relevance_score(&mut self, score: f64) {
        self.relevance_score = Some(score.clamp(0.0, 1.0));
    }

    /// Title, excerpt and content joined and lower-cased for keyword matching.
    pub fn combined_text(&self) -> String {
        format!("{} {} {}", self.title, self.excerpt, self.content).to_lowercase()
    }
}

/// Per-source outcome of a fetch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    /// Registry name of the source.
    pub source: String,
    /// Number of stubs the source contributed.
    pub fetched: usize,
    /// Why the source contributed nothing, if it failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The ranked result of one pipeline run.
///
/// This is the only thing the pipeline hands to the outside world: the
/// renderer, mailer and archive all consume it as-is.
///
/// # Edition Naming
///
/// The `time_of_day` field categorizes editions as:
/// - `"morning"`: 00:00 - 08:00
/// - `"afternoon"`: 08:00 - 16:00
/// - `"evening"`: 16:00 - 24:00
#[derive(Debug, Serialize, Deserialize)]
pub struct Digest {
    /// The local date of the run in `YYYY-MM-DD` format.
    pub local_date: String,
    /// The time of day category: "morning", "afternoon", or "evening".
    pub time_of_day: String,
    pub generated_at: DateTime<Utc>,
    /// Whether the AI enrichment service touched any article.
    pub ai_enriched: bool,
    pub sources: Vec<SourceReport>,
    /// Ranked articles, highest relevance first.
    pub articles: Vec<Article>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Article {
        Article::stub(
            "OpenAI ships a new model",
            "https://example.com/a",
            "teaser",
            "techcrunch_ai",
            Utc::now(),
        )
    }

    #[test]
    fn test_stub_starts_without_enrichment() {
        let article = sample();
        assert!(article.content.is_empty());
        assert_eq!(article.source_label, "Techcrunch Ai");
        assert!(article.relevance_score.is_none());
        assert!(article.topics.is_none());
        assert!(article.summary.is_none());
    }

    #[test]
    fn test_set_content_caps_length() {
        let mut article = sample();
        article.set_content(&"é".repeat(MAX_CONTENT_CHARS + 250));
        assert_eq!(article.content.chars().count(), MAX_CONTENT_CHARS);
    }

    #[test]
    fn test_set_topics_caps_count() {
        let mut article = sample();
        article.set_topics((0..9).map(|i| format!("Topic {i}")).collect());
        assert_eq!(article.topics.as_ref().map(Vec::len), Some(MAX_TOPICS));
    }

    #[test]
    fn test_relevance_score_is_clamped() {
        let mut article = sample();
        article.set_relevance_score(1.7);
        assert_eq!(article.relevance_score, Some(1.0));
        article.set_relevance_score(-0.4);
        assert_eq!(article.relevance_score, Some(0.0));
    }

    #[test]
    fn test_article_serialization_skips_unset_fields() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains("\"source_label\":\"Techcrunch Ai\""));
        assert!(!json.contains("relevance_score"));
        assert!(!json.contains("summary"));
    }

    #[test]
    fn test_digest_deserialization() {
        let json = r#"{
            "local_date": "2025-05-06",
            "time_of_day": "morning",
            "generated_at": "2025-05-06T07:00:00Z",
            "ai_enriched": false,
            "sources": [{"source": "hacker_news", "fetched": 0, "error": "timeout"}],
            "articles": []
        }"#;

        let digest: Digest = serde_json::from_str(json).unwrap();
        assert_eq!(digest.time_of_day, "morning");
        assert_eq!(digest.sources[0].error.as_deref(), Some("timeout"));
        assert!(digest.articles.is_empty());
    }
}
