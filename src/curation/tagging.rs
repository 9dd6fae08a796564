//! Local topic tagger and extractive summarizer.
//!
//! These always run, so every article leaves the pipeline with topics and a
//! summary even when no AI service is configured.

use crate::models::{Article, MAX_TOPICS};
use crate::utils::truncate_chars;
use crate::vocabulary::Vocabulary;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};

static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").expect("static sentence regex"));

/// Fragments shorter than this are not sentences.
pub const MIN_SENTENCE_CHARS: usize = 20;
pub const MAX_SUMMARY_SENTENCES: usize = 3;

/// Topic labels whose triggers occur in the title or content, in rule order.
pub fn extract_topics(article: &Article, vocab: &Vocabulary) -> Vec<String> {
    let text = format!("{} {}", article.title, article.content).to_lowercase();
    vocab
        .topics
        .iter()
        .filter(|rule| rule.triggers.iter().any(|t| text.contains(t.as_str())))
        .map(|rule| rule.label.clone())
        .take(MAX_TOPICS)
        .collect()
}

/// Up to three leading sentences of `content` that fit in `max_chars`.
///
/// Each kept sentence ends in `". "` and the result is trimmed. When nothing
/// qualifies, the excerpt cut to `max_chars` is returned instead.
pub fn summarize(content: &str, excerpt: &str, max_chars: usize) -> String {
    let mut summary = String::new();
    let sentences = SENTENCE_END
        .split(content)
        .map(str::trim)
        .filter(|s| s.chars().count() >= MIN_SENTENCE_CHARS)
        .take(MAX_SUMMARY_SENTENCES);

    for sentence in sentences {
        let grown = summary.chars().count() + sentence.chars().count() + 1;
        if grown > max_chars {
            break;
        }
        summary.push_str(sentence);
        summary.push_str(". ");
    }

    let summary = summary.trim_end();
    if summary.is_empty() {
        truncate_chars(excerpt.trim(), max_chars)
    } else {
        summary.to_string()
    }
}

/// Tag every article and summarize those that have no summary yet.
#[instrument(level = "info", skip_all, fields(articles = articles.len()))]
pub fn tag_and_summarize(articles: &mut [Article], vocab: &Vocabulary, summary_max_chars: usize) {
    for article in articles.iter_mut() {
        let topics = extract_topics(article, vocab);
        article.set_topics(topics);
        if article.summary.as_deref().is_none_or(str::is_empty) {
            article.summary = Some(summarize(&article.content, &article.excerpt, summary_max_chars));
        }
        debug!(title = %article.title, topics = ?article.topics, "Tagged article");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_summary_keeps_sentences_that_fit() {
        let content = "Sentence one is here. Sentence two follows. Sentence three too. Sentence four.";
        assert_eq!(
            summarize(content, "excerpt", 60),
            "Sentence one is here. Sentence two follows."
        );
        assert_eq!(summarize(content, "excerpt", 30), "Sentence one is here.");
    }

    #[test]
    fn test_summary_caps_sentence_count() {
        let content = "The first sentence is long enough. The second sentence is long enough. \
                       The third sentence is long enough! The fourth sentence is long enough?";
        let summary = summarize(content, "", 1000);
        assert_eq!(summary.matches(". ").count() + 1, 3);
        assert!(!summary.contains("fourth"));
    }

    #[test]
    fn test_summary_falls_back_to_excerpt() {
        assert_eq!(summarize("", "A short teaser for the story", 7), "A short");
        assert_eq!(summarize("Tiny. Bits.", "Teaser", 100), "Teaser");
    }

    #[test]
    fn test_topics_follow_rule_order_and_cap() {
        let vocab = Vocabulary::default();
        let mut article = Article::stub(
            "Nvidia GPU startup trains a robot with machine learning",
            "https://a.test/",
            "",
            "s",
            Utc::now(),
        );
        article.set_content("New research paper from OpenAI and Google on computer vision software.");
        let topics = extract_topics(&article, &vocab);
        assert_eq!(
            topics,
            vec!["Machine Learning", "AI Research", "OpenAI", "Google AI", "Computer Vision"]
        );
    }

    #[test]
    fn test_existing_summary_is_kept() {
        let vocab = Vocabulary::default();
        let mut articles = vec![Article::stub("A robot story", "https://a.test/", "teaser", "s", Utc::now())];
        articles[0].summary = Some("Already written.".into());
        tag_and_summarize(&mut articles, &vocab, 300);
        assert_eq!(articles[0].summary.as_deref(), Some("Already written."));
        assert_eq!(articles[0].topics.as_deref(), Some(&["Robotics".to_string()][..]));
    }
}
