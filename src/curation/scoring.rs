//! Additive relevance heuristic.
//!
//! | Term | Weight |
//! |------|--------|
//! | distinct keywords in title + excerpt + content, over vocabulary size | × 0.7 |
//! | any keyword in the title | + 0.2 |
//! | each distinct spam phrase | − 0.1 |
//! | content over 1000 / over 500 characters | + 0.1 / + 0.05 |
//!
//! The sum is clamped to `[0.0, 1.0]`.

use crate::models::Article;
use crate::vocabulary::Vocabulary;
use tracing::{debug, info, instrument};

const KEYWORD_WEIGHT: f64 = 0.7;
const TITLE_BONUS: f64 = 0.2;
const SPAM_PENALTY: f64 = 0.1;

pub fn relevance_score(article: &Article, vocab: &Vocabulary) -> f64 {
    let text = article.combined_text();
    let title = article.title.to_lowercase();

    let mut score = 0.0;
    if !vocab.keywords.is_empty() {
        let found = vocab.keywords.iter().filter(|k| text.contains(k.as_str())).count();
        score += found as f64 / vocab.keywords.len() as f64 * KEYWORD_WEIGHT;
    }
    if vocab.keywords.iter().any(|k| title.contains(k.as_str())) {
        score += TITLE_BONUS;
    }
    let spam = vocab.spam_phrases.iter().filter(|p| text.contains(p.as_str())).count();
    score -= spam as f64 * SPAM_PENALTY;

    score += length_bonus(article.content.chars().count());
    score.clamp(0.0, 1.0)
}

fn length_bonus(chars: usize) -> f64 {
    if chars > 1000 {
        0.1
    } else if chars > 500 {
        0.05
    } else {
        0.0
    }
}

/// Score every article, drop those under `min_score`, best first.
///
/// Ties keep their incoming order.
#[instrument(level = "info", skip_all, fields(min_score = min_score))]
pub fn filter_by_quality(articles: Vec<Article>, vocab: &Vocabulary, min_score: f64) -> Vec<Article> {
    let before = articles.len();
    let mut kept: Vec<Article> = articles
        .into_iter()
        .filter_map(|mut article| {
            let score = relevance_score(&article, vocab);
            article.set_relevance_score(score);
            if score >= min_score {
                Some(article)
            } else {
                debug!(title = %article.title, score, "Below quality threshold");
                None
            }
        })
        .collect();

    kept.sort_by(|a, b| {
        b.relevance_score
            .unwrap_or_default()
            .total_cmp(&a.relevance_score.unwrap_or_default())
    });
    info!(before, after = kept.len(), "Quality filter applied");
    kept
}
