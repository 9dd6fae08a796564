use crate::models::Article;
use crate::utils::collapse_whitespace;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::info;

static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("static punctuation regex"));

/// Lower-case, drop punctuation, collapse whitespace.
pub fn normalize_title(title: &str) -> String {
    collapse_whitespace(&PUNCTUATION.replace_all(&title.to_lowercase(), ""))
}

/// Hex SHA-256 of `normalized_title|url`.
pub fn fingerprint(article: &Article) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_title(&article.title).as_bytes());
    hasher.update(b"|");
    hasher.update(article.url.trim().as_bytes());
    hex::encode(hasher.finalize())
}

/// Keep the first article per fingerprint, in original order.
pub fn deduplicate(articles: Vec<Article>) -> Vec<Article> {
    let before = articles.len();
    let unique: Vec<Article> = articles.into_iter().unique_by(fingerprint).collect();
    info!(before, after = unique.len(), "Deduplicated articles");
    unique
}
