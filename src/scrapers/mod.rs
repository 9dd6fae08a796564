//! Source adapters that turn listing pages, JSON APIs and RSS feeds into
//! article stubs.
//!
//! Every configured source is a [`Source`] whose [`SourceKind`] picks the
//! adapter. The orchestrator only ever calls [`Source::fetch`], so a new kind
//! of source is added here and nowhere else.
//!
//! # Supported Kinds
//!
//! | Kind | Module | Input | Notes |
//! |------|--------|-------|-------|
//! | HTML listing | [`html`] | Category/front page | Selector set with a generic fallback chain |
//! | JSON API | [`json_api`] | Search or listing endpoint | Hacker News, Reddit or a field map |
//! | RSS feed | [`rss`] | RSS 2.0 document | Undated or unparseable items are kept |
//!
//! # Failure Model
//!
//! Whole-source problems (transport, status, unparseable payload) come back
//! as [`SourceError`]. Single items that cannot be used are reported as
//! [`ItemRejection`], logged, and skipped; they never fail the source.

use crate::models::Article;
use crate::utils::collapse_whitespace;
use crate::vocabulary::Vocabulary;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration as StdDuration;
use thiserror::Error;
use tracing::{debug, info, instrument};

pub mod html;
pub mod json_api;
pub mod rss;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// A failure that costs a whole source (or a whole page fetch) its output.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    #[error("malformed payload from {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("invalid base url: {0}")]
    BaseUrl(#[from] url::ParseError),
}

impl SourceError {
    pub fn fetch(url: &str, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(url: &str, reason: impl ToString) -> Self {
        Self::Parse {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Why a single listing/feed item did not become a stub.
#[derive(Debug, Error, PartialEq)]
pub enum ItemRejection {
    #[error("item has no title")]
    MissingTitle,

    #[error("title too short: {0:?}")]
    TitleTooShort(String),

    #[error("item has no link")]
    MissingLink,

    #[error("link cannot be resolved: {0:?}")]
    BadLink(String),

    #[error("title has no topical keyword: {0:?}")]
    OffTopic(String),

    #[error("published {0} is outside the recency window")]
    Stale(DateTime<Utc>),
}

/// Anything that can GET a URL and hand back the body as text.
///
/// The pipeline talks to the network only through this trait, which keeps
/// every stage testable against in-memory pages.
pub trait FetchText {
    async fn fetch_text(&self, url: &str) -> Result<String, SourceError>;
}

/// [`FetchText`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher whose every request gives up after `timeout`.
    pub fn new(timeout: StdDuration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl FetchText for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_text(&self, url: &str) -> Result<String, SourceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SourceError::fetch(url, e))?;
        response.text().await.map_err(|e| SourceError::fetch(url, e))
    }
}

/// Compiled selectors for an HTML listing page.
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    /// Matches one container per story.
    pub article: Selector,
    pub title: Option<Selector>,
    pub link: Option<Selector>,
    pub excerpt: Option<Selector>,
    /// Require a topical keyword in the title.
    pub keyword_gate: bool,
}

/// Field map for JSON APIs without a dedicated mapper.
///
/// Every entry is a dotted path into the payload (`"data.items"`,
/// `"meta.created"`). `items` must lead to an array; the others are looked
/// up relative to each element.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct FieldMap {
    pub items: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
}

/// How a JSON payload maps onto stubs.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonMapper {
    /// Algolia Hacker News search (`hits[]`).
    HackerNews,
    /// Reddit listing (`data.children[].data`).
    Reddit,
    Generic(FieldMap),
}

/// Which adapter handles a source.
#[derive(Debug, Clone)]
pub enum SourceKind {
    HtmlListing(ListingSelectors),
    JsonApi(JsonMapper),
    RssFeed,
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::HtmlListing(_) => "html",
            SourceKind::JsonApi(_) => "api",
            SourceKind::RssFeed => "rss",
        }
    }
}

/// A validated registry entry.
#[derive(Debug, Clone)]
pub struct Source {
    /// Unique registry name; becomes [`Article::source`].
    pub name: String,
    /// Absolute endpoint URL, also the base for relative links.
    pub url: String,
    pub kind: SourceKind,
    /// Overrides the run-wide recency window for dated items.
    pub recency_days: Option<i64>,
}

/// Read-only state shared by every adapter call in one run.
#[derive(Debug, Clone, Copy)]
pub struct FetchContext<'a> {
    pub vocab: &'a Vocabulary,
    /// Reference time for recency checks.
    pub now: DateTime<Utc>,
    /// Default recency window in days.
    pub recency_days: i64,
}

impl FetchContext<'_> {
    /// Whether an item published at `published` is inside `source`'s window.
    ///
    /// A window too wide to represent keeps everything.
    pub fn is_recent(&self, source: &Source, published: DateTime<Utc>) -> bool {
        let days = source.recency_days.unwrap_or(self.recency_days);
        match Duration::try_days(days).and_then(|window| self.now.checked_sub_signed(window)) {
            Some(cutoff) => published >= cutoff,
            None => true,
        }
    }
}

impl Source {
    /// Fetch this source and return at most `limit` stubs.
    ///
    /// Adapters never touch `self`; everything they produce is fresh.
    #[instrument(level = "info", skip_all, fields(source = %self.name, kind = self.kind.label(), limit = limit))]
    pub async fn fetch<F: FetchText>(
        &self,
        fetcher: &F,
        limit: usize,
        ctx: &FetchContext<'_>,
    ) -> Result<Vec<Article>, SourceError> {
        let body = fetcher.fetch_text(&self.url).await?;
        let stubs = match &self.kind {
            SourceKind::HtmlListing(selectors) => {
                html::extract_stubs(self, selectors, &body, limit, ctx)?
            }
            SourceKind::JsonApi(mapper) => json_api::extract_stubs(self, mapper, &body, limit, ctx)?,
            SourceKind::RssFeed => rss::extract_stubs(self, &body, limit, ctx)?,
        };
        info!(count = stubs.len(), url = %self.url, "Fetched source");
        Ok(stubs)
    }
}

/// Keep accepted items up to `limit`, logging every rejection.
///
/// Items past the limit are never evaluated.
pub(crate) fn keep_accepted<I>(source: &str, outcomes: I, limit: usize) -> Vec<Article>
where
    I: IntoIterator<Item = Result<Article, ItemRejection>>,
{
    let mut stubs = Vec::new();
    for outcome in outcomes {
        if stubs.len() >= limit {
            break;
        }
        match outcome {
            Ok(article) => stubs.push(article),
            Err(reason) => debug!(source, %reason, "Skipped item"),
        }
    }
    stubs
}

/// Flatten an HTML fragment (feed descriptions, API story text) to plain text.
pub(crate) fn html_to_text(fragment: &str) -> String {
    if !fragment.contains('<') && !fragment.contains('&') {
        return collapse_whitespace(fragment);
    }
    let parsed = Html::parse_fragment(fragment);
    collapse_whitespace(&parsed.root_element().text().collect::<Vec<_>>().join(" "))
}

/// Parse a feed/API timestamp: RFC 2822, RFC 3339, or unix seconds.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rss_source(recency_days: Option<i64>) -> Source {
        Source {
            name: "feed".into(),
            url: "https://example.com/feed".into(),
            kind: SourceKind::RssFeed,
            recency_days,
        }
    }

    #[test]
    fn test_keep_accepted_stops_at_limit() {
        let now = Utc::now();
        let outcomes = vec![
            Err(ItemRejection::MissingTitle),
            Ok(Article::stub("first story here", "https://a.test/1", "", "s", now)),
            Ok(Article::stub("second story here", "https://a.test/2", "", "s", now)),
            Ok(Article::stub("third story here", "https://a.test/3", "", "s", now)),
        ];
        let kept = keep_accepted("s", outcomes, 2);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].url, "https://a.test/2");
    }

    #[test]
    fn test_recency_window_uses_source_override() {
        let vocab = Vocabulary::default();
        let now = Utc::now();
        let ctx = FetchContext { vocab: &vocab, now, recency_days: 7 };
        let five_days_ago = now - Duration::days(5);

        assert!(ctx.is_recent(&rss_source(None), five_days_ago));
        assert!(!ctx.is_recent(&rss_source(Some(3)), five_days_ago));
        assert!(!ctx.is_recent(&rss_source(None), now - Duration::days(8)));
    }

    #[test]
    fn test_unrepresentable_window_keeps_item() {
        let vocab = Vocabulary::default();
        let now = Utc::now();
        let ctx = FetchContext { vocab: &vocab, now, recency_days: 7 };

        assert!(ctx.is_recent(&rss_source(Some(1_000_000_000)), now));
        assert!(ctx.is_recent(&rss_source(Some(i64::MAX)), now - Duration::days(400)));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let rfc2822 = parse_timestamp("Tue, 06 May 2025 14:30:00 GMT").unwrap();
        let rfc3339 = parse_timestamp("2025-05-06T14:30:00Z").unwrap();
        let unix = parse_timestamp("1746541800").unwrap();
        assert_eq!(rfc2822, rfc3339);
        assert_eq!(rfc3339, unix);
        assert!(parse_timestamp("last tuesday").is_none());
    }

    #[test]
    fn test_html_to_text_strips_markup() {
        assert_eq!(
            html_to_text("<p>Hello <b>new</b>\n model</p>"),
            "Hello new model"
        );
        assert_eq!(html_to_text("plain   text"), "plain text");
        assert_eq!(html_to_text("R&amp;D"), "R&D");
    }
}
