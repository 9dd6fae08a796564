//! Source registry and run settings.
//!
//! The registry is YAML: an ordered list of sources plus optional knobs.
//! Entries are validated up front (URLs, selectors, required per-kind fields),
//! so every configuration mistake surfaces before the first request.
//!
//! ```yaml
//! total_articles: 20
//! min_score: 0.3
//! sources:
//!   - name: techcrunch_ai
//!     kind: html
//!     url: https://techcrunch.com/category/artificial-intelligence/
//!     selectors:
//!       article: .post-block
//!       title: .post-block__title__link
//!   - name: hacker_news
//!     kind: api
//!     format: hacker_news
//!     url: https://hn.algolia.com/api/v1/search_by_date?tags=story
//!     query: artificial intelligence
//!   - name: mit_tech_review
//!     kind: rss
//!     url: https://www.technologyreview.com/topic/artificial-intelligence/feed
//!     recency_days: 3
//! ```

use crate::cli::Cli;
use crate::scrapers::{FieldMap, JsonMapper, ListingSelectors, Source, SourceKind};
use scraper::Selector;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

const BUILTIN_REGISTRY: &str = r#"
sources:
  - name: techcrunch_ai
    kind: html
    url: https://techcrunch.com/category/artificial-intelligence/
    selectors:
      article: .post-block
      title: .post-block__title__link
      link: .post-block__title__link
      excerpt: .post-block__content
  - name: venturebeat_ai
    kind: html
    url: https://venturebeat.com/ai/
    selectors:
      article: article
      title: h2 a
      link: h2 a
      excerpt: .excerpt
  - name: ai_news
    kind: html
    url: https://www.artificialintelligence-news.com/
    keyword_gate: true
    selectors:
      article: .post
      title: h2 a
      link: h2 a
      excerpt: .excerpt
  - name: hacker_news
    kind: api
    format: hacker_news
    url: https://hn.algolia.com/api/v1/search_by_date?tags=story
    query: artificial intelligence
  - name: mit_tech_review
    kind: rss
    url: https://www.technologyreview.com/topic/artificial-intelligence/feed
"#;

/// Widest recency window accepted anywhere, in days.
pub const MAX_RECENCY_DAYS: i64 = 36_500;

/// Anything wrong with the registry or the requested source set.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid registry YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("source `{0}` is declared more than once")]
    DuplicateSource(String),

    #[error("source `{name}`: {reason}")]
    InvalidSource { name: String, reason: String },

    #[error("unknown source `{0}`")]
    UnknownSource(String),

    #[error("setting `{name}`: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

fn check_recency(days: i64) -> Result<(), String> {
    if (1..=MAX_RECENCY_DAYS).contains(&days) {
        Ok(())
    } else {
        Err(format!("recency_days must be in 1..={MAX_RECENCY_DAYS}, got {days}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindTag {
    Html,
    Api,
    Rss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiFormat {
    HackerNews,
    Reddit,
    Generic,
}

/// Raw selector strings for an HTML listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SelectorSpec {
    pub article: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
}

/// One source as written in YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub kind: KindTag,
    pub url: String,
    #[serde(default)]
    pub selectors: Option<SelectorSpec>,
    #[serde(default)]
    pub keyword_gate: bool,
    #[serde(default)]
    pub format: Option<ApiFormat>,
    #[serde(default)]
    pub fields: Option<FieldMap>,
    /// Appended to the URL as `query=<value>`.
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub recency_days: Option<i64>,
}

/// The whole YAML document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryFile {
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
    #[serde(default)]
    pub total_articles: Option<usize>,
    #[serde(default)]
    pub per_source_floor: Option<usize>,
    #[serde(default)]
    pub min_score: Option<f64>,
    #[serde(default)]
    pub recency_days: Option<i64>,
    #[serde(default)]
    pub summary_max_length: Option<usize>,
}

impl RegistryFile {
    #[instrument(level = "info")]
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let file = Self::parse(&raw)?;
        info!(sources = file.sources.len(), "Loaded source registry");
        Ok(file)
    }

    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// The registry shipped with the binary.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::parse(BUILTIN_REGISTRY)
    }
}

impl SourceEntry {
    fn compile(&self) -> Result<Source, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidSource {
            name: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty".into()));
        }
        let mut url = Url::parse(&self.url).map_err(|e| invalid(format!("bad url {:?}: {e}", self.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("url must be http(s), got {:?}", self.url)));
        }
        if let Some(query) = &self.query {
            url.query_pairs_mut().append_pair("query", query);
        }
        if let Some(days) = self.recency_days {
            check_recency(days).map_err(invalid)?;
        }

        let kind = match self.kind {
            KindTag::Html => {
                let declared = self
                    .selectors
                    .as_ref()
                    .ok_or_else(|| invalid("html sources need `selectors.article`".into()))?;
                SourceKind::HtmlListing(ListingSelectors {
                    article: compile_selector(&declared.article).map_err(invalid)?,
                    title: compile_optional(declared.title.as_deref()).map_err(invalid)?,
                    link: compile_optional(declared.link.as_deref()).map_err(invalid)?,
                    excerpt: compile_optional(declared.excerpt.as_deref()).map_err(invalid)?,
                    keyword_gate: self.keyword_gate,
                })
            }
            KindTag::Api => {
                let format = self
                    .format
                    .ok_or_else(|| invalid("api sources need a `format`".into()))?;
                SourceKind::JsonApi(match format {
                    ApiFormat::HackerNews => JsonMapper::HackerNews,
                    ApiFormat::Reddit => JsonMapper::Reddit,
                    ApiFormat::Generic => JsonMapper::Generic(
                        self.fields
                            .clone()
                            .ok_or_else(|| invalid("generic api sources need `fields`".into()))?,
                    ),
                })
            }
            KindTag::Rss => SourceKind::RssFeed,
        };

        Ok(Source {
            name: self.name.clone(),
            url: url.to_string(),
            kind,
            recency_days: self.recency_days,
        })
    }
}

fn compile_selector(raw: &str) -> Result<Selector, String> {
    Selector::parse(raw).map_err(|e| format!("invalid selector {raw:?}: {e}"))
}

fn compile_optional(raw: Option<&str>) -> Result<Option<Selector>, String> {
    raw.map(compile_selector).transpose()
}

/// Validated, ordered set of sources.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    sources: Vec<Source>,
}

impl Registry {
    pub fn from_entries(entries: &[SourceEntry]) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        let mut sources = Vec::with_capacity(entries.len());
        for entry in entries {
            if !seen.insert(entry.name.as_str()) {
                return Err(ConfigError::DuplicateSource(entry.name.clone()));
            }
            sources.push(entry.compile()?);
        }
        Ok(Self { sources })
    }

    /// Restrict the registry to `names`, in registry order.
    ///
    /// An empty list keeps every source. Any name not in the registry is an
    /// error.
    pub fn select(self, names: &[String]) -> Result<Self, ConfigError> {
        if names.is_empty() {
            return Ok(self);
        }
        if let Some(unknown) = names.iter().find(|n| !self.sources.iter().any(|s| &s.name == *n)) {
            return Err(ConfigError::UnknownSource(unknown.clone()));
        }
        Ok(Self {
            sources: self
                .sources
                .into_iter()
                .filter(|s| names.contains(&s.name))
                .collect(),
        })
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Knobs for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Articles the fetch stage hands on.
    pub total_articles: usize,
    /// Smallest per-source quota.
    pub per_source_floor: usize,
    /// Below this many real stubs, placeholders are mixed in.
    pub min_viable_articles: usize,
    pub min_score: f64,
    pub recency_days: i64,
    pub summary_max_length: usize,
    pub source_concurrency: usize,
    pub content_concurrency: usize,
    /// Stagger between consecutive source starts.
    pub inter_source_delay: Duration,
    pub request_timeout: Duration,
    /// Overall budget for fetching and content enrichment.
    pub deadline: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            total_articles: 20,
            per_source_floor: 2,
            min_viable_articles: 3,
            min_score: 0.3,
            recency_days: 7,
            summary_max_length: 300,
            source_concurrency: 4,
            content_concurrency: 8,
            inter_source_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(15),
            deadline: Duration::from_secs(120),
        }
    }
}

impl Settings {
    /// Defaults overridden by whatever the registry file sets.
    pub fn from_file(file: &RegistryFile) -> Self {
        let defaults = Self::default();
        Self {
            total_articles: file.total_articles.unwrap_or(defaults.total_articles),
            per_source_floor: file.per_source_floor.unwrap_or(defaults.per_source_floor),
            min_score: file.min_score.unwrap_or(defaults.min_score),
            recency_days: file.recency_days.unwrap_or(defaults.recency_days),
            summary_max_length: file.summary_max_length.unwrap_or(defaults.summary_max_length),
            ..defaults
        }
    }

    /// Command-line flags win over the file.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(count) = cli.count {
            self.total_articles = count;
        }
        if let Some(floor) = cli.per_source_floor {
            self.per_source_floor = floor;
        }
        if let Some(min_score) = cli.min_score {
            self.min_score = min_score;
        }
        if let Some(days) = cli.recency_days {
            self.recency_days = days;
        }
        if let Some(secs) = cli.deadline_secs {
            self.deadline = Duration::from_secs(secs);
        }
        if let Some(n) = cli.concurrency {
            self.source_concurrency = n.max(1);
            self.content_concurrency = n.saturating_mul(2).max(1);
        }
    }

    /// Reject values that would make the run misbehave after it starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_recency(self.recency_days).map_err(|reason| ConfigError::InvalidSetting {
            name: "recency_days",
            reason,
        })?;
        if !self.min_score.is_finite() {
            return Err(ConfigError::InvalidSetting {
                name: "min_score",
                reason: format!("must be a finite number, got {}", self.min_score),
            });
        }
        Ok(())
    }
}
