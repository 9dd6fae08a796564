//! Fan-out over the source registry.
//!
//! Every source gets the same quota and runs through a bounded pool, with
//! starts staggered so that one host is never hit in a burst. A failed source
//! contributes nothing and is recorded in its [`SourceReport`]; the gather
//! itself never fails. Sources still running at the deadline are abandoned
//! and whatever finished is used.

use crate::config::{Registry, Settings};
use crate::models::{Article, SourceReport};
use crate::scrapers::{FetchContext, FetchText};
use crate::vocabulary::Vocabulary;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::pin::pin;
use tokio::time::{Instant, sleep_until, timeout_at};
use tracing::{info, instrument, warn};

/// `source` value carried by placeholder articles.
pub const PLACEHOLDER_SOURCE: &str = "curated_fallback";

const ABANDONED: &str = "abandoned: pipeline deadline exceeded";

const PLACEHOLDERS: [(&str, &str, &str); 5] = [
    (
        "OpenAI and Anthropic push large language model capabilities further",
        "https://curated.quanticdaily.test/llm-frontier",
        "OpenAI, Anthropic and Google Gemini keep raising the bar for what a large language model (LLM) can do. \
         New GPT and Claude releases improve reasoning and tool use, while generative AI assistants built on the \
         transformer architecture spread into everyday technology products.",
    ),
    (
        "Deep learning hardware startups chase the next AI chip breakthrough",
        "https://curated.quanticdaily.test/ai-hardware",
        "A wave of startup founders in Silicon Valley is designing accelerators for deep learning. Training a neural \
         network with PyTorch or TensorFlow still depends on scarce GPU capacity, and new machine learning chips promise \
         cheaper inference for artificial intelligence workloads.",
    ),
    (
        "Computer vision and robotics bring AI automation to the factory floor",
        "https://curated.quanticdaily.test/vision-robotics",
        "Manufacturers are pairing computer vision models with robotics to automate inspection and assembly. \
         Machine learning algorithm improvements let robots adapt to new parts without reprogramming, and \
         automation technology vendors report growing demand for AI-driven systems.",
    ),
    (
        "NLP tools reshape everyday data science work with AI",
        "https://curated.quanticdaily.test/nlp-data-science",
        "Natural language processing (NLP) has become a standard part of the data science toolkit. Teams use LLM \
         assistants built on ChatGPT and other transformer models to clean text, draft queries and explain machine \
         learning results, shortening the path from raw data to insight.",
    ),
    (
        "Generative AI creativity tools spread beyond Silicon Valley",
        "https://curated.quanticdaily.test/generative-ai-creativity",
        "Image generators such as Midjourney and Stable Diffusion helped take generative AI mainstream. Artists, \
         designers and technology startups now combine them with ChatGPT and other artificial intelligence tools, \
         while deep learning research keeps improving quality and speed.",
    ),
];

/// Everything the fetch stage produced.
#[derive(Debug, Clone, Default)]
pub struct Harvest {
    /// Stubs (and placeholders), newest first.
    pub articles: Vec<Article>,
    /// One entry per source, in registry order.
    pub reports: Vec<SourceReport>,
}

/// Stubs requested from each source: an even share of `total`, never below `floor`.
pub fn per_source_quota(total: usize, floor: usize, sources: usize) -> usize {
    if sources == 0 {
        return 0;
    }
    (total / sources).max(floor)
}

/// The fixed placeholder pool, stamped with `at`.
///
/// Content is filled in so the placeholders survive scoring with the default
/// vocabulary; the enricher skips them.
pub fn placeholder_articles(at: DateTime<Utc>) -> Vec<Article> {
    PLACEHOLDERS
        .iter()
        .map(|(title, url, body)| {
            let mut article = Article::stub(*title, *url, *body, PLACEHOLDER_SOURCE, at);
            article.set_content(body);
            article
        })
        .collect()
}

pub fn is_placeholder(article: &Article) -> bool {
    article.source == PLACEHOLDER_SOURCE
}

/// Fetch every source in `registry` and merge the stubs.
#[instrument(level = "info", skip_all, fields(sources = registry.len(), total = settings.total_articles))]
pub async fn gather<F: FetchText>(
    fetcher: &F,
    registry: &Registry,
    vocab: &Vocabulary,
    settings: &Settings,
    deadline: Instant,
) -> Harvest {
    let started = Utc::now();
    let launch = Instant::now();
    let sources = registry.sources();
    let quota = per_source_quota(settings.total_articles, settings.per_source_floor, sources.len());
    let ctx = FetchContext {
        vocab,
        now: started,
        recency_days: settings.recency_days,
    };
    info!(quota, "Fetching sources");

    let mut outcomes: Vec<Option<_>> = sources.iter().map(|_| None).collect();
    let mut pending = pin!(
        stream::iter(sources.iter().enumerate())
            .map(|(i, source)| async move {
                sleep_until(launch + settings.inter_source_delay * i as u32).await;
                (i, source.fetch(fetcher, quota, &ctx).await)
            })
            .buffer_unordered(settings.source_concurrency.max(1))
    );

    loop {
        match timeout_at(deadline, pending.next()).await {
            Ok(Some((i, outcome))) => outcomes[i] = Some(outcome),
            Ok(None) => break,
            Err(_) => {
                warn!("Deadline reached; abandoning unfinished sources");
                break;
            }
        }
    }

    let mut harvest = Harvest::default();
    for (source, outcome) in sources.iter().zip(outcomes) {
        let report = match outcome {
            Some(Ok(stubs)) => {
                let fetched = stubs.len();
                harvest.articles.extend(stubs);
                SourceReport {
                    source: source.name.clone(),
                    fetched,
                    error: None,
                }
            }
            Some(Err(e)) => {
                warn!(source = %source.name, error = %e, "Source failed; contributing nothing");
                SourceReport {
                    source: source.name.clone(),
                    fetched: 0,
                    error: Some(e.to_string()),
                }
            }
            None => {
                warn!(source = %source.name, "Source abandoned at deadline");
                SourceReport {
                    source: source.name.clone(),
                    fetched: 0,
                    error: Some(ABANDONED.to_string()),
                }
            }
        };
        harvest.reports.push(report);
    }

    let real = harvest.articles.len();
    if real == 0 {
        warn!("No source produced articles; using the placeholder set");
        harvest.articles = placeholder_articles(started);
    } else if real < settings.min_viable_articles {
        let missing = settings.min_viable_articles - real;
        warn!(real, missing, "Too few articles; topping up with placeholders");
        harvest
            .articles
            .extend(placeholder_articles(started).into_iter().take(missing));
    }

    harvest.articles.sort_by(|a, b| b.fetched_at.cmp(&a.fetched_at));
    harvest.articles.truncate(settings.total_articles);
    info!(count = harvest.articles.len(), real, "Gathered articles");
    harvest
}
