//! The curation pipeline from registry to ranked articles.
//!
//! 1. **Gather**: fetch every source under one deadline ([`orchestrator`]).
//! 2. **Deduplicate**: drop repeated title/URL pairs.
//! 3. **Enrich**: fetch full text for the survivors ([`content`]).
//! 4. **Score and filter**: rank by relevance, drop weak articles.
//! 5. **Tag and summarize**: local topics and an extractive summary.
//!
//! Deduplication runs before enrichment because fingerprints do not depend on
//! content; it saves page fetches without changing the result.

use crate::config::{Registry, Settings};
use crate::content;
use crate::curation::{deduplicate, filter_by_quality, tag_and_summarize};
use crate::models::{Article, SourceReport};
use crate::orchestrator;
use crate::scrapers::FetchText;
use crate::vocabulary::Vocabulary;
use tokio::time::Instant;
use tracing::{info, instrument};

/// Ranked articles plus how each source fared.
#[derive(Debug, Clone, Default)]
pub struct Curated {
    pub articles: Vec<Article>,
    pub reports: Vec<SourceReport>,
}

/// Run every stage. Never fails; the worst case is a placeholder-only list.
#[instrument(level = "info", skip_all, fields(sources = registry.len()))]
pub async fn run<F: FetchText>(
    fetcher: &F,
    registry: &Registry,
    vocab: &Vocabulary,
    settings: &Settings,
) -> Curated {
    let deadline = Instant::now() + settings.deadline;

    let harvest = orchestrator::gather(fetcher, registry, vocab, settings, deadline).await;
    let mut articles = deduplicate(harvest.articles);
    content::enrich_articles(fetcher, &mut articles, settings.content_concurrency, deadline).await;

    let mut articles = filter_by_quality(articles, vocab, settings.min_score);
    tag_and_summarize(&mut articles, vocab, settings.summary_max_length);

    info!(count = articles.len(), "Pipeline finished");
    Curated {
        articles,
        reports: harvest.reports,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryFile;
    use crate::models::MAX_CONTENT_CHARS;
    use crate::orchestrator::{PLACEHOLDER_SOURCE, placeholder_articles};
    use crate::test_support::FakeFetcher;
    use chrono::Utc;
    use std::collections::HashSet;
    use std::time::Duration;

    const REGISTRY: &str = r#"
sources:
  - name: ai_listing
    kind: html
    url: https://listing.test/ai/
    selectors:
      article: .story
      title: h2 a
  - name: broken_api
    kind: api
    format: hacker_news
    url: https://api.test/search
  - name: ai_feed
    kind: rss
    url: https://feed.test/rss
"#;

    const LISTING: &str = r#"
        <html><body>
          <div class="story"><h2><a href="/one">Robot arms learn to fold laundry</a></h2><p>Warehouse automation.</p></div>
          <div class="story"><h2><a href="/two">Chip startup unveils model accelerator</a></h2><p>A new chip for every model.</p></div>
          <div class="story"><h2><a href="/three">Model evaluation gets a new benchmark</a></h2><p>Scores for each model.</p></div>
          <div class="story"><h2><a href="/four">Open model weights spark debate</a></h2><p>Licensing questions.</p></div>
          <div class="story"><h2><a href="/five">Robot vacuum maker adds a model</a></h2><p>Cleaning gets smarter.</p></div>
        </body></html>
    "#;

    const FEED: &str = r#"<?xml version="1.0"?>
        <rss version="2.0"><channel><title>Feed</title>
          <item><title>Robot arms learn to fold laundry</title><link>https://listing.test/one</link></item>
          <item><title>Chip startup unveils model accelerator!</title><link>https://listing.test/two</link></item>
        </channel></rss>"#;

    fn settings(total: usize) -> Settings {
        Settings {
            total_articles: total,
            inter_source_delay: Duration::ZERO,
            deadline: Duration::from_secs(10),
            ..Settings::default()
        }
    }

    fn registry() -> Registry {
        let file = RegistryFile::parse(REGISTRY).unwrap();
        Registry::from_entries(&file.sources).unwrap()
    }

    #[tokio::test]
    async fn test_errors_contribute_nothing_and_duplicates_collapse() {
        let fetcher = FakeFetcher::default()
            .with_page("https://listing.test/ai/", LISTING)
            .with_page("https://feed.test/rss", FEED)
            .with_page(
                "https://listing.test/two",
                "<article>The chip runs every model faster than before.</article>",
            );
        let vocab = Vocabulary::new(
            &["ai", "model", "robot", "chip"],
            &[],
            &[],
            &[("Hardware", &["chip"]), ("Robotics", &["robot"])],
        );

        let curated = run(&fetcher, &registry(), &vocab, &settings(20)).await;

        assert_eq!(curated.articles.len(), 5);
        let urls: HashSet<_> = curated.articles.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls.len(), 5);

        let scores: Vec<f64> = curated
            .articles
            .iter()
            .map(|a| a.relevance_score.unwrap())
            .collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
        assert!(curated.articles.iter().all(|a| a.summary.is_some()));
        assert!(curated.articles.iter().all(|a| a.content.chars().count() <= MAX_CONTENT_CHARS));

        assert_eq!(curated.reports.len(), 3);
        assert_eq!(curated.reports[0].fetched, 5);
        assert!(curated.reports[1].error.is_some());
        assert_eq!(curated.reports[2].fetched, 2);

        let chip = curated
            .articles
            .iter()
            .find(|a| a.url == "https://listing.test/two")
            .unwrap();
        assert!(chip.content.contains("faster than before"));
        assert_eq!(chip.topics.as_deref(), Some(&["Hardware".to_string()][..]));
    }

    #[tokio::test]
    async fn test_no_data_yields_placeholders() {
        let fetcher = FakeFetcher::default();
        let vocab = Vocabulary::default();

        let curated = run(&fetcher, &registry(), &vocab, &settings(3)).await;

        assert_eq!(curated.articles.len(), 3);
        assert!(curated.articles.iter().all(|a| a.source == PLACEHOLDER_SOURCE));

        let expected: HashSet<String> = placeholder_articles(Utc::now())
            .into_iter()
            .take(3)
            .map(|a| a.title)
            .collect();
        let titles: HashSet<String> = curated.articles.into_iter().map(|a| a.title).collect();
        assert_eq!(titles, expected);
        assert!(curated.reports.iter().all(|r| r.error.is_some()));
        assert_eq!(fetcher.requests().len(), 3);
    }
}
