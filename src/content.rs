//! Full-text enrichment.
//!
//! Article pages are fetched and reduced to the text of their main content
//! region. Regions are tried in order until one yields text. Any failure
//! leaves the article with empty content.

use crate::models::{Article, MAX_CONTENT_CHARS};
use crate::orchestrator::is_placeholder;
use crate::scrapers::FetchText;
use crate::utils::{collapse_whitespace, truncate_chars};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::pin::pin;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, instrument, warn};

/// Content regions, most specific first.
static CONTENT_STRATEGIES: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        ".article-content",
        ".entry-content",
        ".post-content",
        "article",
        ".content",
        "[class*=\"content\"]",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("static content selector"))
    .collect()
});

const HIDDEN_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];

/// Main text of an article page, or `""` when no region has any.
pub fn extract_main_text(html: &str) -> String {
    let document = Html::parse_document(html);
    CONTENT_STRATEGIES
        .iter()
        .filter_map(|sel| document.select(sel).next())
        .map(visible_text)
        .find(|text| !text.is_empty())
        .map(|text| truncate_chars(&text, MAX_CONTENT_CHARS))
        .unwrap_or_default()
}

/// Text under `root`, skipping script/style subtrees.
fn visible_text(root: ElementRef<'_>) -> String {
    let parts: Vec<&str> = root
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node
                .ancestors()
                .take_while(|ancestor| ancestor.id() != root.id())
                .chain(std::iter::once(*root))
                .filter_map(|ancestor| ancestor.value().as_element())
                .any(|el| HIDDEN_ELEMENTS.contains(&el.name()));
            (!hidden).then_some(&**text)
        })
        .collect();
    collapse_whitespace(&parts.join(" "))
}

/// Fetch `url` and extract its main text; `""` on any failure.
pub async fn fetch_content<F: FetchText>(fetcher: &F, url: &str) -> String {
    match fetcher.fetch_text(url).await {
        Ok(body) => {
            let text = extract_main_text(&body);
            if text.is_empty() {
                debug!(url, "No content region matched");
            }
            text
        }
        Err(e) => {
            warn!(url, error = %e, "Content fetch failed; leaving content empty");
            String::new()
        }
    }
}

/// Fill in `content` for every article that has none.
///
/// Placeholders are skipped. Fetches still running at `deadline` are dropped
/// and their articles keep empty content. Returns how many articles got text.
#[instrument(level = "info", skip_all, fields(articles = articles.len(), concurrency = concurrency))]
pub async fn enrich_articles<F: FetchText>(
    fetcher: &F,
    articles: &mut [Article],
    concurrency: usize,
    deadline: Instant,
) -> usize {
    let targets: Vec<(usize, String)> = articles
        .iter()
        .enumerate()
        .filter(|(_, a)| a.content.is_empty() && !is_placeholder(a))
        .map(|(i, a)| (i, a.url.clone()))
        .collect();
    let requested = targets.len();

    let mut pending = pin!(
        stream::iter(targets)
            .map(|(i, url)| async move { (i, fetch_content(fetcher, &url).await) })
            .buffer_unordered(concurrency.max(1))
    );

    let mut filled = 0;
    loop {
        match timeout_at(deadline, pending.next()).await {
            Ok(Some((i, text))) => {
                if !text.is_empty() {
                    articles[i].set_content(&text);
                    filled += 1;
                }
            }
            Ok(None) => break,
            Err(_) => {
                warn!("Deadline reached; abandoning remaining content fetches");
                break;
            }
        }
    }

    info!(requested, filled, "Content enrichment finished");
    filled
}
