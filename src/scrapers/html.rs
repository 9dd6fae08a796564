//! Listing-page adapter.
//!
//! Category and front pages list stories as repeated containers. For each
//! container matched by the source's `article` selector we pull a title, a
//! link and an excerpt. Sites redesign often, so the declared title selector
//! is backed by a fixed chain of generic heading/title/anchor selectors, and
//! the link falls back to the title anchor or the first anchor in the
//! container.

use super::{FetchContext, ItemRejection, ListingSelectors, Source, SourceError, keep_accepted};
use crate::models::Article;
use crate::utils::collapse_whitespace;
use chrono::Utc;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Titles must be longer than this many characters.
pub const MIN_TITLE_CHARS: usize = 10;

static FALLBACK_TITLE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "h2 a",
        "h3 a",
        "h1 a",
        ".entry-title",
        ".article-title",
        "[class*=\"title\"]",
        "h2",
        "h3",
        "h1",
        "a",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("static title selector"))
    .collect()
});

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("static anchor selector"));
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("static paragraph selector"));

/// Extract up to `limit` stubs from a listing page.
pub(crate) fn extract_stubs(
    source: &Source,
    selectors: &ListingSelectors,
    body: &str,
    limit: usize,
    ctx: &FetchContext<'_>,
) -> Result<Vec<Article>, SourceError> {
    let base = Url::parse(&source.url)?;
    let document = Html::parse_document(body);
    let outcomes = document
        .select(&selectors.article)
        .map(|container| extract_item(container, selectors, &base, source, ctx));
    Ok(keep_accepted(&source.name, outcomes, limit))
}

fn extract_item(
    container: ElementRef<'_>,
    selectors: &ListingSelectors,
    base: &Url,
    source: &Source,
    ctx: &FetchContext<'_>,
) -> Result<Article, ItemRejection> {
    let title_el = find_title(container, selectors.title.as_ref()).ok_or(ItemRejection::MissingTitle)?;
    let title = element_text(title_el);
    if title.chars().count() <= MIN_TITLE_CHARS {
        return Err(ItemRejection::TitleTooShort(title));
    }
    if selectors.keyword_gate && !ctx.vocab.passes_gate(&title) {
        return Err(ItemRejection::OffTopic(title));
    }

    let href = find_link(container, title_el, selectors.link.as_ref()).ok_or(ItemRejection::MissingLink)?;
    let url = base
        .join(href.trim())
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .ok_or_else(|| ItemRejection::BadLink(href.to_string()))?;

    let excerpt = selectors
        .excerpt
        .as_ref()
        .and_then(|sel| container.select(sel).next())
        .or_else(|| container.select(&PARAGRAPH).next())
        .map(element_text)
        .unwrap_or_default();

    Ok(Article::stub(title, url.to_string(), excerpt, &source.name, Utc::now()))
}

/// First element with non-empty text: declared selector, then the fallback chain.
fn find_title<'a>(container: ElementRef<'a>, declared: Option<&Selector>) -> Option<ElementRef<'a>> {
    declared
        .into_iter()
        .chain(FALLBACK_TITLE_SELECTORS.iter())
        .find_map(|sel| {
            container
                .select(sel)
                .find(|el| !element_text(*el).is_empty())
        })
}

fn find_link<'a>(
    container: ElementRef<'a>,
    title_el: ElementRef<'a>,
    declared: Option<&Selector>,
) -> Option<&'a str> {
    let href = |el: ElementRef<'a>| el.value().attr("href").filter(|h| !h.trim().is_empty());

    declared
        .and_then(|sel| container.select(sel).find_map(href))
        .or_else(|| href(title_el))
        .or_else(|| title_el.select(&ANCHOR).find_map(href))
        .or_else(|| container.select(&ANCHOR).find_map(href))
        .or_else(|| href(container))
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::SourceKind;
    use crate::vocabulary::Vocabulary;

    const LISTING: &str = r#"
        <html><body>
          <div class="post">
            <h2 class="headline"><a href="/2025/05/openai-model">OpenAI unveils a faster reasoning model</a></h2>
            <p class="excerpt">The new model is   cheaper to run.</p>
          </div>
          <div class="post">
            <h3><a href="https://other.test/robots">Warehouse robots learn new tricks</a></h3>
            <p>Second teaser.</p>
          </div>
          <div class="post">
            <h2 class="headline"><a href="/short">Too short</a></h2>
          </div>
          <div class="post">
            <h2 class="headline"><a href="/earnings">Quarterly earnings beat analyst estimates</a></h2>
          </div>
          <div class="post">
            <h2 class="headline">Model release without any link</h2>
          </div>
        </body></html>
    "#;

    fn selectors(gate: bool) -> ListingSelectors {
        ListingSelectors {
            article: Selector::parse(".post").unwrap(),
            title: Some(Selector::parse(".headline a").unwrap()),
            link: None,
            excerpt: Some(Selector::parse(".excerpt").unwrap()),
            keyword_gate: gate,
        }
    }

    fn source(gate: bool) -> Source {
        Source {
            name: "ai_news".into(),
            url: "https://news.test/category/ai/".into(),
            kind: SourceKind::HtmlListing(selectors(gate)),
            recency_days: None,
        }
    }

    fn run(gate: bool, limit: usize) -> Vec<Article> {
        let vocab = Vocabulary::new(&[], &[], &["model", "robot", "openai"], &[]);
        let ctx = FetchContext { vocab: &vocab, now: Utc::now(), recency_days: 7 };
        let src = source(gate);
        extract_stubs(&src, &selectors(gate), LISTING, limit, &ctx).unwrap()
    }

    #[test]
    fn test_extracts_and_resolves_relative_links() {
        let stubs = run(false, 10);
        assert_eq!(stubs.len(), 3);
        assert_eq!(stubs[0].title, "OpenAI unveils a faster reasoning model");
        assert_eq!(stubs[0].url, "https://news.test/2025/05/openai-model");
        assert_eq!(stubs[0].excerpt, "The new model is cheaper to run.");
        assert_eq!(stubs[0].source, "ai_news");
        assert!(stubs[0].content.is_empty());
    }

    #[test]
    fn test_falls_back_to_generic_title_selectors() {
        let stubs = run(false, 10);
        let robots = &stubs[1];
        assert_eq!(robots.title, "Warehouse robots learn new tricks");
        assert_eq!(robots.url, "https://other.test/robots");
        assert_eq!(robots.excerpt, "Second teaser.");
    }

    #[test]
    fn test_keyword_gate_drops_off_topic_titles() {
        let stubs = run(true, 10);
        let titles: Vec<_> = stubs.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "OpenAI unveils a faster reasoning model",
                "Warehouse robots learn new tricks"
            ]
        );
    }

    #[test]
    fn test_limit_bounds_output() {
        assert_eq!(run(false, 1).len(), 1);
        assert!(run(false, 0).is_empty());
    }

    #[test]
    fn test_short_titles_are_rejected() {
        let vocab = Vocabulary::default();
        let ctx = FetchContext { vocab: &vocab, now: Utc::now(), recency_days: 7 };
        let doc = Html::parse_fragment(r#"<div class="post"><h2 class="headline"><a href="/x">Exactly10!</a></h2></div>"#);
        let container = doc.select(&Selector::parse(".post").unwrap()).next().unwrap();
        let base = Url::parse("https://news.test/").unwrap();
        let result = extract_item(container, &selectors(false), &base, &source(false), &ctx);
        assert_eq!(result, Err(ItemRejection::TitleTooShort("Exactly10!".into())));
    }
}
