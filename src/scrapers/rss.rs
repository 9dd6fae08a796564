//! RSS 2.0 feed adapter.
//!
//! Items need a title and a link. A `pubDate` that parses and falls outside
//! the recency window drops the item; a missing or unparseable date keeps it.

use super::{
    FetchContext, ItemRejection, Source, SourceError, html_to_text, keep_accepted, parse_timestamp,
};
use crate::models::Article;
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "pubDate", default)]
    pub_date: Option<String>,
}

/// Extract up to `limit` stubs from an RSS document.
pub(crate) fn extract_stubs(
    source: &Source,
    body: &str,
    limit: usize,
    ctx: &FetchContext<'_>,
) -> Result<Vec<Article>, SourceError> {
    let base = Url::parse(&source.url)?;
    let feed: Rss = quick_xml::de::from_str(body).map_err(|e| SourceError::parse(&source.url, e))?;

    let outcomes = feed
        .channel
        .items
        .into_iter()
        .map(|item| accept(item, &base, source, ctx));
    Ok(keep_accepted(&source.name, outcomes, limit))
}

fn accept(
    item: Item,
    base: &Url,
    source: &Source,
    ctx: &FetchContext<'_>,
) -> Result<Article, ItemRejection> {
    let title = item
        .title
        .as_deref()
        .map(html_to_text)
        .filter(|t| !t.is_empty())
        .ok_or(ItemRejection::MissingTitle)?;
    let link = item
        .link
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or(ItemRejection::MissingLink)?;
    let url = base
        .join(link)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .ok_or_else(|| ItemRejection::BadLink(link.to_string()))?;

    let published = match item.pub_date.as_deref() {
        Some(raw) => {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                debug!(source = %source.name, pub_date = raw, "Unparseable pubDate; keeping item");
            }
            parsed
        }
        None => None,
    };
    if let Some(published) = published {
        if !ctx.is_recent(source, published) {
            return Err(ItemRejection::Stale(published));
        }
    }

    let excerpt = item.description.as_deref().map(html_to_text).unwrap_or_default();
    Ok(Article::stub(title, url.to_string(), excerpt, &source.name, Utc::now())
        .with_published_at(published))
}
