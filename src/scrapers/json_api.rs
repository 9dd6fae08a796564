//! JSON API adapter.
//!
//! Each [`JsonMapper`] knows where the item array lives and how one element
//! maps onto title/url/excerpt/creation time. Items created outside the
//! recency window are dropped; items with no creation time are kept.

use super::{
    FetchContext, FieldMap, ItemRejection, JsonMapper, Source, SourceError, html_to_text,
    keep_accepted, parse_timestamp,
};
use crate::models::Article;
use chrono::{DateTime, Utc};
use serde_json::Value;
use url::Url;

/// Fields pulled out of one payload element, before validation.
#[derive(Debug, Default, PartialEq)]
struct RawItem {
    title: Option<String>,
    url: Option<String>,
    excerpt: String,
    created: Option<DateTime<Utc>>,
}

/// Extract up to `limit` stubs from a JSON payload.
pub(crate) fn extract_stubs(
    source: &Source,
    mapper: &JsonMapper,
    body: &str,
    limit: usize,
    ctx: &FetchContext<'_>,
) -> Result<Vec<Article>, SourceError> {
    let base = Url::parse(&source.url)?;
    let payload: Value = serde_json::from_str(body).map_err(|e| SourceError::parse(&source.url, e))?;

    let items = match mapper {
        JsonMapper::HackerNews => payload.get("hits"),
        JsonMapper::Reddit => payload.pointer("/data/children"),
        JsonMapper::Generic(fields) => lookup(&payload, &fields.items),
    }
    .and_then(Value::as_array)
    .ok_or_else(|| SourceError::parse(&source.url, "item array not found"))?;

    let outcomes = items
        .iter()
        .map(|item| accept(map_item(item, mapper), &base, source, ctx));
    Ok(keep_accepted(&source.name, outcomes, limit))
}

fn map_item(item: &Value, mapper: &JsonMapper) -> RawItem {
    match mapper {
        JsonMapper::HackerNews => RawItem {
            title: string_at(item, "title"),
            url: string_at(item, "url").or_else(|| {
                item.get("objectID")
                    .and_then(scalar_string)
                    .map(|id| format!("https://news.ycombinator.com/item?id={id}"))
            }),
            excerpt: string_at(item, "story_text")
                .map(|t| html_to_text(&t))
                .unwrap_or_default(),
            created: item
                .get("created_at_i")
                .and_then(timestamp_value)
                .or_else(|| item.get("created_at").and_then(timestamp_value)),
        },
        JsonMapper::Reddit => {
            let data = item.get("data").unwrap_or(item);
            RawItem {
                title: string_at(data, "title"),
                url: string_at(data, "url")
                    .or_else(|| string_at(data, "permalink").map(|p| format!("https://www.reddit.com{p}"))),
                excerpt: string_at(data, "selftext").unwrap_or_default(),
                created: data.get("created_utc").and_then(timestamp_value),
            }
        }
        JsonMapper::Generic(fields) => map_generic(item, fields),
    }
}

fn map_generic(item: &Value, fields: &FieldMap) -> RawItem {
    let text = |path: &str| lookup(item, path).and_then(scalar_string);
    RawItem {
        title: text(&fields.title),
        url: text(&fields.url),
        excerpt: fields
            .excerpt
            .as_deref()
            .and_then(text)
            .map(|t| html_to_text(&t))
            .unwrap_or_default(),
        created: fields
            .created
            .as_deref()
            .and_then(|path| lookup(item, path))
            .and_then(timestamp_value),
    }
}

fn accept(
    raw: RawItem,
    base: &Url,
    source: &Source,
    ctx: &FetchContext<'_>,
) -> Result<Article, ItemRejection> {
    let title = raw
        .title
        .map(|t| html_to_text(&t))
        .filter(|t| !t.is_empty())
        .ok_or(ItemRejection::MissingTitle)?;
    let link = raw
        .url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or(ItemRejection::MissingLink)?;
    let url = base
        .join(&link)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .ok_or(ItemRejection::BadLink(link))?;

    if let Some(created) = raw.created {
        if !ctx.is_recent(source, created) {
            return Err(ItemRejection::Stale(created));
        }
    }

    Ok(Article::stub(title, url.to_string(), raw.excerpt, &source.name, Utc::now())
        .with_published_at(raw.created))
}

/// Follow a dotted path (`"data.items"`) through nested objects.
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| current.get(segment))
}

fn string_at(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(scalar_string)
}

/// Non-empty strings and numbers as text; everything else is absent.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Unix seconds (integer or float) or a date string.
fn timestamp_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        Value::String(s) => parse_timestamp(s),
        _ => None,
    }
}
