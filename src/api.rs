//! Optional AI enrichment through an OpenAI-compatible chat endpoint.
//!
//! The local tagger and summarizer always run first. When an endpoint is
//! configured, each article is additionally sent to the model, and a usable
//! answer overwrites the local `summary` and `topics`. Any failure leaves the
//! local values in place.
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait for async model interaction
//! - [`ChatClient`]: chat-completions client over `reqwest`
//! - [`RetryAsk`]: decorator adding retries with exponential backoff and jitter
//!
//! # Retry Strategy
//!
//! - Maximum 3 retry attempts
//! - Exponential backoff starting at 1 second, capped at 30 seconds
//! - Random jitter (0-250ms) added to each delay

use crate::models::{Article, MAX_TOPICS};
use crate::orchestrator::is_placeholder;
use crate::utils::{looks_truncated, truncate_chars, truncate_for_log, upcase};
use futures::stream::{self, StreamExt};
use rand::{Rng, rng};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Characters of article content included in a prompt.
const PROMPT_CONTENT_CHARS: usize = 3000;

const SYSTEM_PROMPT: &str = "You are an editor for an AI and technology newsletter. \
Given a news article, reply with a single JSON object and nothing else: \
{\"summary\": \"<2-3 sentence summary for a technical reader>\", \
\"topics\": [\"<up to 5 short topic labels>\"]}";

/// Trait for async model interaction.
///
/// Implementors send text to a model and hand back its reply. Decorators such
/// as [`RetryAsk`] wrap another implementor.
pub trait AskAsync {
    /// The type of response returned by the model.
    type Response;

    /// Send `text` and wait for the reply.
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Wrap `inner`, retrying up to `max_retries` times after the first failure.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    /// Wait before retry number `attempt` (1-based), jitter excluded.
    fn backoff(&self, attempt: usize) -> StdDuration {
        let doublings = attempt.saturating_sub(1).min(16) as u32;
        self.base_delay
            .saturating_mul(1 << doublings)
            .min(self.max_delay)
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all, fields(max_retries = self.max_retries))]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let started = Instant::now();
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let err = match self.inner.ask(text).await {
                Ok(resp) => return Ok(resp),
                Err(e) => e,
            };
            if attempt > self.max_retries {
                error!(
                    attempt,
                    elapsed_ms = started.elapsed().as_millis(),
                    error = %err,
                    "Model request failed; giving up"
                );
                return Err(err);
            }

            let delay = self.backoff(attempt) + StdDuration::from_millis(rng().random_range(0..=250));
            warn!(attempt, ?delay, error = %err, "Model request failed; retrying");
            sleep(delay).await;
        }
    }
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatClient {
    client: Client,
    /// Base URL such as `http://localhost:5001/v1`.
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl ChatClient {
    pub fn new(client: Client, endpoint: &str, api_key: Option<String>, model: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        }
    }
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

impl AskAsync for ChatClient {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let body = json!({
            "model": self.model,
            "temperature": 0.2,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": text},
            ],
        });

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let completion: Completion = request.send().await?.error_for_status()?.json().await?;
        debug!(elapsed_ms = t0.elapsed().as_millis(), "Chat completion returned");
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| "completion had no message content".into())
    }
}

/// What the model returns for one article.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArticleInsights {
    pub summary: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// The user message for `article`: its title and the start of its content.
pub fn build_prompt(article: &Article) -> String {
    let body = if article.content.is_empty() {
        &article.excerpt
    } else {
        &article.content
    };
    format!(
        "Title: {}\n\nArticle:\n{}",
        article.title,
        truncate_chars(body, PROMPT_CONTENT_CHARS)
    )
}

/// Drop a surrounding Markdown code fence, if the model added one.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub fn parse_insights(raw: &str) -> Result<ArticleInsights, serde_json::Error> {
    serde_json::from_str(strip_code_fence(raw))
}

/// Trim, keep 3..=30 character labels, title-case, dedupe, cap at five.
pub fn clean_topics(topics: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for topic in topics {
        let topic = topic.trim();
        let len = topic.chars().count();
        if !(3..=30).contains(&len) {
            continue;
        }
        let label = topic
            .split_whitespace()
            .map(|w| {
                if w.chars().all(|c| !c.is_alphabetic() || c.is_uppercase()) {
                    w.to_string()
                } else {
                    upcase(w)
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        if !cleaned.iter().any(|c| c.eq_ignore_ascii_case(&label)) {
            cleaned.push(label);
        }
        if cleaned.len() == MAX_TOPICS {
            break;
        }
    }
    cleaned
}

/// Ask for insights on one article, re-asking once if the reply was cut off.
#[instrument(level = "info", skip_all, fields(title = %article.title))]
pub async fn insights_for<A>(api: &A, article: &Article) -> Result<ArticleInsights, Box<dyn Error>>
where
    A: AskAsync<Response = String>,
{
    let prompt = build_prompt(article);
    let response = api.ask(&prompt).await?;
    let mut parsed = parse_insights(&response);

    if let Err(ref e) = parsed {
        if looks_truncated(e) {
            warn!(error = %e, "Reply ended early; re-asking once");
            let second = api.ask(&prompt).await?;
            parsed = parse_insights(&second);
        }
    }

    parsed.map_err(|e| {
        warn!(
            error = %e,
            response_preview = %truncate_for_log(&response, 300),
            "Model returned non-conforming JSON"
        );
        e.into()
    })
}

/// Overwrite local summaries and topics with model output where it succeeds.
///
/// Placeholders are left alone. Returns how many articles were updated.
#[instrument(level = "info", skip_all, fields(articles = articles.len(), concurrency = concurrency))]
pub async fn enhance_articles<A>(
    api: &A,
    articles: &mut [Article],
    concurrency: usize,
    summary_max_chars: usize,
) -> usize
where
    A: AskAsync<Response = String>,
{
    let t0 = Instant::now();
    let targets = articles.iter().enumerate().filter(|(_, a)| !is_placeholder(a));
    let results: Vec<(usize, Result<ArticleInsights, Box<dyn Error>>)> = stream::iter(targets)
        .map(|(i, article)| async move { (i, insights_for(api, article).await) })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut updated = 0;
    for (i, result) in results {
        match result {
            Ok(insights) => {
                let article = &mut articles[i];
                let summary = insights.summary.trim();
                if !summary.is_empty() {
                    article.summary = Some(truncate_chars(summary, summary_max_chars));
                }
                let topics = clean_topics(insights.topics);
                if !topics.is_empty() {
                    article.set_topics(topics);
                }
                updated += 1;
            }
            Err(e) => {
                error!(title = %articles[i].title, error = %e, "AI enrichment failed; keeping local summary");
            }
        }
    }

    info!(
        updated,
        elapsed_ms = t0.elapsed().as_millis(),
        "AI enrichment finished"
    );
    updated
}
