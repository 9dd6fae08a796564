//! # Awful AI Digest
//!
//! Gathers AI and technology news from listing pages, JSON APIs and RSS
//! feeds, curates it into a short ranked list, and writes the result as a
//! JSON digest for an external renderer or mailer.
//!
//! ## Usage
//!
//! ```sh
//! awful_ai_digest -o ./digests
//! ```
//!
//! ## Architecture
//!
//! 1. **Configuration**: load and validate the source registry (fatal on error)
//! 2. **Gathering**: fetch every source concurrently under one deadline
//! 3. **Curation**: deduplicate, fetch full text, score, filter, tag, summarize
//! 4. **AI enrichment** (optional): better summaries and topics from an LLM
//! 5. **Output**: write `{output_dir}/{date}/{edition}.json`

use chrono::{Local, Utc};
use clap::Parser;
use std::error::Error;
use std::time::Duration as StdDuration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod content;
mod curation;
mod models;
mod orchestrator;
mod outputs;
mod pipeline;
mod scrapers;
#[cfg(test)]
mod test_support;
mod utils;
mod vocabulary;

use api::{ChatClient, RetryAsk};
use cli::Cli;
use config::{Registry, RegistryFile, Settings};
use models::Digest;
use outputs::json;
use scrapers::HttpFetcher;
use utils::{ensure_writable_dir, time_of_day};
use vocabulary::Vocabulary;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("awful_ai_digest starting up");

    let args = Cli::parse();
    debug!(?args.output_dir, ?args.config, ?args.sources, "Parsed CLI arguments");

    // ---- Configuration (the only fatal stage) ----
    let file = match &args.config {
        Some(path) => RegistryFile::load(path)?,
        None => RegistryFile::builtin()?,
    };
    let mut settings = Settings::from_file(&file);
    settings.apply_cli(&args);
    settings.validate()?;
    let registry = Registry::from_entries(&file.sources)?.select(&args.sources)?;
    if registry.is_empty() {
        warn!("Registry declares no sources; the digest will hold placeholders only");
    }
    info!(sources = registry.len(), ?settings, "Configuration loaded");

    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Gather and curate ----
    let fetcher = HttpFetcher::new(settings.request_timeout)?;
    let vocab = Vocabulary::default();
    let mut curated = pipeline::run(&fetcher, &registry, &vocab, &settings).await;

    // ---- Optional AI enrichment ----
    let mut ai_enriched = false;
    if let Some(endpoint) = args.llm_endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
        let client = ChatClient::new(
            fetcher.client().clone(),
            endpoint,
            args.llm_api_key.clone(),
            &args.llm_model,
        );
        let api = RetryAsk::new(client, 3, StdDuration::from_secs(1));
        let updated = api::enhance_articles(
            &api,
            &mut curated.articles,
            settings.content_concurrency,
            settings.summary_max_length,
        )
        .await;
        ai_enriched = updated > 0;
    } else {
        info!("No LLM endpoint configured; using local summaries");
    }

    // ---- Output ----
    let digest = Digest {
        local_date: Local::now().date_naive().to_string(),
        time_of_day: time_of_day(),
        generated_at: Utc::now(),
        ai_enriched,
        sources: curated.reports,
        articles: curated.articles,
    };
    let path = json::write_digest(&digest, &args.output_dir).await?;

    let failed_sources = digest.sources.iter().filter(|r| r.error.is_some()).count();
    info!(
        path = %path,
        articles = digest.articles.len(),
        failed_sources,
        ai_enriched,
        elapsed_ms = start_time.elapsed().as_millis(),
        "awful_ai_digest finished"
    );
    Ok(())
}
