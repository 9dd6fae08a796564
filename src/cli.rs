//! Command-line interface definitions for Awful AI Digest.
//!
//! Every knob here is optional and overrides the registry file, which in turn
//! overrides the built-in defaults. Secrets can come from the environment.

use clap::Parser;

/// Command-line arguments for the Awful AI Digest pipeline.
///
/// # Examples
///
/// ```sh
/// # Built-in sources, digest written under ./digests
/// awful_ai_digest -o ./digests
///
/// # Custom registry, only two sources, ten articles
/// awful_ai_digest -o ./digests -c sources.yaml --source hacker_news --source mit_tech_review -n 10
///
/// # With AI summaries from a local OpenAI-compatible server
/// LLM_ENDPOINT=http://localhost:5001/v1 awful_ai_digest -o ./digests
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for the digest JSON files
    #[arg(short, long)]
    pub output_dir: String,

    /// Optional path to a YAML source registry (built-in registry otherwise)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Total number of articles to gather
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Minimum number of articles requested from each source
    #[arg(long)]
    pub per_source_floor: Option<usize>,

    /// Minimum relevance score an article needs to be kept
    #[arg(long)]
    pub min_score: Option<f64>,

    /// Drop dated items older than this many days
    #[arg(long)]
    pub recency_days: Option<i64>,

    /// Overall budget for fetching and content enrichment, in seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Number of sources fetched at once (content fetches use twice as many)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Restrict the run to these registry sources (repeatable)
    #[arg(long = "source")]
    pub sources: Vec<String>,

    /// Base URL of an OpenAI-compatible API; enables AI summaries
    #[arg(long, env = "LLM_ENDPOINT")]
    pub llm_endpoint: Option<String>,

    /// API key sent as a bearer token
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Model name sent with each request
    #[arg(long, env = "LLM_MODEL", default_value = "gpt-4o-mini")]
    pub llm_model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "awful_ai_digest",
            "--output-dir",
            "./digests",
            "--config",
            "sources.yaml",
            "--min-score",
            "0.4",
            "--recency-days",
            "3",
        ]);

        assert_eq!(cli.output_dir, "./digests");
        assert_eq!(cli.config.as_deref(), Some("sources.yaml"));
        assert_eq!(cli.min_score, Some(0.4));
        assert_eq!(cli.recency_days, Some(3));
        assert!(cli.sources.is_empty());
    }

    #[test]
    fn test_cli_short_flags_and_repeated_sources() {
        let cli = Cli::parse_from([
            "awful_ai_digest",
            "-o",
            "/tmp/digests",
            "-n",
            "12",
            "--source",
            "hacker_news",
            "--source",
            "mit_tech_review",
        ]);

        assert_eq!(cli.output_dir, "/tmp/digests");
        assert_eq!(cli.count, Some(12));
        assert_eq!(cli.sources, vec!["hacker_news", "mit_tech_review"]);
    }

    #[test]
    fn test_output_dir_is_required() {
        assert!(Cli::try_parse_from(["awful_ai_digest"]).is_err());
    }
}
