//! Post-fetch curation: deduplication, relevance scoring and the local
//! tagger/summarizer.
//!
//! Every function here is pure over the article list and the injected
//! [`Vocabulary`](crate::vocabulary::Vocabulary), so identical inputs always
//! produce identical output.

pub mod dedup;
pub mod scoring;
pub mod tagging;

pub use dedup::deduplicate;
pub use scoring::filter_by_quality;
pub use tagging::tag_and_summarize;
