//! JSON hand-off for the external renderer.
//!
//! Files are organized by date with edition names:
//! ```text
//! output_dir/
//! └── 2025-05-06/
//!     ├── morning.json
//!     ├── afternoon.json
//!     └── evening.json
//! ```
//!
//! A later run of the same edition on the same day replaces the file.

use crate::models::Digest;
use std::error::Error;
use tokio::fs;
use tracing::{error, info, instrument};

/// Path of the digest file for `digest` under `output_dir`.
pub fn digest_path(digest: &Digest, output_dir: &str) -> String {
    format!(
        "{}/{}/{}.json",
        output_dir.trim_end_matches('/'),
        digest.local_date,
        digest.time_of_day
    )
}

/// Serialize `digest` to `{output_dir}/{date}/{edition}.json`.
///
/// Returns the path written.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir))]
pub async fn write_digest(digest: &Digest, output_dir: &str) -> Result<String, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(digest)?;

    let day_dir = format!("{}/{}", output_dir.trim_end_matches('/'), digest.local_date);
    info!(%day_dir, "Ensuring digest directory exists");
    if let Err(e) = fs::create_dir_all(&day_dir).await {
        error!(%day_dir, error = %e, "Failed to create digest dir");
        return Err(e.into());
    }

    let path = digest_path(digest, output_dir);
    fs::write(&path, json).await?;
    info!(%path, articles = digest.articles.len(), "Wrote digest");
    Ok(path)
}
