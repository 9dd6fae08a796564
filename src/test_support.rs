//! In-memory [`FetchText`] for offline tests.

use crate::scrapers::{FetchText, SourceError};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Serves canned bodies by URL. Unknown URLs fail like a refused connection.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    pages: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    requests: Mutex<Vec<(String, Instant)>>,
}

impl FakeFetcher {
    pub fn with_page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), body.into());
        self
    }

    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    /// Every URL requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.request_log().into_iter().map(|(url, _)| url).collect()
    }

    /// When `url` was first requested.
    pub fn requested_at(&self, url: &str) -> Option<Instant> {
        self.request_log()
            .into_iter()
            .find(|(seen, _)| seen == url)
            .map(|(_, at)| at)
    }

    fn request_log(&self) -> Vec<(String, Instant)> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl FetchText for FakeFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, SourceError> {
        if let Ok(mut log) = self.requests.lock() {
            log.push((url.to_string(), Instant::now()));
        }
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| SourceError::fetch(url, "connection refused"))
    }
}
