//! External film catalog
//!
//! Wraps the third-party movie database behind a small trait and a
//! client that bounds every call with a timeout and never propagates
//! upstream failures to the conversation.

mod error;
mod kinopoisk;
mod types;

#[cfg(test)]
pub mod testing;

#[allow(unused_imports)] // Public API re-exports
pub use error::{CatalogError, CatalogErrorKind};
pub use kinopoisk::{KinopoiskService, DEFAULT_BASE_URL};
pub use types::CatalogCandidate;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Upper bound on any single catalog call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Common interface for catalog providers
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Free-text search, at most `limit` results
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<CatalogCandidate>, CatalogError>;

    /// Extended record for one film; `Ok(None)` when upstream does not know the id
    async fn details(&self, external_id: &str) -> Result<Option<CatalogCandidate>, CatalogError>;
}

/// Result of a catalog search as seen by the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchOutcome {
    Found { candidates: Vec<CatalogCandidate> },
    NotFound,
    /// Upstream failed; the reason is for logs, not for users
    Unavailable { reason: String },
}

/// Timeout-bounded, logging front for a [`CatalogService`]
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<dyn CatalogService>,
    timeout: Duration,
}

impl CatalogClient {
    pub fn new(inner: Arc<dyn CatalogService>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub async fn search(&self, query: &str, limit: u32) -> SearchOutcome {
        let start = Instant::now();
        let result = match tokio::time::timeout(self.timeout, self.inner.search(query, limit)).await {
            Ok(result) => result,
            Err(_) => Err(self.elapsed_error()),
        };
        let duration = start.elapsed();

        match result {
            Ok(candidates) if candidates.is_empty() => {
                tracing::info!(query, duration_ms = %duration.as_millis(), "Catalog search found nothing");
                SearchOutcome::NotFound
            }
            Ok(mut candidates) => {
                candidates.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
                tracing::info!(
                    query,
                    results = candidates.len(),
                    duration_ms = %duration.as_millis(),
                    "Catalog search completed"
                );
                SearchOutcome::Found { candidates }
            }
            Err(e) => {
                tracing::warn!(
                    query,
                    kind = e.kind.as_str(),
                    error = %e.message,
                    duration_ms = %duration.as_millis(),
                    "Catalog search failed"
                );
                SearchOutcome::Unavailable { reason: e.message }
            }
        }
    }

    pub async fn fetch_details(&self, external_id: &str) -> Option<CatalogCandidate> {
        let start = Instant::now();
        let result = match tokio::time::timeout(self.timeout, self.inner.details(external_id)).await {
            Ok(result) => result,
            Err(_) => Err(self.elapsed_error()),
        };
        let duration = start.elapsed();

        match result {
            Ok(Some(candidate)) => {
                tracing::debug!(external_id, duration_ms = %duration.as_millis(), "Catalog details fetched");
                Some(candidate)
            }
            Ok(None) => {
                tracing::info!(external_id, "Catalog has no details for film");
                None
            }
            Err(e) => {
                tracing::warn!(
                    external_id,
                    kind = e.kind.as_str(),
                    error = %e.message,
                    duration_ms = %duration.as_millis(),
                    "Catalog details request failed"
                );
                None
            }
        }
    }

    fn elapsed_error(&self) -> CatalogError {
        CatalogError::timeout(format!("No response within {}s", self.timeout.as_secs()))
    }
}
