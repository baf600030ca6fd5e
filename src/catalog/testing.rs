//! Mock catalog for tests

use super::{CatalogCandidate, CatalogError, CatalogService};
use async_trait::async_trait;
use std::sync::Mutex;

/// In-memory catalog with a fixed film list.
///
/// Search matches case-insensitively on a substring of the title.
#[allow(dead_code)]
pub struct MockCatalog {
    films: Mutex<Vec<CatalogCandidate>>,
    details_error: Mutex<Option<CatalogError>>,
    search_error: Mutex<Option<CatalogError>>,
    /// Record of all searches made
    pub searches: Mutex<Vec<(String, u32)>>,
    /// Record of all detail lookups made
    pub detail_lookups: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl MockCatalog {
    pub fn new() -> Self {
        Self {
            films: Mutex::new(Vec::new()),
            details_error: Mutex::new(None),
            search_error: Mutex::new(None),
            searches: Mutex::new(Vec::new()),
            detail_lookups: Mutex::new(Vec::new()),
        }
    }

    /// Add a film to the catalog
    pub fn with_film(self, film: CatalogCandidate) -> Self {
        self.films.lock().unwrap().push(film);
        self
    }

    /// Fail the next search with `error`
    pub fn fail_search(&self, error: CatalogError) {
        *self.search_error.lock().unwrap() = Some(error);
    }

    /// Fail the next detail lookup with `error`
    pub fn fail_details(&self, error: CatalogError) {
        *self.details_error.lock().unwrap() = Some(error);
    }

    pub fn recorded_searches(&self) -> Vec<(String, u32)> {
        self.searches.lock().unwrap().clone()
    }

    pub fn recorded_detail_lookups(&self) -> Vec<String> {
        self.detail_lookups.lock().unwrap().clone()
    }
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogService for MockCatalog {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<CatalogCandidate>, CatalogError> {
        self.searches
            .lock()
            .unwrap()
            .push((query.to_string(), limit));
        if let Some(error) = self.search_error.lock().unwrap().take() {
            return Err(error);
        }

        let needle = query.to_lowercase();
        Ok(self
            .films
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.title.to_lowercase().contains(&needle))
            .take(limit as usize)
            .map(|f| {
                // Search results never carry the detail-only fields
                let mut summary = f.clone();
                summary.director = None;
                summary.actors = None;
                summary.country = None;
                summary.external_rating = None;
                summary
            })
            .collect())
    }

    async fn details(&self, external_id: &str) -> Result<Option<CatalogCandidate>, CatalogError> {
        self.detail_lookups
            .lock()
            .unwrap()
            .push(external_id.to_string());
        if let Some(error) = self.details_error.lock().unwrap().take() {
            return Err(error);
        }

        Ok(self
            .films
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.external_id == external_id)
            .cloned())
    }
}
