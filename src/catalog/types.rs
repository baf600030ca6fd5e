//! Normalized catalog records

use serde::{Deserialize, Serialize};

/// A film returned by the external catalog, not yet persisted.
///
/// Every optional field is `None` when upstream did not provide it. The
/// detail-only fields (`director`, `actors`, `country`, `external_rating`)
/// are usually `None` for search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogCandidate {
    pub external_id: String,
    pub title: String,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub trailer_url: Option<String>,
    pub poster_url: Option<String>,
    pub watch_url: Option<String>,
    pub director: Option<String>,
    pub actors: Option<String>,
    pub country: Option<String>,
    pub external_rating: Option<f64>,
}

impl CatalogCandidate {
    /// Minimal candidate with only the required fields set
    #[allow(dead_code)] // Used in tests
    pub fn new(external_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            title: title.into(),
            year: None,
            genre: None,
            description: None,
            trailer_url: None,
            poster_url: None,
            watch_url: None,
            director: None,
            actors: None,
            country: None,
            external_rating: None,
        }
    }

    /// Button label: `Title (year)`, or `Title (—)` when the year is unknown
    pub fn label(&self) -> String {
        match self.year {
            Some(year) => format!("{} ({year})", self.title),
            None => format!("{} (—)", self.title),
        }
    }

    /// Fill fields this record lacks from `summary`.
    ///
    /// Detail responses occasionally omit things the search summary had
    /// (watch links in particular).
    #[must_use]
    pub fn fill_from(mut self, summary: &CatalogCandidate) -> Self {
        fn fill<T: Clone>(slot: &mut Option<T>, fallback: Option<&T>) {
            if slot.is_none() {
                *slot = fallback.cloned();
            }
        }

        fill(&mut self.year, summary.year.as_ref());
        fill(&mut self.genre, summary.genre.as_ref());
        fill(&mut self.description, summary.description.as_ref());
        fill(&mut self.trailer_url, summary.trailer_url.as_ref());
        fill(&mut self.poster_url, summary.poster_url.as_ref());
        fill(&mut self.watch_url, summary.watch_url.as_ref());
        fill(&mut self.director, summary.director.as_ref());
        fill(&mut self.actors, summary.actors.as_ref());
        fill(&mut self.country, summary.country.as_ref());
        fill(&mut self.external_rating, summary.external_rating.as_ref());
        self
    }
}
