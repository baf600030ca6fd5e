//! Effects produced by state transitions

use super::reply::Reply;
use crate::catalog::CatalogCandidate;
use crate::store::FilmId;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::large_enum_variant)] // Consumed within one transition
pub enum Effect {
    /// Search the external catalog
    SearchCatalog { query: String, limit: u32 },

    /// Fetch the extended record of one candidate
    FetchDetails { external_id: String },

    /// Persist a confirmed candidate
    CreateFilm {
        candidate: CatalogCandidate,
        profile: String,
    },

    /// Load a profile's films
    ListFilms { profile: String, watched_only: bool },

    /// Load one film
    LoadFilm { film_id: FilmId },

    /// Pick a random film of a profile
    PickRandom { profile: String },

    /// Owner-checked watched flag update
    MarkWatched { film_id: FilmId, profile: String },

    /// Owner-checked rating update
    SetRating {
        film_id: FilmId,
        profile: String,
        rating: u8,
    },

    /// Owner-checked comment update
    SetComment {
        film_id: FilmId,
        profile: String,
        comment: String,
    },

    /// Owner-checked removal
    DeleteFilm { film_id: FilmId, profile: String },

    /// Send a message to the user
    Reply(Reply),
}

impl Effect {
    /// Whether executing this effect touches the catalog or the store
    #[allow(dead_code)] // Used in tests
    pub fn is_io(&self) -> bool {
        !matches!(self, Effect::Reply(_))
    }
}
