//! Events that can occur in a conversation

use crate::catalog::{CatalogCandidate, SearchOutcome};
use crate::store::{FilmId, FilmRecord, Mutation};
use serde::{Deserialize, Serialize};

/// Something the user did: a tap on an offered option or free text.
///
/// The presentation layer maps its own input (buttons, commands, messages)
/// onto these; reply options carry them back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Start,
    SwitchProfile,
    ChooseProfile { name: String },
    Text { text: String },

    // Adding a film
    AddFilm,
    SelectCandidate { external_id: String },
    ConfirmCandidate { external_id: String },
    BackToCandidates,
    Cancel,

    // Browsing
    ListFilms,
    ListWatched,
    ShowFilm { film_id: FilmId },
    RandomFilm,

    // Editing a record
    MarkWatched { film_id: FilmId },
    RateFilm { film_id: FilmId },
    CommentFilm { film_id: FilmId },
    DeleteFilm { film_id: FilmId },
}

impl Action {
    #[allow(dead_code)] // Used in tests
    pub fn text(text: impl Into<String>) -> Self {
        Action::Text { text: text.into() }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::SwitchProfile => "switch_profile",
            Action::ChooseProfile { .. } => "choose_profile",
            Action::Text { .. } => "text",
            Action::AddFilm => "add_film",
            Action::SelectCandidate { .. } => "select_candidate",
            Action::ConfirmCandidate { .. } => "confirm_candidate",
            Action::BackToCandidates => "back_to_candidates",
            Action::Cancel => "cancel",
            Action::ListFilms => "list_films",
            Action::ListWatched => "list_watched",
            Action::ShowFilm { .. } => "show_film",
            Action::RandomFilm => "random_film",
            Action::MarkWatched { .. } => "mark_watched",
            Action::RateFilm { .. } => "rate_film",
            Action::CommentFilm { .. } => "comment_film",
            Action::DeleteFilm { .. } => "delete_film",
        }
    }
}

/// Events that trigger state transitions
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)] // Consumed within one transition
pub enum Event {
    /// Input from the user
    User(Action),

    // Catalog results
    SearchCompleted {
        query: String,
        outcome: SearchOutcome,
    },
    DetailsFetched {
        external_id: String,
        details: Option<CatalogCandidate>,
    },

    // Store results
    FilmCreated {
        record: FilmRecord,
    },
    FilmsListed {
        films: Vec<FilmRecord>,
        watched_only: bool,
    },
    FilmLoaded {
        film_id: FilmId,
        record: Option<FilmRecord>,
    },
    RandomPicked {
        record: Option<FilmRecord>,
    },
    WatchedMarked {
        film_id: FilmId,
        outcome: Mutation,
    },
    RatingSaved {
        film_id: FilmId,
        rating: u8,
        outcome: Mutation,
    },
    CommentSaved {
        film_id: FilmId,
        outcome: Mutation,
    },
    FilmDeleted {
        film_id: FilmId,
        outcome: Mutation,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::User(action) => action.name(),
            Event::SearchCompleted { .. } => "search_completed",
            Event::DetailsFetched { .. } => "details_fetched",
            Event::FilmCreated { .. } => "film_created",
            Event::FilmsListed { .. } => "films_listed",
            Event::FilmLoaded { .. } => "film_loaded",
            Event::RandomPicked { .. } => "random_picked",
            Event::WatchedMarked { .. } => "watched_marked",
            Event::RatingSaved { .. } => "rating_saved",
            Event::CommentSaved { .. } => "comment_saved",
            Event::FilmDeleted { .. } => "film_deleted",
        }
    }
}
