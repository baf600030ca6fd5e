//! Conversation state types

use crate::catalog::CatalogCandidate;
use crate::store::FilmId;
use serde::{Deserialize, Serialize};

/// Where the user is inside an interaction.
///
/// Transient data lives in the variant that needs it, so leaving a step
/// discards it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    /// Nothing in progress
    #[default]
    Idle,

    /// Waiting for the user to pick a profile
    ChoosingProfile,

    /// Waiting for a free-text title to search for
    AwaitingSearchQuery,

    /// Search results shown, waiting for a pick and then a confirmation
    ChoosingCandidate {
        candidates: Vec<CatalogCandidate>,
        /// Candidate whose card is currently displayed
        #[serde(default)]
        selected: Option<CatalogCandidate>,
    },

    /// Waiting for a 1-10 rating of `film_id`
    AwaitingRatingInput { film_id: FilmId },

    /// Waiting for a comment on `film_id`
    AwaitingCommentInput { film_id: FilmId },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Idle => "idle",
            Step::ChoosingProfile => "choosing_profile",
            Step::AwaitingSearchQuery => "awaiting_search_query",
            Step::ChoosingCandidate { .. } => "choosing_candidate",
            Step::AwaitingRatingInput { .. } => "awaiting_rating_input",
            Step::AwaitingCommentInput { .. } => "awaiting_comment_input",
        }
    }
}

/// Per-session conversation state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConvState {
    /// Owning profile, once chosen
    pub profile: Option<String>,
    pub step: Step,
}

impl ConvState {
    /// Idle state for `profile` (authenticated idle when `Some`)
    pub fn idle(profile: Option<String>) -> Self {
        Self {
            profile,
            step: Step::Idle,
        }
    }

    /// Same profile, different step
    #[must_use]
    pub fn with_step(&self, step: Step) -> Self {
        Self {
            profile: self.profile.clone(),
            step,
        }
    }

    /// Same profile, back to idle
    #[must_use]
    pub fn to_idle(&self) -> Self {
        self.with_step(Step::Idle)
    }
}

/// Result of [`require_profile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileGuard<'a> {
    Authorized(&'a str),
    NeedsProfileSelection,
}

/// Guard for every handler that acts on a profile's collection
pub fn require_profile(state: &ConvState) -> ProfileGuard<'_> {
    match state.profile.as_deref() {
        Some(profile) if !profile.is_empty() => ProfileGuard::Authorized(profile),
        _ => ProfileGuard::NeedsProfileSelection,
    }
}

/// Context for a conversation (immutable configuration)
#[derive(Debug, Clone)]
pub struct ConvContext {
    pub session_id: String,
    /// Profiles a user may choose, in display order
    pub profiles: Vec<String>,
    /// Result cap passed to catalog searches
    pub search_limit: u32,
}

impl ConvContext {
    pub fn new(session_id: impl Into<String>, profiles: Vec<String>, search_limit: u32) -> Self {
        Self {
            session_id: session_id.into(),
            profiles,
            search_limit,
        }
    }

    /// Resolve a user-typed profile name, ignoring case and surrounding space
    pub fn resolve_profile(&self, name: &str) -> Option<&str> {
        let name = name.trim().to_lowercase();
        self.profiles
            .iter()
            .find(|p| p.to_lowercase() == name)
            .map(String::as_str)
    }
}
