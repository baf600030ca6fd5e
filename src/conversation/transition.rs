//! Pure state transition function

use super::reply::{candidate_card, film_reply, Nav, Reply};
use super::state::{require_profile, ConvContext, ConvState, ProfileGuard, Step};
use super::{Action, Effect, Event};
use crate::catalog::{CatalogCandidate, SearchOutcome};
use crate::store::{FilmId, FilmRecord, Mutation, MAX_COMMENT_CHARS, RATING_RANGE};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_reply(self, reply: Reply) -> Self {
        self.with_effect(Effect::Reply(reply))
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs. All I/O is
/// described by the returned effects.
pub fn transition(
    state: &ConvState,
    ctx: &ConvContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match event {
        Event::User(action) => Ok(handle_action(state, ctx, action)),
        result => handle_result(state, result),
    }
}

// ============================================================================
// User actions
// ============================================================================

#[allow(clippy::too_many_lines)] // One arm per action and step
fn handle_action(state: &ConvState, ctx: &ConvContext, action: Action) -> TransitionResult {
    match (&state.step, action) {
        (_, Action::Start) => start(state, ctx),

        (_, Action::SwitchProfile) => TransitionResult::new(ConvState {
            profile: None,
            step: Step::ChoosingProfile,
        })
        .with_reply(profile_prompt(ctx, "Who is watching?")),

        (_, Action::ChooseProfile { name }) | (Step::ChoosingProfile, Action::Text { text: name }) => {
            choose_profile(state, ctx, &name)
        }

        (_, Action::Cancel) => cancel(state),

        // ============================================================
        // Adding a film
        // ============================================================
        (Step::AwaitingSearchQuery, Action::Text { text }) => submit_query(state, ctx, &text),

        (Step::ChoosingCandidate { candidates, .. }, Action::SelectCandidate { external_id }) => {
            if candidates.iter().any(|c| c.external_id == external_id) {
                TransitionResult::new(state.clone()).with_effect(Effect::FetchDetails { external_id })
            } else {
                TransitionResult::new(state.clone()).with_reply(
                    candidate_list(
                        "That film is not in the list. Choose one of these:".to_string(),
                        candidates,
                    ),
                )
            }
        }

        (Step::ChoosingCandidate { candidates, selected }, Action::ConfirmCandidate { external_id }) => {
            let ProfileGuard::Authorized(profile) = require_profile(state) else {
                return needs_profile(ctx);
            };
            match selected {
                Some(candidate) if candidate.external_id == external_id => {
                    TransitionResult::new(state.clone()).with_effect(Effect::CreateFilm {
                        candidate: candidate.clone(),
                        profile: profile.to_string(),
                    })
                }
                _ => TransitionResult::new(state.with_step(Step::ChoosingCandidate {
                    candidates: candidates.clone(),
                    selected: None,
                }))
                .with_reply(candidate_list(
                    "That selection is out of date. Pick a film again:".to_string(),
                    candidates,
                )),
            }
        }

        (Step::ChoosingCandidate { candidates, .. }, Action::BackToCandidates) => {
            TransitionResult::new(state.with_step(Step::ChoosingCandidate {
                candidates: candidates.clone(),
                selected: None,
            }))
            .with_reply(candidate_list("Choose a film:".to_string(), candidates))
        }

        // ============================================================
        // Free-text inputs
        // ============================================================
        (Step::AwaitingRatingInput { film_id }, Action::Text { text }) => {
            let ProfileGuard::Authorized(profile) = require_profile(state) else {
                return needs_profile(ctx);
            };
            match parse_rating(&text) {
                Some(rating) => TransitionResult::new(state.clone()).with_effect(Effect::SetRating {
                    film_id: *film_id,
                    profile: profile.to_string(),
                    rating,
                }),
                None => TransitionResult::new(state.clone()).with_reply(
                    Reply::new(format!(
                        "Please send a whole number from {} to {}.",
                        RATING_RANGE.start(),
                        RATING_RANGE.end()
                    ))
                    .with_nav(Nav::Cancel),
                ),
            }
        }

        (Step::AwaitingCommentInput { film_id }, Action::Text { text }) => {
            let ProfileGuard::Authorized(profile) = require_profile(state) else {
                return needs_profile(ctx);
            };
            let chars = text.chars().count();
            if chars > MAX_COMMENT_CHARS {
                return TransitionResult::new(state.clone()).with_reply(
                    Reply::new(format!(
                        "That comment is {chars} characters long. The limit is {MAX_COMMENT_CHARS}."
                    ))
                    .with_nav(Nav::Cancel),
                );
            }
            TransitionResult::new(state.clone()).with_effect(Effect::SetComment {
                film_id: *film_id,
                profile: profile.to_string(),
                comment: text,
            })
        }

        // ============================================================
        // Menu actions (abandon any sub-flow in progress)
        // ============================================================
        (
            _,
            action @ (Action::AddFilm
            | Action::ListFilms
            | Action::ListWatched
            | Action::ShowFilm { .. }
            | Action::RandomFilm
            | Action::MarkWatched { .. }
            | Action::RateFilm { .. }
            | Action::CommentFilm { .. }
            | Action::DeleteFilm { .. }),
        ) => menu_action(state, ctx, action),

        // ============================================================
        // Anything else: guidance, no transition
        // ============================================================
        (_, Action::Text { .. }) => TransitionResult::new(state.clone()).with_reply(guidance(state, ctx)),

        (_, Action::SelectCandidate { .. } | Action::ConfirmCandidate { .. } | Action::BackToCandidates) => {
            let mut reply = guidance(state, ctx);
            reply.text = format!("That option is no longer available. {}", reply.text);
            TransitionResult::new(state.clone()).with_reply(reply)
        }
    }
}

fn start(state: &ConvState, ctx: &ConvContext) -> TransitionResult {
    match require_profile(state) {
        ProfileGuard::Authorized(profile) => TransitionResult::new(state.to_idle())
            .with_reply(Reply::new(format!("Welcome back, {profile}! What shall we do?")).with_main_menu()),
        ProfileGuard::NeedsProfileSelection => TransitionResult::new(ConvState {
            profile: None,
            step: Step::ChoosingProfile,
        })
        .with_reply(profile_prompt(ctx, "Hi! I keep your film list. Who is watching?")),
    }
}

fn choose_profile(state: &ConvState, ctx: &ConvContext, name: &str) -> TransitionResult {
    match ctx.resolve_profile(name) {
        Some(profile) => TransitionResult::new(ConvState::idle(Some(profile.to_string())))
            .with_reply(Reply::new(format!("Profile {profile} selected.")).with_main_menu()),
        None => TransitionResult::new(state.clone())
            .with_reply(profile_prompt(ctx, &format!("Unknown profile \"{}\". Choose one of:", name.trim()))),
    }
}

fn cancel(state: &ConvState) -> TransitionResult {
    let reply = match require_profile(state) {
        ProfileGuard::Authorized(_) => Reply::new("Cancelled.").with_main_menu(),
        ProfileGuard::NeedsProfileSelection => Reply::new("Cancelled.").with_option("Start", Action::Start),
    };
    TransitionResult::new(state.to_idle()).with_reply(reply)
}

fn submit_query(state: &ConvState, ctx: &ConvContext, text: &str) -> TransitionResult {
    let ProfileGuard::Authorized(_) = require_profile(state) else {
        return needs_profile(ctx);
    };
    let query = text.trim();
    if query.is_empty() {
        return TransitionResult::new(state.clone())
            .with_reply(Reply::new("Send me the title of the film.").with_nav(Nav::Cancel));
    }
    TransitionResult::new(state.clone()).with_effect(Effect::SearchCatalog {
        query: query.to_string(),
        limit: ctx.search_limit,
    })
}

fn menu_action(state: &ConvState, ctx: &ConvContext, action: Action) -> TransitionResult {
    let ProfileGuard::Authorized(profile) = require_profile(state) else {
        return needs_profile(ctx);
    };
    let profile = profile.to_string();
    let idle = state.to_idle();

    match action {
        Action::AddFilm => TransitionResult::new(state.with_step(Step::AwaitingSearchQuery))
            .with_reply(Reply::new("Send me the title of the film.").with_nav(Nav::Cancel)),
        Action::ListFilms => TransitionResult::new(idle).with_effect(Effect::ListFilms {
            profile,
            watched_only: false,
        }),
        Action::ListWatched => TransitionResult::new(idle).with_effect(Effect::ListFilms {
            profile,
            watched_only: true,
        }),
        Action::ShowFilm { film_id } => TransitionResult::new(idle).with_effect(Effect::LoadFilm { film_id }),
        Action::RandomFilm => TransitionResult::new(idle).with_effect(Effect::PickRandom { profile }),
        Action::MarkWatched { film_id } => {
            TransitionResult::new(idle).with_effect(Effect::MarkWatched { film_id, profile })
        }
        Action::RateFilm { film_id } => TransitionResult::new(state.with_step(Step::AwaitingRatingInput { film_id }))
            .with_reply(
                Reply::new(format!(
                    "Rate the film from {} to {}.",
                    RATING_RANGE.start(),
                    RATING_RANGE.end()
                ))
                .with_nav(Nav::Cancel),
            ),
        Action::CommentFilm { film_id } => {
            TransitionResult::new(state.with_step(Step::AwaitingCommentInput { film_id })).with_reply(
                Reply::new(format!("Send your comment (up to {MAX_COMMENT_CHARS} characters)."))
                    .with_nav(Nav::Cancel),
            )
        }
        Action::DeleteFilm { film_id } => {
            TransitionResult::new(idle).with_effect(Effect::DeleteFilm { film_id, profile })
        }
        other => TransitionResult::new(state.clone()).with_reply(
            Reply::new(format!("Unexpected menu action {}.", other.name())).with_main_menu(),
        ),
    }
}

// ============================================================================
// Effect results
// ============================================================================

fn handle_result(state: &ConvState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (&state.step, event) {
        (Step::AwaitingSearchQuery, Event::SearchCompleted { query, outcome }) => Ok(match outcome {
            SearchOutcome::Found { candidates } if !candidates.is_empty() => {
                let reply = candidate_list(format!("Found for \"{query}\". Choose a film:"), &candidates);
                TransitionResult::new(state.with_step(Step::ChoosingCandidate {
                    candidates,
                    selected: None,
                }))
                .with_reply(reply)
            }
            SearchOutcome::Found { .. } | SearchOutcome::NotFound => TransitionResult::new(state.clone())
                .with_reply(
                    Reply::new(format!("Nothing found for \"{query}\". Try another title."))
                        .with_nav(Nav::Cancel),
                ),
            SearchOutcome::Unavailable { .. } => TransitionResult::new(state.clone()).with_reply(
                Reply::new("The film catalog is not responding. Please try again in a moment.")
                    .with_nav(Nav::Cancel),
            ),
        }),

        (Step::ChoosingCandidate { candidates, .. }, Event::DetailsFetched { external_id, details }) => {
            let summary = candidates
                .iter()
                .find(|c| c.external_id == external_id)
                .ok_or_else(|| {
                    TransitionError::InvalidTransition(format!(
                        "details for {external_id}, which is not among the candidates"
                    ))
                })?;
            let fetched = details.is_some();
            let selected = details.map_or_else(|| summary.clone(), |d| d.fill_from(summary));
            Ok(TransitionResult::new(state.with_step(Step::ChoosingCandidate {
                candidates: candidates.clone(),
                selected: Some(selected.clone()),
            }))
            .with_reply(confirm_card(&selected, fetched)))
        }

        (Step::ChoosingCandidate { .. }, Event::FilmCreated { record }) => Ok(TransitionResult::new(state.to_idle())
            .with_reply(Reply::new(format!("🎬 \"{}\" added to your list.", record.title)).with_main_menu())),

        (Step::Idle, Event::FilmsListed { films, watched_only }) => {
            Ok(TransitionResult::new(state.clone()).with_reply(film_list(&films, watched_only)))
        }

        (Step::Idle, Event::FilmLoaded { film_id, record }) => {
            let reply = match record {
                Some(film) if owned(state, &film) => film_reply(&film),
                Some(_) => mutation_notice(Mutation::NotOwner, film_id, ""),
                None => mutation_notice(Mutation::NotFound, film_id, ""),
            };
            Ok(TransitionResult::new(state.clone()).with_reply(reply))
        }

        (Step::Idle, Event::RandomPicked { record }) => Ok(TransitionResult::new(state.clone()).with_reply(
            match record {
                Some(film) => {
                    let mut reply = film_reply(&film);
                    reply.text = format!("🎲 Tonight's pick:\n{}", reply.text);
                    reply
                }
                None => Reply::new("Your collection is empty. Add a film first.").with_main_menu(),
            },
        )),

        (Step::Idle, Event::WatchedMarked { film_id, outcome }) => Ok(TransitionResult::new(state.clone())
            .with_reply(mutation_notice(outcome, film_id, "Marked as watched."))),

        (Step::AwaitingRatingInput { film_id: pending }, Event::RatingSaved { film_id, rating, outcome })
            if *pending == film_id =>
        {
            Ok(TransitionResult::new(state.to_idle())
                .with_reply(mutation_notice(outcome, film_id, &format!("Rating saved: {rating}/10."))))
        }

        (Step::AwaitingCommentInput { film_id: pending }, Event::CommentSaved { film_id, outcome })
            if *pending == film_id =>
        {
            Ok(TransitionResult::new(state.to_idle()).with_reply(mutation_notice(outcome, film_id, "Comment saved.")))
        }

        (Step::Idle, Event::FilmDeleted { film_id, outcome }) => Ok(TransitionResult::new(state.clone())
            .with_reply(mutation_notice(outcome, film_id, "Film deleted."))),

        (step, event) => Err(TransitionError::InvalidTransition(format!(
            "{} while {}",
            event.name(),
            step.name()
        ))),
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Parse a user-typed rating; `None` unless it is an integer in range
pub fn parse_rating(text: &str) -> Option<u8> {
    text.trim().parse::<u8>().ok().filter(|r| RATING_RANGE.contains(r))
}

fn owned(state: &ConvState, film: &FilmRecord) -> bool {
    state.profile.as_deref().is_some_and(|p| film.is_owned_by(p))
}

fn needs_profile(ctx: &ConvContext) -> TransitionResult {
    TransitionResult::new(ConvState {
        profile: None,
        step: Step::ChoosingProfile,
    })
    .with_reply(profile_prompt(ctx, "Choose a profile first."))
}

fn profile_prompt(ctx: &ConvContext, text: &str) -> Reply {
    ctx.profiles.iter().fold(Reply::new(text), |reply, name| {
        reply.with_option(name.clone(), Action::ChooseProfile { name: name.clone() })
    })
}

fn guidance(state: &ConvState, ctx: &ConvContext) -> Reply {
    match (&state.step, require_profile(state)) {
        (_, ProfileGuard::NeedsProfileSelection) => profile_prompt(ctx, "Choose a profile to begin."),
        (Step::ChoosingCandidate { candidates, .. }, _) => {
            candidate_list("Pick a film from the list, or cancel.".to_string(), candidates)
        }
        (Step::Idle, _) => Reply::new("Use the menu below.").with_main_menu(),
        _ => Reply::new("Finish the current step, or cancel.").with_nav(Nav::Cancel),
    }
}

fn candidate_list(text: String, candidates: &[CatalogCandidate]) -> Reply {
    candidates
        .iter()
        .fold(Reply::new(text), |reply, c| {
            reply.with_option(
                c.label(),
                Action::SelectCandidate {
                    external_id: c.external_id.clone(),
                },
            )
        })
        .with_nav(Nav::Cancel)
}

fn confirm_card(candidate: &CatalogCandidate, fetched: bool) -> Reply {
    let mut text = candidate_card(candidate);
    if !fetched {
        text.push_str("\n\nFull details are unavailable right now.");
    }
    Reply::new(text)
        .with_option(
            "✅ Add to my list",
            Action::ConfirmCandidate {
                external_id: candidate.external_id.clone(),
            },
        )
        .with_nav(Nav::Back)
        .with_nav(Nav::Cancel)
}

fn film_label(film: &FilmRecord) -> String {
    let year = film.year.map_or_else(|| "—".to_string(), |y| y.to_string());
    let mark = if film.watched { " ✔" } else { "" };
    format!("{} ({year}){mark}", film.title)
}

fn film_list(films: &[FilmRecord], watched_only: bool) -> Reply {
    if films.is_empty() {
        let text = if watched_only {
            "You have not watched anything yet."
        } else {
            "Your list is empty."
        };
        return Reply::new(text).with_main_menu();
    }

    let header = if watched_only { "🎞 Watched:" } else { "📋 Your films:" };
    let lines: Vec<String> = films
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{}. {}", i + 1, film_label(f)))
        .collect();
    films.iter().fold(
        Reply::new(format!("{header}\n{}", lines.join("\n"))),
        |reply, f| reply.with_option(film_label(f), Action::ShowFilm { film_id: f.id }),
    )
}

fn mutation_notice(outcome: Mutation, film_id: FilmId, applied: &str) -> Reply {
    let text = match outcome {
        Mutation::Applied => applied.to_string(),
        Mutation::NotFound => format!("Film #{film_id} was not found."),
        Mutation::NotOwner => "This film belongs to another profile.".to_string(),
    };
    Reply::new(text).with_main_menu()
}
