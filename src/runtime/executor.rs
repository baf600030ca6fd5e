//! Conversation runtime executor

use super::SessionError;
use crate::catalog::CatalogClient;
use crate::conversation::{transition, Action, ConvContext, ConvState, Effect, Event, Reply};
use crate::store::{FilmId, FilmStore, Mutation, StoreResult};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// One user action plus the channel its replies go back on
pub struct Inbound {
    pub action: Action,
    pub respond_to: oneshot::Sender<Result<Vec<Reply>, SessionError>>,
}

/// Owns one session's state and executes the effects its transitions produce
pub struct ConversationRuntime {
    context: ConvContext,
    state: ConvState,
    store: FilmStore,
    catalog: CatalogClient,
    inbox: mpsc::Receiver<Inbound>,
    idle_timeout: Duration,
}

impl ConversationRuntime {
    pub fn new(
        context: ConvContext,
        store: FilmStore,
        catalog: CatalogClient,
        inbox: mpsc::Receiver<Inbound>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            context,
            state: ConvState::default(),
            store,
            catalog,
            inbox,
            idle_timeout,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.context.session_id, "Starting session runtime");

        let mut expiring = false;
        loop {
            let next = if expiring {
                self.inbox.recv().await
            } else {
                match tokio::time::timeout(self.idle_timeout, self.inbox.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        tracing::info!(
                            session_id = %self.context.session_id,
                            idle_secs = self.idle_timeout.as_secs(),
                            "Session idle, expiring"
                        );
                        // Refuse new sends but still answer anything already queued
                        self.inbox.close();
                        expiring = true;
                        continue;
                    }
                }
            };
            let Some(Inbound { action, respond_to }) = next else {
                break;
            };

            let result = self.handle(action).await;
            if respond_to.send(result).is_err() {
                tracing::debug!(session_id = %self.context.session_id, "Caller went away before replies were ready");
            }
        }

        tracing::info!(session_id = %self.context.session_id, "Session runtime stopped");
    }

    /// Run one user action to completion and collect the replies.
    ///
    /// A store failure rolls the state back to what it was before the
    /// action, so nothing advances on a write that did not happen.
    pub async fn handle(&mut self, action: Action) -> Result<Vec<Reply>, SessionError> {
        let checkpoint = self.state.clone();
        let mut replies = Vec::new();

        match self.process(Event::User(action), &mut replies).await {
            Ok(()) => Ok(replies),
            Err(e) => {
                tracing::error!(
                    session_id = %self.context.session_id,
                    step = self.state.step.name(),
                    error = %e,
                    "Store failure, state not advanced"
                );
                self.state = checkpoint;
                Err(e.into())
            }
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn state(&self) -> &ConvState {
        &self.state
    }

    async fn process(&mut self, event: Event, replies: &mut Vec<Reply>) -> StoreResult<()> {
        // Effects can produce result events; process them in order, no recursion
        let mut events = VecDeque::from([event]);

        while let Some(current) = events.pop_front() {
            let event_name = current.name();
            let result = match transition(&self.state, &self.context, current) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(
                        session_id = %self.context.session_id,
                        step = self.state.step.name(),
                        event = event_name,
                        error = %e,
                        "Rejected transition"
                    );
                    replies.push(Reply::new("Something went wrong. Please try again.").with_main_menu());
                    continue;
                }
            };

            if result.new_state.step != self.state.step {
                tracing::debug!(
                    session_id = %self.context.session_id,
                    from = self.state.step.name(),
                    to = result.new_state.step.name(),
                    event = event_name,
                    "Step changed"
                );
            }
            self.state = result.new_state;

            for effect in result.effects {
                if let Some(next) = self.execute_effect(effect, replies).await? {
                    events.push_back(next);
                }
            }
        }

        Ok(())
    }

    async fn execute_effect(&self, effect: Effect, replies: &mut Vec<Reply>) -> StoreResult<Option<Event>> {
        match effect {
            Effect::Reply(reply) => {
                replies.push(reply);
                Ok(None)
            }

            Effect::SearchCatalog { query, limit } => {
                let outcome = self.catalog.search(&query, limit).await;
                Ok(Some(Event::SearchCompleted { query, outcome }))
            }

            Effect::FetchDetails { external_id } => {
                let details = self.catalog.fetch_details(&external_id).await;
                Ok(Some(Event::DetailsFetched { external_id, details }))
            }

            Effect::CreateFilm { candidate, profile } => {
                let record = self.store.create(&candidate, &profile)?;
                Ok(Some(Event::FilmCreated { record }))
            }

            Effect::ListFilms { profile, watched_only } => {
                let films = if watched_only {
                    self.store.list_watched(&profile)?
                } else {
                    self.store.list_all(&profile)?
                };
                Ok(Some(Event::FilmsListed { films, watched_only }))
            }

            Effect::LoadFilm { film_id } => {
                let record = self.store.get_by_id(film_id)?;
                Ok(Some(Event::FilmLoaded { film_id, record }))
            }

            Effect::PickRandom { profile } => {
                let record = self.store.pick_random(&profile)?;
                Ok(Some(Event::RandomPicked { record }))
            }

            Effect::MarkWatched { film_id, profile } => {
                let outcome = self.owner_checked(film_id, &profile, |store| store.mark_watched(film_id))?;
                Ok(Some(Event::WatchedMarked { film_id, outcome }))
            }

            Effect::SetRating {
                film_id,
                profile,
                rating,
            } => {
                let outcome = self.store.set_user_rating(film_id, &profile, rating)?;
                Ok(Some(Event::RatingSaved {
                    film_id,
                    rating,
                    outcome,
                }))
            }

            Effect::SetComment {
                film_id,
                profile,
                comment,
            } => {
                let outcome = self.store.set_user_comment(film_id, &profile, &comment)?;
                Ok(Some(Event::CommentSaved { film_id, outcome }))
            }

            Effect::DeleteFilm { film_id, profile } => {
                let outcome = self.owner_checked(film_id, &profile, |store| store.delete(film_id))?;
                Ok(Some(Event::FilmDeleted { film_id, outcome }))
            }
        }
    }

    /// Apply an owner-agnostic store write only when `profile` owns the film
    fn owner_checked(
        &self,
        film_id: FilmId,
        profile: &str,
        write: impl FnOnce(&FilmStore) -> StoreResult<()>,
    ) -> StoreResult<Mutation> {
        match self.store.owner_of(film_id)? {
            None => Ok(Mutation::NotFound),
            Some(owner) if owner != profile => {
                tracing::warn!(
                    session_id = %self.context.session_id,
                    film_id,
                    profile,
                    "Refused write to another profile's film"
                );
                Ok(Mutation::NotOwner)
            }
            Some(_) => {
                write(&self.store)?;
                Ok(Mutation::Applied)
            }
        }
    }
}
