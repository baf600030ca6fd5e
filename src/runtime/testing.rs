//! Session harness for testing
//!
//! Runs real session runtimes against an in-memory store and a mock
//! catalog, without network I/O.

use super::{SessionManager, SessionSettings};
use crate::catalog::testing::MockCatalog;
use crate::catalog::{CatalogCandidate, CatalogClient, CatalogService};
use crate::conversation::{Action, Reply};
use crate::store::FilmStore;
use std::sync::Arc;
use std::time::Duration;

/// A session manager wired to test doubles
pub struct TestHarness {
    pub manager: SessionManager,
    pub catalog: Arc<MockCatalog>,
    pub store: FilmStore,
}

#[allow(dead_code)]
impl TestHarness {
    pub fn new(catalog: MockCatalog) -> Self {
        Self::with_idle_timeout(catalog, Duration::from_secs(60))
    }

    pub fn with_idle_timeout(catalog: MockCatalog, idle_timeout: Duration) -> Self {
        let catalog = Arc::new(catalog);
        let store = FilmStore::open_in_memory().expect("in-memory store");
        let client = CatalogClient::new(
            Arc::clone(&catalog) as Arc<dyn CatalogService>,
            Duration::from_secs(2),
        );
        let manager = SessionManager::new(
            store.clone(),
            client,
            SessionSettings {
                profiles: vec!["alice".to_string(), "bob".to_string()],
                search_limit: 5,
                idle_timeout,
            },
        );
        Self {
            manager,
            catalog,
            store,
        }
    }

    /// Send an action, panicking on session errors
    pub async fn send(&self, session: &str, action: Action) -> Vec<Reply> {
        self.manager
            .dispatch(session, action)
            .await
            .unwrap_or_else(|e| panic!("dispatch failed: {e}"))
    }

    pub async fn text(&self, session: &str, text: &str) -> Vec<Reply> {
        self.send(session, Action::text(text)).await
    }

    /// Start a session and choose `profile`
    pub async fn login(&self, session: &str, profile: &str) {
        self.send(session, Action::Start).await;
        self.send(
            session,
            Action::ChooseProfile {
                name: profile.to_string(),
            },
        )
        .await;
    }
}

/// The standard catalog entry for flow tests
pub fn inception() -> CatalogCandidate {
    let mut c = CatalogCandidate::new("447301", "Inception");
    c.year = Some(2010);
    c.genre = Some("sci-fi, thriller".to_string());
    c.director = Some("Christopher Nolan".to_string());
    c.external_rating = Some(8.7);
    c
}

/// All option actions across a batch of replies
pub fn offered(replies: &[Reply]) -> Vec<Action> {
    replies
        .iter()
        .flat_map(|r| r.options.iter().map(|o| o.action.clone()))
        .collect()
}

pub fn last_text(replies: &[Reply]) -> &str {
    replies.last().map_or("", |r| r.text.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogError;
    use crate::conversation::Nav;
    use crate::runtime::Inbound;
    use crate::store::Mutation;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_add_film_end_to_end() {
        let h = TestHarness::new(MockCatalog::new().with_film(inception()));
        h.login("s1", "alice").await;

        let replies = h.send("s1", Action::AddFilm).await;
        assert_eq!(replies[0].nav, vec![Nav::Cancel]);

        let replies = h.text("s1", "Inception").await;
        let select = Action::SelectCandidate {
            external_id: "447301".to_string(),
        };
        assert!(offered(&replies).contains(&select));
        assert_eq!(h.catalog.recorded_searches(), vec![("Inception".to_string(), 5)]);

        let replies = h.send("s1", select).await;
        assert!(last_text(&replies).contains("Christopher Nolan"));
        let confirm = Action::ConfirmCandidate {
            external_id: "447301".to_string(),
        };
        assert!(offered(&replies).contains(&confirm));

        let replies = h.send("s1", confirm.clone()).await;
        assert!(last_text(&replies).contains("added"));

        let films = h.store.list_all("alice").unwrap();
        assert_eq!(films.len(), 1);
        assert_eq!(films[0].title, "Inception");
        assert_eq!(films[0].year, Some(2010));
        assert_eq!(films[0].director.as_deref(), Some("Christopher Nolan"));
        assert!(!films[0].watched);

        // A repeated tap on the old confirm button creates nothing
        let replies = h.send("s1", confirm).await;
        assert!(last_text(&replies).contains("no longer available"));
        assert_eq!(h.store.count("alice").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_details_failure_falls_back_to_summary() {
        let h = TestHarness::new(MockCatalog::new().with_film(inception()));
        h.login("s1", "alice").await;
        h.send("s1", Action::AddFilm).await;
        h.text("s1", "incep").await;

        h.catalog.fail_details(CatalogError::timeout("slow"));
        let replies = h
            .send(
                "s1",
                Action::SelectCandidate {
                    external_id: "447301".to_string(),
                },
            )
            .await;
        assert!(last_text(&replies).contains("unavailable"));
        assert!(!last_text(&replies).contains("Nolan"));

        h.send(
            "s1",
            Action::ConfirmCandidate {
                external_id: "447301".to_string(),
            },
        )
        .await;
        let films = h.store.list_all("alice").unwrap();
        assert_eq!(films.len(), 1);
        assert_eq!(films[0].director, None);
    }

    #[tokio::test]
    async fn test_cancel_from_candidates_discards_search() {
        let h = TestHarness::new(MockCatalog::new().with_film(inception()));
        h.login("s1", "alice").await;
        h.send("s1", Action::AddFilm).await;
        h.text("s1", "Inception").await;

        let replies = h.send("s1", Action::Cancel).await;
        assert_eq!(last_text(&replies), "Cancelled.");
        assert!(offered(&replies).contains(&Action::AddFilm));

        // Back at idle: free text is not a search and nothing was stored
        h.text("s1", "Inception").await;
        assert_eq!(h.catalog.recorded_searches().len(), 1);
        assert_eq!(h.store.count("alice").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stale_confirmation() {
        let mut other = CatalogCandidate::new("1", "Inception: The Cobol Job");
        other.year = Some(2010);
        let h = TestHarness::new(MockCatalog::new().with_film(inception()).with_film(other));
        h.login("s1", "alice").await;
        h.send("s1", Action::AddFilm).await;
        h.text("s1", "inception").await;
        h.send(
            "s1",
            Action::SelectCandidate {
                external_id: "447301".to_string(),
            },
        )
        .await;

        let replies = h
            .send(
                "s1",
                Action::ConfirmCandidate {
                    external_id: "1".to_string(),
                },
            )
            .await;
        assert!(last_text(&replies).contains("out of date"));
        assert_eq!(h.store.count("alice").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_catalog_outage_is_not_not_found() {
        let h = TestHarness::new(MockCatalog::new().with_film(inception()));
        h.login("s1", "alice").await;
        h.send("s1", Action::AddFilm).await;

        h.catalog.fail_search(CatalogError::status(503, "maintenance"));
        let replies = h.text("s1", "Inception").await;
        assert!(last_text(&replies).contains("try again"));

        // Still waiting for a query, so the retry searches again
        let replies = h.text("s1", "Matrix").await;
        assert!(last_text(&replies).contains("Try another title"));

        let replies = h.text("s1", "Inception").await;
        assert!(offered(&replies).contains(&Action::SelectCandidate {
            external_id: "447301".to_string()
        }));
        assert_eq!(h.catalog.recorded_searches().len(), 3);
    }

    #[tokio::test]
    async fn test_rating_flow() {
        let h = TestHarness::new(MockCatalog::new());
        let film = h.store.create(&inception(), "alice").unwrap();
        h.login("s1", "alice").await;

        for rating in 1..=10u8 {
            h.send("s1", Action::RateFilm { film_id: film.id }).await;
            let replies = h.text("s1", &rating.to_string()).await;
            assert!(last_text(&replies).contains(&format!("{rating}/10")));
            assert_eq!(h.store.get_by_id(film.id).unwrap().unwrap().user_rating, Some(rating));
        }

        h.send("s1", Action::RateFilm { film_id: film.id }).await;
        for bad in ["0", "11", "nine"] {
            let replies = h.text("s1", bad).await;
            assert!(last_text(&replies).contains("from 1 to 10"));
        }
        assert_eq!(h.store.get_by_id(film.id).unwrap().unwrap().user_rating, Some(10));
    }

    #[tokio::test]
    async fn test_comment_flow() {
        let h = TestHarness::new(MockCatalog::new());
        let film = h.store.create(&inception(), "alice").unwrap();
        h.login("s1", "alice").await;

        h.send("s1", Action::CommentFilm { film_id: film.id }).await;
        let replies = h.text("s1", &"x".repeat(501)).await;
        assert!(last_text(&replies).contains("limit"));
        assert_eq!(h.store.get_by_id(film.id).unwrap().unwrap().user_comment, None);

        let replies = h.text("s1", "Dreams within dreams").await;
        assert!(last_text(&replies).contains("Comment saved"));
        assert_eq!(
            h.store.get_by_id(film.id).unwrap().unwrap().user_comment.as_deref(),
            Some("Dreams within dreams")
        );
    }

    #[tokio::test]
    async fn test_cross_profile_writes_are_refused() {
        let h = TestHarness::new(MockCatalog::new());
        let film = h.store.create(&inception(), "bob").unwrap();
        h.login("s1", "alice").await;

        h.send("s1", Action::RateFilm { film_id: film.id }).await;
        let replies = h.text("s1", "3").await;
        assert!(last_text(&replies).contains("another profile"));

        let replies = h.send("s1", Action::MarkWatched { film_id: film.id }).await;
        assert!(last_text(&replies).contains("another profile"));

        let replies = h.send("s1", Action::DeleteFilm { film_id: film.id }).await;
        assert!(last_text(&replies).contains("another profile"));

        let replies = h.send("s1", Action::ShowFilm { film_id: film.id }).await;
        assert!(!last_text(&replies).contains("Inception"));

        let stored = h.store.get_by_id(film.id).unwrap().unwrap();
        assert_eq!(stored.user_rating, None);
        assert!(!stored.watched);
        assert_eq!(
            h.store.set_user_rating(film.id, "alice", 3).unwrap(),
            Mutation::NotOwner
        );
    }

    #[tokio::test]
    async fn test_browse_and_manage() {
        let h = TestHarness::new(MockCatalog::new());
        let film = h.store.create(&inception(), "alice").unwrap();
        h.login("s1", "alice").await;

        let replies = h.send("s1", Action::ListFilms).await;
        assert!(offered(&replies).contains(&Action::ShowFilm { film_id: film.id }));

        let replies = h.send("s1", Action::ListWatched).await;
        assert!(last_text(&replies).contains("not watched anything"));

        let replies = h.send("s1", Action::RandomFilm).await;
        assert!(last_text(&replies).contains("Inception"));

        let replies = h.send("s1", Action::MarkWatched { film_id: film.id }).await;
        assert!(last_text(&replies).contains("Marked as watched"));
        let replies = h.send("s1", Action::ListWatched).await;
        assert!(last_text(&replies).contains("Inception"));

        let replies = h.send("s1", Action::ShowFilm { film_id: film.id }).await;
        assert!(!offered(&replies).contains(&Action::MarkWatched { film_id: film.id }));

        let replies = h.send("s1", Action::DeleteFilm { film_id: film.id }).await;
        assert!(last_text(&replies).contains("deleted"));
        let replies = h.send("s1", Action::RandomFilm).await;
        assert!(last_text(&replies).contains("empty"));
    }

    #[tokio::test]
    async fn test_needs_profile_guard() {
        let h = TestHarness::new(MockCatalog::new().with_film(inception()));
        h.store.create(&inception(), "alice").unwrap();

        let replies = h.send("fresh", Action::ListFilms).await;
        assert!(offered(&replies).contains(&Action::ChooseProfile {
            name: "alice".to_string()
        }));
        assert!(!last_text(&replies).contains("Inception"));

        h.send("fresh", Action::AddFilm).await;
        h.text("fresh", "Inception").await;
        assert!(h.catalog.recorded_searches().is_empty());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let h = TestHarness::new(MockCatalog::new().with_film(inception()));
        h.login("a", "alice").await;
        h.login("b", "bob").await;

        h.send("a", Action::AddFilm).await;
        // Session b is idle; its text must not run a's search
        h.text("b", "Inception").await;
        assert!(h.catalog.recorded_searches().is_empty());

        h.text("a", "Inception").await;
        h.send(
            "a",
            Action::SelectCandidate {
                external_id: "447301".to_string(),
            },
        )
        .await;
        h.send(
            "a",
            Action::ConfirmCandidate {
                external_id: "447301".to_string(),
            },
        )
        .await;

        assert_eq!(h.store.count("alice").unwrap(), 1);
        assert_eq!(h.store.count("bob").unwrap(), 0);
        assert_eq!(h.manager.active_sessions().await, 2);
    }

    #[tokio::test]
    async fn test_switch_profile() {
        let h = TestHarness::new(MockCatalog::new());
        h.store.create(&inception(), "alice").unwrap();
        h.login("s1", "alice").await;

        h.send("s1", Action::SwitchProfile).await;
        let replies = h.text("s1", "Bob").await;
        assert!(last_text(&replies).contains("bob"));

        let replies = h.send("s1", Action::ListFilms).await;
        assert!(last_text(&replies).contains("empty"));
    }

    #[tokio::test]
    async fn test_queued_actions_run_in_arrival_order() {
        let h = TestHarness::new(MockCatalog::new());
        let film = h.store.create(&inception(), "alice").unwrap();
        h.login("s1", "alice").await;

        // Queue everything before reading any reply
        let handle = h.manager.get_or_create("s1").await;
        let mut pending = Vec::new();
        for action in [
            Action::RateFilm { film_id: film.id },
            Action::text("7"),
            Action::CommentFilm { film_id: film.id },
            Action::text("Great heist"),
        ] {
            let (respond_to, response) = oneshot::channel();
            handle.inbox.send(Inbound { action, respond_to }).await.unwrap();
            pending.push(response);
        }

        let mut texts = Vec::new();
        for response in pending {
            let replies = response.await.unwrap().unwrap();
            texts.push(last_text(&replies).to_string());
        }
        assert!(texts[0].contains("Rate the film"));
        assert!(texts[1].contains("Rating saved: 7/10"));
        assert!(texts[3].contains("Comment saved"));

        let record = h.store.get_by_id(film.id).unwrap().unwrap();
        assert_eq!(record.user_rating, Some(7));
        assert_eq!(record.user_comment.as_deref(), Some("Great heist"));
    }

    #[tokio::test]
    async fn test_concurrent_actions_share_one_runtime() {
        let h = Arc::new(TestHarness::new(MockCatalog::new()));
        let film = h.store.create(&inception(), "alice").unwrap();

        let starts: Vec<_> = (0..8)
            .map(|_| {
                let h = Arc::clone(&h);
                tokio::spawn(async move { h.send("race", Action::Start).await })
            })
            .collect();
        for start in starts {
            assert!(!start.await.unwrap().is_empty());
        }
        assert_eq!(h.manager.active_sessions().await, 1);

        h.send(
            "race",
            Action::ChooseProfile {
                name: "alice".to_string(),
            },
        )
        .await;
        let film_id = film.id;
        let views: Vec<_> = (0..8)
            .map(|_| {
                let h = Arc::clone(&h);
                tokio::spawn(async move { h.send("race", Action::ShowFilm { film_id }).await })
            })
            .collect();
        for view in views {
            assert!(last_text(&view.await.unwrap()).contains("Inception"));
        }

        // Still one coherent session afterwards
        h.send("race", Action::RateFilm { film_id: film.id }).await;
        let replies = h.text("race", "9").await;
        assert!(last_text(&replies).contains("9/10"));
        assert_eq!(h.manager.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn test_idle_sessions_are_evicted() {
        let h = TestHarness::with_idle_timeout(MockCatalog::new(), Duration::from_millis(200));
        h.store.create(&inception(), "alice").unwrap();
        h.login("a", "alice").await;
        h.login("b", "bob").await;
        assert_eq!(h.manager.active_sessions().await, 2);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(h.manager.active_sessions().await, 0);

        // Starting another session drops the expired handles
        h.send("c", Action::Start).await;
        assert_eq!(h.manager.sessions.read().await.len(), 1);

        // An expired session comes back fresh, without its profile
        let replies = h.send("a", Action::ListFilms).await;
        assert!(offered(&replies).contains(&Action::ChooseProfile {
            name: "alice".to_string()
        }));
        assert!(!last_text(&replies).contains("Inception"));
        assert_eq!(h.manager.sessions.read().await.len(), 2);
    }
}
