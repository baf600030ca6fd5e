//! Runtime for executing conversations
//!
//! One task per session owns that session's state and handles its actions
//! one at a time, in arrival order. Different sessions run concurrently.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::{ConversationRuntime, Inbound};

use crate::catalog::CatalogClient;
use crate::conversation::{Action, ConvContext, Reply};
use crate::store::{FilmStore, StoreError};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, RwLock};

/// Inbox depth per session; senders wait when a session falls behind
const INBOX_CAPACITY: usize = 32;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Session {0} is not running")]
    Closed(String),
}

/// Settings shared by every session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub profiles: Vec<String>,
    pub search_limit: u32,
    /// A session with no actions for this long stops and forgets its state
    pub idle_timeout: Duration,
}

/// Manager for all session runtimes
pub struct SessionManager {
    store: FilmStore,
    catalog: CatalogClient,
    settings: SessionSettings,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub inbox: mpsc::Sender<Inbound>,
}

impl SessionManager {
    pub fn new(store: FilmStore, catalog: CatalogClient, settings: SessionSettings) -> Self {
        Self {
            store,
            catalog,
            settings,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create the runtime for a session
    pub async fn get_or_create(&self, session_id: &str) -> SessionHandle {
        // Check if already running
        {
            let sessions = self.sessions.read().await;
            if let Some(handle) = sessions.get(session_id) {
                if !handle.inbox.is_closed() {
                    return handle.clone();
                }
            }
        }

        let mut sessions = self.sessions.write().await;
        // Another caller may have started it while we waited for the lock
        if let Some(handle) = sessions.get(session_id) {
            if !handle.inbox.is_closed() {
                return handle.clone();
            }
            tracing::debug!(session_id, "Session expired, starting fresh");
        }

        let before = sessions.len();
        sessions.retain(|_, h| !h.inbox.is_closed());
        if sessions.len() < before {
            tracing::debug!(pruned = before - sessions.len(), "Dropped expired sessions");
        }

        let context = ConvContext::new(
            session_id,
            self.settings.profiles.clone(),
            self.settings.search_limit,
        );
        let (inbox_tx, inbox_rx) = mpsc::channel(INBOX_CAPACITY);
        let runtime = ConversationRuntime::new(
            context,
            self.store.clone(),
            self.catalog.clone(),
            inbox_rx,
            self.settings.idle_timeout,
        );

        let id = session_id.to_string();
        tokio::spawn(async move {
            runtime.run().await;
            tracing::info!(session_id = %id, "Session runtime finished");
        });

        let handle = SessionHandle { inbox: inbox_tx };
        sessions.insert(session_id.to_string(), handle.clone());
        handle
    }

    /// Deliver one user action and wait for the session's replies
    pub async fn dispatch(&self, session_id: &str, action: Action) -> Result<Vec<Reply>, SessionError> {
        let (respond_to, response) = oneshot::channel();
        let inbound = Inbound { action, respond_to };

        let handle = self.get_or_create(session_id).await;
        if let Err(mpsc::error::SendError(inbound)) = handle.inbox.send(inbound).await {
            // Expired between lookup and send; the next lookup starts a fresh runtime
            let handle = self.get_or_create(session_id).await;
            handle.inbox.send(inbound).await.map_err(|_| closed(session_id))?;
        }
        match response.await {
            Ok(result) => result,
            Err(_) => Err(closed(session_id)),
        }
    }

    /// Number of sessions with a live runtime
    #[allow(dead_code)] // Used in tests
    pub async fn active_sessions(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|h| !h.inbox.is_closed())
            .count()
    }

    pub fn store(&self) -> &FilmStore {
        &self.store
    }

    pub fn profiles(&self) -> &[String] {
        &self.settings.profiles
    }
}

fn closed(session_id: &str) -> SessionError {
    tracing::error!(session_id, "Session runtime stopped before replying");
    SessionError::Closed(session_id.to_string())
}
