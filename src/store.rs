//! Film store
//!
//! Persists film records per profile in `SQLite`.

mod schema;

pub use schema::*;

use crate::catalog::CatalogCandidate;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Database connection lock poisoned")]
    LockPoisoned,
    #[error("Invalid value: {0}")]
    Invalid(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Thread-safe film store handle.
///
/// All statements run under one connection mutex, so concurrent writes to
/// the same record are serialized and the last commit wins.
#[derive(Clone)]
pub struct FilmStore {
    conn: Arc<Mutex<Connection>>,
}

impl FilmStore {
    /// Open or create the store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// Open an in-memory store (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    // ==================== Reads ====================

    /// Get a film by id
    pub fn get_by_id(&self, id: FilmId) -> StoreResult<Option<FilmRecord>> {
        let conn = self.conn()?;
        query_film(&conn, id)
    }

    /// Every film of a profile, in insertion order
    pub fn list_all(&self, profile: &str) -> StoreResult<Vec<FilmRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {FILM_COLUMNS} FROM films WHERE profile = ?1 ORDER BY id ASC"
        ))?;

        let rows = stmt.query_map(params![profile], parse_film_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// Watched films of a profile, in insertion order
    pub fn list_watched(&self, profile: &str) -> StoreResult<Vec<FilmRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {FILM_COLUMNS} FROM films WHERE profile = ?1 AND watched = 1 ORDER BY id ASC"
        ))?;

        let rows = stmt.query_map(params![profile], parse_film_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// Uniformly pick one film of a profile
    pub fn pick_random(&self, profile: &str) -> StoreResult<Option<FilmRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id FROM films WHERE profile = ?1")?;
        let ids: Vec<FilmId> = stmt
            .query_map(params![profile], |row| row.get(0))?
            .collect::<Result<_, _>>()?;

        match ids.choose(&mut rand::thread_rng()) {
            Some(id) => query_film(&conn, *id),
            None => Ok(None),
        }
    }

    /// Number of films in a profile's collection
    #[allow(dead_code)] // Used in tests
    pub fn count(&self, profile: &str) -> StoreResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM films WHERE profile = ?1",
            params![profile],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Owning profile of a film, if it exists
    pub fn owner_of(&self, id: FilmId) -> StoreResult<Option<String>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT profile FROM films WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()
        .map_err(StoreError::from)
    }

    // ==================== Writes ====================

    /// Persist a catalog candidate into `profile`'s collection
    pub fn create(&self, candidate: &CatalogCandidate, profile: &str) -> StoreResult<FilmRecord> {
        if candidate.title.trim().is_empty() {
            return Err(StoreError::Invalid("film title is required".to_string()));
        }
        if profile.is_empty() {
            return Err(StoreError::Invalid("owning profile is required".to_string()));
        }

        let conn = self.conn()?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO films (title, year, genre, description, trailer_url, poster_url, watch_url,
                                director, actors, country, external_rating, watched, profile, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 0, ?12, ?13)",
            params![
                candidate.title,
                candidate.year,
                candidate.genre,
                candidate.description,
                candidate.trailer_url,
                candidate.poster_url,
                candidate.watch_url,
                candidate.director,
                candidate.actors,
                candidate.country,
                candidate.external_rating,
                profile,
                now.to_rfc3339(),
            ],
        )?;
        let id = conn.last_insert_rowid();

        tracing::info!(film_id = id, profile, title = %candidate.title, "Film added");

        Ok(FilmRecord {
            id,
            title: candidate.title.clone(),
            year: candidate.year,
            genre: candidate.genre.clone(),
            description: candidate.description.clone(),
            trailer_url: candidate.trailer_url.clone(),
            poster_url: candidate.poster_url.clone(),
            watch_url: candidate.watch_url.clone(),
            director: candidate.director.clone(),
            actors: candidate.actors.clone(),
            country: candidate.country.clone(),
            external_rating: candidate.external_rating,
            watched: false,
            profile: profile.to_string(),
            user_rating: None,
            user_comment: None,
            added_at: now,
        })
    }

    /// Set watched = true. Unknown ids are ignored.
    pub fn mark_watched(&self, id: FilmId) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute("UPDATE films SET watched = 1 WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Set the user rating if `profile` owns the film
    pub fn set_user_rating(&self, id: FilmId, profile: &str, rating: u8) -> StoreResult<Mutation> {
        if !RATING_RANGE.contains(&rating) {
            return Err(StoreError::Invalid(format!(
                "rating {rating} outside {}..={}",
                RATING_RANGE.start(),
                RATING_RANGE.end()
            )));
        }

        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE films SET user_rating = ?1 WHERE id = ?2 AND profile = ?3",
            params![rating, id, profile],
        )?;
        owner_scoped_outcome(&conn, id, profile, updated)
    }

    /// Set the user comment if `profile` owns the film
    pub fn set_user_comment(&self, id: FilmId, profile: &str, comment: &str) -> StoreResult<Mutation> {
        let chars = comment.chars().count();
        if chars > MAX_COMMENT_CHARS {
            return Err(StoreError::Invalid(format!(
                "comment is {chars} characters, limit is {MAX_COMMENT_CHARS}"
            )));
        }

        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE films SET user_comment = ?1 WHERE id = ?2 AND profile = ?3",
            params![comment, id, profile],
        )?;
        owner_scoped_outcome(&conn, id, profile, updated)
    }

    /// Remove a film. Unknown ids are ignored.
    pub fn delete(&self, id: FilmId) -> StoreResult<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM films WHERE id = ?1", params![id])?;
        if deleted > 0 {
            tracing::info!(film_id = id, "Film deleted");
        }
        Ok(())
    }
}

fn query_film(conn: &Connection, id: FilmId) -> StoreResult<Option<FilmRecord>> {
    conn.query_row(
        &format!("SELECT {FILM_COLUMNS} FROM films WHERE id = ?1"),
        params![id],
        parse_film_row,
    )
    .optional()
    .map_err(StoreError::from)
}

/// Turn an owner-filtered UPDATE count into a [`Mutation`]
fn owner_scoped_outcome(
    conn: &Connection,
    id: FilmId,
    profile: &str,
    updated: usize,
) -> StoreResult<Mutation> {
    if updated > 0 {
        return Ok(Mutation::Applied);
    }

    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM films WHERE id = ?1)",
        params![id],
        |row| row.get(0),
    )?;

    if exists {
        tracing::warn!(film_id = id, profile, "Ignoring update of film owned by another profile");
        Ok(Mutation::NotOwner)
    } else {
        Ok(Mutation::NotFound)
    }
}

/// Parse a film row selected with [`FILM_COLUMNS`]
fn parse_film_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FilmRecord> {
    Ok(FilmRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        year: row.get(2)?,
        genre: row.get(3)?,
        description: row.get(4)?,
        trailer_url: row.get(5)?,
        poster_url: row.get(6)?,
        watch_url: row.get(7)?,
        director: row.get(8)?,
        actors: row.get(9)?,
        country: row.get(10)?,
        external_rating: row.get(11)?,
        watched: row.get(12)?,
        profile: row.get(13)?,
        user_rating: row.get(14)?,
        user_comment: row.get(15)?,
        added_at: parse_datetime(&row.get::<_, String>(16)?),
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
