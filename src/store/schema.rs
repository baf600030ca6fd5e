//! Database schema and types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS films (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    year INTEGER,
    genre TEXT,
    description TEXT,
    trailer_url TEXT,
    poster_url TEXT,
    watch_url TEXT,
    director TEXT,
    actors TEXT,
    country TEXT,
    external_rating REAL,
    watched BOOLEAN NOT NULL DEFAULT 0,
    profile TEXT NOT NULL,
    user_rating INTEGER CHECK (user_rating BETWEEN 1 AND 10),
    user_comment TEXT,
    added_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_films_profile ON films(profile, watched);
";

/// Column list shared by every film query, in `parse_film_row` order
pub(super) const FILM_COLUMNS: &str = "id, title, year, genre, description, trailer_url, \
     poster_url, watch_url, director, actors, country, external_rating, watched, profile, \
     user_rating, user_comment, added_at";

/// Accepted user ratings
pub const RATING_RANGE: RangeInclusive<u8> = 1..=10;

/// Longest accepted user comment, in characters
pub const MAX_COMMENT_CHARS: usize = 500;

pub type FilmId = i64;

/// Persisted film entry, owned by exactly one profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmRecord {
    pub id: FilmId,
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
    pub watched: bool,
    pub profile: String,
    pub user_rating: Option<u8>,
    pub user_comment: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl FilmRecord {
    pub fn is_owned_by(&self, profile: &str) -> bool {
        self.profile == profile
    }
}

/// Outcome of an owner-scoped update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    Applied,
    NotFound,
    /// Record exists but belongs to another profile; nothing was written
    NotOwner,
}
