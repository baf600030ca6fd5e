//! Kinopoisk (api.kinopoisk.dev v1.4) catalog implementation

use super::{CatalogCandidate, CatalogError, CatalogService};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.kinopoisk.dev";

/// Credited roles are localized upstream; both spellings are accepted.
const DIRECTOR_ROLES: [&str; 2] = ["director", "режиссеры"];
const ACTOR_ROLES: [&str; 2] = ["actor", "актеры"];
const MAX_ACTORS: usize = 5;
const LIST_SEPARATOR: &str = ", ";

/// Kinopoisk service implementation
pub struct KinopoiskService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl KinopoiskService {
    pub fn new(
        api_key: Option<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<(StatusCode, String), CatalogError> {
        let mut request = self
            .client
            .get(format!("{}{path}", self.base_url))
            .header("accept", "application/json")
            .query(query);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-KEY", key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CatalogError::timeout(format!("Request timeout: {e}"))
            } else if e.is_connect() {
                CatalogError::network(format!("Connection failed: {e}"))
            } else {
                CatalogError::network(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                CatalogError::timeout(format!("Timed out reading response: {e}"))
            } else {
                CatalogError::network(format!("Failed to read response: {e}"))
            }
        })?;

        Ok((status, body))
    }
}

#[async_trait]
impl CatalogService for KinopoiskService {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<CatalogCandidate>, CatalogError> {
        let (status, body) = self
            .get(
                "/v1.4/movie/search",
                &[("query", query.to_string()), ("limit", limit.to_string())],
            )
            .await?;

        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        let parsed: KpSearchResponse = serde_json::from_str(&body)
            .map_err(|e| CatalogError::decode(format!("Failed to parse search response: {e}")))?;

        Ok(parsed
            .docs
            .unwrap_or_default()
            .into_iter()
            .filter_map(normalize_movie)
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect())
    }

    async fn details(&self, external_id: &str) -> Result<Option<CatalogCandidate>, CatalogError> {
        let (status, body) = self.get(&format!("/v1.4/movie/{external_id}"), &[]).await?;

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        let movie: KpMovie = serde_json::from_str(&body)
            .map_err(|e| CatalogError::decode(format!("Failed to parse movie response: {e}")))?;

        Ok(normalize_movie(movie))
    }
}

fn classify_error(status: StatusCode, body: &str) -> CatalogError {
    // Upstream error bodies look like {"statusCode":401,"message":"...","error":"Unauthorized"}
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.chars().take(200).collect());

    match status.as_u16() {
        401 | 403 => CatalogError::status(status.as_u16(), format!("Authentication failed: {message}")),
        429 => CatalogError::status(429, format!("Rate limited: {message}")),
        code @ 500..=599 => CatalogError::status(code, format!("Server error: {message}")),
        code => CatalogError::status(code, format!("HTTP {status}: {message}")),
    }
}

/// Translate one upstream movie into a candidate.
///
/// Returns `None` for docs without an id or any usable title.
fn normalize_movie(movie: KpMovie) -> Option<CatalogCandidate> {
    let external_id = movie.id?.to_string();
    let title = non_blank(movie.name).or_else(|| non_blank(movie.alternative_name))?;

    let persons = movie.persons.unwrap_or_default();
    let director = join_non_empty(
        persons
            .iter()
            .filter(|p| p.has_role(&DIRECTOR_ROLES))
            .filter_map(KpPerson::display_name),
    );
    let actors = join_non_empty(
        persons
            .iter()
            .filter(|p| p.has_role(&ACTOR_ROLES))
            .filter_map(KpPerson::display_name)
            .take(MAX_ACTORS),
    );

    let external_rating = movie
        .rating
        .and_then(|r| positive(r.kp).or_else(|| positive(r.imdb)));

    Some(CatalogCandidate {
        external_id,
        title,
        year: movie.year,
        genre: join_non_empty(named(movie.genres)),
        description: non_blank(movie.description).or_else(|| non_blank(movie.short_description)),
        trailer_url: movie
            .videos
            .and_then(|v| v.trailers)
            .and_then(|t| t.into_iter().find_map(|video| non_blank(video.url))),
        poster_url: movie.poster.and_then(|p| non_blank(p.url)),
        watch_url: movie
            .watchability
            .and_then(|w| w.items)
            .and_then(|items| items.into_iter().find_map(|item| non_blank(item.url))),
        director,
        actors,
        country: join_non_empty(named(movie.countries)),
        external_rating,
    })
}

fn named(list: Option<Vec<KpNamed>>) -> impl Iterator<Item = String> {
    list.unwrap_or_default()
        .into_iter()
        .filter_map(|n| non_blank(n.name))
}

fn join_non_empty(items: impl Iterator<Item = String>) -> Option<String> {
    let items: Vec<String> = items.collect();
    if items.is_empty() {
        None
    } else {
        Some(items.join(LIST_SEPARATOR))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

// Kinopoisk reports 0 for "no rating yet"
fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

// Kinopoisk API types. Every field is optional: upstream sends `null` freely.

#[derive(Debug, Deserialize)]
struct KpSearchResponse {
    docs: Option<Vec<KpMovie>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KpMovie {
    id: Option<i64>,
    name: Option<String>,
    alternative_name: Option<String>,
    year: Option<i32>,
    description: Option<String>,
    short_description: Option<String>,
    genres: Option<Vec<KpNamed>>,
    countries: Option<Vec<KpNamed>>,
    poster: Option<KpPoster>,
    videos: Option<KpVideos>,
    watchability: Option<KpWatchability>,
    rating: Option<KpRating>,
    persons: Option<Vec<KpPerson>>,
}

#[derive(Debug, Deserialize)]
struct KpNamed {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KpPoster {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KpVideos {
    trailers: Option<Vec<KpLink>>,
}

#[derive(Debug, Deserialize)]
struct KpWatchability {
    items: Option<Vec<KpLink>>,
}

#[derive(Debug, Deserialize)]
struct KpLink {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KpRating {
    kp: Option<f64>,
    imdb: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KpPerson {
    name: Option<String>,
    en_name: Option<String>,
    profession: Option<String>,
    en_profession: Option<String>,
}

impl KpPerson {
    fn has_role(&self, roles: &[&str]) -> bool {
        [&self.en_profession, &self.profession]
            .into_iter()
            .flatten()
            .any(|p| roles.iter().any(|r| p.eq_ignore_ascii_case(r)))
    }

    fn display_name(&self) -> Option<String> {
        non_blank(self.name.clone()).or_else(|| non_blank(self.en_name.clone()))
    }
}
