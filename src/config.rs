//! Process configuration from the environment

use crate::catalog::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_PROFILE: &str = "main";
const DEFAULT_SEARCH_LIMIT: u32 = 5;
/// Search result cap accepted from configuration
const MAX_SEARCH_LIMIT: u32 = 20;
const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("FILMOTEKA_PROFILES lists no profile names")]
    NoProfiles,
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub profiles: Vec<String>,
    pub search_limit: u32,
    pub kinopoisk_api_key: Option<String>,
    pub kinopoisk_api_url: String,
    pub catalog_timeout: Duration,
    pub session_idle_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let db_path = var("FILMOTEKA_DB_PATH").map_or_else(
            || {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".filmoteka").join("films.db")
            },
            PathBuf::from,
        );

        let port = match var("FILMOTEKA_PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "FILMOTEKA_PORT",
                expected: "a port number",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let profiles = match var("FILMOTEKA_PROFILES") {
            Some(value) => parse_profiles(&value)?,
            None => vec![DEFAULT_PROFILE.to_string()],
        };

        let search_limit = match var("FILMOTEKA_SEARCH_LIMIT") {
            Some(value) => value
                .parse::<u32>()
                .ok()
                .filter(|n| (1..=MAX_SEARCH_LIMIT).contains(n))
                .ok_or(ConfigError::Invalid {
                    name: "FILMOTEKA_SEARCH_LIMIT",
                    expected: "an integer from 1 to 20",
                    value,
                })?,
            None => DEFAULT_SEARCH_LIMIT,
        };

        let catalog_timeout = match var("CATALOG_TIMEOUT_SECS") {
            Some(value) => {
                let secs: u64 = value.parse().map_err(|_| ConfigError::Invalid {
                    name: "CATALOG_TIMEOUT_SECS",
                    expected: "a whole number of seconds",
                    value,
                })?;
                Duration::from_secs(secs.clamp(1, DEFAULT_TIMEOUT.as_secs()))
            }
            None => DEFAULT_TIMEOUT,
        };

        let session_idle_timeout = match var("FILMOTEKA_SESSION_IDLE_SECS") {
            Some(value) => value
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::Invalid {
                    name: "FILMOTEKA_SESSION_IDLE_SECS",
                    expected: "a positive number of seconds",
                    value,
                })?,
            None => DEFAULT_SESSION_IDLE,
        };

        Ok(Self {
            db_path,
            port,
            profiles,
            search_limit,
            kinopoisk_api_key: var("KINOPOISK_API_KEY"),
            kinopoisk_api_url: var("KINOPOISK_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            catalog_timeout,
            session_idle_timeout,
        })
    }
}

/// Comma-separated names, trimmed, first spelling of each kept
fn parse_profiles(value: &str) -> Result<Vec<String>, ConfigError> {
    let mut profiles: Vec<String> = Vec::new();
    for name in value.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !profiles.iter().any(|p| p.to_lowercase() == name.to_lowercase()) {
            profiles.push(name.to_string());
        }
    }
    if profiles.is_empty() {
        return Err(ConfigError::NoProfiles);
    }
    Ok(profiles)
}
