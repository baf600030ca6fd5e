//! API request/response types

use crate::conversation::Reply;
use crate::store::FilmRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionResponse {
    pub replies: Vec<Reply>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilmsQuery {
    #[serde(default)]
    pub watched: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilmsResponse {
    pub profile: String,
    pub films: Vec<FilmRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
