//! Reply payloads and card rendering
//!
//! A reply is text plus optional selectable options and navigation
//! affordances. How it is drawn (keyboards, buttons, HTML) is up to the
//! presentation layer.

use super::event::Action;
use crate::catalog::CatalogCandidate;
use crate::store::FilmRecord;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// One response message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ReplyOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nav: Vec<Nav>,
}

/// A selectable option; `action` is sent back verbatim when picked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyOption {
    pub label: String,
    pub action: Action,
}

/// Navigation affordance attached to a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nav {
    Back,
    Cancel,
}

impl Nav {
    /// The action a tap on this affordance produces
    #[allow(dead_code)] // Used in tests
    pub fn action(self) -> Action {
        match self {
            Nav::Back => Action::BackToCandidates,
            Nav::Cancel => Action::Cancel,
        }
    }
}

impl Reply {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            options: Vec::new(),
            nav: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_option(mut self, label: impl Into<String>, action: Action) -> Self {
        self.options.push(ReplyOption {
            label: label.into(),
            action,
        });
        self
    }

    #[must_use]
    pub fn with_nav(mut self, nav: Nav) -> Self {
        self.nav.push(nav);
        self
    }

    /// Attach the main menu as options
    #[must_use]
    pub fn with_main_menu(self) -> Self {
        self.with_option("✅ Add film", Action::AddFilm)
            .with_option("👀 Random film", Action::RandomFilm)
            .with_option("📋 Film list", Action::ListFilms)
            .with_option("🎞 Watched", Action::ListWatched)
            .with_option("👤 Switch profile", Action::SwitchProfile)
    }
}

// ============================================================================
// Cards
// ============================================================================

struct Card {
    lines: Vec<String>,
}

impl Card {
    fn titled(title: &str) -> Self {
        Self {
            lines: vec![format!("🎥 {title}")],
        }
    }

    /// Add `label: value` only when the value is known
    fn field(mut self, label: &str, value: Option<impl Display>) -> Self {
        if let Some(value) = value {
            self.lines.push(format!("{label}: {value}"));
        }
        self
    }

    fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    fn render(self) -> String {
        self.lines.join("\n")
    }
}

/// Card for a search candidate
pub fn candidate_card(c: &CatalogCandidate) -> String {
    Card::titled(&c.title)
        .field("Year", c.year)
        .field("Genre", c.genre.as_deref())
        .field("Country", c.country.as_deref())
        .field("Director", c.director.as_deref())
        .field("Starring", c.actors.as_deref())
        .field("Rating", c.external_rating.map(|r| format!("{r:.1}")))
        .field("Description", c.description.as_deref())
        .field("Trailer", c.trailer_url.as_deref())
        .field("Poster", c.poster_url.as_deref())
        .field("Watch online", c.watch_url.as_deref())
        .render()
}

/// Card for a stored film
pub fn film_card(f: &FilmRecord) -> String {
    Card::titled(&f.title)
        .field("Year", f.year)
        .field("Genre", f.genre.as_deref())
        .field("Country", f.country.as_deref())
        .field("Director", f.director.as_deref())
        .field("Starring", f.actors.as_deref())
        .field("Rating", f.external_rating.map(|r| format!("{r:.1}")))
        .field("Description", f.description.as_deref())
        .field("Trailer", f.trailer_url.as_deref())
        .field("Poster", f.poster_url.as_deref())
        .field("Watch online", f.watch_url.as_deref())
        .line(if f.watched { "✔ Watched" } else { "Not watched yet" })
        .field("Your rating", f.user_rating.map(|r| format!("{r}/10")))
        .field("Your comment", f.user_comment.as_deref())
        .render()
}

/// Card plus the follow-up actions for a stored film
pub fn film_reply(f: &FilmRecord) -> Reply {
    let mut reply = Reply::new(film_card(f));
    if !f.watched {
        reply = reply.with_option("👁 Mark watched", Action::MarkWatched { film_id: f.id });
    }
    reply
        .with_option("⭐ Rate", Action::RateFilm { film_id: f.id })
        .with_option("💬 Comment", Action::CommentFilm { film_id: f.id })
        .with_option("🗑 Delete", Action::DeleteFilm { film_id: f.id })
}
