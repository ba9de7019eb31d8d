mod deck;
mod rating_log;
mod review;

use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub use deck::{default_deck, load_deck, parse_deck, try_load_deck, Deck, DeckError, ParseOptions};
pub use rating_log::{open_rating_log, FileRatingLog, LogError, NullRatingLog, RatingSink};
pub use review::{CardInputError, ReviewSession, ReviewState, Step};

pub const DEFAULT_DECK_FILE: &str = "cards.yaml";
pub const DEFAULT_LOG_FILE: &str = "ratings.log";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: String,
    pub question: String,
    pub answer: String,
}

impl Card {
    pub fn new(id: impl Into<String>, question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            answer: answer.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Bad,
    Meh,
    Good,
}

impl Rating {
    pub fn letter(self) -> char {
        match self {
            Rating::Bad => 'B',
            Rating::Meh => 'M',
            Rating::Good => 'G',
        }
    }

    pub fn word(self) -> &'static str {
        match self {
            Rating::Bad => "bad",
            Rating::Meh => "meh",
            Rating::Good => "good",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rating::Bad => "Bad",
            Rating::Meh => "Meh",
            Rating::Good => "Good",
        }
    }
}

/// How a rating is spelled in the log file.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RatingCode {
    #[default]
    Letter,
    Word,
}

impl RatingCode {
    pub fn encode(self, rating: Rating) -> String {
        match self {
            RatingCode::Letter => rating.letter().to_string(),
            RatingCode::Word => rating.word().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingEvent {
    pub timestamp: NaiveDateTime,
    pub card_ref: String,
    pub rating: Rating,
}

impl RatingEvent {
    pub fn to_line(&self, code: RatingCode) -> String {
        format!(
            "{}|{}|{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.card_ref,
            code.encode(self.rating)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub deck_path: Option<PathBuf>,
    pub log_path: Option<PathBuf>,
    pub rating_code: RatingCode,
    pub require_section: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            deck_path: None,
            log_path: None,
            rating_code: RatingCode::Letter,
            require_section: true,
        }
    }
}

impl SessionConfig {
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            require_section: self.require_section,
        }
    }
}
