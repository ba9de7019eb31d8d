use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::Card;

#[derive(Debug, thiserror::Error)]
pub enum DeckError {
    #[error("deck file {} does not exist", .0.display())]
    Missing(PathBuf),
    #[error("failed to read deck file: {0}")]
    Read(#[from] io::Error),
    #[error("deck file has no complete cards")]
    Empty,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.cards.iter().any(|card| card.id == id)
    }

    /// First of `card-1`, `card-2`, ... not already taken by a card in the deck.
    pub fn next_free_id(&self) -> String {
        IdAllocator::new(self.iter().map(|card| card.id.as_str())).claim()
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }
}

pub fn default_deck() -> Deck {
    Deck::new(vec![
        Card::new("card-1", "What is the capital of France?", "Paris"),
        Card::new("card-2", "What is 2 + 2?", "4"),
        Card::new("card-3", "Name the largest planet in our solar system.", "Jupiter"),
    ])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Ignore list entries until a `cards:` line has been seen.
    pub require_section: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            require_section: true,
        }
    }
}

pub fn load_deck(path: &Path, options: ParseOptions) -> Deck {
    match try_load_deck(path, options) {
        Ok(deck) => {
            log::info!("Loaded {} cards from {}", deck.len(), path.display());
            deck
        }
        Err(DeckError::Missing(path)) => {
            log::info!("No deck at {}, using built-in deck", path.display());
            default_deck()
        }
        Err(err) => {
            log::warn!("Ignoring {}: {err}; using built-in deck", path.display());
            default_deck()
        }
    }
}

pub fn try_load_deck(path: &Path, options: ParseOptions) -> Result<Deck, DeckError> {
    let bytes = fs::read(path).map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            DeckError::Missing(path.to_path_buf())
        } else {
            DeckError::Read(err)
        }
    })?;
    let text = String::from_utf8_lossy(&bytes);
    let deck = parse_deck(&text, options);
    if deck.is_empty() {
        return Err(DeckError::Empty);
    }
    Ok(deck)
}

pub fn parse_deck(text: &str, options: ParseOptions) -> Deck {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut parser = DeckParser::new(options);
    for line in text.lines() {
        parser.feed(line);
    }
    parser.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    BeforeSection,
    BetweenEntries,
    InEntry,
}

#[derive(Debug, Default)]
struct Entry {
    id: Option<String>,
    question: Option<String>,
    answer: Option<String>,
}

impl Entry {
    fn apply(&mut self, pair: &str) {
        let Some((key, value)) = pair.split_once(':') else {
            return;
        };
        let value = strip_quotes(value.trim()).to_string();
        match key.trim() {
            "id" => self.id = Some(value),
            "question" => self.question = Some(value),
            "answer" => self.answer = Some(value),
            _ => {}
        }
    }

    fn into_card(self) -> Option<Card> {
        let question = self.question.filter(|value| !value.is_empty())?;
        let answer = self.answer.filter(|value| !value.is_empty())?;
        Some(Card {
            id: self.id.unwrap_or_default(),
            question,
            answer,
        })
    }
}

struct DeckParser {
    options: ParseOptions,
    state: ParseState,
    current: Entry,
    cards: Vec<Card>,
}

impl DeckParser {
    fn new(options: ParseOptions) -> Self {
        Self {
            options,
            state: ParseState::BeforeSection,
            current: Entry::default(),
            cards: Vec::new(),
        }
    }

    fn feed(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return;
        }

        match (self.state, list_item(trimmed)) {
            (ParseState::BeforeSection, _) if trimmed == "cards:" => {
                self.state = ParseState::BetweenEntries;
            }
            (ParseState::BeforeSection, Some(rest)) if !self.options.require_section => {
                self.open_entry(rest);
            }
            (ParseState::BeforeSection, _) => {}
            (_, Some(rest)) => self.open_entry(rest),
            (ParseState::InEntry, None) => self.current.apply(trimmed),
            (ParseState::BetweenEntries, None) => {}
        }
    }

    fn open_entry(&mut self, rest: &str) {
        self.commit();
        self.state = ParseState::InEntry;
        if !rest.is_empty() {
            self.current.apply(rest);
        }
    }

    fn commit(&mut self) {
        let entry = std::mem::take(&mut self.current);
        if let Some(card) = entry.into_card() {
            self.cards.push(card);
        }
    }

    fn finish(mut self) -> Deck {
        self.commit();
        let taken = self.cards.iter().map(|card| card.id.as_str());
        let mut ids = IdAllocator::new(taken.filter(|id| !id.is_empty()));
        for card in self.cards.iter_mut().filter(|card| card.id.is_empty()) {
            card.id = ids.claim();
        }
        Deck::new(self.cards)
    }
}

/// Hands out `card-N` ids in increasing order, skipping ids already in use.
struct IdAllocator {
    used: HashSet<String>,
    next: usize,
}

impl IdAllocator {
    fn new<'a>(taken: impl Iterator<Item = &'a str>) -> Self {
        Self {
            used: taken.map(str::to_string).collect(),
            next: 1,
        }
    }

    fn claim(&mut self) -> String {
        loop {
            let candidate = format!("card-{}", self.next);
            self.next += 1;
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

fn list_item(trimmed: &str) -> Option<&str> {
    if trimmed == "-" {
        return Some("");
    }
    trimmed.strip_prefix("- ").map(str::trim)
}

fn strip_quotes(value: &str) -> &str {
    if value.len() >= 2 {
        let quoted = (value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\''));
        if quoted {
            return &value[1..value.len() - 1];
        }
    }
    value
}
