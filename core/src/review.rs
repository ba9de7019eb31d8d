use chrono::{Local, NaiveDateTime};

use crate::{Card, Deck, Rating, RatingEvent, RatingSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    AwaitingReveal,
    AnswerShown,
}

/// Outcome of a transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Ignored,
    Revealed,
    Advanced { index: usize, wrapped: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CardInputError {
    #[error("Question cannot be empty")]
    EmptyQuestion,
    #[error("Answer cannot be empty")]
    EmptyAnswer,
}

#[derive(Debug)]
pub struct ReviewSession {
    deck: Deck,
    index: usize,
    answer_visible: bool,
    sink: Box<dyn RatingSink>,
    clock: fn() -> NaiveDateTime,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl ReviewSession {
    pub fn new(deck: Deck, sink: Box<dyn RatingSink>) -> Self {
        Self {
            deck,
            index: 0,
            answer_visible: false,
            sink,
            clock: local_now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> ReviewState {
        if self.answer_visible {
            ReviewState::AnswerShown
        } else {
            ReviewState::AwaitingReveal
        }
    }

    pub fn can_rate(&self) -> bool {
        self.answer_visible && !self.deck.is_empty()
    }

    pub fn current_card(&self) -> Option<&Card> {
        self.deck.get(self.index)
    }

    pub fn visible_answer(&self) -> Option<&str> {
        if !self.answer_visible {
            return None;
        }
        self.current_card().map(|card| card.answer.as_str())
    }

    pub fn load_card(&mut self, index: usize) {
        if self.deck.is_empty() {
            return;
        }
        self.index = index % self.deck.len();
        self.answer_visible = false;
    }

    pub fn show_answer(&mut self) -> Step {
        if self.deck.is_empty() || self.answer_visible {
            return Step::Ignored;
        }
        self.answer_visible = true;
        Step::Revealed
    }

    pub fn rate(&mut self, rating: Rating) -> Step {
        let Some(card) = self.current_card().filter(|_| self.answer_visible) else {
            return Step::Ignored;
        };
        let event = RatingEvent {
            timestamp: (self.clock)(),
            card_ref: card.id.clone(),
            rating,
        };
        if let Err(err) = self.sink.record(&event) {
            log::warn!("Rating for {} not persisted: {err}", event.card_ref);
        }
        self.advance()
    }

    pub fn advance(&mut self) -> Step {
        if self.deck.is_empty() || !self.answer_visible {
            return Step::Ignored;
        }
        self.index = (self.index + 1) % self.deck.len();
        self.answer_visible = false;
        let wrapped = self.index == 0;
        if wrapped {
            log::debug!("Deck wrapped after {} cards", self.deck.len());
        }
        Step::Advanced {
            index: self.index,
            wrapped,
        }
    }

    pub fn append_card(&mut self, question: &str, answer: &str) -> Result<&Card, CardInputError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(CardInputError::EmptyQuestion);
        }
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(CardInputError::EmptyAnswer);
        }

        let id = self.deck.next_free_id();
        log::info!("Added card {id}");
        self.deck.push(Card::new(id, question, answer));
        self.index = self.deck.len() - 1;
        self.answer_visible = false;
        Ok(&self.deck.cards()[self.index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{default_deck, LogError};
    use chrono::NaiveDate;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default, Clone)]
    struct MemorySink {
        events: Rc<RefCell<Vec<RatingEvent>>>,
    }

    impl RatingSink for MemorySink {
        fn record(&mut self, event: &RatingEvent) -> Result<(), LogError> {
            self.events.borrow_mut().push(event.clone());
            Ok(())
        }
    }

    #[derive(Debug)]
    struct BrokenSink;

    impl RatingSink for BrokenSink {
        fn record(&mut self, _event: &RatingEvent) -> Result<(), LogError> {
            Err(LogError::Write(std::io::Error::other("disk full")))
        }
    }

    fn fixed_clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn session_with(deck: Deck) -> (ReviewSession, MemorySink) {
        let sink = MemorySink::default();
        let session = ReviewSession::new(deck, Box::new(sink.clone())).with_clock(fixed_clock);
        (session, sink)
    }

    fn deck_of(n: usize) -> Deck {
        Deck::new(
            (1..=n)
                .map(|i| Card::new(format!("card-{i}"), format!("Q{i}"), format!("A{i}")))
                .collect(),
        )
    }

    #[test]
    fn test_starts_awaiting_reveal() {
        let (session, _) = session_with(default_deck());
        assert_eq!(session.index(), 0);
        assert_eq!(session.state(), ReviewState::AwaitingReveal);
        assert!(session.visible_answer().is_none());
        assert!(!session.can_rate());
    }

    #[test]
    fn test_cycle_wraps_exactly_at_zero() {
        for n in 1..=4 {
            let (mut session, _) = session_with(deck_of(n));
            let mut seen = Vec::new();
            for _ in 0..(2 * n) {
                assert_eq!(session.show_answer(), Step::Revealed);
                match session.advance() {
                    Step::Advanced { index, wrapped } => {
                        assert_eq!(wrapped, index == 0);
                        seen.push(index);
                    }
                    other => panic!("unexpected {other:?}"),
                }
            }
            let expected: Vec<usize> = (0..2 * n).map(|i| (i + 1) % n).collect();
            assert_eq!(seen, expected);
        }
    }

    #[test]
    fn test_rate_before_reveal_is_ignored() {
        let (mut session, sink) = session_with(deck_of(3));
        assert_eq!(session.rate(Rating::Good), Step::Ignored);
        assert_eq!(session.advance(), Step::Ignored);
        assert_eq!(session.index(), 0);
        assert!(sink.events.borrow().is_empty());
    }

    #[test]
    fn test_second_reveal_is_ignored() {
        let (mut session, _) = session_with(deck_of(2));
        assert_eq!(session.show_answer(), Step::Revealed);
        assert_eq!(session.show_answer(), Step::Ignored);
        assert_eq!(session.visible_answer(), Some("A1"));
        assert_eq!(session.state(), ReviewState::AnswerShown);
    }

    #[test]
    fn test_rate_records_event_and_advances() {
        let (mut session, sink) = session_with(deck_of(2));
        session.show_answer();
        assert_eq!(
            session.rate(Rating::Good),
            Step::Advanced {
                index: 1,
                wrapped: false
            }
        );
        let events = sink.events.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].card_ref, "card-1");
        assert_eq!(events[0].rating, Rating::Good);
        assert_eq!(events[0].timestamp, fixed_clock());
        assert_eq!(session.state(), ReviewState::AwaitingReveal);
    }

    #[test]
    fn test_rating_last_card_wraps() {
        let (mut session, _) = session_with(deck_of(2));
        session.load_card(1);
        session.show_answer();
        assert_eq!(
            session.rate(Rating::Bad),
            Step::Advanced {
                index: 0,
                wrapped: true
            }
        );
    }

    #[test]
    fn test_sink_failure_does_not_block_review() {
        let mut session = ReviewSession::new(deck_of(2), Box::new(BrokenSink));
        session.show_answer();
        assert!(matches!(session.rate(Rating::Meh), Step::Advanced { index: 1, .. }));
    }

    #[test]
    fn test_empty_deck_ignores_everything() {
        let (mut session, sink) = session_with(Deck::default());
        assert_eq!(session.show_answer(), Step::Ignored);
        assert_eq!(session.rate(Rating::Good), Step::Ignored);
        assert_eq!(session.advance(), Step::Ignored);
        session.load_card(3);
        assert_eq!(session.index(), 0);
        assert!(session.current_card().is_none());
        assert!(sink.events.borrow().is_empty());
    }

    #[test]
    fn test_load_card_resets_reveal() {
        let (mut session, _) = session_with(deck_of(3));
        session.show_answer();
        session.load_card(5);
        assert_eq!(session.index(), 2);
        assert_eq!(session.state(), ReviewState::AwaitingReveal);
    }

    #[test]
    fn test_append_card_moves_to_new_card() {
        let (mut session, _) = session_with(default_deck());
        session.show_answer();
        let card = session.append_card("  X ", "Y").unwrap().clone();
        assert_eq!(card, Card::new("card-4", "X", "Y"));
        assert_eq!(session.deck().len(), 4);
        assert_eq!(session.index(), 3);
        assert_eq!(session.state(), ReviewState::AwaitingReveal);
    }

    #[test]
    fn test_append_card_rejects_blank_fields() {
        let (mut session, _) = session_with(deck_of(2));
        session.load_card(1);
        assert_eq!(session.append_card("   ", "Y").unwrap_err(), CardInputError::EmptyQuestion);
        assert_eq!(session.append_card("X", "\t").unwrap_err(), CardInputError::EmptyAnswer);
        assert_eq!(session.deck().len(), 2);
        assert_eq!(session.index(), 1);
    }

    #[test]
    fn test_append_to_empty_deck() {
        let (mut session, _) = session_with(Deck::default());
        session.append_card("X", "Y").unwrap();
        assert_eq!(session.current_card().map(|card| card.id.as_str()), Some("card-1"));
        assert_eq!(session.show_answer(), Step::Revealed);
    }
}
