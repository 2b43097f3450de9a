// src/session/ledger.rs

use std::sync::Arc;

use crate::session::error::SessionError;

/// One nullable selection per question, in paper order.
#[derive(Debug, Clone)]
pub struct AnswerLedger {
    answers: Vec<Option<String>>,
    cursor: usize,
}

impl AnswerLedger {
    /// An empty ledger aligned with a paper of `len` questions.
    pub fn new(len: usize) -> Self {
        Self {
            answers: vec![None; len],
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn answer(&self, index: usize) -> Option<&str> {
        self.answers.get(index).and_then(|a| a.as_deref())
    }

    pub fn answered(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    /// Record `option` for question `index`, replacing any earlier choice.
    pub fn select(&mut self, index: usize, option: impl Into<String>) -> Result<(), SessionError> {
        let len = self.len();
        let slot = self
            .answers
            .get_mut(index)
            .ok_or(SessionError::QuestionOutOfRange { index, len })?;
        *slot = Some(option.into());
        Ok(())
    }

    /// Move the read cursor. Answers are untouched.
    pub fn navigate(&mut self, index: usize) -> Result<(), SessionError> {
        if index >= self.len() {
            return Err(SessionError::QuestionOutOfRange {
                index,
                len: self.len(),
            });
        }
        self.cursor = index;
        Ok(())
    }

    /// Immutable copy of the answers, index-aligned with the question set.
    pub fn snapshot(&self) -> Arc<[Option<String>]> {
        self.answers.clone().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_is_aligned_with_paper() {
        let mut ledger = AnswerLedger::new(4);
        ledger.select(2, "C").unwrap();

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot[0], None);
        assert_eq!(snapshot[2].as_deref(), Some("C"));
    }

    #[test]
    fn test_select_overwrites_and_is_idempotent() {
        let mut ledger = AnswerLedger::new(2);
        ledger.select(0, "A").unwrap();
        ledger.select(0, "B").unwrap();
        ledger.select(0, "B").unwrap();

        assert_eq!(ledger.answer(0), Some("B"));
        assert_eq!(ledger.answered(), 1);
    }

    #[test]
    fn test_navigate_moves_cursor_only() {
        let mut ledger = AnswerLedger::new(3);
        ledger.select(1, "D").unwrap();
        let before = ledger.snapshot();

        ledger.navigate(2).unwrap();
        ledger.navigate(0).unwrap();

        assert_eq!(ledger.cursor(), 0);
        assert_eq!(ledger.snapshot(), before);
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        let mut ledger = AnswerLedger::new(2);

        assert_eq!(
            ledger.select(2, "A"),
            Err(SessionError::QuestionOutOfRange { index: 2, len: 2 })
        );
        assert!(ledger.navigate(5).is_err());
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.cursor(), 0);
    }

    #[test]
    fn test_snapshot_does_not_follow_later_writes() {
        let mut ledger = AnswerLedger::new(1);
        let before = ledger.snapshot();
        ledger.select(0, "A").unwrap();

        assert_eq!(before[0], None);
    }
}
