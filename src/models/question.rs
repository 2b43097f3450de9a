// src/models/question.rs

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// Subject the question belongs to (matched case-insensitively).
    pub subject: String,

    /// The text content of the question.
    pub content: String,

    /// List of options (e.g., ["Option A", "Option B"]).
    /// Stored as a JSON array in the database.
    #[sqlx(json)]
    pub options: Vec<String>,

    /// The correct option, compared verbatim against the user's selection.
    pub answer: String,
}

/// What the exam UI is allowed to see of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionPrompt<'a> {
    pub content: &'a str,
    pub options: &'a [String],
}

/// An ordered, immutable paper of questions for one session.
///
/// The order is the one delivered by the question source; positions are what
/// answers are scored against, so the set is never reordered after creation.
/// Correct answers are only reachable from inside the crate.
#[derive(Debug, Clone)]
pub struct QuestionSet {
    questions: Arc<[Question]>,
}

impl QuestionSet {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions: questions.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn prompt(&self, index: usize) -> Option<QuestionPrompt<'_>> {
        self.questions.get(index).map(|q| QuestionPrompt {
            content: &q.content,
            options: &q.options,
        })
    }

    pub(crate) fn contents(&self) -> Vec<String> {
        self.questions.iter().map(|q| q.content.clone()).collect()
    }

    pub(crate) fn correct_answers(&self) -> Vec<String> {
        self.questions.iter().map(|q| q.answer.clone()).collect()
    }
}
