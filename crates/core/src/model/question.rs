use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

/// Fewest options a question may offer.
pub const MIN_OPTIONS: usize = 2;
/// Most options a question may offer (labels A through F).
pub const MAX_OPTIONS: usize = 6;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {id}: prompt cannot be empty")]
    EmptyPrompt { id: QuestionId },

    #[error("question {id}: expected 2 to 6 options, got {len}")]
    OptionCount { id: QuestionId, len: usize },

    #[error("question {id}: option {index} is empty")]
    EmptyOption { id: QuestionId, index: usize },

    #[error("question {id}: correct answer {index} is out of range for {len} options")]
    CorrectAnswerOutOfRange {
        id: QuestionId,
        index: usize,
        len: usize,
    },

    #[error("question {id}: feedback for option {index} is out of range for {len} options")]
    FeedbackOutOfRange {
        id: QuestionId,
        index: usize,
        len: usize,
    },

    #[error("question id {id} appears more than once")]
    DuplicateId { id: QuestionId },
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Wire shape of a question as found in question-set documents.
///
/// Nothing here is trusted; call [`QuestionDraft::validate`] before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub id: QuestionId,
    #[serde(rename = "question")]
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub option_feedback: BTreeMap<usize, String>,
}

impl QuestionDraft {
    /// Check the draft against the question invariants.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` for a blank prompt, an option count outside
    /// `MIN_OPTIONS..=MAX_OPTIONS`, blank options, or indices out of range.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let id = self.id;
        let prompt = self.prompt.trim().to_owned();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt { id });
        }

        let len = self.options.len();
        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&len) {
            return Err(QuestionError::OptionCount { id, len });
        }
        if let Some(index) = self.options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuestionError::EmptyOption { id, index });
        }
        if self.correct_answer >= len {
            return Err(QuestionError::CorrectAnswerOutOfRange {
                id,
                index: self.correct_answer,
                len,
            });
        }
        if let Some(&index) = self.option_feedback.keys().find(|&&k| k >= len) {
            return Err(QuestionError::FeedbackOutOfRange { id, index, len });
        }

        Ok(Question {
            id,
            prompt,
            options: self.options,
            correct_answer: self.correct_answer,
            explanation: self.explanation.trim().to_owned(),
            option_feedback: self.option_feedback,
        })
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A validated multiple-choice question, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct_answer: usize,
    explanation: String,
    option_feedback: BTreeMap<usize, String>,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Zero-based index of the correct option before any shuffling.
    #[must_use]
    pub fn correct_answer(&self) -> usize {
        self.correct_answer
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn option_feedback(&self) -> &BTreeMap<usize, String> {
        &self.option_feedback
    }
}

/// Validate a whole question set, rejecting duplicate ids.
///
/// # Errors
///
/// Returns the first `QuestionError` encountered.
pub fn validate_question_set(
    drafts: impl IntoIterator<Item = QuestionDraft>,
) -> Result<Vec<Question>, QuestionError> {
    let mut seen = HashSet::new();
    let mut questions = Vec::new();
    for draft in drafts {
        if !seen.insert(draft.id) {
            return Err(QuestionError::DuplicateId { id: draft.id });
        }
        questions.push(draft.validate()?);
    }
    Ok(questions)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
