use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::attempts::AttemptLedger;
use crate::model::ids::QuestionId;
use crate::model::question::{MAX_OPTIONS, Question};

const LABELS: [char; MAX_OPTIONS] = ['A', 'B', 'C', 'D', 'E', 'F'];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PermutationError {
    #[error("question {id}: permutation has {got} entries for {expected} options")]
    LengthMismatch {
        id: QuestionId,
        expected: usize,
        got: usize,
    },

    #[error("question {id}: permutation is not a bijection over the options")]
    NotBijective { id: QuestionId },
}

/// Positional label for an option index (`0 -> 'A'`).
#[must_use]
pub fn option_label(index: usize) -> Option<char> {
    LABELS.get(index).copied()
}

/// Remove a stale positional prefix such as `"B. "` from option text.
///
/// Only a single letter `A`-`D`, a dot, and at least one whitespace character
/// count as a prefix; anything else is returned trimmed but otherwise intact.
#[must_use]
pub fn strip_option_label(text: &str) -> &str {
    let trimmed = text.trim();
    let mut chars = trimmed.chars();
    let (Some(letter), Some('.'), Some(space)) = (chars.next(), chars.next(), chars.next()) else {
        return trimmed;
    };
    if matches!(letter, 'A'..='D') && space.is_whitespace() {
        trimmed[2..].trim_start()
    } else {
        trimmed
    }
}

//
// ─── SESSION OPTION ────────────────────────────────────────────────────────────
//

/// One answer option after shuffling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOption {
    pub label: char,
    pub text: String,
    pub original_index: usize,
}

impl SessionOption {
    /// Text with its positional label, e.g. `"C. Disclose the conflict"`.
    #[must_use]
    pub fn labeled(&self) -> String {
        format!("{}. {}", self.label, self.text)
    }
}

//
// ─── SESSION QUESTION ──────────────────────────────────────────────────────────
//

/// A question as presented in one session: options permuted and relabeled,
/// correct index and per-option feedback remapped to the new positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionQuestion {
    id: QuestionId,
    prompt: String,
    options: Vec<SessionOption>,
    correct_answer_index: usize,
    explanation: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    option_feedback: BTreeMap<usize, String>,
}

impl SessionQuestion {
    /// Build a session question from `question` laid out in `order`, where
    /// `order[new_index] == original_index`.
    ///
    /// # Errors
    ///
    /// Returns `PermutationError` unless `order` is a permutation of the option indices.
    pub fn from_permutation(question: &Question, order: &[usize]) -> Result<Self, PermutationError> {
        let id = question.id();
        let expected = question.options().len();
        if order.len() != expected {
            return Err(PermutationError::LengthMismatch {
                id,
                expected,
                got: order.len(),
            });
        }
        let distinct: HashSet<usize> = order.iter().copied().collect();
        if distinct.len() != expected || order.iter().any(|&i| i >= expected) {
            return Err(PermutationError::NotBijective { id });
        }

        Ok(Self::assemble(question, order))
    }

    /// Session question in source order; used where shuffling is not wanted.
    #[must_use]
    pub fn in_source_order(question: &Question) -> Self {
        let order: Vec<usize> = (0..question.options().len()).collect();
        Self::assemble(question, &order)
    }

    fn assemble(question: &Question, order: &[usize]) -> Self {
        let mut options = Vec::with_capacity(order.len());
        let mut option_feedback = BTreeMap::new();
        let mut correct_answer_index = 0;
        for (new_index, &original_index) in order.iter().enumerate() {
            options.push(SessionOption {
                label: option_label(new_index).unwrap_or('?'),
                text: strip_option_label(&question.options()[original_index]).to_owned(),
                original_index,
            });
            if original_index == question.correct_answer() {
                correct_answer_index = new_index;
            }
            if let Some(feedback) = question.option_feedback().get(&original_index) {
                option_feedback.insert(new_index, feedback.clone());
            }
        }

        Self {
            id: question.id(),
            prompt: question.prompt().to_owned(),
            options,
            correct_answer_index,
            explanation: question.explanation().to_owned(),
            option_feedback,
        }
    }

    /// Structural check for questions read back from storage.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let len = self.options.len();
        let distinct: HashSet<usize> = self.options.iter().map(|o| o.original_index).collect();
        self.correct_answer_index < len
            && distinct.len() == len
            && self.options.iter().all(|o| o.original_index < len)
            && self
                .options
                .iter()
                .enumerate()
                .all(|(i, o)| option_label(i) == Some(o.label))
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[SessionOption] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer_index(&self) -> usize {
        self.correct_answer_index
    }

    #[must_use]
    pub fn correct_option(&self) -> &SessionOption {
        &self.options[self.correct_answer_index]
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// Wrong-answer feedback for the option currently at `index`.
    #[must_use]
    pub fn feedback_for(&self, index: usize) -> Option<&str> {
        self.option_feedback.get(&index).map(String::as_str)
    }
}

//
// ─── LOCKED SHUFFLE ────────────────────────────────────────────────────────────
//

/// A persisted shuffle for one practice test, together with the attempt
/// history that indexes into it.
///
/// Attempts only make sense relative to this exact permutation, so they live
/// and die with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedShuffle {
    pub questions: Vec<SessionQuestion>,
    #[serde(default)]
    pub attempts: AttemptLedger,
    pub locked_at: DateTime<Utc>,
}

impl LockedShuffle {
    #[must_use]
    pub fn new(questions: Vec<SessionQuestion>, locked_at: DateTime<Utc>) -> Self {
        Self {
            questions,
            attempts: AttemptLedger::default(),
            locked_at,
        }
    }

    /// True when every stored question still satisfies the shuffle invariants.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.questions.iter().all(SessionQuestion::is_consistent)
    }

    /// True when the locked questions are exactly the given source questions.
    ///
    /// Each locked question is rebuilt from its source counterpart with the
    /// stored option order; any difference in prompt, options, answer key,
    /// explanation or feedback makes the lock stale.
    #[must_use]
    pub fn matches_source(&self, source: &[Question]) -> bool {
        if self.questions.len() != source.len() {
            return false;
        }
        let by_id: HashMap<QuestionId, &Question> = source.iter().map(|q| (q.id(), q)).collect();
        if by_id.len() != source.len() {
            return false;
        }
        self.questions.iter().all(|locked| {
            let Some(question) = by_id.get(&locked.id()) else {
                return false;
            };
            let order: Vec<usize> = locked.options().iter().map(|o| o.original_index).collect();
            SessionQuestion::from_permutation(question, &order)
                .is_ok_and(|rebuilt| rebuilt == *locked)
        })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::question::QuestionDraft;
    use crate::time::fixed_now;

    fn question() -> Question {
        draft().validate().unwrap()
    }

    fn draft() -> QuestionDraft {
        let mut option_feedback = BTreeMap::new();
        option_feedback.insert(2, "Too late.".to_string());
        QuestionDraft {
            id: QuestionId::new(9),
            prompt: "When must a conflict be disclosed?".into(),
            options: vec![
                "A. Before the sale".into(),
                "B. Never".into(),
                "C. After the sale".into(),
            ],
            correct_answer: 0,
            explanation: "Disclosure precedes the sale.".into(),
            option_feedback,
        }
    }

    #[test]
    fn strip_label_only_removes_letter_dot_space() {
        assert_eq!(strip_option_label("A. Loyalty"), "Loyalty");
        assert_eq!(strip_option_label("  D.\tCare "), "Care");
        assert_eq!(strip_option_label("D.C. Circuit"), "D.C. Circuit");
        assert_eq!(strip_option_label("E. Fifth"), "E. Fifth");
        assert_eq!(strip_option_label("Plain"), "Plain");
        assert_eq!(strip_option_label("A."), "A.");
    }

    #[test]
    fn permutation_remaps_correct_answer_and_feedback() {
        let q = question();
        let sq = SessionQuestion::from_permutation(&q, &[2, 0, 1]).unwrap();

        let texts: Vec<_> = sq.options().iter().map(SessionOption::labeled).collect();
        assert_eq!(texts, ["A. After the sale", "B. Before the sale", "C. Never"]);
        assert_eq!(sq.correct_answer_index(), 1);
        assert_eq!(sq.correct_option().text, "Before the sale");
        assert_eq!(sq.feedback_for(0), Some("Too late."));
        assert_eq!(sq.feedback_for(2), None);
    }

    #[test]
    fn permutation_must_be_bijective() {
        let q = question();
        assert!(matches!(
            SessionQuestion::from_permutation(&q, &[0, 0, 1]).unwrap_err(),
            PermutationError::NotBijective { .. }
        ));
        assert!(matches!(
            SessionQuestion::from_permutation(&q, &[0, 1]).unwrap_err(),
            PermutationError::LengthMismatch { expected: 3, got: 2, .. }
        ));
    }

    #[test]
    fn locked_shuffle_matches_only_same_id_set() {
        let q = question();
        let locked = LockedShuffle::new(vec![SessionQuestion::in_source_order(&q)], fixed_now());
        assert!(locked.matches_source(std::slice::from_ref(&q)));
        assert!(!locked.matches_source(&[]));
    }

    #[test]
    fn locked_shuffle_goes_stale_when_content_changes() {
        let q = question();
        let shuffled = SessionQuestion::from_permutation(&q, &[2, 0, 1]).unwrap();
        let locked = LockedShuffle::new(vec![shuffled], fixed_now());
        assert!(locked.matches_source(std::slice::from_ref(&q)));

        let mut draft = draft();
        draft.correct_answer = 1;
        let rekeyed = draft.validate().unwrap();
        assert!(!locked.matches_source(&[rekeyed]));

        let mut draft = self::draft();
        draft.options[1] = "B. Only when asked".into();
        let reworded = draft.validate().unwrap();
        assert!(!locked.matches_source(&[reworded]));
    }

    #[test]
    fn locked_shuffle_survives_json() {
        let q = question();
        let locked = LockedShuffle::new(vec![SessionQuestion::in_source_order(&q)], fixed_now());
        let json = serde_json::to_string(&locked).unwrap();
        let back: LockedShuffle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, locked);
    }
}
