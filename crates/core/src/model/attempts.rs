use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;

/// Per-question attempt history for one shuffle of a question set.
///
/// `attempted` holds the distinct wrong option indices in click order.
/// `first_attempt_correct` is written once per question and never changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptLedger {
    #[serde(default)]
    attempted: BTreeMap<QuestionId, Vec<usize>>,
    #[serde(default)]
    first_attempt_correct: BTreeMap<QuestionId, bool>,
}

impl AttemptLedger {
    #[must_use]
    pub fn attempted(&self, id: QuestionId) -> &[usize] {
        self.attempted.get(&id).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn has_attempted(&self, id: QuestionId, index: usize) -> bool {
        self.attempted(id).contains(&index)
    }

    /// Append a wrong option; returns `false` if it was already recorded.
    pub fn record_wrong(&mut self, id: QuestionId, index: usize) -> bool {
        let entry = self.attempted.entry(id).or_default();
        if entry.contains(&index) {
            return false;
        }
        entry.push(index);
        true
    }

    #[must_use]
    pub fn first_attempt_correct(&self, id: QuestionId) -> Option<bool> {
        self.first_attempt_correct.get(&id).copied()
    }

    /// Record the first-attempt result; returns `false` if one was already set.
    pub fn record_first_attempt(&mut self, id: QuestionId, correct: bool) -> bool {
        if self.first_attempt_correct.contains_key(&id) {
            return false;
        }
        self.first_attempt_correct.insert(id, correct);
        true
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attempted.is_empty() && self.first_attempt_correct.is_empty()
    }

    pub fn clear(&mut self) {
        self.attempted.clear();
        self.first_attempt_correct.clear();
    }
}
