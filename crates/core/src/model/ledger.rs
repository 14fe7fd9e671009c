use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{QuestionId, TestId, TopicId};

/// Where a question lives in the catalog: the ledger's composite key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOrigin {
    pub topic_id: TopicId,
    pub test_id: TestId,
    pub question_id: QuestionId,
}

impl QuestionOrigin {
    #[must_use]
    pub fn new(topic_id: TopicId, test_id: TestId, question_id: QuestionId) -> Self {
        Self {
            topic_id,
            test_id,
            question_id,
        }
    }
}

/// A question the learner missed on first attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrongAnswerEntry {
    #[serde(flatten)]
    pub origin: QuestionOrigin,
    pub recorded_at: DateTime<Utc>,
}

/// Cross-topic registry of missed questions, unique by [`QuestionOrigin`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WrongAnswerLedger {
    entries: Vec<WrongAnswerEntry>,
}

impl WrongAnswerLedger {
    #[must_use]
    pub fn entries(&self) -> &[WrongAnswerEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, origin: &QuestionOrigin) -> bool {
        self.entries.iter().any(|e| &e.origin == origin)
    }

    /// Insert a miss unless one is already recorded for `origin`.
    ///
    /// The first miss wins; a repeat does not touch the stored timestamp.
    /// Returns `true` when a new entry was added.
    pub fn record(&mut self, origin: QuestionOrigin, at: DateTime<Utc>) -> bool {
        if self.contains(&origin) {
            return false;
        }
        self.entries.push(WrongAnswerEntry {
            origin,
            recorded_at: at,
        });
        true
    }

    /// Remove every entry for `question_id`, whatever topic or test it came from.
    ///
    /// Returns the number of entries removed.
    pub fn remove(&mut self, question_id: QuestionId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.origin.question_id != question_id);
        before - self.entries.len()
    }

    /// Remove only the entry with this exact composite key.
    pub fn remove_scoped(&mut self, origin: &QuestionOrigin) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.origin != origin);
        before != self.entries.len()
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn origin(topic: &str, test: &str, q: u64) -> QuestionOrigin {
        QuestionOrigin::new(
            TopicId::new(topic).unwrap(),
            TestId::new(test).unwrap(),
            QuestionId::new(q),
        )
    }

    #[test]
    fn record_dedupes_by_composite_key() {
        let mut ledger = WrongAnswerLedger::default();
        let now = fixed_now();
        assert!(ledger.record(origin("ethics", "p1", 1), now));
        assert!(!ledger.record(
            origin("ethics", "p1", 1),
            now + chrono::Duration::minutes(5)
        ));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.entries()[0].recorded_at, now);
    }

    #[test]
    fn same_question_id_in_other_test_is_a_separate_entry() {
        let mut ledger = WrongAnswerLedger::default();
        ledger.record(origin("ethics", "p1", 1), fixed_now());
        ledger.record(origin("ethics", "p2", 1), fixed_now());
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn remove_by_question_id_spans_topics() {
        let mut ledger = WrongAnswerLedger::default();
        ledger.record(origin("ethics", "p1", 1), fixed_now());
        ledger.record(origin("funds", "p1", 1), fixed_now());
        ledger.record(origin("funds", "p1", 2), fixed_now());

        assert_eq!(ledger.remove(QuestionId::new(1)), 2);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn scoped_remove_leaves_other_contexts() {
        let mut ledger = WrongAnswerLedger::default();
        ledger.record(origin("ethics", "p1", 1), fixed_now());
        ledger.record(origin("funds", "p1", 1), fixed_now());

        assert!(ledger.remove_scoped(&origin("ethics", "p1", 1)));
        assert!(!ledger.remove_scoped(&origin("ethics", "p1", 1)));
        assert!(ledger.contains(&origin("funds", "p1", 1)));
    }

    #[test]
    fn ledger_encodes_as_flat_array() {
        let mut ledger = WrongAnswerLedger::default();
        ledger.record(origin("ethics", "p1", 4), fixed_now());
        let json = serde_json::to_value(&ledger).unwrap();
        assert_eq!(json[0]["topicId"], "ethics");
        assert_eq!(json[0]["testId"], "p1");
        assert_eq!(json[0]["questionId"], 4);

        let back: WrongAnswerLedger = serde_json::from_value(json).unwrap();
        assert_eq!(back, ledger);
        ledger.clear_all();
        assert!(ledger.is_empty());
    }
}
