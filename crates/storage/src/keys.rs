//! Deterministic storage keys.
//!
//! Topic and test ids cannot contain `:`, so no two (topic, test) pairs
//! share a key.

use mcq_core::model::{TestId, TopicId};

pub const PROGRESS_PREFIX: &str = "progress";
pub const SHUFFLE_PREFIX: &str = "shuffle";
/// Single global key holding the wrong-answer ledger.
pub const WRONG_ANSWERS_KEY: &str = "wrong-answers";

#[must_use]
pub fn progress_key(topic: &TopicId, test: &TestId) -> String {
    format!("{PROGRESS_PREFIX}:{topic}:{test}")
}

#[must_use]
pub fn shuffle_key(topic: &TopicId, test: &TestId) -> String {
    format!("{SHUFFLE_PREFIX}:{topic}:{test}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_prefix_topic_test_layout() {
        let topic = TopicId::new("llqp-ethics").unwrap();
        let test = TestId::new("practice-1").unwrap();
        assert_eq!(progress_key(&topic, &test), "progress:llqp-ethics:practice-1");
        assert_eq!(shuffle_key(&topic, &test), "shuffle:llqp-ethics:practice-1");
    }

    #[test]
    fn distinct_pairs_never_share_a_key() {
        let a = (TopicId::new("funds").unwrap(), TestId::new("p2").unwrap());
        let b = (TopicId::new("funds-p2").unwrap(), TestId::new("p").unwrap());
        assert_ne!(progress_key(&a.0, &a.1), progress_key(&b.0, &b.1));
        assert_ne!(progress_key(&a.0, &a.1), shuffle_key(&a.0, &a.1));
        assert_ne!(progress_key(&a.0, &a.1), WRONG_ANSWERS_KEY);
    }
}
