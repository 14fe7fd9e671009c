use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;

/// Durable progress for one practice test.
///
/// An absent record is equivalent to `ProgressRecord::empty`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(default)]
    pub viewed: BTreeSet<QuestionId>,
    #[serde(default)]
    pub bookmarked: BTreeSet<QuestionId>,
    #[serde(default)]
    pub revealed: BTreeSet<QuestionId>,
    pub last_updated: DateTime<Utc>,
}

impl ProgressRecord {
    #[must_use]
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            viewed: BTreeSet::new(),
            bookmarked: BTreeSet::new(),
            revealed: BTreeSet::new(),
            last_updated: now,
        }
    }

    /// `round(100 * viewed / total)`, or 0 for an empty test.
    #[must_use]
    pub fn completion_percent(&self, total_questions: usize) -> u8 {
        completion_percent(self.viewed.len(), total_questions)
    }
}

/// Rounded percentage of `done` over `total`, capped at 100; 0 when `total` is 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn completion_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (100.0 * done as f64 / total as f64).round();
    pct.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(completion_percent(1, 3), 33);
        assert_eq!(completion_percent(2, 3), 67);
        assert_eq!(completion_percent(1, 8), 13);
    }

    #[test]
    fn percent_is_zero_for_empty_total() {
        assert_eq!(completion_percent(5, 0), 0);
    }

    #[test]
    fn percent_caps_at_hundred() {
        // A shrunken test can leave more viewed ids than questions.
        assert_eq!(completion_percent(12, 10), 100);
    }

    #[test]
    fn record_parses_without_optional_sets() {
        let json = r#"{ "viewed": [1, 2], "lastUpdated": "2023-11-14T22:13:20Z" }"#;
        let record: ProgressRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.viewed.len(), 2);
        assert!(record.bookmarked.is_empty());
        assert_eq!(record.last_updated, fixed_now());
        assert_eq!(record.completion_percent(4), 50);
    }
}
