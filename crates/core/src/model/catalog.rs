use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{TestId, TopicId};
use crate::model::question::{Question, QuestionDraft, QuestionError, validate_question_set};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("topic {0} appears more than once")]
    DuplicateTopic(TopicId),

    #[error("topic {topic}: practice test {test} appears more than once")]
    DuplicateTest { topic: TopicId, test: TestId },

    #[error("topic {0}: name cannot be empty")]
    EmptyTopicName(TopicId),

    #[error("topic {topic}: practice test {test} has no data file")]
    MissingDataFile { topic: TopicId, test: TestId },

    #[error(transparent)]
    Question(#[from] QuestionError),
}

//
// ─── AVAILABILITY ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Availability {
    #[default]
    Active,
    ComingSoon,
}

impl Availability {
    fn coming_soon() -> Self {
        Self::ComingSoon
    }

    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// A named question set inside a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeTest {
    pub id: TestId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub question_count: u32,
    #[serde(default)]
    pub data_file: String,
    /// Tests are playable unless explicitly marked otherwise.
    #[serde(default)]
    pub status: Availability,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: TopicId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    /// Topics stay hidden behind "coming soon" unless marked active.
    #[serde(default = "Availability::coming_soon")]
    pub status: Availability,
    #[serde(default)]
    pub practice_tests: Vec<PracticeTest>,
}

impl Topic {
    #[must_use]
    pub fn practice_test(&self, id: &TestId) -> Option<&PracticeTest> {
        self.practice_tests.iter().find(|t| &t.id == id)
    }

    /// Sum of advertised question counts across all practice tests.
    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.practice_tests.iter().map(|t| t.question_count).sum()
    }
}

/// The topic catalog document (`topics.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub topics: Vec<Topic>,
}

impl Catalog {
    /// Check id uniqueness and required fields.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` on duplicate ids, blank topic names, or active
    /// practice tests without a data file.
    pub fn validate(self) -> Result<Self, CatalogError> {
        let mut topic_ids = HashSet::new();
        for topic in &self.topics {
            if !topic_ids.insert(&topic.id) {
                return Err(CatalogError::DuplicateTopic(topic.id.clone()));
            }
            if topic.name.trim().is_empty() {
                return Err(CatalogError::EmptyTopicName(topic.id.clone()));
            }
            let mut test_ids = HashSet::new();
            for test in &topic.practice_tests {
                if !test_ids.insert(&test.id) {
                    return Err(CatalogError::DuplicateTest {
                        topic: topic.id.clone(),
                        test: test.id.clone(),
                    });
                }
                if test.status.is_active() && test.data_file.trim().is_empty() {
                    return Err(CatalogError::MissingDataFile {
                        topic: topic.id.clone(),
                        test: test.id.clone(),
                    });
                }
            }
        }
        Ok(self)
    }

    #[must_use]
    pub fn topic(&self, id: &TopicId) -> Option<&Topic> {
        self.topics.iter().find(|t| &t.id == id)
    }

    #[must_use]
    pub fn practice_test(&self, topic: &TopicId, test: &TestId) -> Option<&PracticeTest> {
        self.topic(topic).and_then(|t| t.practice_test(test))
    }
}

//
// ─── QUESTION SET DOCUMENT ─────────────────────────────────────────────────────
//

/// A practice-test data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSetDocument {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub questions: Vec<QuestionDraft>,
}

impl QuestionSetDocument {
    /// Validate every question in the document.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Question` for the first malformed question.
    pub fn into_questions(self) -> Result<Vec<Question>, CatalogError> {
        Ok(validate_question_set(self.questions)?)
    }
}
