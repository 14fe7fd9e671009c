use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use mcq_core::model::{
    Catalog, PracticeTest, Question, QuestionId, QuestionOrigin, QuestionSetDocument, TestId,
    Topic, TopicId, WrongAnswerEntry,
};
use storage::stores::ProgressStore;

use crate::error::{ResourceError, StudyError};

//
// ─── QUESTION SOURCES ──────────────────────────────────────────────────────────
//

/// Read-only access to the topic catalog and validated question sets.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// # Errors
    ///
    /// Returns `ResourceError` when the catalog cannot be read or validated.
    async fn catalog(&self) -> Result<Catalog, ResourceError>;

    /// # Errors
    ///
    /// Returns `ResourceError` for unknown or unavailable tests and for data
    /// files that cannot be read or validated.
    async fn question_set(
        &self,
        topic: &TopicId,
        test: &TestId,
    ) -> Result<Vec<Question>, ResourceError>;
}

fn playable<'a>(
    catalog: &'a Catalog,
    topic: &TopicId,
    test: &TestId,
) -> Result<&'a PracticeTest, ResourceError> {
    let found = catalog
        .topic(topic)
        .ok_or_else(|| ResourceError::UnknownTopic(topic.clone()))?;
    let practice = found
        .practice_test(test)
        .ok_or_else(|| ResourceError::UnknownTest {
            topic: topic.clone(),
            test: test.clone(),
        })?;
    if !practice.status.is_active() {
        return Err(ResourceError::Unavailable {
            topic: topic.clone(),
            test: test.clone(),
        });
    }
    Ok(practice)
}

/// Loads `topics.json` and question-set documents from a directory tree.
///
/// Data file paths in the catalog are relative to `root`.
#[derive(Clone, Debug)]
pub struct FileQuestionSource {
    root: PathBuf,
    catalog_path: PathBuf,
}

impl FileQuestionSource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, catalog_path: impl AsRef<Path>) -> Self {
        let root = root.into();
        let catalog_path = root.join(catalog_path);
        Self { root, catalog_path }
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ResourceError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ResourceError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_str(&raw).map_err(|source| ResourceError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[async_trait]
impl QuestionSource for FileQuestionSource {
    async fn catalog(&self) -> Result<Catalog, ResourceError> {
        let catalog: Catalog = Self::read_json(&self.catalog_path).await?;
        Ok(catalog.validate()?)
    }

    async fn question_set(
        &self,
        topic: &TopicId,
        test: &TestId,
    ) -> Result<Vec<Question>, ResourceError> {
        let catalog = self.catalog().await?;
        let practice = playable(&catalog, topic, test)?;
        let path = self.root.join(&practice.data_file);
        let document: QuestionSetDocument = Self::read_json(&path).await?;
        let questions = document.into_questions()?;
        tracing::debug!(%topic, %test, count = questions.len(), "loaded question set");
        Ok(questions)
    }
}

/// Catalog and question sets held in memory, for tests and embedding.
#[derive(Clone, Debug, Default)]
pub struct InMemoryQuestionSource {
    catalog: Catalog,
    sets: HashMap<(TopicId, TestId), Vec<Question>>,
}

impl InMemoryQuestionSource {
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            sets: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_set(mut self, topic: TopicId, test: TestId, questions: Vec<Question>) -> Self {
        self.sets.insert((topic, test), questions);
        self
    }
}

#[async_trait]
impl QuestionSource for InMemoryQuestionSource {
    async fn catalog(&self) -> Result<Catalog, ResourceError> {
        Ok(self.catalog.clone().validate()?)
    }

    async fn question_set(
        &self,
        topic: &TopicId,
        test: &TestId,
    ) -> Result<Vec<Question>, ResourceError> {
        playable(&self.catalog, topic, test)?;
        Ok(self
            .sets
            .get(&(topic.clone(), test.clone()))
            .cloned()
            .unwrap_or_default())
    }
}

//
// ─── REVIEW SET ────────────────────────────────────────────────────────────────
//

/// A ledger entry resolved to its current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    pub origin: QuestionOrigin,
    pub question: Question,
}

/// Resolve ledger entries to questions, skipping anything that no longer exists.
///
/// Question ids must be unique within a session, so when two contexts share an
/// id only the first entry is kept. An empty result means nothing to review.
pub async fn build_review_set(
    entries: &[WrongAnswerEntry],
    source: &dyn QuestionSource,
) -> Vec<ReviewItem> {
    let mut sets: HashMap<(TopicId, TestId), Option<Vec<Question>>> = HashMap::new();
    let mut seen: HashSet<QuestionId> = HashSet::new();
    let mut items = Vec::new();

    for entry in entries {
        let origin = &entry.origin;
        let key = (origin.topic_id.clone(), origin.test_id.clone());
        if !sets.contains_key(&key) {
            let loaded = match source.question_set(&key.0, &key.1).await {
                Ok(questions) => Some(questions),
                Err(err) => {
                    tracing::warn!(topic = %key.0, test = %key.1, error = %err, "skipping review entries for unavailable test");
                    None
                }
            };
            sets.insert(key.clone(), loaded);
        }

        let Some(question) = sets
            .get(&key)
            .and_then(Option::as_ref)
            .and_then(|qs| qs.iter().find(|q| q.id() == origin.question_id))
        else {
            tracing::warn!(question = %origin.question_id, "skipping review entry for missing question");
            continue;
        };

        if !seen.insert(question.id()) {
            tracing::warn!(question = %origin.question_id, "skipping review entry with duplicate question id");
            continue;
        }
        items.push(ReviewItem {
            origin: origin.clone(),
            question: question.clone(),
        });
    }

    items
}

//
// ─── CATALOG OVERVIEW ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeTestOverview {
    pub test: PracticeTest,
    pub percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicOverview {
    pub topic: Topic,
    pub percent: u8,
    pub tests: Vec<PracticeTestOverview>,
}

/// Topic and practice-test listings annotated with stored progress.
#[derive(Clone)]
pub struct CatalogService {
    source: Arc<dyn QuestionSource>,
    progress: ProgressStore,
}

impl CatalogService {
    #[must_use]
    pub fn new(source: Arc<dyn QuestionSource>, progress: ProgressStore) -> Self {
        Self { source, progress }
    }

    /// # Errors
    ///
    /// Returns `StudyError` when the catalog or stored progress cannot be read.
    pub async fn overview(&self) -> Result<Vec<TopicOverview>, StudyError> {
        let catalog = self.source.catalog().await?;
        let mut topics = Vec::with_capacity(catalog.topics.len());
        for topic in catalog.topics {
            let percent = self.progress.topic_completion_percent(&topic).await?;
            let mut tests = Vec::with_capacity(topic.practice_tests.len());
            for test in &topic.practice_tests {
                let percent = self
                    .progress
                    .completion_percent(&topic.id, &test.id, test.question_count as usize)
                    .await?;
                tests.push(PracticeTestOverview {
                    test: test.clone(),
                    percent,
                });
            }
            topics.push(TopicOverview {
                topic,
                percent,
                tests,
            });
        }
        Ok(topics)
    }
}
