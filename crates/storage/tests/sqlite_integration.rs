use mcq_core::model::{
    LockedShuffle, ProgressRecord, QuestionDraft, QuestionId, QuestionOrigin, SessionQuestion,
    TestId, TopicId,
};
use mcq_core::time::fixed_now;
use storage::repository::{KeyValueStore, Storage};
use storage::sqlite::SqliteRepository;

fn ids() -> (TopicId, TestId) {
    (
        TopicId::new("llqp-ethics").unwrap(),
        TestId::new("practice-1").unwrap(),
    )
}

#[tokio::test]
async fn sqlite_kv_upserts_and_deletes() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    // Migrations are idempotent.
    repo.migrate().await.expect("migrate twice");

    assert_eq!(repo.get("progress:a:b").await.unwrap(), None);
    repo.set("progress:a:b", "1").await.unwrap();
    repo.set("progress:a:b", "2").await.unwrap();
    repo.set("progress:a_x:b", "3").await.unwrap();
    assert_eq!(repo.get("progress:a:b").await.unwrap().as_deref(), Some("2"));

    repo.delete("progress:a:b").await.unwrap();
    repo.delete("progress:a:b").await.unwrap();
    assert_eq!(repo.get("progress:a:b").await.unwrap(), None);
    assert_eq!(repo.get("progress:a_x:b").await.unwrap().as_deref(), Some("3"));
}

#[tokio::test]
async fn sqlite_storage_persists_typed_records() {
    let storage = Storage::sqlite("sqlite:file:memdb_typed?mode=memory&cache=shared")
        .await
        .expect("storage");
    let (topic, test) = ids();

    let mut progress = ProgressRecord::empty(fixed_now());
    progress.viewed.insert(QuestionId::new(1));
    progress.bookmarked.insert(QuestionId::new(1));
    storage.progress.save(&topic, &test, &progress).await.unwrap();
    assert_eq!(
        storage.progress.load(&topic, &test).await.unwrap(),
        Some(progress)
    );

    let question = QuestionDraft {
        id: QuestionId::new(1),
        prompt: "Who owes a duty of care?".into(),
        options: vec!["A. The advisor".into(), "B. Nobody".into()],
        correct_answer: 0,
        explanation: String::new(),
        option_feedback: Default::default(),
    }
    .validate()
    .unwrap();
    let mut shuffle = LockedShuffle::new(
        vec![SessionQuestion::from_permutation(&question, &[1, 0]).unwrap()],
        fixed_now(),
    );
    shuffle.attempts.record_wrong(QuestionId::new(1), 0);
    storage.shuffles.save(&topic, &test, &shuffle).await.unwrap();
    let loaded = storage.shuffles.load(&topic, &test).await.unwrap().unwrap();
    assert_eq!(loaded, shuffle);
    assert_eq!(loaded.questions[0].correct_answer_index(), 1);

    let origin = QuestionOrigin::new(topic, test, QuestionId::new(1));
    assert!(storage.wrong_answers.record(origin, fixed_now()).await.unwrap());
    assert_eq!(storage.wrong_answers.count().await.unwrap(), 1);
}
