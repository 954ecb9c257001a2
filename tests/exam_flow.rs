use std::path::PathBuf;
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use serde_json::json;

use toeic_bot::assets::Assets;
use toeic_bot::quiz::bundled::{BundledTestSource, TEST_DATA_FILE};
use toeic_bot::quiz::loader::{LaunchOutcome, TestLoader};
use toeic_bot::quiz::remote::{MemoryStore, RemoteTestSource};
use toeic_bot::quiz::{ExamLaunch, ExamLauncher, LaunchResult, Part};
use toeic_bot::vocabulary::{sample_vocabulary, VocabularyLoader};

#[derive(Default)]
struct ExamScreen {
    received: Mutex<Option<serde_json::Value>>,
}

#[async_trait]
impl ExamLauncher for ExamScreen {
    async fn launch(&self, exam: ExamLaunch) -> LaunchResult {
        *self.received.lock().unwrap() = Some(serde_json::to_value(&exam)?);
        Ok(())
    }
}

fn speaking_file(questions: usize) -> serde_json::Value {
    let questions: Vec<_> = (0..questions)
        .map(|i| {
            json!({
                "questionText": format!("Pronounce word {}", i),
                "options": ["I can pronounce it.", "I need more practice."],
                "correctAnswer": 0,
                "word": format!("word{}", i),
                "phoneticText": format!("/w{}/", i)
            })
        })
        .collect();
    json!({
        "nameTest": "TOEIC38 Vocabulary Practice Test",
        "description": "Business meetings",
        "parts": {"part_4": {"questions": questions}}
    })
}

#[tokio::test]
async fn speaking_test_reaches_the_exam_screen_in_order() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(TEST_DATA_FILE), speaking_file(5).to_string()).unwrap();

    let loader = TestLoader::new(Arc::new(BundledTestSource::new(Assets::new(dir.path()))));
    let screen = Arc::new(ExamScreen::default());
    let destination = Arc::downgrade(&screen) as Weak<dyn ExamLauncher>;

    let outcome = loader.start_test("speaking", destination).await;
    assert_eq!(outcome, LaunchOutcome::Launched(5));

    let payload = screen.received.lock().unwrap().clone().unwrap();
    assert_eq!(payload["testType"], "speaking");
    assert_eq!(payload["courseId"], "toeic38");
    assert_eq!(payload["test_name"], "TOEIC38 Vocabulary Practice Test");
    assert_eq!(payload["test_description"], "Business meetings");

    let questions = payload["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 5);
    for (i, q) in questions.iter().enumerate() {
        assert_eq!(q["questionText"], format!("Pronounce word {}", i));
        assert_eq!(q["questionType"], "speaking");
    }
}

#[tokio::test]
async fn missing_part_launches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(TEST_DATA_FILE), speaking_file(5).to_string()).unwrap();

    let loader = TestLoader::new(Arc::new(BundledTestSource::new(Assets::new(dir.path()))));
    let screen = Arc::new(ExamScreen::default());

    let outcome = loader
        .start_test("reading", Arc::downgrade(&screen) as Weak<dyn ExamLauncher>)
        .await;

    assert_eq!(outcome, LaunchOutcome::Failed);
    assert!(screen.received.lock().unwrap().is_none());
}

#[tokio::test]
async fn remote_source_skips_broken_records_and_launches_the_rest() {
    let store = MemoryStore::new();
    store.insert(
        "Tests/toeic38_test",
        json!({"nameTest": "Remote test", "description": "From the store"}),
    );
    store.insert(
        "Tests/toeic38_test/Parts/part_1/Questions/question_1",
        json!({"questionText": "Missing options", "correctAnswer": 0}),
    );
    store.insert(
        "Tests/toeic38_test/Parts/part_1/Questions/question_2",
        json!({"questionText": "Which word?", "options": ["agenda", "minutes"], "correctAnswer": 1}),
    );

    let loader = TestLoader::new(Arc::new(RemoteTestSource::new(store)));
    let screen = Arc::new(ExamScreen::default());

    let outcome = loader
        .start_test("listening", Arc::downgrade(&screen) as Weak<dyn ExamLauncher>)
        .await;

    assert_eq!(outcome, LaunchOutcome::Launched(1));
    let payload = screen.received.lock().unwrap().clone().unwrap();
    assert_eq!(payload["test_name"], "Remote test");
    assert_eq!(payload["questions"][0]["questionText"], "Which word?");
}

fn shipped_assets() -> Assets {
    Assets::new(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets"))
}

#[tokio::test]
async fn shipped_test_file_has_every_part() {
    let source = BundledTestSource::new(shipped_assets());
    let loader = TestLoader::new(Arc::new(source));

    for part in Part::ALL {
        let exam = loader.load_exam(part.test_type()).await.unwrap();
        assert!(!exam.questions.is_empty(), "{} has no questions", part);
        assert!(exam
            .questions
            .iter()
            .all(|q| q.correct_option().is_some()));
    }
}

#[tokio::test]
async fn shipped_vocabulary_covers_each_lesson() {
    let loader = VocabularyLoader::new(shipped_assets());

    let lessons = loader.lessons().await;
    assert!(!lessons.is_empty());

    for lesson in &lessons {
        let items = loader.load(Some(lesson.as_str())).await;
        assert_ne!(items, sample_vocabulary(), "lesson {} fell back to samples", lesson);
    }
}
