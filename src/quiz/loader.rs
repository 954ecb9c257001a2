use std::sync::{Arc, Weak};

use log::{debug, error, info, warn};

use crate::error::{LoadError, LoadResult};
use crate::quiz::{ExamLaunch, ExamLauncher, Part, TestDataSource, TEST_ID};

/// What became of a [`TestLoader::start_test`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The exam screen received this many questions.
    Launched(usize),
    NoQuestions,
    Failed,
    /// The exam screen went away while the test was loading.
    DestinationGone,
}

/// Loads one part of the test and hands it to the exam screen.
pub struct TestLoader {
    source: Arc<dyn TestDataSource>,
    test_id: String,
}

impl TestLoader {
    pub fn new(source: Arc<dyn TestDataSource>) -> Self {
        Self::with_test_id(source, TEST_ID)
    }

    pub fn with_test_id(source: Arc<dyn TestDataSource>, test_id: &str) -> Self {
        Self {
            source,
            test_id: test_id.to_string(),
        }
    }

    /// Fetches the part for `test_type` and tags every question with it.
    pub async fn load_exam(&self, test_type: &str) -> LoadResult<ExamLaunch> {
        let part = Part::from_test_type(test_type);
        debug!("Loading test data for {} ({})", test_type, part);

        let mut content = self.source.fetch_test(&self.test_id, part).await?;
        if content.questions.is_empty() {
            return Err(LoadError::NoQuestions(part.to_string()));
        }

        content.questions = content
            .questions
            .into_iter()
            .map(|q| q.with_question_type(test_type))
            .collect();

        Ok(ExamLaunch::new(test_type, content))
    }

    /// Loads the test and launches it, unless `launcher` has been dropped by then.
    ///
    /// Failures end up in the log only.
    pub async fn start_test(
        &self,
        test_type: &str,
        launcher: Weak<dyn ExamLauncher>,
    ) -> LaunchOutcome {
        let exam = match self.load_exam(test_type).await {
            Ok(exam) => exam,
            Err(LoadError::NoQuestions(part)) => {
                error!("No questions found for part: {}", part);
                return LaunchOutcome::NoQuestions;
            }
            Err(e) => {
                error!("Could not load {} test: {}", test_type, e);
                return LaunchOutcome::Failed;
            }
        };

        let launcher = match launcher.upgrade() {
            Some(launcher) => launcher,
            None => {
                warn!("Exam screen closed before the {} test finished loading", test_type);
                return LaunchOutcome::DestinationGone;
            }
        };

        let count = exam.questions.len();
        if let Err(e) = launcher.launch(exam).await {
            error!("Could not start the exam screen: {}", e);
            return LaunchOutcome::Failed;
        }

        info!("Started exam with {} questions", count);
        LaunchOutcome::Launched(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::{LaunchResult, Question, TestContent};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedSource {
        requested: Mutex<Vec<(String, Part)>>,
        questions: usize,
    }

    impl FixedSource {
        fn new(questions: usize) -> Arc<Self> {
            Arc::new(Self {
                requested: Mutex::new(Vec::new()),
                questions,
            })
        }
    }

    #[async_trait]
    impl TestDataSource for FixedSource {
        async fn fetch_test(&self, test_id: &str, part: Part) -> LoadResult<TestContent> {
            self.requested.lock().unwrap().push((test_id.to_string(), part));
            Ok(TestContent {
                name: "Practice".into(),
                description: "Desc".into(),
                questions: (0..self.questions)
                    .map(|i| Question::new(format!("q{}", i), vec!["a".into(), "b".into()], 0, None, None))
                    .collect(),
            })
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl TestDataSource for BrokenSource {
        async fn fetch_test(&self, _test_id: &str, part: Part) -> LoadResult<TestContent> {
            Err(LoadError::PartNotFound(part.to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingLauncher {
        launched: Mutex<Vec<ExamLaunch>>,
    }

    #[async_trait]
    impl ExamLauncher for RecordingLauncher {
        async fn launch(&self, exam: ExamLaunch) -> LaunchResult {
            self.launched.lock().unwrap().push(exam);
            Ok(())
        }
    }

    #[tokio::test]
    async fn reading_queries_part_two() {
        let source = FixedSource::new(2);
        let loader = TestLoader::new(source.clone());

        loader.load_exam("reading").await.unwrap();

        let requested = source.requested.lock().unwrap();
        assert_eq!(requested.as_slice(), &[("toeic38_test".to_string(), Part::Part2)]);
    }

    #[tokio::test]
    async fn questions_are_tagged_with_the_test_type() {
        let loader = TestLoader::new(FixedSource::new(3));
        let exam = loader.load_exam("writing").await.unwrap();

        assert_eq!(exam.test_type, "writing");
        assert_eq!(exam.course_id, "toeic38");
        assert!(exam.questions.iter().all(|q| q.question_type == "writing"));
    }

    #[tokio::test]
    async fn launches_when_destination_is_alive() {
        let loader = TestLoader::new(FixedSource::new(3));
        let launcher = Arc::new(RecordingLauncher::default());
        let weak: Weak<dyn ExamLauncher> = Arc::downgrade(&launcher) as Weak<dyn ExamLauncher>;

        let outcome = loader.start_test("listening", weak).await;

        assert_eq!(outcome, LaunchOutcome::Launched(3));
        let launched = launcher.launched.lock().unwrap();
        assert_eq!(launched.len(), 1);
        assert_eq!(launched[0].test_name, "Practice");
    }

    #[tokio::test]
    async fn dropped_destination_is_not_launched() {
        let loader = TestLoader::new(FixedSource::new(3));
        let launcher = Arc::new(RecordingLauncher::default());
        let weak: Weak<dyn ExamLauncher> = Arc::downgrade(&launcher) as Weak<dyn ExamLauncher>;
        drop(launcher);

        assert_eq!(loader.start_test("listening", weak).await, LaunchOutcome::DestinationGone);
    }

    #[tokio::test]
    async fn empty_and_failed_loads_do_not_launch() {
        let launcher = Arc::new(RecordingLauncher::default());
        let weak = || Arc::downgrade(&launcher) as Weak<dyn ExamLauncher>;

        let empty = TestLoader::new(FixedSource::new(0));
        assert_eq!(empty.start_test("speaking", weak()).await, LaunchOutcome::NoQuestions);

        let broken = TestLoader::new(Arc::new(BrokenSource));
        assert_eq!(broken.start_test("speaking", weak()).await, LaunchOutcome::Failed);

        assert!(launcher.launched.lock().unwrap().is_empty());
    }
}
