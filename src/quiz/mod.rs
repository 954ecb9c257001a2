pub mod bundled;
pub mod firestore;
pub mod generator;
pub mod loader;
pub mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LoadResult;

pub const COURSE_ID: &str = "toeic38";
pub const TEST_ID: &str = "toeic38_test";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question_text: String,
    pub options: Vec<String>,
    #[serde(rename = "correctAnswer")]
    pub correct_answer_index: i32,
    pub audio_url: Option<String>,
    pub explanation: Option<String>,
    pub question_type: String,
    pub word: Option<String>,
    pub phonetic_text: Option<String>,
    pub example_text: Option<String>,
}

impl Question {
    pub fn new(
        question_text: String,
        options: Vec<String>,
        correct_answer_index: i32,
        audio_url: Option<String>,
        explanation: Option<String>,
    ) -> Self {
        Self {
            question_text,
            options,
            correct_answer_index,
            audio_url,
            explanation,
            ..Default::default()
        }
    }

    pub fn with_question_type(mut self, question_type: &str) -> Self {
        self.question_type = question_type.to_string();
        self
    }

    pub fn with_word(mut self, word: Option<String>) -> Self {
        self.word = word;
        self
    }

    pub fn with_phonetic_text(mut self, phonetic_text: Option<String>) -> Self {
        self.phonetic_text = phonetic_text;
        self
    }

    pub fn with_example_text(mut self, example_text: String) -> Self {
        self.example_text = Some(example_text);
        self
    }

    /// Text of the correct option, if the index points inside `options`.
    pub fn correct_option(&self) -> Option<&str> {
        usize::try_from(self.correct_answer_index)
            .ok()
            .and_then(|i| self.options.get(i))
            .map(String::as_str)
    }
}

/// One of the four sections of the test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Part {
    #[serde(rename = "part_1")]
    Part1,
    #[serde(rename = "part_2")]
    Part2,
    #[serde(rename = "part_3")]
    Part3,
    #[serde(rename = "part_4")]
    Part4,
}

impl Part {
    pub const ALL: [Part; 4] = [Part::Part1, Part::Part2, Part::Part3, Part::Part4];

    /// Unknown test types land on the listening part.
    pub fn from_test_type(test_type: &str) -> Self {
        match test_type {
            "listening" => Part::Part1,
            "reading" => Part::Part2,
            "writing" => Part::Part3,
            "speaking" => Part::Part4,
            _ => Part::Part1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Part::Part1 => "part_1",
            Part::Part2 => "part_2",
            Part::Part3 => "part_3",
            Part::Part4 => "part_4",
        }
    }

    pub fn test_type(&self) -> &'static str {
        match self {
            Part::Part1 => "listening",
            Part::Part2 => "reading",
            Part::Part3 => "writing",
            Part::Part4 => "speaking",
        }
    }
}

impl std::fmt::Display for Part {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Test metadata plus the questions of one part, as a source delivers them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestContent {
    pub name: String,
    pub description: String,
    pub questions: Vec<Question>,
}

/// Payload handed to the exam screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamLaunch {
    #[serde(rename = "testType")]
    pub test_type: String,
    #[serde(rename = "courseId")]
    pub course_id: String,
    pub test_name: String,
    pub test_description: String,
    pub questions: Vec<Question>,
}

impl ExamLaunch {
    pub fn new(test_type: &str, content: TestContent) -> Self {
        Self {
            test_type: test_type.to_string(),
            course_id: COURSE_ID.to_string(),
            test_name: content.name,
            test_description: content.description,
            questions: content.questions,
        }
    }
}

/// Where test content comes from.
#[async_trait]
pub trait TestDataSource: Send + Sync {
    async fn fetch_test(&self, test_id: &str, part: Part) -> LoadResult<TestContent>;
}

pub type LaunchResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// The exam screen that receives a loaded test.
#[async_trait]
pub trait ExamLauncher: Send + Sync {
    async fn launch(&self, exam: ExamLaunch) -> LaunchResult;
}
