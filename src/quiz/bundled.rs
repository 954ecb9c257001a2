//! Test content bundled as a single JSON file.

use std::collections::BTreeMap;

use async_trait::async_trait;
use log::{debug, error};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::assets::Assets;
use crate::error::{LoadError, LoadResult};
use crate::quiz::{Part, Question, TestContent, TestDataSource};

pub const TEST_DATA_FILE: &str = "toeic38_test_data.json";

/// The whole bundled test file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestDocument {
    #[serde(rename = "nameTest")]
    pub name_test: String,
    pub description: String,
    pub parts: BTreeMap<Part, PartDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub questions: Vec<QuestionRecord>,
}

/// A question as stored, before it is turned into a [`Question`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub question_text: String,
    #[serde(deserialize_with = "options_as_text")]
    pub options: Vec<String>,
    #[serde(deserialize_with = "index_from_number")]
    pub correct_answer: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_type: Option<String>,
}

impl QuestionRecord {
    /// Absent optional fields become empty strings; an empty example is left unset.
    pub fn into_question(self) -> Question {
        let question = Question::new(
            self.question_text,
            self.options,
            self.correct_answer as i32,
            Some(self.audio_url.unwrap_or_default()),
            Some(self.explanation.unwrap_or_default()),
        )
        .with_word(Some(self.word.unwrap_or_default()))
        .with_phonetic_text(Some(self.phonetic_text.unwrap_or_default()));

        match self.example_text {
            Some(example) if !example.is_empty() => question.with_example_text(example),
            _ => question,
        }
    }
}

// `1.0` and `"1"` both read as index 1; fractions are truncated.
fn index_from_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let index = match &value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    };
    index.ok_or_else(|| de::Error::custom(format!("correctAnswer is not a number: {}", value)))
}

// Numbers and booleans in `options` are kept as their text.
fn options_as_text<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<Value>::deserialize(deserializer)?
        .into_iter()
        .map(|value| match value {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(de::Error::custom(format!("option is not text: {}", other))),
        })
        .collect()
}

// Parts stay untyped so that only the requested one has to be well formed.
#[derive(Debug, Deserialize)]
struct RawTestFile {
    #[serde(rename = "nameTest")]
    name_test: String,
    description: String,
    parts: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawPart {
    questions: Vec<QuestionRecord>,
}

/// Reads [`TEST_DATA_FILE`] from the assets.
///
/// Stricter than the remote source: a question missing a required field fails
/// the whole load.
pub struct BundledTestSource {
    assets: Assets,
}

impl BundledTestSource {
    pub fn new(assets: Assets) -> Self {
        Self { assets }
    }
}

#[async_trait]
impl TestDataSource for BundledTestSource {
    async fn fetch_test(&self, _test_id: &str, part: Part) -> LoadResult<TestContent> {
        let json = self.assets.read_to_string(TEST_DATA_FILE).await.map_err(|e| {
            error!("Failed to load test data from JSON: {}", e);
            LoadError::from(e)
        })?;

        parse_test_data(&json, part)
    }
}

pub fn parse_test_data(json: &str, part: Part) -> LoadResult<TestContent> {
    let file: RawTestFile = serde_json::from_str(json)?;

    let raw_part = match file.parts.get(part.as_str()) {
        Some(value) => value.clone(),
        None => {
            error!("Part not found in test data: {}", part);
            return Err(LoadError::PartNotFound(part.to_string()));
        }
    };
    let raw_part: RawPart = serde_json::from_value(raw_part)?;

    let questions: Vec<Question> = raw_part
        .questions
        .into_iter()
        .map(QuestionRecord::into_question)
        .collect();
    debug!("Parsed {} questions for {}", questions.len(), part);

    Ok(TestContent {
        name: file.name_test,
        description: file.description,
        questions,
    })
}
