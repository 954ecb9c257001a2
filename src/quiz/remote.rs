//! Test content kept in a remote document store.
//!
//! Layout: `Tests/{testId}` holds `nameTest` and `description`, and
//! `Tests/{testId}/Parts/{partId}/Questions` holds one document per question.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use log::{debug, error, info};
use serde_json::{Map, Value};

use crate::error::{LoadError, LoadResult, StoreError, StoreResult};
use crate::quiz::bundled::TestDocument;
use crate::quiz::{Part, Question, TestContent, TestDataSource, COURSE_ID};

/// A document with its fields decoded to plain JSON values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: &str, fields: Map<String, Value>) -> Self {
        Self {
            id: id.to_string(),
            fields,
        }
    }

    pub fn get_string(&self, field: &str) -> Option<String> {
        self.fields
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        let value = self.fields.get(field)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f as i64))
    }

    /// `None` unless the field is an array made only of strings.
    pub fn get_string_list(&self, field: &str) -> Option<Vec<String>> {
        self.fields
            .get(field)?
            .as_array()?
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect()
    }
}

/// Get/list access to a collection-shaped store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// `Ok(None)` when the document does not exist.
    async fn get_document(&self, path: &str) -> StoreResult<Option<Document>>;

    /// Documents directly inside `collection_path`, ordered by id.
    async fn list_documents(&self, collection_path: &str) -> StoreResult<Vec<Document>>;

    /// Creates the document at `path`, replacing all of its fields if it exists.
    async fn set_document(&self, path: &str, fields: Map<String, Value>) -> StoreResult<()>;
}

pub fn test_path(test_id: &str) -> String {
    format!("Tests/{}", test_id)
}

pub fn part_path(test_id: &str, part: Part) -> String {
    format!("Tests/{}/Parts/{}", test_id, part)
}

pub fn questions_path(test_id: &str, part: Part) -> String {
    format!("{}/Questions", part_path(test_id, part))
}

/// Writes `document` in the layout [`RemoteTestSource`] reads back.
///
/// Questions are stored as `question_01`, `question_02`, ... Returns how many
/// were written. Stops at the first failed write.
pub async fn upload_test_document<S>(store: &S, test_id: &str, document: &TestDocument) -> StoreResult<usize>
where
    S: DocumentStore + ?Sized,
{
    let mut test_fields = Map::new();
    test_fields.insert("nameTest".into(), Value::from(document.name_test.as_str()));
    test_fields.insert("description".into(), Value::from(document.description.as_str()));
    test_fields.insert("courseId".into(), Value::from(COURSE_ID));
    store.set_document(&test_path(test_id), test_fields).await?;

    let mut written = 0;
    for (part, part_document) in &document.parts {
        let mut part_fields = Map::new();
        if let Some(title) = &part_document.title {
            part_fields.insert("title".into(), Value::from(title.as_str()));
        }
        if let Some(description) = &part_document.description {
            part_fields.insert("description".into(), Value::from(description.as_str()));
        }
        store.set_document(&part_path(test_id, *part), part_fields).await?;

        for (i, record) in part_document.questions.iter().enumerate() {
            // Padded so id order is question order up to 99 questions.
            let path = format!("{}/question_{:02}", questions_path(test_id, *part), i + 1);
            let fields = match serde_json::to_value(record) {
                Ok(Value::Object(fields)) => fields,
                Ok(other) => {
                    return Err(StoreError::Encode {
                        path,
                        reason: format!("expected an object, got {}", other),
                    })
                }
                Err(e) => {
                    return Err(StoreError::Encode {
                        path,
                        reason: e.to_string(),
                    })
                }
            };
            store.set_document(&path, fields).await?;
            written += 1;
        }
        info!("Uploaded {} questions for {}", part_document.questions.len(), part);
    }

    Ok(written)
}

/// Loads a test with two sequential lookups: metadata, then the part's questions.
///
/// Question documents missing `questionText`, `options` or `correctAnswer` are
/// skipped rather than failing the load.
pub struct RemoteTestSource<S> {
    store: S,
}

impl<S: DocumentStore> RemoteTestSource<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S: DocumentStore> TestDataSource for RemoteTestSource<S> {
    async fn fetch_test(&self, test_id: &str, part: Part) -> LoadResult<TestContent> {
        let test_doc = match self.store.get_document(&test_path(test_id)).await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                error!("Test document not found: {}", test_id);
                return Err(LoadError::TestNotFound(test_id.to_string()));
            }
            Err(e) => {
                error!("Test document not found: {} ({})", test_id, e);
                return Err(e.into());
            }
        };

        let name = test_doc.get_string("nameTest").unwrap_or_default();
        let description = test_doc.get_string("description").unwrap_or_default();
        info!("Found test: {}", name);

        let documents = self
            .store
            .list_documents(&questions_path(test_id, part))
            .await
            .map_err(|e| {
                error!("Error loading questions: {}", e);
                LoadError::from(e)
            })?;

        let questions: Vec<Question> = documents.iter().filter_map(question_from_document).collect();

        Ok(TestContent {
            name,
            description,
            questions,
        })
    }
}

fn question_from_document(doc: &Document) -> Option<Question> {
    let (question_text, options, correct_answer) = match (
        doc.get_string("questionText"),
        doc.get_string_list("options"),
        doc.get_i64("correctAnswer"),
    ) {
        (Some(text), Some(options), Some(correct)) => (text, options, correct),
        _ => {
            debug!("Skipping incomplete question document {}", doc.id);
            return None;
        }
    };

    let question = Question::new(
        question_text,
        options,
        correct_answer as i32,
        doc.get_string("audioUrl"),
        doc.get_string("explanation"),
    )
    .with_word(doc.get_string("word"))
    .with_phonetic_text(doc.get_string("phoneticText"));

    debug!("Added question: {}", question.question_text);
    Some(match doc.get_string("exampleText") {
        Some(example) => question.with_example_text(example),
        None => question,
    })
}

/// In-process [`DocumentStore`] keyed by full document path.
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<BTreeMap<String, Map<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `fields` (a JSON object) at `path`. Non-objects are stored empty.
    pub fn insert(&self, path: &str, fields: Value) {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.put(path, fields);
    }

    pub fn len(&self) -> usize {
        match self.documents.lock() {
            Ok(documents) => documents.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn put(&self, path: &str, fields: Map<String, Value>) {
        let mut documents = match self.documents.lock() {
            Ok(documents) => documents,
            Err(poisoned) => poisoned.into_inner(),
        };
        documents.insert(path.trim_matches('/').to_string(), fields);
    }
}

fn split_parent(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((parent, id)) => (parent, id),
        None => ("", path),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, path: &str) -> StoreResult<Option<Document>> {
        let path = path.trim_matches('/');
        let documents = match self.documents.lock() {
            Ok(documents) => documents,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(documents
            .get(path)
            .map(|fields| Document::new(split_parent(path).1, fields.clone())))
    }

    async fn list_documents(&self, collection_path: &str) -> StoreResult<Vec<Document>> {
        let collection_path = collection_path.trim_matches('/');
        let documents = match self.documents.lock() {
            Ok(documents) => documents,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(documents
            .iter()
            .filter(|(path, _)| split_parent(path).0 == collection_path)
            .map(|(path, fields)| Document::new(split_parent(path).1, fields.clone()))
            .collect())
    }

    async fn set_document(&self, path: &str, fields: Map<String, Value>) -> StoreResult<()> {
        self.put(path, fields);
        Ok(())
    }
}
