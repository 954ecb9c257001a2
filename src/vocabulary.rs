//! Vocabulary lists read from the bundled lesson files.

use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::assets::Assets;
use crate::error::{LoadError, LoadResult};

pub const COMBINED_FILE: &str = "toeic38_all_vocabulary.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyItem {
    pub english: String,
    pub vietnamese: String,
    pub phonetic: String,
}

impl VocabularyItem {
    pub fn new(english: &str, vietnamese: &str, phonetic: &str) -> Self {
        Self {
            english: english.to_string(),
            vietnamese: vietnamese.to_string(),
            phonetic: phonetic.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct VocabularyFile {
    vocabulary: Option<Vec<Value>>,
}

// Entries are read field by field so one odd value does not sink the file.
#[derive(Debug)]
struct RawEntry {
    english: String,
    vietnamese: String,
    phonetic: String,
    lesson_id: Option<String>,
}

impl RawEntry {
    fn from_value(value: &Value) -> Option<Self> {
        let object = match value.as_object() {
            Some(object) => object,
            None => {
                debug!("Skipping vocabulary entry that is not an object: {}", value);
                return None;
            }
        };
        let text = |key: &str| object.get(key).and_then(scalar_text).unwrap_or_default();

        Some(Self {
            english: text("english"),
            vietnamese: text("vietnamese"),
            phonetic: text("phonetic"),
            lesson_id: object.get("lessonId").and_then(scalar_text),
        })
    }

    fn into_item(self) -> VocabularyItem {
        VocabularyItem {
            english: self.english,
            vietnamese: self.vietnamese,
            phonetic: self.phonetic,
        }
    }
}

// Null and structured values have no text; numbers and booleans do.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn read_entries(json: &str) -> serde_json::Result<Option<Vec<RawEntry>>> {
    let file: VocabularyFile = serde_json::from_str(json)?;
    Ok(file
        .vocabulary
        .map(|values| values.iter().filter_map(RawEntry::from_value).collect()))
}

/// File looked up first for a lesson.
pub fn candidate_file(lesson_id: Option<&str>) -> String {
    match lesson_id {
        Some(id) => format!("{}_vocabulary.json", id),
        None => COMBINED_FILE.to_string(),
    }
}

/// Words shown when nothing could be loaded from the assets.
pub fn sample_vocabulary() -> Vec<VocabularyItem> {
    vec![
        VocabularyItem::new("agenda", "chương trình nghị sự", "/əˈdʒendə/"),
        VocabularyItem::new("minutes", "biên bản cuộc họp", "/ˈmɪnɪts/"),
        VocabularyItem::new("attendee", "người tham dự", "/ˌætenˈdiː/"),
        VocabularyItem::new("postpone", "hoãn lại", "/pəʊstˈpəʊn/"),
        VocabularyItem::new("consensus", "sự đồng thuận", "/kənˈsensəs/"),
    ]
}

pub struct VocabularyLoader {
    assets: Assets,
}

impl VocabularyLoader {
    pub fn new(assets: Assets) -> Self {
        Self { assets }
    }

    /// Vocabulary for `lesson_id`, or for every lesson when it is `None`.
    ///
    /// Never empty: any failure falls back to [`sample_vocabulary`].
    pub async fn load(&self, lesson_id: Option<&str>) -> Vec<VocabularyItem> {
        let file_name = candidate_file(lesson_id);
        debug!("Loading vocabulary from assets: {}", file_name);

        let (json, lesson_scoped) = match self.assets.read_to_string(&file_name).await {
            Ok(json) => (json, lesson_id.is_some()),
            Err(e) => {
                warn!("{}", e);
                match self.assets.read_to_string(COMBINED_FILE).await {
                    Ok(json) => (json, false),
                    Err(e) => {
                        error!("Could not load vocabulary from assets: {}", e);
                        return sample_vocabulary();
                    }
                }
            }
        };

        match parse_vocabulary(&json, lesson_id, lesson_scoped) {
            Ok(items) if !items.is_empty() => items,
            Ok(_) => {
                warn!("No vocabulary found for lesson {:?}, using sample data", lesson_id);
                sample_vocabulary()
            }
            Err(e) => {
                error!("Error loading vocabulary from assets: {}", e);
                sample_vocabulary()
            }
        }
    }

    /// Every entry of the combined file, with no sample fallback.
    ///
    /// For tooling that must not mistake the samples for real content.
    pub async fn load_combined(&self) -> LoadResult<Vec<VocabularyItem>> {
        let json = self.assets.read_to_string(COMBINED_FILE).await?;
        let entries = read_entries(&json)?.ok_or_else(|| {
            LoadError::Malformed(format!("{} has no vocabulary array", COMBINED_FILE))
        })?;
        if entries.is_empty() {
            return Err(LoadError::Malformed(format!("{} has no entries", COMBINED_FILE)));
        }
        Ok(entries.into_iter().map(RawEntry::into_item).collect())
    }

    /// Lesson ids present in the combined file, in order of first appearance.
    pub async fn lessons(&self) -> Vec<String> {
        let json = match self.assets.read_to_string(COMBINED_FILE).await {
            Ok(json) => json,
            Err(e) => {
                warn!("{}", e);
                return Vec::new();
            }
        };
        let entries = match read_entries(&json) {
            Ok(entries) => entries.unwrap_or_default(),
            Err(e) => {
                error!("Error parsing {}: {}", COMBINED_FILE, e);
                return Vec::new();
            }
        };

        let mut lessons: Vec<String> = Vec::new();
        for entry in entries {
            if let Some(id) = entry.lesson_id {
                if !lessons.contains(&id) {
                    lessons.push(id);
                }
            }
        }
        lessons
    }
}

// A lesson-specific file is taken as is; the combined file is filtered by lesson.
fn parse_vocabulary(
    json: &str,
    lesson_id: Option<&str>,
    lesson_scoped: bool,
) -> serde_json::Result<Vec<VocabularyItem>> {
    let entries = match read_entries(json)? {
        Some(entries) => entries,
        None => return Ok(Vec::new()),
    };

    if lesson_scoped {
        return Ok(entries.into_iter().map(RawEntry::into_item).collect());
    }

    Ok(entries
        .into_iter()
        .filter(|entry| match lesson_id {
            Some(id) => entry.lesson_id.as_deref() == Some(id),
            None => true,
        })
        .map(RawEntry::into_item)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const COMBINED: &str = r#"{
        "courseId": "toeic38",
        "vocabulary": [
            {"english": "agenda", "vietnamese": "chương trình", "phonetic": "/əˈdʒendə/", "lessonId": "L1"},
            {"english": "quorum", "vietnamese": "số đại biểu", "lessonId": "L2"},
            {"english": "adjourn", "vietnamese": "hoãn", "phonetic": "/əˈdʒɜːn/", "lessonId": "L3"}
        ]
    }"#;

    fn assets_with(files: &[(&str, &str)]) -> (tempfile::TempDir, VocabularyLoader) {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            fs::write(dir.path().join(name), body).unwrap();
        }
        let loader = VocabularyLoader::new(Assets::new(dir.path()));
        (dir, loader)
    }

    #[test]
    fn candidate_file_names() {
        assert_eq!(candidate_file(Some("L1")), "L1_vocabulary.json");
        assert_eq!(candidate_file(None), "toeic38_all_vocabulary.json");
    }

    #[tokio::test]
    async fn combined_file_is_filtered_by_lesson() {
        let (_dir, loader) = assets_with(&[(COMBINED_FILE, COMBINED)]);

        let items = loader.load(Some("L1")).await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].english, "agenda");
    }

    #[tokio::test]
    async fn lesson_file_is_taken_whole() {
        let lesson = r#"{"lessonId": "L2", "vocabulary": [
            {"english": "quorum", "vietnamese": "số đại biểu"},
            {"english": "motion", "vietnamese": "kiến nghị", "phonetic": "/ˈməʊʃn/"}
        ]}"#;
        let (_dir, loader) = assets_with(&[("L2_vocabulary.json", lesson), (COMBINED_FILE, COMBINED)]);

        let items = loader.load(Some("L2")).await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0], VocabularyItem::new("quorum", "số đại biểu", ""));
        assert_eq!(items[1].phonetic, "/ˈməʊʃn/");
    }

    #[tokio::test]
    async fn no_lesson_keeps_everything() {
        let (_dir, loader) = assets_with(&[(COMBINED_FILE, COMBINED)]);
        let items = loader.load(None).await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].phonetic, "");
    }

    #[tokio::test]
    async fn missing_assets_fall_back_to_samples() {
        let (_dir, loader) = assets_with(&[]);
        let items = loader.load(Some("L1")).await;
        assert_eq!(items, sample_vocabulary());
        assert!(!items.is_empty());
    }

    #[tokio::test]
    async fn unknown_lesson_and_broken_json_fall_back_to_samples() {
        let (_dir, loader) = assets_with(&[(COMBINED_FILE, COMBINED)]);
        assert_eq!(loader.load(Some("L9")).await, sample_vocabulary());

        let (_dir, loader) = assets_with(&[(COMBINED_FILE, "{\"vocabulary\": [")]);
        assert_eq!(loader.load(None).await, sample_vocabulary());

        let (_dir, loader) = assets_with(&[(COMBINED_FILE, "{\"words\": []}")]);
        assert_eq!(loader.load(None).await, sample_vocabulary());
    }

    #[tokio::test]
    async fn odd_field_values_do_not_discard_the_file() {
        let combined = r#"{"vocabulary": [
            {"english": "agenda", "vietnamese": "chương trình", "phonetic": null, "lessonId": "L1"},
            {"english": "quorum", "vietnamese": "số đại biểu", "lessonId": 3},
            {"english": "adjourn", "vietnamese": null, "phonetic": ["/əˈdʒɜːn/"]},
            "not an entry"
        ]}"#;
        let (_dir, loader) = assets_with(&[(COMBINED_FILE, combined)]);

        let items = loader.load(None).await;
        let words: Vec<_> = items.iter().map(|i| i.english.as_str()).collect();
        assert_eq!(words, vec!["agenda", "quorum", "adjourn"]);
        assert_eq!(items[0].phonetic, "");
        assert_eq!(items[2].vietnamese, "");

        assert_eq!(loader.load(Some("3")).await, vec![VocabularyItem::new("quorum", "số đại biểu", "")]);
        assert_eq!(loader.lessons().await, vec!["L1", "3"]);
    }

    #[tokio::test]
    async fn combined_load_reports_failures_instead_of_samples() {
        let (_dir, loader) = assets_with(&[]);
        assert!(matches!(loader.load_combined().await, Err(LoadError::Asset(_))));

        let (_dir, loader) = assets_with(&[(COMBINED_FILE, "{\"vocabulary\": [")]);
        assert!(matches!(loader.load_combined().await, Err(LoadError::Malformed(_))));

        let (_dir, loader) = assets_with(&[(COMBINED_FILE, "{\"words\": []}")]);
        assert!(matches!(loader.load_combined().await, Err(LoadError::Malformed(_))));

        let (_dir, loader) = assets_with(&[(COMBINED_FILE, "{\"vocabulary\": []}")]);
        assert!(matches!(loader.load_combined().await, Err(LoadError::Malformed(_))));

        let (_dir, loader) = assets_with(&[(COMBINED_FILE, COMBINED)]);
        assert_eq!(loader.load_combined().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn lessons_are_listed_in_order() {
        let (_dir, loader) = assets_with(&[(COMBINED_FILE, COMBINED)]);
        assert_eq!(loader.lessons().await, vec!["L1", "L2", "L3"]);
    }
}
