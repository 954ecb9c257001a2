//! Builds the bundled test file out of the lesson vocabulary.

use std::collections::BTreeMap;

use log::{info, warn};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::quiz::bundled::{PartDocument, QuestionRecord, TestDocument};
use crate::quiz::Part;
use crate::vocabulary::VocabularyItem;

pub const QUESTIONS_PER_PART: usize = 10;
const DISTRACTORS: usize = 3;

pub const TEST_NAME: &str = "TOEIC38 Vocabulary Practice Test";
pub const TEST_DESCRIPTION: &str = "Luyện tập từ vựng TOEIC về Business Meetings";

const BLANK: &str = "_____";

const SENTENCE_TEMPLATES: [&str; 5] = [
    "We need to _____ a meeting with the clients next week.",
    "Please _____ the document before sending it to the manager.",
    "The team will _____ the new project next month.",
    "Can you _____ this information in your report?",
    "Our company needs to _____ new employees for the project.",
];

pub fn generate_test_document<R: Rng + ?Sized>(
    vocabulary: &[VocabularyItem],
    rng: &mut R,
) -> TestDocument {
    let usable: Vec<VocabularyItem> = vocabulary
        .iter()
        .filter(|v| !v.english.trim().is_empty() && !v.vietnamese.trim().is_empty())
        .cloned()
        .collect();
    if usable.len() < vocabulary.len() {
        warn!(
            "Skipped {} vocabulary items without english or vietnamese text",
            vocabulary.len() - usable.len()
        );
    }

    let mut parts = BTreeMap::new();
    for part in Part::ALL {
        let questions = match part {
            Part::Part1 => listening_questions(&usable, rng),
            Part::Part2 => reading_questions(&usable, rng),
            Part::Part3 => writing_questions(&usable, rng),
            Part::Part4 => speaking_questions(&usable, rng),
        };
        info!("Generated {} {} questions", questions.len(), part.test_type());
        let (title, description) = part_heading(part);
        parts.insert(
            part,
            PartDocument {
                title: Some(title.to_string()),
                description: Some(description.to_string()),
                questions,
            },
        );
    }

    TestDocument {
        name_test: TEST_NAME.to_string(),
        description: TEST_DESCRIPTION.to_string(),
        parts,
    }
}

fn part_heading(part: Part) -> (&'static str, &'static str) {
    match part {
        Part::Part1 => (
            "Listening Practice",
            "Listen to the word and select the correct meaning",
        ),
        Part::Part2 => (
            "Reading Practice",
            "Read and understand the vocabulary meaning",
        ),
        Part::Part3 => (
            "Writing Practice",
            "Complete sentences with appropriate vocabulary",
        ),
        Part::Part4 => (
            "Speaking Practice",
            "Practice pronunciation and using vocabulary in context",
        ),
    }
}

// Shuffled copy of the vocabulary, cut to one part's worth of questions.
fn pick_words<R: Rng + ?Sized>(vocabulary: &[VocabularyItem], rng: &mut R) -> Vec<VocabularyItem> {
    let mut words = vocabulary.to_vec();
    words.shuffle(rng);
    words.truncate(QUESTIONS_PER_PART);
    words
}

/// Up to three distinct values of `field`, none equal to `answer`.
fn distractors<R: Rng + ?Sized>(
    vocabulary: &[VocabularyItem],
    answer: &str,
    field: fn(&VocabularyItem) -> &str,
    rng: &mut R,
) -> Vec<String> {
    let mut candidates: Vec<&str> = Vec::new();
    for item in vocabulary {
        let value = field(item);
        if value != answer && !candidates.contains(&value) {
            candidates.push(value);
        }
    }
    candidates
        .choose_multiple(rng, DISTRACTORS)
        .map(|s| s.to_string())
        .collect()
}

// Answer plus distractors in random order, with the index of the answer.
fn shuffled_options<R: Rng + ?Sized>(
    answer: &str,
    wrong: Vec<String>,
    rng: &mut R,
) -> (Vec<String>, i64) {
    let mut options = vec![answer.to_string()];
    options.extend(wrong);
    options.shuffle(rng);
    let correct = options.iter().position(|o| o == answer).unwrap_or(0);
    (options, correct as i64)
}

fn record(question_text: String, options: Vec<String>, correct_answer: i64, part: Part) -> QuestionRecord {
    QuestionRecord {
        question_text,
        options,
        correct_answer,
        audio_url: None,
        explanation: None,
        word: None,
        phonetic_text: None,
        example_text: None,
        question_type: Some(part.test_type().to_string()),
    }
}

fn english(item: &VocabularyItem) -> &str {
    &item.english
}

fn vietnamese(item: &VocabularyItem) -> &str {
    &item.vietnamese
}

fn listening_questions<R: Rng + ?Sized>(vocabulary: &[VocabularyItem], rng: &mut R) -> Vec<QuestionRecord> {
    pick_words(vocabulary, rng)
        .into_iter()
        .map(|word| {
            let wrong = distractors(vocabulary, &word.english, english, rng);
            let (options, correct) = shuffled_options(&word.english, wrong, rng);
            QuestionRecord {
                audio_url: Some(String::new()),
                explanation: Some(format!(
                    "Từ bạn nghe là '{}' ({}) có nghĩa là '{}'.",
                    word.english, word.phonetic, word.vietnamese
                )),
                word: Some(word.english.clone()),
                phonetic_text: Some(word.phonetic.clone()),
                ..record(
                    "Bạn nghe từ. Chọn từ tiếng Anh đúng với từ bạn vừa nghe.".to_string(),
                    options,
                    correct,
                    Part::Part1,
                )
            }
        })
        .collect()
}

fn reading_questions<R: Rng + ?Sized>(vocabulary: &[VocabularyItem], rng: &mut R) -> Vec<QuestionRecord> {
    pick_words(vocabulary, rng)
        .into_iter()
        .map(|word| {
            let wrong = distractors(vocabulary, &word.vietnamese, vietnamese, rng);
            let (options, correct) = shuffled_options(&word.vietnamese, wrong, rng);
            QuestionRecord {
                explanation: Some(format!(
                    "'{}' ({}) có nghĩa là '{}'.",
                    word.english, word.phonetic, word.vietnamese
                )),
                word: Some(word.english.clone()),
                phonetic_text: Some(word.phonetic.clone()),
                ..record(
                    format!("Đâu là nghĩa của '{}' ({})?", word.english, word.phonetic),
                    options,
                    correct,
                    Part::Part2,
                )
            }
        })
        .collect()
}

fn writing_questions<R: Rng + ?Sized>(vocabulary: &[VocabularyItem], rng: &mut R) -> Vec<QuestionRecord> {
    pick_words(vocabulary, rng)
        .into_iter()
        .map(|word| {
            let sentence = SENTENCE_TEMPLATES
                .choose(rng)
                .copied()
                .unwrap_or(SENTENCE_TEMPLATES[0]);
            let wrong = distractors(vocabulary, &word.english, english, rng);
            let (options, correct) = shuffled_options(&word.english, wrong, rng);
            QuestionRecord {
                explanation: Some(format!(
                    "Từ '{}' ({}) có nghĩa là '{}' và phù hợp để điền vào chỗ trống.",
                    word.english, word.phonetic, word.vietnamese
                )),
                word: Some(word.english.clone()),
                phonetic_text: Some(word.phonetic.clone()),
                example_text: Some(sentence.replace(BLANK, &word.english)),
                ..record(
                    format!("Hoàn thành câu sau bằng từ vựng phù hợp: '{}'", sentence),
                    options,
                    correct,
                    Part::Part3,
                )
            }
        })
        .collect()
}

fn speaking_questions<R: Rng + ?Sized>(vocabulary: &[VocabularyItem], rng: &mut R) -> Vec<QuestionRecord> {
    pick_words(vocabulary, rng)
        .into_iter()
        .map(|word| {
            let lower = word.english.to_lowercase();
            let contexts = [
                format!("Please {} the meeting for tomorrow.", lower),
                format!("We need to {} our strategy before the deadline.", lower),
                format!("The {} will be held in the main conference room.", lower),
                format!("Can you {} this information to the team?", lower),
                format!("Our company {} requires approval from management.", lower),
            ];
            let example = contexts.choose(rng).cloned().unwrap_or_default();

            // First option is the expected self-assessment.
            let options = vec![
                format!("I can pronounce '{}' correctly.", word.english),
                "I need more practice with this word.".to_string(),
                format!("Let me try again with '{}'.", word.english),
                format!("I understand how to use '{}' in a sentence.", word.english),
            ];

            QuestionRecord {
                audio_url: Some(String::new()),
                explanation: Some(format!(
                    "'{}' ({}) có nghĩa là '{}'.",
                    word.english, word.phonetic, word.vietnamese
                )),
                word: Some(word.english.clone()),
                phonetic_text: Some(word.phonetic.clone()),
                example_text: Some(example.clone()),
                ..record(
                    format!(
                        "Hãy phát âm từ '{}' ({}) và sử dụng nó trong câu sau: '{}'",
                        word.english, word.phonetic, example
                    ),
                    options,
                    0,
                    Part::Part4,
                )
            }
        })
        .collect()
}
