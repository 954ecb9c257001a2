use std::sync::{Arc, Weak};

use async_trait::async_trait;
use dotenv::dotenv;
use log::{debug, info};
use teloxide::{
    dispatching::dialogue::{serializer::Json, ErasedStorage, SqliteStorage, Storage},
    prelude::*,
    types::{
        ChatAction, InputFile, KeyboardButton, KeyboardMarkup, KeyboardRemove, ParseMode,
        ReplyMarkup,
    },
    utils::html,
};

use toeic_bot::config::Config;
use toeic_bot::quiz::loader::{LaunchOutcome, TestLoader};
use toeic_bot::quiz::{ExamLaunch, ExamLauncher, LaunchResult, Question};
use toeic_bot::vocabulary::{VocabularyItem, VocabularyLoader};
use toeic_bot::youtube::{self, WebSettings, WebSurface};

type ExamDialogue = Dialogue<State, ErasedStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type DialogueStorage = Arc<ErasedStorage<State>>;

#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    ReceiveChoice,
    ReceiveLessonId,
    Exam {
        exam: ExamLaunch,
        question_number: usize,
        score: usize,
    },
}

#[tokio::main]
async fn main() -> HandlerResult {
    dotenv().ok();
    pretty_env_logger::init();
    log::info!("Starting TOEIC38 bot...");

    let config = Config::from_env()?;
    let bot = Bot::from_env();

    info!("Opening dialogue storage at {}", config.dialogue_db);
    let storage: DialogueStorage = SqliteStorage::open(&config.dialogue_db, Json)
        .await
        .map_err(|e| format!("Failed to open dialogue storage: {}", e))?
        .erase();

    let loader = Arc::new(TestLoader::new(config.test_source()?));
    let vocabulary = Arc::new(VocabularyLoader::new(config.assets()));

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .enter_dialogue::<Message, ErasedStorage<State>, State>()
            .branch(dptree::case![State::Start].endpoint(start))
            .branch(dptree::case![State::ReceiveChoice].endpoint(receive_choice))
            .branch(dptree::case![State::ReceiveLessonId].endpoint(receive_lesson_id))
            .branch(
                dptree::case![State::Exam {
                    exam,
                    question_number,
                    score
                }]
                .endpoint(exam_question),
            ),
    )
    .dependencies(dptree::deps![storage, loader, vocabulary])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;

    Ok(())
}

const GREETING_TEXT: &str = "Hi! I'm the TOEIC38 study bot. Pick a practice test, browse the vocabulary, or send me a YouTube link to watch.";
const CHOOSE_TEXT: &str = "Please choose one of the options";

const LISTENING: &str = "Listening";
const READING: &str = "Reading";
const WRITING: &str = "Writing";
const SPEAKING: &str = "Speaking";
const VOCABULARY: &str = "Vocabulary";
const ALL_LESSONS: &str = "All lessons";
const START_EXAM: &str = "Start!";

// Telegram rejects longer messages.
const MESSAGE_LIMIT: usize = 4000;

fn main_menu() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(LISTENING), KeyboardButton::new(READING)],
        vec![KeyboardButton::new(WRITING), KeyboardButton::new(SPEAKING)],
        vec![KeyboardButton::new(VOCABULARY)],
    ])
}

fn test_type_for(choice: &str) -> Option<&'static str> {
    match choice {
        LISTENING => Some("listening"),
        READING => Some("reading"),
        WRITING => Some("writing"),
        SPEAKING => Some("speaking"),
        _ => None,
    }
}

async fn start(bot: Bot, dialogue: ExamDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, GREETING_TEXT)
        .reply_markup(main_menu())
        .await?;

    dialogue.update(State::ReceiveChoice).await?;
    Ok(())
}

async fn receive_choice(
    bot: Bot,
    dialogue: ExamDialogue,
    msg: Message,
    loader: Arc<TestLoader>,
    vocabulary: Arc<VocabularyLoader>,
) -> HandlerResult {
    let text = match msg.text() {
        Some(text) => text.trim(),
        None => {
            bot.send_message(msg.chat.id, CHOOSE_TEXT).await?;
            return Ok(());
        }
    };

    if let Some(test_type) = test_type_for(text) {
        // Only cosmetic, so a failure here doesn't matter
        let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;

        let launcher = Arc::new(ChatExamLauncher {
            bot: bot.clone(),
            dialogue: dialogue.clone(),
            chat_id: msg.chat.id,
        });
        let destination = Arc::downgrade(&launcher) as Weak<dyn ExamLauncher>;
        let outcome = loader.start_test(test_type, destination).await;
        match outcome {
            LaunchOutcome::Launched(count) => {
                debug!("Chat {} started {} test ({} questions)", msg.chat.id, test_type, count)
            }
            // Failed loads stay silent; the menu is still there.
            other => debug!("{} test for chat {} not started: {:?}", test_type, msg.chat.id, other),
        }
        return Ok(());
    }

    if text == VOCABULARY {
        let mut rows = vec![vec![KeyboardButton::new(ALL_LESSONS)]];
        for lesson in vocabulary.lessons().await {
            rows.push(vec![KeyboardButton::new(lesson)]);
        }
        bot.send_message(msg.chat.id, "Which lesson? Pick one or type its id.")
            .reply_markup(KeyboardMarkup::new(rows))
            .await?;
        dialogue.update(State::ReceiveLessonId).await?;
        return Ok(());
    }

    if youtube::is_youtube_url(Some(text)) {
        send_player(&bot, msg.chat.id, text).await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, CHOOSE_TEXT)
        .reply_markup(main_menu())
        .await?;
    Ok(())
}

async fn receive_lesson_id(
    bot: Bot,
    dialogue: ExamDialogue,
    msg: Message,
    vocabulary: Arc<VocabularyLoader>,
) -> HandlerResult {
    let lesson_id = match msg.text().map(str::trim) {
        Some(ALL_LESSONS) => None,
        Some(id) if !id.is_empty() => Some(id.to_string()),
        _ => {
            bot.send_message(msg.chat.id, "Please send a lesson id (as text)")
                .await?;
            return Ok(());
        }
    };

    let items = vocabulary.load(lesson_id.as_deref()).await;
    let title = match &lesson_id {
        Some(id) => format!("<b>Vocabulary for {}</b> ({} words)", html::escape(id), items.len()),
        None => format!("<b>All vocabulary</b> ({} words)", items.len()),
    };

    for chunk in vocabulary_messages(&title, &items) {
        bot.send_message(msg.chat.id, chunk)
            .parse_mode(ParseMode::Html)
            .reply_markup(main_menu())
            .await?;
    }

    dialogue.update(State::ReceiveChoice).await?;
    Ok(())
}

fn vocabulary_line(item: &VocabularyItem) -> String {
    if item.phonetic.is_empty() {
        return format!("• <b>{}</b> - {}", html::escape(&item.english), html::escape(&item.vietnamese));
    }
    format!(
        "• <b>{}</b> <i>{}</i> - {}",
        html::escape(&item.english),
        html::escape(&item.phonetic),
        html::escape(&item.vietnamese)
    )
}

fn vocabulary_messages(title: &str, items: &[VocabularyItem]) -> Vec<String> {
    let mut messages = Vec::new();
    let mut current = title.to_string();
    for item in items {
        let line = vocabulary_line(item);
        if current.len() + line.len() + 1 > MESSAGE_LIMIT {
            messages.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(&line);
    }
    if !current.is_empty() {
        messages.push(current);
    }
    messages
}

/// Puts a loaded test in front of the chat as an exam dialogue.
struct ChatExamLauncher {
    bot: Bot,
    dialogue: ExamDialogue,
    chat_id: ChatId,
}

#[async_trait]
impl ExamLauncher for ChatExamLauncher {
    async fn launch(&self, exam: ExamLaunch) -> LaunchResult {
        let intro = format!(
            "<b>{}</b>\n{}\n\n{} questions. Ready?",
            html::escape(&exam.test_name),
            html::escape(&exam.test_description),
            exam.questions.len()
        );
        self.bot
            .send_message(self.chat_id, intro)
            .parse_mode(ParseMode::Html)
            .reply_markup(KeyboardMarkup::new(vec![vec![KeyboardButton::new(START_EXAM)]]))
            .await?;

        self.dialogue
            .update(State::Exam {
                exam,
                question_number: 0,
                score: 0,
            })
            .await?;
        Ok(())
    }
}

async fn exam_question(
    bot: Bot,
    dialogue: ExamDialogue,
    (exam, question_number, score): (ExamLaunch, usize, usize),
    msg: Message,
) -> HandlerResult {
    let mut current_score = score;
    if question_number != 0 {
        if let Some(question) = exam.questions.get(question_number - 1) {
            let answer = msg.text().unwrap_or_default().trim();
            match question.correct_option() {
                Some(correct) if answer == correct => {
                    bot.send_message(msg.chat.id, "Correct!").await?;
                    current_score += 1;
                }
                Some(correct) => {
                    let mut reply = format!("Incorrect. The correct answer is: {}", correct);
                    if let Some(explanation) = question.explanation.as_deref().filter(|e| !e.is_empty()) {
                        reply.push_str("\n\n");
                        reply.push_str(explanation);
                    }
                    bot.send_message(msg.chat.id, reply).await?;
                }
                None => {
                    bot.send_message(msg.chat.id, "Answer recorded.").await?;
                }
            }
        }
    }

    if question_number >= exam.questions.len() {
        let summary = format!(
            "Test finished! You answered {} of {} questions correctly.\nWhat would you like to do next?",
            current_score,
            exam.questions.len()
        );
        bot.send_message(msg.chat.id, summary)
            .reply_markup(main_menu())
            .await?;

        dialogue.update(State::ReceiveChoice).await?;
        return Ok(());
    }

    let question = &exam.questions[question_number];
    bot.send_message(msg.chat.id, question_message(question_number, question))
        .parse_mode(ParseMode::Html)
        .reply_markup(answer_markup(question))
        .await?;

    dialogue
        .update(State::Exam {
            exam,
            question_number: question_number + 1,
            score: current_score,
        })
        .await?;
    Ok(())
}

// Telegram rejects an empty reply keyboard.
fn answer_markup(question: &Question) -> ReplyMarkup {
    if question.options.is_empty() {
        return ReplyMarkup::KeyboardRemove(KeyboardRemove::new());
    }
    ReplyMarkup::Keyboard(KeyboardMarkup::new(
        question
            .options
            .iter()
            .map(|option| vec![KeyboardButton::new(option.clone())])
            .collect::<Vec<_>>(),
    ))
}

fn question_message(question_number: usize, question: &Question) -> String {
    let mut text = format!(
        "Question {}:\n{}",
        question_number + 1,
        html::escape(&question.question_text)
    );
    let word = question.word.as_deref().unwrap_or_default();
    let phonetic = question.phonetic_text.as_deref().unwrap_or_default();
    if !word.is_empty() && question.question_type == "speaking" {
        text.push_str(&format!("\n\n<b>{}</b> <i>{}</i>", html::escape(word), html::escape(phonetic)));
    }
    if let Some(audio) = question.audio_url.as_deref().filter(|a| !a.is_empty()) {
        text.push_str(&format!("\n\n<a href=\"{}\">Listen</a>", html::escape(audio)));
    }
    if question.options.is_empty() {
        text.push_str("\n\nType your answer to continue.");
    }
    text
}

/// Collects the player page instead of rendering it.
#[derive(Default)]
struct HtmlAttachment {
    visible: bool,
    settings: WebSettings,
    html: Option<String>,
}

impl WebSurface for HtmlAttachment {
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn apply_settings(&mut self, settings: WebSettings) {
        self.settings = settings;
    }

    fn load_html(&mut self, html: &str, _mime_type: &str, _encoding: &str) {
        self.html = Some(html.to_string());
    }
}

async fn send_player(bot: &Bot, chat_id: ChatId, url: &str) -> HandlerResult {
    let mut page = HtmlAttachment::default();
    if !youtube::load_youtube_video(Some(&mut page), None, Some(url)) {
        bot.send_message(chat_id, CHOOSE_TEXT)
            .reply_markup(main_menu())
            .await?;
        return Ok(());
    }

    let (html, video_id) = match (page.html.take(), youtube::extract_video_id(Some(url))) {
        (Some(html), Some(video_id)) => (html, video_id),
        _ => return Ok(()),
    };
    debug!(
        "Sending player page for {} (visible: {}, scripts enabled: {})",
        video_id, page.visible, page.settings.javascript_enabled
    );

    bot.send_document(
        chat_id,
        InputFile::memory(html.into_bytes()).file_name(format!("{}.html", video_id)),
    )
    .caption(youtube::watch_url(&video_id))
    .await?;
    Ok(())
}
