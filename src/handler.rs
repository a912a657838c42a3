use std::path::PathBuf;
use std::sync::Arc;

use teloxide::types::{ChatId, UserId};

use crate::error::QuizError;
use crate::messenger::{Format, Messenger};
use crate::quiz::evaluate::{self, Evaluation, INVALID_ANSWER_NOTICE};
use crate::quiz::picker::{normalize, Picker};
use crate::quiz::render::{Outbound, Renderer};
use crate::quiz::{self, Question, Topic};
use crate::store::{QuizSession, QuizStore};

/// Serves questions and checks answers for every user of the bot.
///
/// Owns the pick history, so one instance should live as long as the bot.
pub struct QuizHandler {
    store: Arc<dyn QuizStore>,
    messenger: Arc<dyn Messenger>,
    picker: Picker,
    renderer: Renderer,
    questions_dir: PathBuf,
}

impl QuizHandler {
    pub fn new(
        store: Arc<dyn QuizStore>,
        messenger: Arc<dyn Messenger>,
        renderer: Renderer,
        questions_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            messenger,
            picker: Picker::new(),
            renderer,
            questions_dir,
        }
    }

    pub fn topics(&self) -> std::io::Result<Vec<String>> {
        quiz::list_topics(&self.questions_dir)
    }

    /// Makes `topic` the user's current quiz, after checking it can be loaded.
    /// Returns `false` if the user was told why it could not.
    pub async fn start_quiz(&self, user: UserId, topic: &str) -> Result<bool, QuizError> {
        let started = self.try_start_quiz(user, topic).await.map(|()| true);
        self.settle(user, started).await
    }

    /// Picks a fresh question from the user's topic and sends it.
    pub async fn send_question(&self, user: UserId) -> Result<bool, QuizError> {
        let sent = self.try_send_question(user).await.map(|()| true);
        self.settle(user, sent).await
    }

    /// Checks `reply` against the last question served to the user.
    ///
    /// Returns `true` once the answer is recorded. `false` means nothing was
    /// recorded: the user got a notice, or the first question of the topic.
    pub async fn check_answer(&self, user: UserId, reply: &str) -> Result<bool, QuizError> {
        let checked = self.try_check_answer(user, reply).await;
        self.settle(user, checked).await
    }

    /// Sends the user's counters, percentages and streak.
    pub async fn send_stats(&self, user: UserId) -> Result<bool, QuizError> {
        let sent = self.try_send_stats(user).await.map(|()| true);
        self.settle(user, sent).await
    }

    async fn try_send_stats(&self, user: UserId) -> Result<(), QuizError> {
        let stats = self.store.stats(user).await?;
        let streak = self.store.streak(user).await?;
        self.notify(user, &evaluate::stats_message(&stats, streak))
            .await
    }

    async fn try_start_quiz(&self, user: UserId, topic: &str) -> Result<(), QuizError> {
        let topic = Topic::load(&self.questions_dir, topic)?;
        self.store.start_quiz(user, &topic.name).await?;
        log::info!("user {} started quiz {}", user.0, topic.name);
        Ok(())
    }

    async fn try_send_question(&self, user: UserId) -> Result<(), QuizError> {
        let (topic, index) = self.load_question(user).await?;
        let plan = self.renderer.render(&topic.questions[index])?;
        self.deliver(user, plan).await
    }

    async fn try_check_answer(&self, user: UserId, reply: &str) -> Result<bool, QuizError> {
        let session = self.session(user).await?;
        let Some(last) = session.last_question else {
            // Nothing asked yet in this topic, so the text cannot be an answer.
            self.try_send_question(user).await?;
            return Ok(false);
        };
        let topic = Topic::load(&self.questions_dir, &session.topic)?;
        let index = normalize(last as i64, topic.len());
        let question: &Question = &topic.questions[index];

        match evaluate::evaluate(self.store.as_ref(), user, question, reply).await? {
            Evaluation::Rejected => {
                self.notify(user, INVALID_ANSWER_NOTICE).await?;
                Ok(false)
            }
            Evaluation::Accepted { outcome, message } => {
                log::debug!("user {} answered question {index}: {outcome:?}", user.0);
                self.messenger
                    .send_text(chat(user), &message, Format::Html)
                    .await?;
                Ok(true)
            }
        }
    }

    async fn session(&self, user: UserId) -> Result<QuizSession, QuizError> {
        self.store
            .quiz_session(user)
            .await?
            .ok_or(QuizError::NoSession(user.0))
    }

    /// Loads the user's topic and picks a fresh question from it. Nothing is
    /// recorded unless the topic loads.
    async fn load_question(&self, user: UserId) -> Result<(Topic, usize), QuizError> {
        let session = self.session(user).await?;
        let topic = Topic::load(&self.questions_dir, &session.topic)?;
        let index = self.picker.pick(user, &topic.name, topic.len(), None);
        self.store.set_last_question(user, index).await?;
        Ok((topic, index))
    }

    async fn deliver(&self, user: UserId, plan: Vec<Outbound>) -> Result<(), QuizError> {
        let chat = chat(user);
        for item in plan {
            match item {
                Outbound::Text(text) => {
                    self.messenger.send_text(chat, &text, Format::Html).await?
                }
                Outbound::Photo { image, caption } => {
                    self.messenger
                        .send_image(chat, image, caption.as_deref())
                        .await?
                }
                Outbound::Choices { prompt, labels } => {
                    self.messenger.send_choices(chat, &prompt, &labels).await?
                }
            }
        }
        Ok(())
    }

    async fn notify(&self, user: UserId, notice: &str) -> Result<(), QuizError> {
        self.messenger
            .send_text(chat(user), notice, Format::Plain)
            .await
    }

    /// Reports a failed step to the user. Only a failure to deliver the
    /// report itself is passed on.
    async fn settle(&self, user: UserId, result: Result<bool, QuizError>) -> Result<bool, QuizError> {
        match result {
            Ok(done) => Ok(done),
            Err(err) => {
                log::warn!("quiz handling for user {} failed: {err}", user.0);
                self.notify(user, err.user_notice()).await?;
                Ok(false)
            }
        }
    }
}

fn chat(user: UserId) -> ChatId {
    ChatId::from(user)
}
