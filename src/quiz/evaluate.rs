use teloxide::types::UserId;

use crate::error::QuizError;
use crate::quiz::render::SKIP_LABEL;
use crate::quiz::Question;
use crate::store::{Outcome, QuizStats, QuizStore};

pub const INVALID_ANSWER_NOTICE: &str = "Risposta non valida";

/// What the user typed in reply to a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// 1-based option number, not yet range checked.
    Choice(i64),
    Skip,
    Invalid,
}

impl Reply {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.eq_ignore_ascii_case(SKIP_LABEL) {
            return Reply::Skip;
        }
        match text.parse::<i64>() {
            Ok(number) => Reply::Choice(number),
            Err(_) => Reply::Invalid,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// The reply was not an answer; nothing was recorded.
    Rejected,
    /// The reply was recorded; `message` is what to tell the user.
    Accepted { outcome: Outcome, message: String },
}

pub fn judge(question: &Question, reply: Reply) -> Option<Outcome> {
    match reply {
        Reply::Invalid => None,
        Reply::Skip => Some(Outcome::NotAnswered),
        Reply::Choice(number) if number == question.correct_number() as i64 => {
            Some(Outcome::Correct)
        }
        Reply::Choice(_) => Some(Outcome::Wrong),
    }
}

/// Records the user's reply to `question` and builds the feedback message.
pub async fn evaluate(
    store: &dyn QuizStore,
    user: UserId,
    question: &Question,
    reply: &str,
) -> Result<Evaluation, QuizError> {
    let Some(outcome) = judge(question, Reply::parse(reply)) else {
        return Ok(Evaluation::Rejected);
    };
    store.record(user, outcome).await?;

    let mut message = match outcome {
        Outcome::NotAnswered => format!(
            "🟡 La risposta corretta era la {}\n",
            question.correct_number()
        ),
        Outcome::Correct => format!(
            "✅ Risposta corretta!\n<code>Streak attuale: {}</code>\n",
            store.streak(user).await?
        ),
        Outcome::Wrong => format!(
            "❌ Risposta errata. La risposta corretta era la {}\n",
            question.correct_number()
        ),
    };
    message.push_str(&summary_line(&store.stats(user).await?));

    Ok(Evaluation::Accepted { outcome, message })
}

pub fn summary_line(stats: &QuizStats) -> String {
    format!(
        "<code>Correttezza: {:.2}% ({} / {})</code>",
        round_percent(stats.percent_correct),
        stats.correct,
        stats.total()
    )
}

pub fn stats_message(stats: &QuizStats, streak: u32) -> String {
    format!(
        "✅ Corrette: {} ({:.2}%)\n❌ Errate: {} ({:.2}%)\n🟡 Passate: {} ({:.2}%)\nStreak attuale: {}",
        stats.correct,
        round_percent(stats.percent_correct),
        stats.wrong,
        round_percent(stats.percent_wrong),
        stats.not_answered,
        round_percent(stats.percent_not_answered),
        streak
    )
}

pub fn round_percent(percent: f64) -> f64 {
    (percent * 100.0).round() / 100.0
}
