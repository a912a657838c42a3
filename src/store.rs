use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use teloxide::types::UserId;

use crate::error::QuizError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSession {
    pub topic: String,
    pub last_question: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Wrong,
    NotAnswered,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QuizStats {
    pub percent_correct: f64,
    pub percent_wrong: f64,
    pub percent_not_answered: f64,
    pub correct: u32,
    pub wrong: u32,
    pub not_answered: u32,
}

impl QuizStats {
    /// Derives the percentages from the counters; all zero when nothing
    /// has been answered yet.
    pub fn from_counts(correct: u32, wrong: u32, not_answered: u32) -> Self {
        let total = correct + wrong + not_answered;
        let percent = |count: u32| {
            if total == 0 {
                0.0
            } else {
                100.0 * f64::from(count) / f64::from(total)
            }
        };
        Self {
            percent_correct: percent(correct),
            percent_wrong: percent(wrong),
            percent_not_answered: percent(not_answered),
            correct,
            wrong,
            not_answered,
        }
    }

    pub fn total(&self) -> u32 {
        self.correct + self.wrong + self.not_answered
    }
}

/// Persistence for quiz sessions and per-user statistics.
#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn quiz_session(&self, user: UserId) -> Result<Option<QuizSession>, QuizError>;

    /// Switches `user` to `topic`, forgetting the last served question.
    async fn start_quiz(&self, user: UserId, topic: &str) -> Result<(), QuizError>;

    async fn set_last_question(&self, user: UserId, index: usize) -> Result<(), QuizError>;

    async fn record(&self, user: UserId, outcome: Outcome) -> Result<(), QuizError>;

    /// Consecutive correct answers up to now.
    async fn streak(&self, user: UserId) -> Result<u32, QuizError>;

    async fn stats(&self, user: UserId) -> Result<QuizStats, QuizError>;
}

#[derive(Debug, Default)]
struct UserRecord {
    session: Option<QuizSession>,
    correct: u32,
    wrong: u32,
    not_answered: u32,
    streak: u32,
}

/// Keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<UserId, UserRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_user<T>(&self, user: UserId, f: impl FnOnce(&mut UserRecord) -> T) -> T {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        f(users.entry(user).or_default())
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn quiz_session(&self, user: UserId) -> Result<Option<QuizSession>, QuizError> {
        Ok(self.with_user(user, |record| record.session.clone()))
    }

    async fn start_quiz(&self, user: UserId, topic: &str) -> Result<(), QuizError> {
        self.with_user(user, |record| {
            record.session = Some(QuizSession {
                topic: topic.to_string(),
                last_question: None,
            })
        });
        Ok(())
    }

    async fn set_last_question(&self, user: UserId, index: usize) -> Result<(), QuizError> {
        self.with_user(user, |record| match record.session.as_mut() {
            Some(session) => {
                session.last_question = Some(index);
                Ok(())
            }
            None => Err(QuizError::NoSession(user.0)),
        })
    }

    async fn record(&self, user: UserId, outcome: Outcome) -> Result<(), QuizError> {
        self.with_user(user, |record| match outcome {
            Outcome::Correct => {
                record.correct += 1;
                record.streak += 1;
            }
            Outcome::Wrong => {
                record.wrong += 1;
                record.streak = 0;
            }
            Outcome::NotAnswered => {
                record.not_answered += 1;
                record.streak = 0;
            }
        });
        Ok(())
    }

    async fn streak(&self, user: UserId) -> Result<u32, QuizError> {
        Ok(self.with_user(user, |record| record.streak))
    }

    async fn stats(&self, user: UserId) -> Result<QuizStats, QuizError> {
        Ok(self.with_user(user, |record| {
            QuizStats::from_counts(record.correct, record.wrong, record.not_answered)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: UserId = UserId(1);

    #[test]
    fn empty_stats_are_zero() {
        let stats = QuizStats::from_counts(0, 0, 0);
        assert_eq!(stats.percent_correct, 0.0);
        assert_eq!(stats.total(), 0);
    }

    #[test]
    fn percentages_come_from_counters() {
        let stats = QuizStats::from_counts(2, 1, 1);
        assert_eq!(stats.percent_correct, 50.0);
        assert_eq!(stats.percent_wrong, 25.0);
        assert_eq!(stats.percent_not_answered, 25.0);
        assert_eq!(stats.total(), 4);
    }

    #[tokio::test]
    async fn streak_resets_on_miss() {
        let store = MemoryStore::new();
        store.record(USER, Outcome::Correct).await.unwrap();
        store.record(USER, Outcome::Correct).await.unwrap();
        assert_eq!(store.streak(USER).await.unwrap(), 2);

        store.record(USER, Outcome::NotAnswered).await.unwrap();
        assert_eq!(store.streak(USER).await.unwrap(), 0);
        store.record(USER, Outcome::Correct).await.unwrap();
        store.record(USER, Outcome::Wrong).await.unwrap();
        assert_eq!(store.streak(USER).await.unwrap(), 0);

        let stats = store.stats(USER).await.unwrap();
        assert_eq!((stats.correct, stats.wrong, stats.not_answered), (3, 1, 1));
    }

    #[tokio::test]
    async fn last_question_needs_a_session() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.set_last_question(USER, 3).await,
            Err(QuizError::NoSession(1))
        ));

        store.start_quiz(USER, "math").await.unwrap();
        store.set_last_question(USER, 3).await.unwrap();
        assert_eq!(
            store.quiz_session(USER).await.unwrap(),
            Some(QuizSession {
                topic: "math".to_string(),
                last_question: Some(3),
            })
        );

        store.start_quiz(USER, "arte").await.unwrap();
        let session = store.quiz_session(USER).await.unwrap().unwrap();
        assert_eq!(session.last_question, None);
    }
}
