use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub const QUIZ_ERROR_NOTICE: &str = "500 - Errore nella gestione del quiz";
pub const NOT_FOUND_NOTICE: &str = "404 - File not found";
pub const INTERNAL_ERROR_NOTICE: &str = "500 - Internal Error";

#[derive(Debug, Error)]
pub enum QuizError {
    #[error("user {0} has no quiz in progress")]
    NoSession(u64),

    #[error("invalid topic name {0:?}")]
    InvalidTopicName(String),

    #[error("topic {topic:?} not found")]
    TopicNotFound {
        topic: String,
        #[source]
        source: std::io::Error,
    },

    #[error("topic {topic:?} is not a valid question list")]
    MalformedTopic {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("topic {0:?} has no questions")]
    EmptyTopic(String),

    #[error("question {index} of topic {topic:?}: {reason}")]
    InvalidQuestion {
        topic: String,
        index: usize,
        reason: &'static str,
    },

    #[error("embedded image is not valid base64")]
    Image(#[from] base64::DecodeError),

    #[error("store failure")]
    Store(#[source] BoxError),

    #[error("transport failure")]
    Transport(#[source] BoxError),
}

impl QuizError {
    /// Text shown to the user when handling aborts with this error.
    pub fn user_notice(&self) -> &'static str {
        match self {
            QuizError::NoSession(_) | QuizError::InvalidTopicName(_) | QuizError::Store(_) => {
                QUIZ_ERROR_NOTICE
            }
            QuizError::TopicNotFound { .. }
            | QuizError::MalformedTopic { .. }
            | QuizError::EmptyTopic(_)
            | QuizError::InvalidQuestion { .. } => NOT_FOUND_NOTICE,
            QuizError::Image(_) | QuizError::Transport(_) => INTERNAL_ERROR_NOTICE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_follow_failure_class() {
        let missing = QuizError::TopicNotFound {
            topic: "math".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(missing.user_notice(), NOT_FOUND_NOTICE);
        assert_eq!(
            QuizError::InvalidTopicName("../etc".to_string()).user_notice(),
            QUIZ_ERROR_NOTICE
        );
        assert_eq!(QuizError::NoSession(7).user_notice(), QUIZ_ERROR_NOTICE);
        assert_eq!(
            QuizError::Transport("boom".into()).user_notice(),
            INTERNAL_ERROR_NOTICE
        );
    }
}
