pub mod evaluate;
pub mod picker;
pub mod render;

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use crate::error::QuizError;

const TOPIC_EXTENSION: &str = "json";

/// How a question has to be presented, depending on where its images are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Text,
    ImageInQuestion,
    ImageInAnswer,
    ImageInQuestionAndAnswer,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    #[serde(rename = "quest")]
    pub text: String,
    #[serde(default)]
    pub image: String,
    pub answers: Vec<Answer>,
    pub correct: usize,
}

impl Question {
    #[cfg(test)]
    pub fn new(text: String, image: String, answers: Vec<Answer>, correct: usize) -> Self {
        Self {
            text,
            image,
            answers,
            correct,
        }
    }

    pub fn has_image(&self) -> bool {
        has_image(&self.image)
    }

    pub fn kind(&self) -> QuestionKind {
        let answer_image = self.answers.iter().any(Answer::has_image);
        match (self.has_image(), answer_image) {
            (false, false) => QuestionKind::Text,
            (true, false) => QuestionKind::ImageInQuestion,
            (false, true) => QuestionKind::ImageInAnswer,
            (true, true) => QuestionKind::ImageInQuestionAndAnswer,
        }
    }

    /// The correct option as the user sees it, counting from 1.
    pub fn correct_number(&self) -> usize {
        self.correct + 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Answer {
    pub text: String,
    #[serde(default)]
    pub image: String,
}

impl Answer {
    #[cfg(test)]
    pub fn new(text: String, image: String) -> Self {
        Self { text, image }
    }

    pub fn has_image(&self) -> bool {
        has_image(&self.image)
    }
}

fn has_image(encoded: &str) -> bool {
    !encoded.trim().is_empty()
}

#[derive(Debug, Clone)]
pub struct Topic {
    pub name: String,
    pub questions: Vec<Question>,
}

impl Topic {
    /// Reads `<dir>/<name>.json` and checks every question is answerable.
    pub fn load(dir: &Path, name: &str) -> Result<Self, QuizError> {
        let name = sanitize_topic_name(name)?;
        let path = dir.join(format!("{name}.{TOPIC_EXTENSION}"));

        let file = File::open(&path).map_err(|source| QuizError::TopicNotFound {
            topic: name.clone(),
            source,
        })?;
        let questions: Vec<Question> = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| QuizError::MalformedTopic {
                topic: name.clone(),
                source,
            })?;

        if questions.is_empty() {
            return Err(QuizError::EmptyTopic(name));
        }
        for (index, question) in questions.iter().enumerate() {
            if question.answers.is_empty() {
                return Err(QuizError::InvalidQuestion {
                    topic: name,
                    index,
                    reason: "no answers",
                });
            }
            if question.correct >= question.answers.len() {
                return Err(QuizError::InvalidQuestion {
                    topic: name,
                    index,
                    reason: "correct answer out of range",
                });
            }
        }

        Ok(Self { name, questions })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }
}

/// Topic names map straight onto file names, so only ASCII letters and
/// digits are accepted. Anything else is rejected rather than cleaned up.
pub fn sanitize_topic_name(name: &str) -> Result<String, QuizError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(QuizError::InvalidTopicName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Names of the topics available in `dir`, sorted.
pub fn list_topics(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut topics = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == TOPIC_EXTENSION))
        .filter_map(|path| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_string)
        })
        .filter(|stem| sanitize_topic_name(stem).is_ok())
        .collect::<Vec<_>>();
    topics.sort();
    Ok(topics)
}
