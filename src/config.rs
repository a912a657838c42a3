use std::path::PathBuf;

use crate::quiz::render::Limits;

/// Bot settings, read from the environment (and `.env`).
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Directory holding one `<topic>.json` file per topic.
    pub questions_dir: PathBuf,
    /// Message and caption length limits used when rendering.
    pub limits: Limits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            questions_dir: PathBuf::from("data/questions"),
            limits: Limits::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        let length = |key: &str, fallback: usize| match lookup(key).map(|v| v.trim().parse::<usize>()) {
            Some(Ok(value)) if value > 0 => value,
            Some(_) => {
                log::warn!("ignoring invalid {key}, using {fallback}");
                fallback
            }
            None => fallback,
        };

        Self {
            questions_dir: lookup("QUIZ_QUESTIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.questions_dir),
            limits: Limits {
                message: length("QUIZ_MAX_MESSAGE_LENGTH", default.limits.message),
                caption: length("QUIZ_MAX_CAPTION_LENGTH", default.limits.caption),
            },
        }
    }
}
