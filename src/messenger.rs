use async_trait::async_trait;
use teloxide::{
    prelude::*,
    types::{ChatId, InputFile, KeyboardButton, KeyboardMarkup, ParseMode},
    RequestError,
};

use crate::error::QuizError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Plain,
    Html,
}

/// The outbound side of the chat transport.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, chat: ChatId, text: &str, format: Format) -> Result<(), QuizError>;

    /// Sends a photo; the caption, if any, is HTML.
    async fn send_image(
        &self,
        chat: ChatId,
        image: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<(), QuizError>;

    /// Sends `prompt` with a reply keyboard, one button per row.
    async fn send_choices(
        &self,
        chat: ChatId,
        prompt: &str,
        labels: &[String],
    ) -> Result<(), QuizError>;
}

fn transport(err: RequestError) -> QuizError {
    QuizError::Transport(Box::new(err))
}

/// One button per row, shrunk to fit and hidden once a button is pressed.
fn answer_keyboard(labels: &[String]) -> KeyboardMarkup {
    let mut keyboard = KeyboardMarkup::new(
        labels
            .iter()
            .map(|label| vec![KeyboardButton::new(label.clone())])
            .collect::<Vec<_>>(),
    );
    keyboard.resize_keyboard = true.into();
    keyboard.one_time_keyboard = true.into();
    keyboard
}

#[async_trait]
impl Messenger for Bot {
    async fn send_text(&self, chat: ChatId, text: &str, format: Format) -> Result<(), QuizError> {
        let request = self.send_message(chat, text);
        let sent = match format {
            Format::Plain => request.await,
            Format::Html => request.parse_mode(ParseMode::Html).await,
        };
        sent.map_err(transport)?;
        Ok(())
    }

    async fn send_image(
        &self,
        chat: ChatId,
        image: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<(), QuizError> {
        let request = self.send_photo(chat, InputFile::memory(image));
        let sent = match caption {
            Some(caption) => request.caption(caption).parse_mode(ParseMode::Html).await,
            None => request.await,
        };
        sent.map_err(transport)?;
        Ok(())
    }

    async fn send_choices(
        &self,
        chat: ChatId,
        prompt: &str,
        labels: &[String],
    ) -> Result<(), QuizError> {
        let keyboard = answer_keyboard(labels);
        self.send_message(chat, prompt)
            .reply_markup(keyboard)
            .await
            .map_err(transport)?;
        Ok(())
    }
}
