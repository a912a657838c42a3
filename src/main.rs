mod config;
mod error;
mod handler;
mod messenger;
mod quiz;
mod store;

use std::sync::Arc;

use dotenv::dotenv;
use handler::QuizHandler;
use quiz::render::Renderer;
use store::{MemoryStore, QuizStore};
use teloxide::{prelude::*, types::ChatId, utils::command::BotCommands};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Comandi disponibili:")]
enum Command {
    #[command(description = "presentazione e elenco dei quiz.")]
    Start,
    #[command(description = "elenca i quiz disponibili.")]
    Topics,
    #[command(description = "inizia un quiz, es. /quiz storia")]
    Quiz(String),
    #[command(description = "passa a una nuova domanda.")]
    Next,
    #[command(description = "mostra le tue statistiche.")]
    Stats,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    pretty_env_logger::init();
    log::info!("Starting quiz bot...");

    let config = config::Config::from_env();
    log::info!("Loading topics from {}", config.questions_dir.display());

    let bot = Bot::from_env();
    let store: Arc<dyn QuizStore> = Arc::new(MemoryStore::new());
    let quiz_handler = Arc::new(QuizHandler::new(
        store,
        Arc::new(bot.clone()),
        Renderer::new(config.limits),
        config.questions_dir,
    ));

    let handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(command),
        )
        .branch(dptree::endpoint(answer));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![quiz_handler])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

const GREETING_TEXT: &str = "Ciao! Sono il bot dei quiz. Scegli un argomento con /quiz seguito dal nome.";
const NO_TOPICS_TEXT: &str = "Nessun quiz disponibile al momento.";
const MISSING_TOPIC_TEXT: &str = "Indica il quiz, ad esempio /quiz storia";

async fn command(
    bot: Bot,
    quiz_handler: Arc<QuizHandler>,
    msg: Message,
    cmd: Command,
) -> HandlerResult {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let user = user.id;

    match cmd {
        Command::Start => {
            bot.send_message(msg.chat.id, GREETING_TEXT).await?;
            send_topics(&bot, &quiz_handler, msg.chat.id).await?;
        }
        Command::Topics => send_topics(&bot, &quiz_handler, msg.chat.id).await?,
        Command::Quiz(topic) if topic.trim().is_empty() => {
            bot.send_message(msg.chat.id, MISSING_TOPIC_TEXT).await?;
        }
        Command::Quiz(topic) => {
            if quiz_handler.start_quiz(user, &topic).await? {
                quiz_handler.send_question(user).await?;
            }
        }
        Command::Next => {
            quiz_handler.send_question(user).await?;
        }
        Command::Stats => {
            quiz_handler.send_stats(user).await?;
        }
    }
    Ok(())
}

async fn send_topics(bot: &Bot, quiz_handler: &QuizHandler, chat: ChatId) -> HandlerResult {
    let topics = match quiz_handler.topics() {
        Ok(topics) => topics,
        Err(err) => {
            log::warn!("Unable to list topics: {err}");
            Vec::new()
        }
    };

    let text = if topics.is_empty() {
        NO_TOPICS_TEXT.to_string()
    } else {
        format!("Quiz disponibili:\n{}", topics.join("\n"))
    };
    bot.send_message(chat, text).await?;
    Ok(())
}

/// Any plain message is an answer to the last question; once it is
/// recorded the next question follows.
async fn answer(quiz_handler: Arc<QuizHandler>, msg: Message) -> HandlerResult {
    let (Some(user), Some(text)) = (msg.from(), msg.text()) else {
        return Ok(());
    };
    let user = user.id;

    if quiz_handler.check_answer(user, text).await? {
        quiz_handler.send_question(user).await?;
    }
    Ok(())
}
