pub mod callbacks;
pub mod commands;
pub mod handlers;
pub mod keyboards;
pub mod quiz_flow;

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::User;

use crate::ai::llm::ChatModel;
use crate::ai::tts::{TtsManager, VoiceEngine};
use crate::chat::cache::ReplyCache;
use crate::chat::orchestrator::Orchestrator;
use crate::chat::session::{Mode, SessionStore};
use crate::config::AppConfig;
use crate::quiz::session::QuizStore;

pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;
pub type HandlerResult = Result<(), HandlerError>;

/// Shared application state, accessible from all handlers.
pub struct AppState {
    pub config: AppConfig,
    pub sessions: SessionStore,
    pub quiz: QuizStore,
    pub cache: Arc<ReplyCache>,
    pub llm: Arc<dyn ChatModel>,
    pub tts: TtsManager,
    pub orchestrator: Orchestrator,
}

/// Build the teloxide update handler tree.
pub fn build_handler() -> UpdateHandler<HandlerError> {
    let command_handler = Update::filter_message()
        .filter_command::<commands::BotCommand>()
        .endpoint(commands::handle_command);

    let callback_handler = Update::filter_callback_query().endpoint(callbacks::handle_callback);

    let message_handler = Update::filter_message().endpoint(handlers::handle_message);

    dptree::entry()
        .branch(command_handler)
        .branch(callback_handler)
        .branch(message_handler)
}

/// Mirrors an interaction into the ops channel, when one is configured.
/// Log failures never bubble into the user-facing flow.
pub async fn log_to_channel(
    bot: &Bot,
    state: &Arc<AppState>,
    user: &User,
    kind: &str,
    query: &str,
    reply: &str,
) {
    if state.config.log_channel_id == 0 {
        return;
    }

    // Snapshot the active mode and voice; callers release their session
    // lock before logging, so this brief re-lock cannot deadlock.
    let session = state.sessions.get_or_create(user.id.0 as i64);
    let (mode, voice) = {
        let session = session.lock().await;
        (session.mode, session.voice)
    };

    let text = log_line(&user.first_name, mode, voice, kind, query, reply);
    if let Err(err) = bot
        .send_message(ChatId(state.config.log_channel_id), text)
        .await
    {
        tracing::debug!("log channel send failed: {err}");
    }
}

fn log_line(
    first_name: &str,
    mode: Mode,
    voice: VoiceEngine,
    kind: &str,
    query: &str,
    reply: &str,
) -> String {
    format!(
        "📝 Log | 👤 {}\nMode: {} | Voice: {}\nTYPE: {}\n❓ {}\n🤖 {}",
        first_name,
        mode.title(),
        voice.display_name(),
        kind,
        preview(query),
        preview(reply),
    )
}

/// Telegram caps messages at 4096 chars; keep each logged half well under.
fn preview(text: &str) -> String {
    const MAX: usize = 1500;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX).collect();
        format!("{head}…")
    }
}
