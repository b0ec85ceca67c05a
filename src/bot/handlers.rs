use std::io::Cursor;
use std::sync::Arc;

use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InputFile, User};

use crate::ai::tts;
use crate::bot::{keyboards, log_to_channel, AppState, HandlerResult};
use crate::chat::persona;

/// Catch-all for non-command messages: text goes through the orchestrator,
/// voice notes through the one-shot transcribe-and-reply path.
pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> HandlerResult {
    let Some(user) = msg.from.clone() else {
        return Ok(());
    };
    let user_id = user.id.0 as i64;

    // During a quiz the only expected input is an answer button tap;
    // stray chat would drag the model into two conversations at once.
    if state.quiz.is_active(user_id) {
        return Ok(());
    }

    if msg.voice().is_some() || msg.audio().is_some() {
        return handle_voice(&bot, &msg, &state, &user).await;
    }
    if let Some(text) = msg.text() {
        let text = text.to_string();
        return handle_text(&bot, &msg, &state, &user, &text).await;
    }

    Ok(())
}

async fn handle_text(
    bot: &Bot,
    msg: &Message,
    state: &Arc<AppState>,
    user: &User,
    text: &str,
) -> HandlerResult {
    bot.send_chat_action(msg.chat.id, ChatAction::Typing)
        .await?;

    // The per-user lock is held for the whole turn so two rapid messages
    // from the same user cannot interleave their history writes.
    let session = state.sessions.get_or_create(user.id.0 as i64);
    let mut session = session.lock().await;
    let reply = state.orchestrator.respond(&mut session, text).await;
    drop(session);

    bot.send_message(msg.chat.id, &reply.text)
        .reply_markup(keyboards::speak())
        .await?;

    log_to_channel(bot, state, user, reply.source.label(), text, &reply.text).await;
    Ok(())
}

async fn handle_voice(
    bot: &Bot,
    msg: &Message,
    state: &Arc<AppState>,
    user: &User,
) -> HandlerResult {
    bot.send_chat_action(msg.chat.id, ChatAction::RecordVoice)
        .await?;

    // ── 1. Download the audio ──────────────────────────────────────

    let file_id = if let Some(voice) = msg.voice() {
        &voice.file.id
    } else if let Some(audio) = msg.audio() {
        &audio.file.id
    } else {
        return Ok(());
    };

    let file = bot.get_file(file_id).await?;
    let mut buf = Cursor::new(Vec::new());
    bot.download_file(&file.path, &mut buf).await?;
    let audio = buf.into_inner();

    // ── 2. One model call transcribes and answers ──────────────────

    let session = state.sessions.get_or_create(user.id.0 as i64);
    let session = session.lock().await;
    let system = format!(
        "Transcribe the voice note and reply to it. {}",
        persona::system_prompt(session.mode)
    );
    let reply = match state
        .llm
        .transcribe_and_reply(&audio, "audio/ogg", &system)
        .await
    {
        Ok(reply) => reply,
        Err(err) => {
            tracing::error!("voice reply failed: {err}");
            bot.send_message(msg.chat.id, "❌ Audio samajh nahi aaya, dobara bhejo.")
                .await?;
            return Ok(());
        }
    };
    let engine = session.voice;
    drop(session);

    // ── 3. Voice out when synthesis works, text otherwise ──────────

    match state.tts.synthesize(&tts::strip_markup(&reply), engine).await {
        Ok(mp3) => {
            bot.send_voice(msg.chat.id, InputFile::memory(mp3).file_name("reply.mp3"))
                .await?;
        }
        Err(err) => {
            tracing::warn!("voice synthesis failed, falling back to text: {err}");
            bot.send_message(msg.chat.id, &reply).await?;
        }
    }

    log_to_channel(bot, state, user, "VOICE", "🎙 voice note", &reply).await;
    Ok(())
}
