use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{ChatAction, InputFile};
use uuid::Uuid;

use crate::ai::tts;
use crate::bot::quiz_flow::{self, AnswerVerdict};
use crate::bot::{keyboards, AppState, HandlerResult};
use crate::chat::session::{Mode, UserSession};
use crate::quiz::session::QuizLevel;

pub async fn handle_callback(bot: Bot, q: CallbackQuery, state: Arc<AppState>) -> HandlerResult {
    let data = match q.data.as_deref() {
        Some(d) => d,
        None => return Ok(()),
    };

    let user_id = q.from.id.0 as i64;

    // ── Settings Panel ─────────────────────────────────────────────
    if let Some(mode_str) = data.strip_prefix("set_mode:") {
        let mode = Mode::from_str_loose(mode_str);
        let session = state.sessions.get_or_create(user_id);
        let mut session = session.lock().await;

        if session.set_mode(mode) {
            bot.answer_callback_query(&q.id)
                .text(format!("Mode: {}", mode.title()))
                .await?;
            refresh_settings(&bot, &q, &session).await?;
        } else {
            bot.answer_callback_query(&q.id)
                .text("Already active!")
                .await?;
        }
        return Ok(());
    }

    if data == "toggle_voice" {
        let session = state.sessions.get_or_create(user_id);
        let mut session = session.lock().await;
        session.toggle_voice();

        bot.answer_callback_query(&q.id)
            .text(format!("Switched to {}", session.voice.display_name()))
            .await?;
        refresh_settings(&bot, &q, &session).await?;
        return Ok(());
    }

    if data == "toggle_memory" {
        let session = state.sessions.get_or_create(user_id);
        let mut session = session.lock().await;
        session.toggle_memory();

        bot.answer_callback_query(&q.id)
            .text(if session.memory_enabled {
                "Memory ON"
            } else {
                "Memory OFF"
            })
            .await?;
        refresh_settings(&bot, &q, &session).await?;
        return Ok(());
    }

    if data == "clear_json" {
        if state.config.is_owner(user_id) {
            state.cache.clear().await;
            bot.answer_callback_query(&q.id)
                .text("🗑️ Cache cleared!")
                .await?;
        } else {
            bot.answer_callback_query(&q.id)
                .text("🚫 Access denied!")
                .show_alert(true)
                .await?;
        }
        return Ok(());
    }

    // ── Read Aloud ─────────────────────────────────────────────────
    if data == "speak_msg" {
        speak_message(&bot, &q, &state).await?;
        return Ok(());
    }

    // ── Quiz Flow ──────────────────────────────────────────────────
    if let Some(level_str) = data.strip_prefix("quiz_lvl:") {
        let Some(level) = QuizLevel::from_callback(level_str) else {
            bot.answer_callback_query(&q.id).await?;
            return Ok(());
        };

        match state.quiz.choose_level(user_id, level) {
            Ok(()) => {
                bot.answer_callback_query(&q.id)
                    .text(format!("Level: {}", level.title()))
                    .await?;
                if let Some(msg) = q.regular_message() {
                    bot.edit_message_text(
                        msg.chat.id,
                        msg.id,
                        format!("📚 Level: {}\n\nAb timer chuno:", level.title()),
                    )
                    .reply_markup(keyboards::quiz_timers())
                    .await?;
                }
            }
            Err(_) => {
                bot.answer_callback_query(&q.id)
                    .text("⚠️ Ye quiz expire ho chuka hai. /quiz se naya shuru karo.")
                    .show_alert(true)
                    .await?;
            }
        }
        return Ok(());
    }

    if let Some(secs_str) = data.strip_prefix("quiz_time:") {
        let Ok(secs) = secs_str.parse::<u32>() else {
            bot.answer_callback_query(&q.id).await?;
            return Ok(());
        };

        match state.quiz.choose_timer(user_id, secs) {
            Ok(()) => {
                bot.answer_callback_query(&q.id)
                    .text(format!("⏱ {secs}s per question"))
                    .await?;
                if let Some(msg) = q.regular_message() {
                    bot.edit_message_text(
                        msg.chat.id,
                        msg.id,
                        format!("🚀 Quiz shuru! Har sawal ke liye {secs}s."),
                    )
                    .await?;
                    quiz_flow::issue_question(bot.clone(), state.clone(), msg.chat.id, user_id)
                        .await?;
                }
            }
            Err(_) => {
                bot.answer_callback_query(&q.id)
                    .text("⚠️ Ye quiz expire ho chuka hai. /quiz se naya shuru karo.")
                    .show_alert(true)
                    .await?;
            }
        }
        return Ok(());
    }

    if let Some(rest) = data.strip_prefix("quiz_ans:") {
        let Some((id_str, index_str)) = rest.split_once(':') else {
            bot.answer_callback_query(&q.id).await?;
            return Ok(());
        };
        let (Ok(question_id), Ok(choice)) = (Uuid::parse_str(id_str), index_str.parse::<usize>())
        else {
            bot.answer_callback_query(&q.id).await?;
            return Ok(());
        };
        let Some(msg) = q.regular_message() else {
            bot.answer_callback_query(&q.id)
                .text("⚠️ Purana message, dobara bhejo.")
                .await?;
            return Ok(());
        };

        let verdict =
            quiz_flow::submit_answer(&bot, &state, msg.chat.id, user_id, question_id, choice)
                .await?;
        let (toast, alert) = match verdict {
            AnswerVerdict::Correct => ("🎉 Sahi Jawab! +10 Points", true),
            AnswerVerdict::Wrong => ("❌ Galat Jawab!", true),
            AnswerVerdict::Expired => ("⚠️ Ye sawal expire ho chuka hai.", false),
        };
        bot.answer_callback_query(&q.id)
            .text(toast)
            .show_alert(alert)
            .await?;
        return Ok(());
    }

    if data == "quiz_stop" {
        let stopped = match q.regular_message() {
            Some(msg) => quiz_flow::stop_quiz(&bot, &state, msg.chat.id, user_id).await?,
            None => false,
        };
        bot.answer_callback_query(&q.id)
            .text(if stopped {
                "🏁 Quiz stopped"
            } else {
                "⚠️ Koi quiz nahi chal raha"
            })
            .await?;
        return Ok(());
    }

    // Unknown button, just clear the spinner.
    bot.answer_callback_query(&q.id).await?;
    Ok(())
}

/// Redraws the settings keyboard in place after a toggle.
async fn refresh_settings(bot: &Bot, q: &CallbackQuery, session: &UserSession) -> HandlerResult {
    if let Some(msg) = q.regular_message() {
        bot.edit_message_reply_markup(msg.chat.id, msg.id)
            .reply_markup(keyboards::settings(session))
            .await?;
    }
    Ok(())
}

/// The 🔊 button under text replies: re-voice the message it hangs from.
async fn speak_message(bot: &Bot, q: &CallbackQuery, state: &Arc<AppState>) -> HandlerResult {
    let Some(msg) = q.regular_message() else {
        bot.answer_callback_query(&q.id)
            .text("⚠️ Purana message, dobara bhejo.")
            .await?;
        return Ok(());
    };
    let Some(text) = msg.text() else {
        bot.answer_callback_query(&q.id).await?;
        return Ok(());
    };

    bot.answer_callback_query(&q.id).text("🎤 Generating...").await?;
    bot.send_chat_action(msg.chat.id, ChatAction::RecordVoice)
        .await?;

    let user_id = q.from.id.0 as i64;
    let engine = state.sessions.get_or_create(user_id).lock().await.voice;

    match state.tts.synthesize(&tts::strip_markup(text), engine).await {
        Ok(mp3) => {
            bot.send_voice(msg.chat.id, InputFile::memory(mp3).file_name("speech.mp3"))
                .await?;
        }
        Err(err) => {
            tracing::warn!("speak button synthesis failed: {err}");
            bot.send_message(msg.chat.id, "❌ Audio nahi ban paya.")
                .await?;
        }
    }
    Ok(())
}
