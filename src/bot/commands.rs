use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{ChatAction, InputFile};
use teloxide::utils::command::BotCommands;

use crate::ai::image;
use crate::bot::{keyboards, log_to_channel, quiz_flow, AppState, HandlerResult};
use crate::chat::persona;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Ye commands available hain:")]
pub enum BotCommand {
    #[command(description = "Bot ko jagao")]
    Start,
    #[command(description = "Commands ki list")]
    Help,
    #[command(description = "Session ka haal dekho")]
    Status,
    #[command(description = "Mode, voice aur memory badlo")]
    Settings,
    #[command(description = "Image banao, e.g. /img future city")]
    Img(String),
    #[command(description = "Quiz khelo, e.g. /quiz indian history")]
    Quiz(String),
    #[command(description = "Chalta quiz roko")]
    Stop,
}

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: BotCommand,
    state: Arc<AppState>,
) -> HandlerResult {
    let Some(user) = msg.from.clone() else {
        return Ok(());
    };
    let user_id = user.id.0 as i64;

    // Any command outside the quiz flow ends a running quiz first, so stray
    // timers stop posting into an unrelated conversation. /status is
    // read-only and may peek at a live quiz.
    if !matches!(
        cmd,
        BotCommand::Quiz(_) | BotCommand::Stop | BotCommand::Status
    ) && state.quiz.is_active(user_id)
    {
        quiz_flow::stop_quiz(&bot, &state, msg.chat.id, user_id).await?;
    }

    match cmd {
        BotCommand::Start => {
            bot.send_message(
                msg.chat.id,
                "🔥 Dev Online!\n\n\
                 💬 Kuch bhi pucho, main yahin hoon.\n\
                 🎛 /settings se voice aur mode badlo.\n\
                 🖼 /img se image banao.\n\
                 🎮 /quiz se quiz khelo.",
            )
            .await?;
        }

        BotCommand::Help => {
            bot.send_message(msg.chat.id, BotCommand::descriptions().to_string())
                .await?;
        }

        BotCommand::Status => {
            let session = state.sessions.get_or_create(user_id);
            let session = session.lock().await;
            let quiz_line = state
                .quiz
                .with_session(user_id, |s| {
                    format!("{} ({}/{} sahi)", s.topic, s.score, s.asked)
                })
                .unwrap_or_else(|| "none".to_string());

            bot.send_message(
                msg.chat.id,
                format!(
                    "📊 Status\n\n🎭 Mode: {}\n🗣 Voice: {}\n🧠 Memory: {}\n🎮 Quiz: {}\n💾 Cached replies: {}\n🕒 {}",
                    session.mode.title(),
                    session.voice.display_name(),
                    if session.memory_enabled { "✅ ON" } else { "❌ OFF" },
                    quiz_line,
                    state.cache.len().await,
                    persona::ist_now_string(),
                ),
            )
            .await?;
        }

        BotCommand::Settings => {
            let session = state.sessions.get_or_create(user_id);
            let session = session.lock().await;
            bot.send_message(msg.chat.id, "🎛️ Control Panel")
                .reply_markup(keyboards::settings(&session))
                .await?;
        }

        BotCommand::Img(prompt) => {
            let prompt = prompt.trim();
            if prompt.is_empty() {
                bot.send_message(msg.chat.id, "⚠️ Likho toh kya banau! Ex: /img future city")
                    .await?;
                return Ok(());
            }

            bot.send_chat_action(msg.chat.id, ChatAction::UploadPhoto)
                .await?;
            let url = image::build_image_url(prompt);
            match bot
                .send_photo(msg.chat.id, InputFile::url(url.clone()))
                .caption(format!("🖼 Generated: {prompt}"))
                .await
            {
                Ok(_) => log_to_channel(&bot, &state, &user, "IMAGE", prompt, url.as_str()).await,
                Err(err) => {
                    tracing::warn!("image send failed: {err}");
                    bot.send_message(msg.chat.id, "❌ Image nahi ban paya, dobara try karo.")
                        .await?;
                }
            }
        }

        BotCommand::Quiz(topic) => {
            quiz_flow::start_quiz(&bot, &state, msg.chat.id, user_id, &topic).await?;
        }

        BotCommand::Stop => {
            if !quiz_flow::stop_quiz(&bot, &state, msg.chat.id, user_id).await? {
                bot.send_message(msg.chat.id, "⚠️ Koi quiz nahi chal raha. /quiz se shuru karo.")
                    .await?;
            }
        }
    }

    Ok(())
}
