use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ChatAction;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use crate::bot::{keyboards, AppState, HandlerError, HandlerResult};
use crate::quiz::generator;
use crate::quiz::session::{IssuedQuestion, QUESTION_GAP_SECS};

pub enum AnswerVerdict {
    Correct,
    Wrong,
    Expired,
}

/// Entry point for /quiz. Ends any round already running, then walks the
/// user through level and timer selection.
pub async fn start_quiz(
    bot: &Bot,
    state: &Arc<AppState>,
    chat_id: ChatId,
    user_id: i64,
    topic: &str,
) -> HandlerResult {
    let topic = topic.trim();
    let topic = if topic.is_empty() { "General Knowledge" } else { topic };

    if let Some(finished) = state.quiz.stop(user_id) {
        if finished.asked > 0 {
            bot.send_message(chat_id, finished.report()).await?;
        }
    }

    state.quiz.start(user_id, topic);
    bot.send_message(chat_id, format!("🎮 Quiz: {topic}\n\nPehle apna level chuno:"))
        .reply_markup(keyboards::quiz_levels())
        .await?;
    Ok(())
}

/// Generates and posts the next question, then arms its timeout. Owned
/// arguments because the scheduling tasks call this from spawned futures.
pub async fn issue_question(
    bot: Bot,
    state: Arc<AppState>,
    chat_id: ChatId,
    user_id: i64,
) -> HandlerResult {
    let Some((topic, level, limit)) = state
        .quiz
        .with_session(user_id, |s| (s.topic.clone(), s.level, s.time_limit_secs))
    else {
        return Ok(());
    };
    let (Some(level), Some(limit)) = (level, limit) else {
        return Ok(());
    };

    bot.send_chat_action(chat_id, ChatAction::Typing).await?;

    let question = match generator::generate_question(state.llm.as_ref(), &topic, level).await {
        Ok(question) => question,
        Err(err) => {
            tracing::warn!("question generation failed: {err}");
            let report = state.quiz.stop(user_id).map(|s| s.report());
            bot.send_message(chat_id, "❌ Naya sawal nahi ban paya. Quiz yahin rokna pada.")
                .await?;
            if let Some(report) = report {
                bot.send_message(chat_id, report).await?;
            }
            return Ok(());
        }
    };

    let id = Uuid::new_v4();
    let number = state.quiz.with_session(user_id, |s| s.asked + 1).unwrap_or(1);
    let sent = bot
        .send_message(
            chat_id,
            format!("❓ Q{number}. {}\n\n⏱ {limit}s", question.question),
        )
        .reply_markup(keyboards::quiz_answers(id, &question.options))
        .await?;
    let message_id = sent.id;

    let timer = spawn_timeout(bot, state.clone(), chat_id, user_id, id, limit);

    // The quiz may have been stopped or restarted while generation was in
    // flight; a vanished session drops the timer unarmed and a session
    // back in setup refuses the install.
    state.quiz.with_session(user_id, move |s| {
        s.set_current(
            IssuedQuestion {
                id,
                text: question.question,
                options: question.options,
                correct_index: question.correct_index,
                explanation: question.explanation,
                message_id,
            },
            timer,
        )
    });

    Ok(())
}

fn spawn_timeout(
    bot: Bot,
    state: Arc<AppState>,
    chat_id: ChatId,
    user_id: i64,
    question_id: Uuid,
    limit_secs: u32,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        sleep(Duration::from_secs(u64::from(limit_secs))).await;
        if let Err(err) = handle_timeout(bot, state, chat_id, user_id, question_id).await {
            tracing::warn!("quiz timeout handling failed: {err}");
        }
    })
}

/// Fires when the per-question timer lapses. Whoever resolves the question
/// first wins, so a question answered at the last moment makes this a no-op.
async fn handle_timeout(
    bot: Bot,
    state: Arc<AppState>,
    chat_id: ChatId,
    user_id: i64,
    question_id: Uuid,
) -> HandlerResult {
    let Ok((question, _)) = state.quiz.resolve_question(user_id, question_id, None) else {
        return Ok(());
    };

    let right = question
        .options
        .get(question.correct_index)
        .map(String::as_str)
        .unwrap_or("?");
    bot.edit_message_text(
        chat_id,
        question.message_id,
        format!(
            "⏰ Time up!\n\n❓ {}\n\n✅ Sahi jawab: {right}\n💡 {}",
            question.text, question.explanation
        ),
    )
    .await?;

    schedule_next_question(bot, state, chat_id, user_id);
    Ok(())
}

/// Short breather between questions, then the next round if the quiz is
/// still on.
fn schedule_next_question(bot: Bot, state: Arc<AppState>, chat_id: ChatId, user_id: i64) {
    tokio::spawn(async move {
        sleep(Duration::from_secs(QUESTION_GAP_SECS)).await;
        if !state.quiz.is_active(user_id) {
            return;
        }
        if let Err(err) = issue_question(bot, state, chat_id, user_id).await {
            tracing::warn!("failed to issue the next question: {err}");
        }
    });
}

/// Scores a tapped answer button and reveals the solution in place.
pub async fn submit_answer(
    bot: &Bot,
    state: &Arc<AppState>,
    chat_id: ChatId,
    user_id: i64,
    question_id: Uuid,
    choice: usize,
) -> Result<AnswerVerdict, HandlerError> {
    let (question, correct) = match state.quiz.resolve_question(user_id, question_id, Some(choice))
    {
        Ok(resolved) => resolved,
        Err(_) => return Ok(AnswerVerdict::Expired),
    };

    let chosen = question
        .options
        .get(choice)
        .map(String::as_str)
        .unwrap_or("?");
    let right = question
        .options
        .get(question.correct_index)
        .map(String::as_str)
        .unwrap_or("?");
    let heading = if correct { "✅ Correct!" } else { "❌ Galat!" };

    bot.edit_message_text(
        chat_id,
        question.message_id,
        format!(
            "{heading}\n\n❓ {}\n\n👉 Tumhara jawab: {chosen}\n✅ Sahi jawab: {right}\n💡 {}",
            question.text, question.explanation
        ),
    )
    .await?;

    schedule_next_question(bot.clone(), state.clone(), chat_id, user_id);

    Ok(if correct {
        AnswerVerdict::Correct
    } else {
        AnswerVerdict::Wrong
    })
}

/// Ends the quiz and posts the final report. Returns false when nothing
/// was running.
pub async fn stop_quiz(
    bot: &Bot,
    state: &Arc<AppState>,
    chat_id: ChatId,
    user_id: i64,
) -> Result<bool, HandlerError> {
    match state.quiz.stop(user_id) {
        Some(finished) => {
            bot.send_message(chat_id, finished.report()).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}
