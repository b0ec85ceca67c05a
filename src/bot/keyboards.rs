use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use uuid::Uuid;

use crate::chat::session::{Mode, UserSession};
use crate::quiz::session::{QuizLevel, TIME_CHOICES};

const OPTION_LABEL_CHARS: usize = 60;

/// Settings panel: one marker-prefixed button per persona, then the voice,
/// memory and owner rows.
pub fn settings(session: &UserSession) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();

    for pair in Mode::ALL.chunks(2) {
        let row = pair
            .iter()
            .map(|mode| {
                let marker = if *mode == session.mode { "✅" } else { "❌" };
                InlineKeyboardButton::callback(
                    format!("{marker} {}", mode.title()),
                    format!("set_mode:{}", mode.as_str()),
                )
            })
            .collect();
        rows.push(row);
    }

    rows.push(vec![InlineKeyboardButton::callback(
        format!("🗣️ Voice: {}", session.voice.display_name()),
        "toggle_voice",
    )]);
    rows.push(vec![InlineKeyboardButton::callback(
        if session.memory_enabled {
            "🧠 Memory: ✅ ON"
        } else {
            "🧠 Memory: ❌ OFF"
        },
        "toggle_memory",
    )]);
    rows.push(vec![InlineKeyboardButton::callback(
        "🗑️ Clear Cache (Owner)",
        "clear_json",
    )]);

    InlineKeyboardMarkup::new(rows)
}

/// Single button under every text reply that reads it aloud.
pub fn speak() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "🔊 Suno",
        "speak_msg",
    )]])
}

pub fn quiz_levels() -> InlineKeyboardMarkup {
    let rows = QuizLevel::ALL
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|level| {
                    InlineKeyboardButton::callback(
                        level.title(),
                        format!("quiz_lvl:{}", level.as_str()),
                    )
                })
                .collect()
        })
        .collect::<Vec<Vec<_>>>();
    InlineKeyboardMarkup::new(rows)
}

pub fn quiz_timers() -> InlineKeyboardMarkup {
    let row = TIME_CHOICES
        .iter()
        .map(|secs| {
            InlineKeyboardButton::callback(format!("⏱ {secs}s"), format!("quiz_time:{secs}"))
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(vec![row])
}

/// Answer grid for one question. Callback data carries the question id so
/// taps on an already-replaced question are recognised as stale.
pub fn quiz_answers(question_id: Uuid, options: &[String]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();

    for (row_index, pair) in options.chunks(2).enumerate() {
        let row = pair
            .iter()
            .enumerate()
            .map(|(col, option)| {
                let index = row_index * 2 + col;
                InlineKeyboardButton::callback(
                    clip(option),
                    format!("quiz_ans:{question_id}:{index}"),
                )
            })
            .collect();
        rows.push(row);
    }

    rows.push(vec![InlineKeyboardButton::callback("🛑 Stop Quiz", "quiz_stop")]);
    InlineKeyboardMarkup::new(rows)
}

/// Telegram rejects overlong button labels, so trim to a sane width.
fn clip(label: &str) -> String {
    if label.chars().count() <= OPTION_LABEL_CHARS {
        label.to_string()
    } else {
        let head: String = label.chars().take(OPTION_LABEL_CHARS - 1).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    use crate::ai::tts::VoiceEngine;

    fn callback_data(button: &InlineKeyboardButton) -> &str {
        match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => data,
            other => panic!("expected callback button, got {other:?}"),
        }
    }

    #[test]
    fn settings_marks_only_the_active_mode() {
        let session = UserSession::default();
        let markup = settings(&session);

        let mode_buttons: Vec<&InlineKeyboardButton> = markup
            .inline_keyboard
            .iter()
            .flatten()
            .filter(|b| callback_data(b).starts_with("set_mode:"))
            .collect();

        assert_eq!(mode_buttons.len(), Mode::ALL.len());
        let checked = mode_buttons
            .iter()
            .filter(|b| b.text.starts_with("✅"))
            .count();
        assert_eq!(checked, 1);
        assert!(mode_buttons
            .iter()
            .any(|b| b.text.starts_with("✅") && callback_data(b) == "set_mode:friendly"));
    }

    #[test]
    fn settings_reflects_voice_and_memory_state() {
        let mut session = UserSession::default();
        session.toggle_memory();
        session.toggle_voice();
        let markup = settings(&session);

        let texts: Vec<&str> = markup
            .inline_keyboard
            .iter()
            .flatten()
            .map(|b| b.text.as_str())
            .collect();

        assert!(texts.iter().any(|t| t.contains("Memory: ❌ OFF")));
        assert!(texts
            .iter()
            .any(|t| t.contains(VoiceEngine::Google.display_name())));
    }

    #[test]
    fn level_buttons_cover_every_level() {
        let markup = quiz_levels();
        let data: Vec<String> = markup
            .inline_keyboard
            .iter()
            .flatten()
            .map(|b| callback_data(b).to_string())
            .collect();

        assert_eq!(data.len(), QuizLevel::ALL.len());
        for level in QuizLevel::ALL {
            assert!(data.contains(&format!("quiz_lvl:{}", level.as_str())));
        }
    }

    #[test]
    fn timer_buttons_carry_seconds() {
        let markup = quiz_timers();
        let buttons: Vec<&InlineKeyboardButton> =
            markup.inline_keyboard.iter().flatten().collect();
        assert_eq!(buttons.len(), TIME_CHOICES.len());
        assert_eq!(callback_data(buttons[0]), "quiz_time:10");
        assert_eq!(buttons[0].text, "⏱ 10s");
    }

    #[test]
    fn answer_buttons_carry_the_question_id_and_index() {
        let id = Uuid::new_v4();
        let options = vec!["a".to_string(), "b".into(), "c".into(), "d".into()];
        let markup = quiz_answers(id, &options);

        let data: Vec<String> = markup
            .inline_keyboard
            .iter()
            .flatten()
            .map(|b| callback_data(b).to_string())
            .collect();

        for index in 0..4 {
            assert!(data.contains(&format!("quiz_ans:{id}:{index}")));
        }
        assert_eq!(data.last().map(String::as_str), Some("quiz_stop"));
    }

    #[test]
    fn overlong_option_labels_are_clipped() {
        let id = Uuid::new_v4();
        let long = "x".repeat(200);
        let markup = quiz_answers(id, &[long, "b".into(), "c".into(), "d".into()]);
        let first = &markup.inline_keyboard[0][0];
        assert_eq!(first.text.chars().count(), OPTION_LABEL_CHARS);
        assert!(first.text.ends_with('…'));
    }
}
