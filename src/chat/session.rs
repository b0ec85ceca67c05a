use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::ai::llm::ChatTurn;
use crate::ai::tts::VoiceEngine;

/// History never exceeds this many turns (5 user/model exchanges).
pub const HISTORY_CAP: usize = 10;

/// Personas the bot can speak as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Friendly,
    Study,
    Funny,
    Roast,
    Romantic,
    Sad,
    Gk,
    Math,
}

impl Mode {
    pub const ALL: [Mode; 8] = [
        Mode::Friendly,
        Mode::Study,
        Mode::Funny,
        Mode::Roast,
        Mode::Romantic,
        Mode::Sad,
        Mode::Gk,
        Mode::Math,
    ];

    /// Stable id used in callback data.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Friendly => "friendly",
            Self::Study => "study",
            Self::Funny => "funny",
            Self::Roast => "roast",
            Self::Romantic => "romantic",
            Self::Sad => "sad",
            Self::Gk => "gk",
            Self::Math => "math",
        }
    }

    pub fn from_str_loose(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "study" => Self::Study,
            "funny" => Self::Funny,
            "roast" => Self::Roast,
            "romantic" => Self::Romantic,
            "sad" => Self::Sad,
            "gk" => Self::Gk,
            "math" => Self::Math,
            _ => Self::Friendly,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Friendly => "Friendly",
            Self::Study => "Study",
            Self::Funny => "Funny",
            Self::Roast => "Roast",
            Self::Romantic => "Romantic",
            Self::Sad => "Sad",
            Self::Gk => "GK",
            Self::Math => "Math",
        }
    }
}

/// Per-user chat configuration and rolling history. Lives in memory only;
/// a restart resets everyone to defaults.
#[derive(Debug, Clone)]
pub struct UserSession {
    pub mode: Mode,
    pub voice: VoiceEngine,
    pub memory_enabled: bool,
    history: Vec<ChatTurn>,
}

impl Default for UserSession {
    fn default() -> Self {
        Self {
            mode: Mode::Friendly,
            voice: VoiceEngine::Edge,
            memory_enabled: true,
            history: Vec::new(),
        }
    }
}

impl UserSession {
    /// Returns true when the mode actually changed. Switching personas
    /// drops the history so one persona's tone never leaks into another's
    /// prompt.
    pub fn set_mode(&mut self, mode: Mode) -> bool {
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        self.history.clear();
        true
    }

    pub fn toggle_voice(&mut self) {
        self.voice = self.voice.other();
    }

    pub fn toggle_memory(&mut self) {
        self.memory_enabled = !self.memory_enabled;
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Appends a full exchange, then evicts whole pairs from the front until
    /// the cap holds. History therefore always starts on a user turn.
    pub fn push_exchange(&mut self, user_text: &str, model_text: &str) {
        self.history.push(ChatTurn::user(user_text));
        self.history.push(ChatTurn::model(model_text));
        while self.history.len() > HISTORY_CAP {
            self.history.drain(..2);
        }
    }
}

/// One lock per user, created lazily. Handlers hold the lock for the whole
/// turn, so a user's messages are processed one at a time while different
/// users proceed in parallel.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<UserSession>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, user_id: i64) -> Arc<tokio::sync::Mutex<UserSession>> {
        let mut map = self.inner.lock().unwrap();
        map.entry(user_id).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::ai::llm::ChatRole;

    #[test]
    fn fresh_session_has_documented_defaults() {
        let session = UserSession::default();
        assert_eq!(session.mode, Mode::Friendly);
        assert_eq!(session.voice, VoiceEngine::Edge);
        assert!(session.memory_enabled);
        assert!(session.history().is_empty());
    }

    #[test]
    fn mode_switch_clears_history() {
        let mut session = UserSession::default();
        session.push_exchange("hi", "hello!");
        assert!(!session.history().is_empty());

        assert!(session.set_mode(Mode::Roast));
        assert!(session.history().is_empty());
    }

    #[test]
    fn picking_the_active_mode_keeps_history() {
        let mut session = UserSession::default();
        session.push_exchange("hi", "hello!");

        assert!(!session.set_mode(Mode::Friendly));
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn history_trims_in_pairs_and_starts_on_a_user_turn() {
        let mut session = UserSession::default();
        for i in 0..20 {
            session.push_exchange(&format!("q{i}"), &format!("a{i}"));
            assert!(session.history().len() <= HISTORY_CAP);
            assert_eq!(session.history()[0].role, ChatRole::User);
        }
        // Oldest exchanges fell off the front.
        assert_eq!(session.history()[0].text, "q15");
        assert_eq!(session.history().last().unwrap().text, "a19");
    }

    #[test]
    fn voice_toggle_flips_between_the_two_engines() {
        let mut session = UserSession::default();
        session.toggle_voice();
        assert_eq!(session.voice, VoiceEngine::Google);
        session.toggle_voice();
        assert_eq!(session.voice, VoiceEngine::Edge);
    }

    #[test]
    fn store_hands_out_the_same_session_per_user() {
        let store = SessionStore::new();
        let a = store.get_or_create(1);
        let b = store.get_or_create(1);
        let c = store.get_or_create(2);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn loose_mode_parse_defaults_to_friendly() {
        assert_eq!(Mode::from_str_loose("ROAST"), Mode::Roast);
        assert_eq!(Mode::from_str_loose("gk"), Mode::Gk);
        assert_eq!(Mode::from_str_loose("nonsense"), Mode::Friendly);
    }
}
