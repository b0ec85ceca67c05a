use std::collections::HashMap;
use std::sync::Mutex;

use teloxide::types::MessageId;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::QuizError;

/// Seconds-per-question options shown on the timer keyboard.
pub const TIME_CHOICES: [u32; 5] = [10, 15, 30, 45, 60];

/// Pause between revealing an answer and sending the next question.
pub const QUESTION_GAP_SECS: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizLevel {
    Basic,
    Junior,
    Senior,
    Science,
    Commerce,
    Arts,
    Expert,
}

impl QuizLevel {
    pub const ALL: [QuizLevel; 7] = [
        QuizLevel::Basic,
        QuizLevel::Junior,
        QuizLevel::Senior,
        QuizLevel::Science,
        QuizLevel::Commerce,
        QuizLevel::Arts,
        QuizLevel::Expert,
    ];

    /// Stable id used in callback data.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Junior => "junior",
            Self::Senior => "senior",
            Self::Science => "science",
            Self::Commerce => "commerce",
            Self::Arts => "arts",
            Self::Expert => "expert",
        }
    }

    pub fn from_callback(data: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.as_str() == data)
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Basic => "🌱 Basic",
            Self::Junior => "📘 Junior",
            Self::Senior => "📕 Senior",
            Self::Science => "🔬 Science",
            Self::Commerce => "💼 Commerce",
            Self::Arts => "🎨 Arts",
            Self::Expert => "🧠 Expert",
        }
    }

    /// Difficulty wording injected into the generation prompt.
    pub fn prompt_hint(self) -> &'static str {
        match self {
            Self::Basic => "very simple, for absolute beginners",
            Self::Junior => "school level, classes 6 to 8",
            Self::Senior => "high school level, classes 9 to 12",
            Self::Science => "science stream, intermediate level",
            Self::Commerce => "commerce stream, intermediate level",
            Self::Arts => "arts stream, intermediate level",
            Self::Expert => "competitive exam level, genuinely tricky",
        }
    }
}

/// Setup walks level -> timer -> questions; answer callbacks only count
/// once the session is Active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    PickingLevel,
    PickingTimer,
    Active,
}

/// The question currently on screen, with everything needed to score an
/// answer or reveal the solution on timeout.
#[derive(Debug, Clone)]
pub struct IssuedQuestion {
    pub id: Uuid,
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: String,
    pub message_id: MessageId,
}

pub struct QuizSession {
    pub topic: String,
    pub phase: QuizPhase,
    pub level: Option<QuizLevel>,
    pub time_limit_secs: Option<u32>,
    pub score: u32,
    pub wrong: u32,
    pub asked: u32,
    pub current: Option<IssuedQuestion>,
    timer: Option<JoinHandle<()>>,
}

impl QuizSession {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            phase: QuizPhase::PickingLevel,
            level: None,
            time_limit_secs: None,
            score: 0,
            wrong: 0,
            asked: 0,
            current: None,
            timer: None,
        }
    }

    /// Returns false when the session is past the level-picking phase; the
    /// tap then came from a stale keyboard.
    pub fn choose_level(&mut self, level: QuizLevel) -> bool {
        if self.phase != QuizPhase::PickingLevel {
            return false;
        }
        self.level = Some(level);
        self.phase = QuizPhase::PickingTimer;
        true
    }

    pub fn choose_timer(&mut self, secs: u32) -> bool {
        if self.phase != QuizPhase::PickingTimer {
            return false;
        }
        self.time_limit_secs = Some(secs);
        self.score = 0;
        self.wrong = 0;
        self.asked = 0;
        self.phase = QuizPhase::Active;
        true
    }

    /// Installs a freshly generated question and arms its timeout.
    /// Generation runs outside the lock, so the quiz may have been
    /// restarted and be back in setup by the time the question arrives;
    /// anything but an Active session refuses the install and kills the
    /// timer.
    pub fn set_current(&mut self, question: IssuedQuestion, timer: JoinHandle<()>) {
        if self.phase != QuizPhase::Active {
            timer.abort();
            return;
        }
        self.cancel_timer();
        self.current = Some(question);
        self.timer = Some(timer);
    }

    pub fn cancel_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }

    /// Claims the current question if the id still matches. The first
    /// claimant (answer tap or timeout) wins; everyone else gets None.
    /// `abort_timer` must be false when the claimant is the timer task
    /// itself: aborting its own handle would cancel it at the next await,
    /// before it can reveal the answer and schedule the next round.
    pub fn resolve_current(&mut self, id: Uuid, abort_timer: bool) -> Option<IssuedQuestion> {
        match &self.current {
            Some(question) if question.id == id => {
                if abort_timer {
                    self.cancel_timer();
                } else {
                    // Detach; the timer task is the one running this.
                    self.timer = None;
                }
                self.current.take()
            }
            _ => None,
        }
    }

    pub fn record_answer(&mut self, correct: bool) {
        self.asked += 1;
        if correct {
            self.score += 1;
        } else {
            self.wrong += 1;
        }
    }

    pub fn percent(&self) -> u32 {
        if self.asked == 0 {
            return 0;
        }
        ((self.score as f64 / self.asked as f64) * 100.0).round() as u32
    }

    pub fn remark(&self) -> &'static str {
        match self.percent() {
            90..=100 => "🏆 Outstanding! Tum toh champion nikle!",
            70..=89 => "🔥 Bahut badhiya! Thoda aur practice karo.",
            40..=69 => "🙂 Theek thaak. Mehnat karte raho.",
            _ => "📚 Koi baat nahi, agli baar aur accha hoga!",
        }
    }

    pub fn report(&self) -> String {
        format!(
            "🏁 Quiz Over: {}\n\n✅ Sahi: {}\n❌ Galat: {}\n📊 Total: {}\n🎯 Score: {}%\n\n{}",
            self.topic,
            self.score,
            self.wrong,
            self.asked,
            self.percent(),
            self.remark()
        )
    }
}

/// One quiz per user. Plain mutex; closures run under the lock and never
/// await.
#[derive(Default)]
pub struct QuizStore {
    inner: Mutex<HashMap<i64, QuizSession>>,
}

impl QuizStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any quiz the user already had, killing its timer.
    pub fn start(&self, user_id: i64, topic: impl Into<String>) {
        let mut map = self.inner.lock().unwrap();
        if let Some(mut old) = map.insert(user_id, QuizSession::new(topic)) {
            old.cancel_timer();
        }
    }

    pub fn stop(&self, user_id: i64) -> Option<QuizSession> {
        let mut session = self.inner.lock().unwrap().remove(&user_id)?;
        session.cancel_timer();
        Some(session)
    }

    pub fn is_active(&self, user_id: i64) -> bool {
        self.inner.lock().unwrap().contains_key(&user_id)
    }

    pub fn with_session<T>(&self, user_id: i64, f: impl FnOnce(&mut QuizSession) -> T) -> Option<T> {
        self.inner.lock().unwrap().get_mut(&user_id).map(f)
    }

    pub fn choose_level(&self, user_id: i64, level: QuizLevel) -> Result<(), QuizError> {
        match self.with_session(user_id, |s| s.choose_level(level)) {
            Some(true) => Ok(()),
            _ => Err(QuizError::SessionExpired),
        }
    }

    pub fn choose_timer(&self, user_id: i64, secs: u32) -> Result<(), QuizError> {
        match self.with_session(user_id, |s| s.choose_timer(secs)) {
            Some(true) => Ok(()),
            _ => Err(QuizError::SessionExpired),
        }
    }

    /// Scores the question identified by `question_id`. `choice` of None
    /// means the timer ran out, which counts as wrong; only an answer tap
    /// aborts the pending timer, since on timeout that timer is the
    /// caller.
    pub fn resolve_question(
        &self,
        user_id: i64,
        question_id: Uuid,
        choice: Option<usize>,
    ) -> Result<(IssuedQuestion, bool), QuizError> {
        self.with_session(user_id, |session| {
            let question = session.resolve_current(question_id, choice.is_some())?;
            let correct = choice == Some(question.correct_index);
            session.record_answer(correct);
            Some((question, correct))
        })
        .flatten()
        .ok_or(QuizError::SessionExpired)
    }
}
