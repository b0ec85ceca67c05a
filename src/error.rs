use thiserror::Error;

/// Failure of an external collaborator (LLM, TTS, image, page fetch).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{service} error: {message}")]
    Upstream {
        service: &'static str,
        message: String,
        retriable: bool,
    },

    #[error("{service} transport error: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl ServiceError {
    pub fn upstream(service: &'static str, message: impl Into<String>, retriable: bool) -> Self {
        Self::Upstream {
            service,
            message: message.into(),
            retriable,
        }
    }

    pub fn transport(service: &'static str, source: reqwest::Error) -> Self {
        Self::Transport { service, source }
    }

    /// Whether a second attempt could plausibly succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Upstream { retriable, .. } => *retriable,
            Self::Transport { source, .. } => source.is_timeout() || source.is_connect(),
        }
    }
}

/// Failures specific to the quiz mini-game.
#[derive(Debug, Error)]
pub enum QuizError {
    /// The model's question payload did not parse into a usable question.
    #[error("malformed question payload: {0}")]
    MalformedQuestion(String),

    /// Every generation attempt produced a malformed payload.
    #[error("question generation failed after {0} attempts")]
    GenerationExhausted(u32),

    /// A button press referenced quiz state that no longer exists.
    #[error("quiz session expired")]
    SessionExpired,

    #[error(transparent)]
    Service(#[from] ServiceError),
}
