use std::sync::Arc;

use crate::ai::llm::{ChatModel, GenerateRequest};
use crate::ai::scrape::{self, PageReader};
use crate::chat::cache::ReplyCache;
use crate::chat::persona;
use crate::chat::session::UserSession;

/// Where a reply came from, for the interaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Cache,
    Model,
    Error,
}

impl ReplySource {
    pub fn label(self) -> &'static str {
        match self {
            Self::Cache => "CACHE",
            Self::Model => "AI",
            Self::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub text: String,
    pub source: ReplySource,
}

impl ChatReply {
    fn model(text: String) -> Self {
        Self { text, source: ReplySource::Model }
    }

    fn error(text: impl Into<String>) -> Self {
        Self { text: text.into(), source: ReplySource::Error }
    }
}

/// Routes one chat message to the cache, the page reader, or the model, and
/// settles history and cache writes afterwards.
pub struct Orchestrator {
    model: Arc<dyn ChatModel>,
    pages: Arc<dyn PageReader>,
    cache: Arc<ReplyCache>,
}

impl Orchestrator {
    pub fn new(model: Arc<dyn ChatModel>, pages: Arc<dyn PageReader>, cache: Arc<ReplyCache>) -> Self {
        Self { model, pages, cache }
    }

    pub async fn respond(&self, session: &mut UserSession, text: &str) -> ChatReply {
        if let Some(url) = scrape::find_url(text) {
            return self.respond_about_page(session, text, url).await;
        }

        let wants_live = persona::needs_live_data(text);

        if session.memory_enabled && !wants_live {
            if let Some(answer) = self.cache.lookup(text).await {
                tracing::debug!("cache hit");
                return ChatReply { text: answer, source: ReplySource::Cache };
            }
        }

        let system = persona::system_prompt(session.mode);
        let history = if session.memory_enabled {
            session.history().to_vec()
        } else {
            Vec::new()
        };

        // Preferred variant first, then the other exactly once.
        let plan: [bool; 2] = if wants_live { [true, false] } else { [false, true] };

        let mut answer = None;
        for search in plan {
            let request = GenerateRequest {
                system: system.clone(),
                history: history.clone(),
                user_text: text.to_string(),
                search,
            };
            match self.model.generate(request).await {
                Ok(reply) => {
                    answer = Some(reply);
                    break;
                }
                Err(err) if err.is_retriable() => {
                    tracing::warn!(search, "model call failed, trying next variant: {err}")
                }
                Err(err) => tracing::error!(search, "model call failed: {err}"),
            }
        }

        let Some(answer) = answer else {
            return ChatReply::error("😔 Abhi AI se baat nahi ho pa rahi. Thodi der baad try karo.");
        };

        if session.memory_enabled {
            self.cache.store(text, &answer).await;
            session.push_exchange(text, &answer);
        }

        ChatReply::model(answer)
    }

    /// Messages carrying a link get answered from the page text via the
    /// plain model variant. Page replies are never cached; page content is
    /// too time-variable for a memoization layer.
    async fn respond_about_page(&self, session: &UserSession, text: &str, url: &str) -> ChatReply {
        tracing::debug!(url, "answering about a page");

        let page_text = match self.pages.extract_text(url).await {
            Ok(page_text) => page_text,
            Err(err) => {
                tracing::warn!("page read failed: {err}");
                return ChatReply::error(format!("❌ Ye page nahi khul paya: {url}"));
            }
        };

        let request = GenerateRequest {
            system: persona::system_prompt(session.mode),
            history: Vec::new(),
            user_text: format!("Page content:\n{page_text}\n\nUser: {text}"),
            search: false,
        };

        match self.model.generate(request).await {
            Ok(answer) => ChatReply::model(answer),
            Err(err) => {
                tracing::warn!("model call failed for page question: {err}");
                ChatReply::error("😔 Page padh liya par jawab nahi ban paya.")
            }
        }
    }
}
