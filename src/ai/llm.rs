use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;

use crate::config::AppConfig;
use crate::error::ServiceError;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Who produced a conversation turn, in Gemini wire terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    fn as_wire(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// A single (role, text) turn forwarded as conversation context.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// One text-in, text-out request to the chat model.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub system: String,
    pub history: Vec<ChatTurn>,
    pub user_text: String,
    /// Ask for the search-grounded variant of the call.
    pub search: bool,
}

/// The hosted model behind the bot. Narrow on purpose so handlers and the
/// quiz engine can run against a scripted fake in tests.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<String, ServiceError>;

    /// One call that both transcribes a voice note and answers it.
    async fn transcribe_and_reply(
        &self,
        audio: &[u8],
        mime: &str,
        system: &str,
    ) -> Result<String, ServiceError>;
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
        }
    }

    fn request_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            GEMINI_BASE_URL, self.model, self.api_key
        )
    }

    fn build_body(request: &GenerateRequest) -> serde_json::Value {
        let mut contents: Vec<serde_json::Value> = Vec::new();

        for turn in &request.history {
            contents.push(serde_json::json!({
                "role": turn.role.as_wire(),
                "parts": [{ "text": turn.text }],
            }));
        }

        contents.push(serde_json::json!({
            "role": "user",
            "parts": [{ "text": request.user_text }],
        }));

        let mut body = serde_json::json!({ "contents": contents });

        if !request.system.is_empty() {
            body["system_instruction"] = serde_json::json!({
                "parts": [{ "text": request.system }],
            });
        }

        if request.search {
            body["tools"] = serde_json::json!([{ "google_search": {} }]);
        }

        body
    }

    async fn post_generate(&self, body: &serde_json::Value) -> Result<String, ServiceError> {
        let response = self
            .client
            .post(self.request_url())
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::transport("gemini", e))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ServiceError::upstream("gemini", "rate limited", true));
        }
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ServiceError::upstream(
                "gemini",
                format!("HTTP {status}: {error_body}"),
                status.is_server_error(),
            ));
        }

        let resp: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ServiceError::transport("gemini", e))?;

        // Text lives in candidates[0].content.parts[].text.
        let parts = resp["candidates"][0]["content"]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        let mut text = String::new();
        for part in &parts {
            if let Some(piece) = part["text"].as_str() {
                text.push_str(piece);
            }
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::upstream(
                "gemini",
                "response carried no candidates",
                false,
            ));
        }

        Ok(text.to_string())
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<String, ServiceError> {
        let body = Self::build_body(&request);
        self.post_generate(&body).await
    }

    async fn transcribe_and_reply(
        &self,
        audio: &[u8],
        mime: &str,
        system: &str,
    ) -> Result<String, ServiceError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(audio);
        let body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": system },
                    { "inline_data": { "mime_type": mime, "data": encoded } },
                ],
            }],
        });
        self.post_generate(&body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(search: bool) -> GenerateRequest {
        GenerateRequest {
            system: "Be brief.".into(),
            history: vec![ChatTurn::user("hi"), ChatTurn::model("hello!")],
            user_text: "kaise ho?".into(),
            search,
        }
    }

    #[test]
    fn body_interleaves_history_before_the_new_turn() {
        let body = GeminiClient::build_body(&request(false));
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["text"], "kaise ho?");
    }

    #[test]
    fn system_text_goes_into_system_instruction() {
        let body = GeminiClient::build_body(&request(false));
        assert_eq!(body["system_instruction"]["parts"][0]["text"], "Be brief.");

        let mut req = request(false);
        req.system = String::new();
        let body = GeminiClient::build_body(&req);
        assert!(body.get("system_instruction").is_none());
    }

    #[test]
    fn search_flag_toggles_the_google_search_tool() {
        let body = GeminiClient::build_body(&request(true));
        assert!(body["tools"][0].get("google_search").is_some());

        let body = GeminiClient::build_body(&request(false));
        assert!(body.get("tools").is_none());
    }
}
