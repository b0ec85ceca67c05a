use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub telegram_bot_token: String,
    pub gemini_api_key: String,
    pub gemini_model: String,

    /// Telegram user ID allowed to wipe the reply cache.
    pub owner_id: i64,
    /// Chat ID mirrored with interaction logs; 0 disables mirroring.
    pub log_channel_id: i64,

    /// Path of the reply-cache JSON file.
    pub cache_path: String,

    /// edge-tts voice used for the male "Dev" voice.
    pub edge_voice_id: String,

    /// Port for the health-check HTTP server.
    pub http_port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN")?,
            gemini_api_key: std::env::var("GEMINI_API_KEY")?,
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            owner_id: std::env::var("OWNER_ID")
                .unwrap_or_else(|_| "0".to_string())
                .parse()?,
            log_channel_id: std::env::var("LOG_CHANNEL_ID")
                .unwrap_or_else(|_| "0".to_string())
                .parse()?,
            cache_path: std::env::var("CACHE_PATH").unwrap_or_else(|_| "reply.json".to_string()),
            edge_voice_id: std::env::var("EDGE_VOICE_ID")
                .unwrap_or_else(|_| "hi-IN-MadhurNeural".to_string()),
            http_port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),
        })
    }

    pub fn is_owner(&self, user_id: i64) -> bool {
        user_id == self.owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig {
            telegram_bot_token: "token".into(),
            gemini_api_key: "key".into(),
            gemini_model: "gemini-2.0-flash".into(),
            owner_id: 42,
            log_channel_id: 0,
            cache_path: "reply.json".into(),
            edge_voice_id: "hi-IN-MadhurNeural".into(),
            http_port: 8000,
        }
    }

    #[test]
    fn only_the_owner_passes_the_gate() {
        let config = test_config();
        assert!(config.is_owner(42));
        assert!(!config.is_owner(43));
        assert!(!config.is_owner(0));
    }
}
