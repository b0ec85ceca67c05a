use tokio::process::Command;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::ServiceError;

/// Google Translate only speaks short utterances; longer text is chunked.
const GOOGLE_TTS_CHUNK_CHARS: usize = 180;

/// The two selectable voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceEngine {
    /// edge-tts CLI, the male "Dev" voice.
    Edge,
    /// Google Translate TTS, the female fallback voice.
    Google,
}

impl VoiceEngine {
    pub fn other(self) -> Self {
        match self {
            Self::Edge => Self::Google,
            Self::Google => Self::Edge,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Edge => "♂️ Male (Dev)",
            Self::Google => "♀️ Female (Google)",
        }
    }

    fn service_name(self) -> &'static str {
        match self {
            Self::Edge => "edge-tts",
            Self::Google => "google-tts",
        }
    }
}

pub struct TtsManager {
    client: reqwest::Client,
    edge_voice_id: String,
}

impl TtsManager {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            edge_voice_id: config.edge_voice_id.clone(),
        }
    }

    /// MP3 bytes for `text`. The chosen engine is tried first, the other one
    /// exactly once on failure.
    pub async fn synthesize(&self, text: &str, engine: VoiceEngine) -> Result<Vec<u8>, ServiceError> {
        match self.speak_one(text, engine).await {
            Ok(audio) => Ok(audio),
            Err(err) => {
                tracing::warn!(
                    "{} failed, falling back to {}: {err}",
                    engine.service_name(),
                    engine.other().service_name()
                );
                self.speak_one(text, engine.other()).await
            }
        }
    }

    async fn speak_one(&self, text: &str, engine: VoiceEngine) -> Result<Vec<u8>, ServiceError> {
        match engine {
            VoiceEngine::Edge => self.speak_edge(text).await,
            VoiceEngine::Google => self.speak_google(text).await,
        }
    }

    /// edge-tts writes its output to a file; read it back and clean up.
    async fn speak_edge(&self, text: &str) -> Result<Vec<u8>, ServiceError> {
        let path = std::env::temp_dir().join(format!("tts_{}.mp3", Uuid::new_v4()));

        let output = Command::new("edge-tts")
            .args(["--voice", &self.edge_voice_id, "--text", text, "--write-media"])
            .arg(&path)
            .output()
            .await
            .map_err(|e| ServiceError::upstream("edge-tts", format!("spawn failed: {e}"), false))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(ServiceError::upstream(
                "edge-tts",
                format!("exit {}: {}", output.status, stderr.trim()),
                false,
            ));
        }

        let audio = tokio::fs::read(&path)
            .await
            .map_err(|e| ServiceError::upstream("edge-tts", format!("no media written: {e}"), false))?;
        let _ = tokio::fs::remove_file(&path).await;

        if audio.is_empty() {
            return Err(ServiceError::upstream("edge-tts", "wrote an empty media file", false));
        }
        Ok(audio)
    }

    /// Google Translate TTS over HTTP, one request per chunk, frames
    /// concatenated. MP3 frames are self-delimiting so plain concatenation
    /// plays back fine.
    async fn speak_google(&self, text: &str) -> Result<Vec<u8>, ServiceError> {
        let mut audio = Vec::new();

        for chunk in chunk_text(text, GOOGLE_TTS_CHUNK_CHARS) {
            let response = self
                .client
                .get("https://translate.google.com/translate_tts")
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", "hi"),
                    ("q", chunk.as_str()),
                ])
                .send()
                .await
                .map_err(|e| ServiceError::transport("google-tts", e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(ServiceError::upstream(
                    "google-tts",
                    format!("HTTP {status}"),
                    status.is_server_error(),
                ));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| ServiceError::transport("google-tts", e))?;
            audio.extend_from_slice(&bytes);
        }

        if audio.is_empty() {
            return Err(ServiceError::upstream("google-tts", "no audio produced", false));
        }
        Ok(audio)
    }
}

/// Telegram markdown decorations sound terrible when spoken.
pub fn strip_markup(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '*' | '_' | '`' | '#'))
        .collect()
}

/// Splits on word boundaries where possible; a single oversized token is
/// split hard so every chunk stays under `max` characters.
fn chunk_text(text: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let mut piece = String::new();
            let mut piece_len = 0;
            for ch in word.chars() {
                piece.push(ch);
                piece_len += 1;
                if piece_len == max {
                    chunks.push(std::mem::take(&mut piece));
                    piece_len = 0;
                }
            }
            current = piece;
            continue;
        }

        let current_len = current.chars().count();
        if current_len > 0 && current_len + 1 + word_len > max {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engines_form_a_two_way_switch() {
        assert_eq!(VoiceEngine::Edge.other(), VoiceEngine::Google);
        assert_eq!(VoiceEngine::Google.other(), VoiceEngine::Edge);
        assert_eq!(VoiceEngine::Edge.other().other(), VoiceEngine::Edge);
    }

    #[test]
    fn markup_characters_are_stripped_for_speech() {
        assert_eq!(strip_markup("*Dev* ka `naam` _yaad_ #rakho"), "Dev ka naam yaad rakho");
        assert_eq!(strip_markup("plain text"), "plain text");
        assert_eq!(strip_markup(""), "");
    }

    #[test]
    fn chunks_respect_the_length_ceiling() {
        let text = "ek do teen char paanch chhe saat aath nau das".repeat(10);
        for chunk in chunk_text(&text, 30) {
            assert!(chunk.chars().count() <= 30, "oversized chunk: {chunk:?}");
        }
    }

    #[test]
    fn short_text_stays_in_one_chunk() {
        assert_eq!(chunk_text("namaste duniya", 180), vec!["namaste duniya".to_string()]);
    }

    #[test]
    fn words_survive_chunking_intact() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let rejoined = chunk_text(text, 12).join(" ");
        assert_eq!(rejoined, text);
    }

    #[test]
    fn oversized_token_is_split_hard() {
        let token = "x".repeat(25);
        let chunks = chunk_text(&token, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), token);
    }
}
