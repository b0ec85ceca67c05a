use serde::Deserialize;

use crate::ai::llm::{ChatModel, GenerateRequest};
use crate::error::QuizError;
use crate::quiz::session::QuizLevel;

/// Model output is flaky JSON; retry this many times before giving up.
pub const MAX_GENERATION_ATTEMPTS: u32 = 3;

fn default_explanation() -> String {
    "Sahi jawab yahi hai.".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    #[serde(default = "default_explanation")]
    pub explanation: String,
}

impl QuizQuestion {
    fn validate(self) -> Result<Self, QuizError> {
        if self.options.len() != 4 {
            return Err(QuizError::MalformedQuestion(format!(
                "expected 4 options, got {}",
                self.options.len()
            )));
        }
        if self.correct_index >= self.options.len() {
            return Err(QuizError::MalformedQuestion(format!(
                "correct_index {} out of range",
                self.correct_index
            )));
        }
        if self.question.trim().is_empty() {
            return Err(QuizError::MalformedQuestion("empty question text".into()));
        }
        Ok(self)
    }
}

/// Pulls the outermost JSON object out of a reply that may be wrapped in
/// markdown fences or prose.
fn extract_json(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

fn parse_question(raw: &str) -> Result<QuizQuestion, QuizError> {
    let json = extract_json(raw)
        .ok_or_else(|| QuizError::MalformedQuestion("no JSON object in reply".into()))?;
    let question: QuizQuestion = serde_json::from_str(json)
        .map_err(|err| QuizError::MalformedQuestion(err.to_string()))?;
    question.validate()
}

fn build_prompt(topic: &str, level: QuizLevel) -> String {
    format!(
        "Generate one multiple-choice quiz question about '{topic}'.\n\
         Difficulty: {hint}.\n\
         Language: Hinglish.\n\
         Reply with ONLY a JSON object, no other text:\n\
         {{\"question\": \"...\", \"options\": [\"...\", \"...\", \"...\", \"...\"], \
         \"correct_index\": 0, \"explanation\": \"...\"}}\n\
         Exactly 4 options. correct_index is 0-based.",
        hint = level.prompt_hint()
    )
}

/// Asks the model for a fresh question, retrying on malformed output.
/// Transport and upstream failures are not retried here; the caller ends
/// the quiz on those.
pub async fn generate_question(
    model: &dyn ChatModel,
    topic: &str,
    level: QuizLevel,
) -> Result<QuizQuestion, QuizError> {
    let prompt = build_prompt(topic, level);

    for attempt in 1..=MAX_GENERATION_ATTEMPTS {
        let request = GenerateRequest {
            system: String::new(),
            history: Vec::new(),
            user_text: prompt.clone(),
            search: false,
        };
        let raw = model.generate(request).await?;
        match parse_question(&raw) {
            Ok(question) => return Ok(question),
            Err(err) => tracing::warn!(attempt, "discarding malformed question: {err}"),
        }
    }

    Err(QuizError::GenerationExhausted(MAX_GENERATION_ATTEMPTS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::ServiceError;

    const GOOD_JSON: &str = r#"{"question": "Capital of India?", "options": ["Mumbai", "Delhi", "Pune", "Agra"], "correct_index": 1, "explanation": "Delhi hai."}"#;

    struct SequenceModel {
        replies: Vec<Result<String, ServiceError>>,
        calls: AtomicUsize,
    }

    impl SequenceModel {
        fn new(replies: Vec<Result<String, ServiceError>>) -> Self {
            Self { replies, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl ChatModel for SequenceModel {
        async fn generate(&self, _request: GenerateRequest) -> Result<String, ServiceError> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.replies.get(i) {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(err)) => Err(ServiceError::upstream("gemini", err.to_string(), false)),
                None => Ok("ran out of scripted replies".to_string()),
            }
        }

        async fn transcribe_and_reply(
            &self,
            _audio: &[u8],
            _mime: &str,
            _system: &str,
        ) -> Result<String, ServiceError> {
            Ok(String::new())
        }
    }

    #[test]
    fn plain_json_parses() {
        let q = parse_question(GOOD_JSON).unwrap();
        assert_eq!(q.question, "Capital of India?");
        assert_eq!(q.correct_index, 1);
        assert_eq!(q.options.len(), 4);
        assert_eq!(q.explanation, "Delhi hai.");
    }

    #[test]
    fn fenced_and_prose_wrapped_json_parses() {
        let fenced = format!("```json\n{GOOD_JSON}\n```");
        assert!(parse_question(&fenced).is_ok());

        let prose = format!("Sure! Here is your question:\n{GOOD_JSON}\nEnjoy!");
        assert!(parse_question(&prose).is_ok());
    }

    #[test]
    fn missing_explanation_gets_the_default() {
        let raw = r#"{"question": "Q?", "options": ["a", "b", "c", "d"], "correct_index": 0}"#;
        let q = parse_question(raw).unwrap();
        assert_eq!(q.explanation, "Sahi jawab yahi hai.");
    }

    #[test]
    fn wrong_option_count_is_rejected() {
        let raw = r#"{"question": "Q?", "options": ["a", "b"], "correct_index": 0}"#;
        assert!(matches!(parse_question(raw), Err(QuizError::MalformedQuestion(_))));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let raw = r#"{"question": "Q?", "options": ["a", "b", "c", "d"], "correct_index": 4}"#;
        assert!(matches!(parse_question(raw), Err(QuizError::MalformedQuestion(_))));
    }

    #[test]
    fn reply_without_json_is_rejected() {
        assert!(matches!(
            parse_question("mujhe nahi pata"),
            Err(QuizError::MalformedQuestion(_))
        ));
    }

    #[test]
    fn prompt_names_topic_and_difficulty() {
        let prompt = build_prompt("indian history", QuizLevel::Expert);
        assert!(prompt.contains("indian history"));
        assert!(prompt.contains("competitive exam level"));
        assert!(prompt.contains("correct_index"));
    }

    #[tokio::test]
    async fn malformed_replies_are_retried_then_exhausted() {
        let model = SequenceModel::new(vec![
            Ok("not json".to_string()),
            Ok("{\"broken\": true}".to_string()),
            Ok("still nothing useful".to_string()),
        ]);
        let result = generate_question(&model, "gk", QuizLevel::Basic).await;
        assert!(matches!(result, Err(QuizError::GenerationExhausted(3))));
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn second_attempt_can_succeed() {
        let model = SequenceModel::new(vec![
            Ok("garbage".to_string()),
            Ok(GOOD_JSON.to_string()),
        ]);
        let question = generate_question(&model, "gk", QuizLevel::Basic).await.unwrap();
        assert_eq!(question.correct_index, 1);
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn service_failures_are_not_retried() {
        let model = SequenceModel::new(vec![Err(ServiceError::upstream(
            "gemini",
            "quota exceeded",
            false,
        ))]);
        let result = generate_question(&model, "gk", QuizLevel::Basic).await;
        assert!(matches!(result, Err(QuizError::Service(_))));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }
}
