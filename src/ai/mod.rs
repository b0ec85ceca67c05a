pub mod image;
pub mod llm;
pub mod scrape;
pub mod tts;
