use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::error::ServiceError;

/// Pages are clipped before they hit the model's context window.
const MAX_PAGE_CHARS: usize = 8000;

/// Plenty of sites refuse requests without a browser user agent.
const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Fetches a web page and boils it down to readable text.
#[async_trait]
pub trait PageReader: Send + Sync {
    async fn extract_text(&self, url: &str) -> Result<String, ServiceError>;
}

#[derive(Default)]
pub struct HttpPageReader {
    client: reqwest::Client,
}

impl HttpPageReader {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PageReader for HttpPageReader {
    async fn extract_text(&self, url: &str) -> Result<String, ServiceError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, BROWSER_UA)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| ServiceError::transport("scrape", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::upstream(
                "scrape",
                format!("HTTP {status} for {url}"),
                status.is_server_error(),
            ));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ServiceError::transport("scrape", e))?;

        let text = paragraphs_to_text(&html);
        if text.is_empty() {
            return Err(ServiceError::upstream("scrape", "no readable paragraphs", false));
        }
        Ok(text)
    }
}

fn paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p>").expect("paragraph pattern"))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]+>").expect("tag pattern"))
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("url pattern"))
}

/// Paragraph contents only; menus, scripts and ads live outside `<p>` tags
/// often enough that this crude cut works well in practice.
fn paragraphs_to_text(html: &str) -> String {
    let mut out = String::new();

    for cap in paragraph_re().captures_iter(html) {
        let inner = tag_re().replace_all(&cap[1], " ");
        let decoded = decode_entities(&inner);
        let cleaned = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
        if cleaned.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&cleaned);
        if out.chars().count() >= MAX_PAGE_CHARS {
            break;
        }
    }

    out.chars().take(MAX_PAGE_CHARS).collect()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// First http(s) link in the text, trailing punctuation trimmed.
pub fn find_url(text: &str) -> Option<&str> {
    url_re()
        .find(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ')', ']']))
}
