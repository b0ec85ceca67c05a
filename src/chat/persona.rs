use chrono::{FixedOffset, Utc};

use crate::chat::session::Mode;

/// Words that suggest the answer needs live data rather than a canned reply.
const TRIGGER_TERMS: &[&str] = &[
    "news", "latest", "today", "price", "weather", "score", "update", "who", "what", "where",
    "when", "kaun", "kya", "kahan", "kab", "aaj", "abhi", "taja",
];

const IST_OFFSET_SECS: i32 = 5 * 3600 + 1800;

/// Instruction text per persona. The bot answers in Hinglish by default.
pub fn instruction(mode: Mode) -> &'static str {
    match mode {
        Mode::Friendly => "Tumhara naam Dev hai. Tum friendly aur cool ho. Hinglish mein baat karo.",
        Mode::Study => "Tum ek strict Teacher ho. Sirf padhai ki baat karo.",
        Mode::Funny => "Tum ek Comedian ho. Funny jawab do.",
        Mode::Roast => "Tum ek Savage Roaster ho. User ko roast karo.",
        Mode::Romantic => "Tum ek Flirty partner ho. Pyaar se baat karo.",
        Mode::Sad => "Tum bahut udaas ho.",
        Mode::Gk => "Tum GK expert ho. Short factual jawab do.",
        Mode::Math => "Tum Math Solver ho. Step-by-step samjhao.",
    }
}

/// Current time in IST, as shown in prompts and on the status page.
pub fn ist_now_string() -> String {
    let ist = FixedOffset::east_opt(IST_OFFSET_SECS).expect("IST offset is in range");
    Utc::now()
        .with_timezone(&ist)
        .format("%d %B %Y, %I:%M %p")
        .to_string()
}

pub fn system_prompt(mode: Mode) -> String {
    format!("Date: {}. {}", ist_now_string(), instruction(mode))
}

/// Word-boundary scan over the lowercased text. Substring hits do not count:
/// "whoever" must not fire on "who".
pub fn needs_live_data(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| TRIGGER_TERMS.contains(&word))
}
