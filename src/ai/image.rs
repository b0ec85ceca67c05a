use url::Url;

const POLLINATIONS_BASE: &str = "https://image.pollinations.ai";

/// Pollinations renders the image straight from the prompt in the URL path,
/// so "generation" is pure string construction.
pub fn build_image_url(prompt: &str) -> Url {
    let mut url = Url::parse(POLLINATIONS_BASE).expect("static base url");
    url.path_segments_mut()
        .expect("https url is a valid base")
        .push("prompt")
        .push(prompt);
    url.set_query(Some("nologo=true"));
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lands_in_the_path_with_nologo() {
        let url = build_image_url("future city");
        assert_eq!(url.as_str(), "https://image.pollinations.ai/prompt/future%20city?nologo=true");
    }

    #[test]
    fn reserved_characters_are_percent_encoded() {
        let url = build_image_url("cat & dog / 100%");
        let path = url.path();
        assert!(path.starts_with("/prompt/"), "path: {path}");
        assert!(!path[8..].contains('/'), "prompt must stay one segment: {path}");
        assert!(path.contains("%25"), "percent sign must be encoded: {path}");
    }

    #[test]
    fn hindi_prompts_survive_encoding() {
        let url = build_image_url("सुंदर पहाड़");
        assert!(url.as_str().contains("nologo=true"));
        assert_eq!(url.host_str(), Some("image.pollinations.ai"));
    }
}
