pub mod openai;

use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use base64::Engine;
use std::path::Path;

/// One user-turn content block: plain text or an inline image data URL.
#[derive(Debug, Clone)]
pub enum UserContent {
    Text(String),
    ImageDataUrl(String),
}

/// A single chat completion request: one system turn, one mixed user turn.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub temperature: f64,
    pub system: String,
    pub user: Vec<UserContent>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, temperature: f64, system: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature,
            system: system.into(),
            user: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.user.push(UserContent::Text(text.into()));
        self
    }

    pub fn with_image(mut self, data_url: impl Into<String>) -> Self {
        self.user.push(UserContent::ImageDataUrl(data_url.into()));
        self
    }
}

#[async_trait]
pub trait ChatProvider {
    /// Send a chat request and return the assistant's text reply.
    async fn complete(&self, request: ChatRequest) -> AppResult<String>;
}

/// Remove ```...``` fences if the model wraps its output in markdown.
pub fn strip_code_fences(text: &str) -> String {
    let text = text.trim();
    if !text.starts_with("```") {
        return text.to_string();
    }

    let mut lines: Vec<&str> = text.lines().collect();
    if lines.first().is_some_and(|l| l.starts_with("```")) {
        lines.remove(0);
    }
    if lines.last().is_some_and(|l| l.trim() == "```") {
        lines.pop();
    }
    lines.join("\n").trim().to_string()
}

/// Extract the outermost JSON object from a model reply that may carry
/// surrounding prose despite instructions.
pub fn extract_json_object(text: &str) -> AppResult<&str> {
    let first = text.find('{');
    let last = text.rfind('}');
    match (first, last) {
        (Some(first), Some(last)) if last > first => Ok(&text[first..=last]),
        _ => Err(AppError::Llm(format!(
            "Model did not return a JSON object:\n{}",
            text
        ))),
    }
}

fn guess_mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}

/// Read a local image and return a data: URL suitable for vision requests.
pub fn image_to_data_url(path: &Path) -> AppResult<String> {
    if !path.is_file() {
        return Err(AppError::Io(format!(
            "Image file not found: {}",
            path.display()
        )));
    }

    let bytes = std::fs::read(path)
        .map_err(|e| AppError::Io(format!("Failed to read image '{}': {}", path.display(), e)))?;

    let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{};base64,{}", guess_mime_type(path), b64))
}

/// First non-empty line of a reply, for prompts that demand a single sentence.
pub fn first_nonempty_line(text: &str) -> String {
    for line in text.lines() {
        let line = line.trim();
        if !line.is_empty() {
            return line.to_string();
        }
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_strip_code_fences_plain_text_unchanged() {
        assert_eq!(strip_code_fences("  <cpacs/>  "), "<cpacs/>");
    }

    #[test]
    fn test_strip_code_fences_removes_fences() {
        let fenced = "```xml\n<cpacs/>\n```";
        assert_eq!(strip_code_fences(fenced), "<cpacs/>");
    }

    #[test]
    fn test_strip_code_fences_without_trailing_fence() {
        let fenced = "```json\n{\"edits\": []}";
        assert_eq!(strip_code_fences(fenced), "{\"edits\": []}");
    }

    #[test]
    fn test_extract_json_object() {
        let reply = "Sure, here you go: {\"edits\": [{\"a\": 1}]} hope that helps";
        assert_eq!(
            extract_json_object(reply).unwrap(),
            "{\"edits\": [{\"a\": 1}]}"
        );
    }

    #[test]
    fn test_extract_json_object_missing() {
        assert!(extract_json_object("no json here").is_err());
    }

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(guess_mime_type(Path::new("a.webp")), "image/webp");
        assert_eq!(guess_mime_type(Path::new("a.bin")), "image/png");
    }

    #[test]
    fn test_image_to_data_url_prefix() {
        let mut f = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        f.write_all(&[0x89, 0x50, 0x4e, 0x47]).unwrap();
        let url = image_to_data_url(f.path()).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_first_nonempty_line() {
        assert_eq!(
            first_nonempty_line("\n\n  make the nose more pointed  \nsecond"),
            "make the nose more pointed"
        );
    }
}
