use super::{ChatProvider, ChatRequest, UserContent};
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct OpenAiClient {
    client: Client,
    api_base: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    temperature: f64,
    messages: Vec<WireMessage>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: WireContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            client: Client::builder()
                .user_agent(concat!("flyai/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn to_wire(request: &ChatRequest) -> ChatCompletionRequest {
        let user_content = match request.user.as_slice() {
            [UserContent::Text(text)] => WireContent::Text(text.clone()),
            parts => WireContent::Parts(
                parts
                    .iter()
                    .map(|c| match c {
                        UserContent::Text(text) => ContentPart::Text { text: text.clone() },
                        UserContent::ImageDataUrl(url) => ContentPart::ImageUrl {
                            image_url: ImageUrl { url: url.clone() },
                        },
                    })
                    .collect(),
            ),
        };

        ChatCompletionRequest {
            model: request.model.clone(),
            temperature: request.temperature,
            messages: vec![
                WireMessage {
                    role: "system",
                    content: WireContent::Text(request.system.clone()),
                },
                WireMessage {
                    role: "user",
                    content: user_content,
                },
            ],
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> AppResult<String> {
        let url = format!("{}/chat/completions", self.api_base);
        let wire = Self::to_wire(&request);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&wire)
            .send()
            .await
            .map_err(|e| AppError::Network(format!("Chat completion request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Network(format!(
                "Chat completion failed: {} - {}",
                status, error_text
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Network(format!("Failed to parse chat response: {}", e)))?;

        let reply = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if reply.trim().is_empty() {
            return Err(AppError::Llm("Model returned an empty reply".to_string()));
        }

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_request_text_only() {
        let request = ChatRequest::new("gpt-4.1", 0.2, "system prompt").with_text("hello");
        let wire = OpenAiClient::to_wire(&request);
        let json = serde_json::to_value(&wire).unwrap();

        assert_eq!(json["model"], "gpt-4.1");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello");
    }

    #[test]
    fn test_wire_request_with_image_parts() {
        let request = ChatRequest::new("gpt-4o-mini", 0.2, "critic")
            .with_text("look at this")
            .with_image("data:image/png;base64,AAAA");
        let wire = OpenAiClient::to_wire(&request);
        let json = serde_json::to_value(&wire).unwrap();

        let parts = json["messages"][1]["content"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,AAAA");
    }
}
