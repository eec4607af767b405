use serde::{Deserialize, Serialize};

pub const OPENROUTER_CHAT_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

pub const DEFAULT_MODEL: &str = "qwen/qwen3-32b";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatCompletionResponseMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatCompletionChoice {
    pub message: ChatCompletionResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
    pub index: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatCompletionUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: Option<u32>,
    pub total_tokens: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatCompletionResponse {
    pub id: String,
    #[serde(default)]
    pub object: Option<String>,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    pub usage: Option<ChatCompletionUsage>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if the model produced any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_skips_unset_options() {
        let request = ChatCompletionRequest {
            model: DEFAULT_MODEL.to_string(),
            messages: vec![ChatMessage::user("hi")],
            temperature: Some(0.7),
            max_tokens: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("max_tokens").is_none());
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn test_first_content() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"id": "gen-1", "created": 1, "model": "m",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "[]"}}]}"#,
        )
        .unwrap();
        assert_eq!(response.first_content(), Some("[]"));
    }
}
