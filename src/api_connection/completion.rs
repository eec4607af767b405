//! The text-completion seam the pipeline talks to.

use async_trait::async_trait;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use super::connection::{ApiConnectionError, OpenRouterConnection};
use super::endpoints::{ChatCompletionRequest, ChatMessage};
use crate::error::AppError;

const SYSTEM_PROMPT: &str =
    "You are a culinary assistant. You always answer with valid JSON and nothing else.";

/// Anything that turns a prompt into model text.
#[async_trait]
pub trait TextCompletion: Send + Sync + fmt::Debug {
    async fn complete(&self, prompt: &str) -> Result<String, AppError>;

    fn model_name(&self) -> &str;
}

/// Production model backed by OpenRouter.
#[derive(Debug)]
pub struct OpenRouterCompletion {
    connection: OpenRouterConnection,
    model: String,
}

impl OpenRouterCompletion {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, ApiConnectionError> {
        Ok(Self {
            connection: OpenRouterConnection::new(api_key, timeout)?,
            model,
        })
    }
}

#[async_trait]
impl TextCompletion for OpenRouterCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, AppError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
            temperature: Some(0.7),
            max_tokens: Some(4096),
        };

        let response = self.connection.call_chat_completion(&request).await?;
        let content = response
            .first_content()
            .ok_or(ApiConnectionError::EmptyResponse)?
            .to_string();

        debug!("Raw model response:\n---\n{}\n---", content);
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Scripted model for tests and offline runs.
///
/// Responses are matched by case-insensitive substring of the prompt, in
/// registration order. Without a match the default response is returned, or
/// an upstream error when there is none.
#[derive(Debug, Default)]
pub struct FakeCompletion {
    responses: Vec<(String, Result<String, String>)>,
    default_response: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl FakeCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, prompt_contains: &str, response: &str) -> Self {
        self.responses
            .push((prompt_contains.to_lowercase(), Ok(response.to_string())));
        self
    }

    /// Prompts containing `prompt_contains` fail as if the API were unreachable.
    pub fn with_failure(mut self, prompt_contains: &str, message: &str) -> Self {
        self.responses
            .push((prompt_contains.to_lowercase(), Err(message.to_string())));
        self
    }

    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    /// Canned answers good enough to click through the app without an API key.
    pub fn with_demo_responses() -> Self {
        Self::new()
            .with_response(
                "grocery receipt parser",
                r#"[{"name": "eggs", "quantity": "12"}, {"name": "milk", "quantity": "1 gal"}]"#,
            )
            .with_response(
                "chef assistant",
                r#"```json
{"recipes": [{"name": "Cheesy Scrambled Eggs", "description": "Soft eggs with melted cheddar.",
  "prepTime": "5 minutes", "cookTime": "5 minutes", "difficulty": "easy", "servings": 2,
  "ingredients": ["4 eggs", "1/4 cup shredded cheddar", "1 tbsp butter"],
  "instructions": ["Whisk the eggs.", "Melt butter over low heat.", "Stir eggs until just set, fold in cheese."],
  "allergenWarning": "None", "dietaryTags": ["vegetarian"]}]}
```"#,
            )
    }

    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextCompletion for FakeCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, AppError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let prompt_lower = prompt.to_lowercase();
        for (pattern, response) in &self.responses {
            if prompt_lower.contains(pattern.as_str()) {
                return response.clone().map_err(AppError::Upstream);
            }
        }

        match &self.default_response {
            Some(response) => Ok(response.clone()),
            None => Err(AppError::Upstream(format!(
                "FakeCompletion: no response configured for prompt starting with: {}",
                prompt.chars().take(100).collect::<String>()
            ))),
        }
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_matching_is_case_insensitive() {
        let model = FakeCompletion::new().with_response("HELLO", "world");
        assert_eq!(model.complete("hello there").await.unwrap(), "world");
        assert_eq!(model.recorded_prompts(), vec!["hello there"]);
    }

    #[tokio::test]
    async fn test_fake_without_match_errors() {
        let model = FakeCompletion::new();
        assert!(matches!(model.complete("anything").await, Err(AppError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_fake_scripted_failure_and_default() {
        let model = FakeCompletion::new()
            .with_failure("receipt", "connection refused")
            .with_default_response("{}");
        assert!(model.complete("parse this receipt").await.is_err());
        assert_eq!(model.complete("something else").await.unwrap(), "{}");
    }
}
