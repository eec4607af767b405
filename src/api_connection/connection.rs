use reqwest::Client;
use std::error::Error;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use super::endpoints::{ChatCompletionRequest, ChatCompletionResponse, OPENROUTER_CHAT_URL};
use crate::error::AppError;

#[derive(Debug)]
pub enum ApiConnectionError {
    MissingApiKey(String),
    NetworkError(reqwest::Error),
    Timeout(Duration),
    SerializationError(serde_json::Error),
    ApiError {
        status: reqwest::StatusCode,
        error_body: String,
    },
    EmptyResponse,
}

impl fmt::Display for ApiConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiConnectionError::MissingApiKey(key_name) => {
                write!(f, "API key not found in environment: {}", key_name)
            }
            ApiConnectionError::NetworkError(err) => write!(f, "Network error: {}", err),
            ApiConnectionError::Timeout(after) => {
                write!(f, "Request timed out after {}s", after.as_secs())
            }
            ApiConnectionError::SerializationError(err) => {
                write!(f, "Serialization error: {}", err)
            }
            ApiConnectionError::ApiError { status, error_body } => {
                write!(f, "API error {}: {}", status, error_body)
            }
            ApiConnectionError::EmptyResponse => write!(f, "No response choices received from API"),
        }
    }
}

impl Error for ApiConnectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ApiConnectionError::NetworkError(err) => Some(err),
            ApiConnectionError::SerializationError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiConnectionError {
    fn from(err: serde_json::Error) -> Self {
        ApiConnectionError::SerializationError(err)
    }
}

impl From<ApiConnectionError> for AppError {
    fn from(err: ApiConnectionError) -> Self {
        match err {
            ApiConnectionError::Timeout(after) => AppError::Timeout {
                service: "AI model",
                seconds: after.as_secs(),
            },
            other => AppError::Upstream(other.to_string()),
        }
    }
}

/// Thin client for the OpenRouter chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenRouterConnection {
    api_key: String,
    client: Client,
    timeout: Duration,
    site_url: String,
    app_name: String,
}

impl OpenRouterConnection {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, ApiConnectionError> {
        if api_key.trim().is_empty() {
            return Err(ApiConnectionError::MissingApiKey("OPENROUTER_API_KEY".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiConnectionError::NetworkError)?;

        Ok(Self {
            api_key,
            client,
            timeout,
            site_url: std::env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string()),
            app_name: std::env::var("APP_NAME").unwrap_or_else(|_| "PantryChef".to_string()),
        })
    }

    fn classify(&self, err: reqwest::Error) -> ApiConnectionError {
        if err.is_timeout() {
            ApiConnectionError::Timeout(self.timeout)
        } else {
            ApiConnectionError::NetworkError(err)
        }
    }

    pub async fn call_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ApiConnectionError> {
        debug!("Sending chat completion to model {}", request.model);

        let response = self
            .client
            .post(OPENROUTER_CHAT_URL)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.site_url)
            .header("X-Title", &self.app_name)
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            return Err(ApiConnectionError::ApiError {
                status,
                error_body: body,
            });
        }

        Ok(serde_json::from_str::<ChatCompletionResponse>(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_api_key_rejected() {
        let result = OpenRouterConnection::new("  ".to_string(), Duration::from_secs(5));
        assert!(matches!(result, Err(ApiConnectionError::MissingApiKey(_))));
    }

    #[test]
    fn test_timeout_maps_to_distinct_app_error() {
        let err: AppError = ApiConnectionError::Timeout(Duration::from_secs(60)).into();
        assert!(matches!(err, AppError::Timeout { seconds: 60, .. }));

        let err: AppError = ApiConnectionError::EmptyResponse.into();
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
