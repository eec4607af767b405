use anyhow::{Context, Result};
use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};
use tracing::{info, warn};

pub const DEFAULT_USER_ID: &str = "demo-user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    OpenRouter,
    Fake,
}

impl FromStr for LlmProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openrouter" => Ok(LlmProviderKind::OpenRouter),
            "fake" => Ok(LlmProviderKind::Fake),
            other => Err(format!("unknown provider '{}' (expected openrouter or fake)", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub default_user_id: String,
    pub llm_provider: LlmProviderKind,
    pub openrouter_api_key: Option<String>,
    pub llm_model: String,
    pub llm_timeout: Duration,
    pub tesseract_cmd: String,
    pub ocr_timeout: Duration,
}

impl Config {
    /// Reads `.env` (if any) and the process environment.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            port: try_load("PORT", "3001")?,
            data_dir: PathBuf::from(try_load::<String>("DATA_DIR", "data")?),
            default_user_id: try_load("DEFAULT_USER_ID", DEFAULT_USER_ID)?,
            llm_provider: try_load("LLM_PROVIDER", "openrouter")?,
            openrouter_api_key: env::var("OPENROUTER_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            llm_model: try_load("LLM_MODEL", crate::api_connection::endpoints::DEFAULT_MODEL)?,
            llm_timeout: Duration::from_secs(try_load("LLM_TIMEOUT_SECS", "60")?),
            tesseract_cmd: try_load("TESSERACT_CMD", "tesseract")?,
            ocr_timeout: Duration::from_secs(try_load("OCR_TIMEOUT_SECS", "30")?),
        })
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("pantry_chef.json")
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse::<T>()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            anyhow::anyhow!("{e}")
        })
        .with_context(|| format!("Environment variable {key} is misconfigured"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_load_default_and_invalid() {
        let port: u16 = try_load("PANTRY_CHEF_TEST_UNSET_PORT", "3001").unwrap();
        assert_eq!(port, 3001);

        env::set_var("PANTRY_CHEF_TEST_BAD_TIMEOUT", "soon");
        assert!(try_load::<u64>("PANTRY_CHEF_TEST_BAD_TIMEOUT", "60").is_err());
        env::remove_var("PANTRY_CHEF_TEST_BAD_TIMEOUT");
    }

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("Fake".parse::<LlmProviderKind>(), Ok(LlmProviderKind::Fake));
        assert_eq!("openrouter".parse::<LlmProviderKind>(), Ok(LlmProviderKind::OpenRouter));
        assert!("gpt".parse::<LlmProviderKind>().is_err());
    }
}
