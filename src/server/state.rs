use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api_connection::{FakeCompletion, OpenRouterCompletion, TextCompletion};
use crate::config::{Config, LlmProviderKind};
use crate::ocr::{OcrEngine, TesseractOcr};
use crate::storage::{DocumentStore, JsonFileStore};

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub model: Arc<dyn TextCompletion>,
    pub ocr: Arc<dyn OcrEngine>,
    pub default_user_id: Arc<str>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        model: Arc<dyn TextCompletion>,
        ocr: Arc<dyn OcrEngine>,
        default_user_id: &str,
    ) -> Self {
        Self {
            store,
            model,
            ocr,
            default_user_id: Arc::from(default_user_id),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let store = open_store(config)?;
        let model = build_model(config)?;
        info!("Using model {}", model.model_name());

        let ocr = TesseractOcr::new(config.tesseract_cmd.clone(), config.ocr_timeout);

        Ok(Self::new(
            store,
            model,
            Arc::new(ocr),
            &config.default_user_id,
        ))
    }
}

/// Opens the configured document store without touching the model or OCR.
pub fn open_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    let store_path = config.store_path();
    let store = JsonFileStore::open(&store_path)
        .with_context(|| format!("Failed to open document store at {}", store_path.display()))?;
    info!("Document store at {}", store_path.display());
    Ok(Arc::new(store))
}

pub fn build_model(config: &Config) -> Result<Arc<dyn TextCompletion>> {
    match config.llm_provider {
        LlmProviderKind::Fake => {
            warn!("LLM_PROVIDER=fake, recipes and receipt parsing use canned responses");
            Ok(Arc::new(FakeCompletion::with_demo_responses()))
        }
        LlmProviderKind::OpenRouter => {
            let api_key = config
                .openrouter_api_key
                .clone()
                .context("OPENROUTER_API_KEY must be set when LLM_PROVIDER=openrouter")?;
            let model = OpenRouterCompletion::new(api_key, config.llm_model.clone(), config.llm_timeout)
                .context("Failed to build OpenRouter client")?;
            Ok(Arc::new(model))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn config_without_key(data_dir: &std::path::Path) -> Config {
        Config {
            port: 3001,
            data_dir: data_dir.to_path_buf(),
            default_user_id: "demo-user".to_string(),
            llm_provider: LlmProviderKind::OpenRouter,
            openrouter_api_key: None,
            llm_model: "test-model".to_string(),
            llm_timeout: Duration::from_secs(5),
            tesseract_cmd: "tesseract".to_string(),
            ocr_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_store_opens_without_api_key() {
        let dir = tempdir().unwrap();
        let config = config_without_key(dir.path());

        assert!(open_store(&config).is_ok());
        assert!(build_model(&config).is_err());
        assert!(AppState::from_config(&config).is_err());
    }

    #[test]
    fn test_fake_provider_needs_no_key() {
        let dir = tempdir().unwrap();
        let mut config = config_without_key(dir.path());
        config.llm_provider = LlmProviderKind::Fake;

        let state = AppState::from_config(&config).unwrap();
        assert_eq!(&*state.default_user_id, "demo-user");
    }
}
