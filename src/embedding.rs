//! OpenAI-compatible embedding model.
//!
//! [`OpenAiEmbeddingModel`] calls `POST {base_url}/embeddings` for one text
//! at a time; batching and retries are the indexer's job. Responses are
//! classified into [`EmbeddingError`] variants:
//!
//! | Condition | Variant | Retried |
//! |-----------|---------|---------|
//! | API key env var unset, base URL empty | `Config` | no |
//! | HTTP 401 / 403 | `Auth` | no |
//! | HTTP 429 | `RateLimited` | yes |
//! | HTTP 5xx, network error | `Transient` | yes |
//! | other HTTP 4xx, malformed body | `Provider` | no |
//!
//! Use [`create_model`] to build the configured model.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use quill_core::embedding::{EmbeddingError, EmbeddingModel};

use crate::config::EmbeddingConfig;

/// Embedding model backed by an OpenAI-compatible HTTP API.
pub struct OpenAiEmbeddingModel {
    id: String,
    model: String,
    dims: usize,
    base_url: Option<String>,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiEmbeddingModel {
    /// Build the model from configuration.
    ///
    /// A missing API key or base URL does not fail here; it surfaces as
    /// [`EmbeddingError::Config`] on the first call, so hosts can prompt
    /// for settings at the point of use.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for OpenAI provider"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            id: format!("openai/{}", model),
            model,
            dims,
            base_url: config
                .base_url
                .as_ref()
                .map(|u| u.trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
            api_key: std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty()),
            client,
        })
    }
}

#[async_trait]
impl EmbeddingModel for OpenAiEmbeddingModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn dimension(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| EmbeddingError::Config("embedding base URL is not set".into()))?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| EmbeddingError::Config("API key is not set".into()))?;

        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });

        let response = self
            .client
            .post(format!("{}/embeddings", base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), body_text));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Transient(e.to_string()))?;
        parse_openai_response(&json)?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Provider {
                status: None,
                message: "empty embedding response".into(),
            })
    }
}

fn classify_status(status: u16, body: String) -> EmbeddingError {
    let message = format!("HTTP {}: {}", status, body);
    match status {
        401 | 403 => EmbeddingError::Auth(message),
        429 => EmbeddingError::RateLimited(message),
        s if s >= 500 => EmbeddingError::Transient(message),
        s => EmbeddingError::Provider {
            status: Some(s),
            message: body,
        },
    }
}

/// Extract `data[].embedding` arrays, ordered by `data[].index`.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let malformed = |what: &str| EmbeddingError::Provider {
        status: None,
        message: format!("invalid embeddings response: {}", what),
    };

    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| malformed("missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| malformed("missing embedding"))?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map_or(position, |i| i as usize);
        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        indexed.push((index, vec));
    }
    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

/// Build the configured embedding model.
///
/// | Config Value | Model |
/// |-------------|-------|
/// | `"openai"` | [`OpenAiEmbeddingModel`] |
/// | `"disabled"` | error: nothing to index with |
pub fn create_model(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingModel>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiEmbeddingModel::new(config)?)),
        "disabled" => bail!("Embedding provider is disabled. Set [embedding] provider in config."),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "openai".into(),
            model: Some("text-embedding-3-small".into()),
            dims: Some(3),
            api_key_env: "QUILL_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(classify_status(401, String::new()), EmbeddingError::Auth(_)));
        assert!(matches!(classify_status(403, String::new()), EmbeddingError::Auth(_)));
        assert!(matches!(classify_status(429, String::new()), EmbeddingError::RateLimited(_)));
        assert!(matches!(classify_status(503, String::new()), EmbeddingError::Transient(_)));
        assert!(matches!(
            classify_status(400, "too long".into()),
            EmbeddingError::Provider { status: Some(400), .. }
        ));
    }

    #[test]
    fn test_parse_orders_by_index() {
        let json = serde_json::json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        });
        assert_eq!(
            parse_openai_response(&json).unwrap(),
            vec![vec![1.0, 0.0], vec![0.0, 1.0]]
        );
        assert!(parse_openai_response(&serde_json::json!({ "error": "x" })).is_err());
    }

    #[tokio::test]
    async fn test_missing_key_is_a_config_error() {
        let model = OpenAiEmbeddingModel::new(&config()).unwrap();
        assert_eq!(model.id(), "openai/text-embedding-3-small");
        assert_eq!(model.dimension(), 3);
        let err = model.embed("hello").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Config(_)));
        assert!(!model.is_retryable(&err));
    }

    #[tokio::test]
    async fn test_empty_base_url_is_a_config_error() {
        let model = OpenAiEmbeddingModel::new(&EmbeddingConfig {
            base_url: Some(String::new()),
            ..config()
        })
        .unwrap();
        assert!(matches!(model.embed("hello").await, Err(EmbeddingError::Config(_))));
    }

    #[test]
    fn test_create_model_dispatch() {
        assert!(create_model(&EmbeddingConfig::default()).is_err());
        assert!(create_model(&config()).is_ok());
    }
}
