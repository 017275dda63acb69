//! Query embedding.

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::KnowledgeError;
use crate::llm::gemini::GEMINI_API_BASE;

/// Turns text into an embedding vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, KnowledgeError>;
}

// --- Gemini embedContent request and response structures ---

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: String,
    content: EmbedContent<'a>,
    task_type: &'static str,
}

#[derive(Serialize, Debug)]
struct EmbedContent<'a> {
    parts: Vec<EmbedPart<'a>>,
}

#[derive(Serialize, Debug)]
struct EmbedPart<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug)]
struct EmbedResponse {
    embedding: EmbedValues,
}

#[derive(Deserialize, Debug)]
struct EmbedValues {
    values: Vec<f32>,
}

/// Embeds retrieval queries with the Gemini `embedContent` endpoint.
#[derive(Clone, Debug)]
pub struct GeminiEmbedder {
    client: ReqwestClient,
    api_base: String,
    api_key: SecretString,
    model: String,
}

impl GeminiEmbedder {
    pub fn new(api_key: SecretString, model: &str) -> Self {
        Self::with_api_base(GEMINI_API_BASE, api_key, model)
    }

    pub fn with_api_base(api_base: &str, api_key: SecretString, model: &str) -> Self {
        Self {
            client: ReqwestClient::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            model: model_path(model),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:embedContent", self.api_base, self.model)
    }
}

/// Gemini expects model names prefixed with `models/`.
fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, KnowledgeError> {
        let body = EmbedRequest {
            model: self.model.clone(),
            content: EmbedContent {
                parts: vec![EmbedPart { text }],
            },
            task_type: "RETRIEVAL_QUERY",
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.expose_secret())])
            .json(&body)
            .send()
            .await
            .map_err(|e| KnowledgeError::EmbeddingFailed {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(KnowledgeError::EmbeddingFailed {
                reason: format!("HTTP {status}: {error_text}"),
            });
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            KnowledgeError::EmbeddingFailed {
                reason: e.to_string(),
            }
        })?;
        debug!(dimensions = parsed.embedding.values.len(), "Embedded query");
        Ok(parsed.embedding.values)
    }
}
