//! Embedding provider seam.
//!
//! The core never retries a failed provider call: a partially embedded
//! index is worse than none, so provider failures abort the build. The
//! provider identity participates in the index fingerprint.

use crate::error::IngestError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identity hashed into the index fingerprint; changing the model
    /// forces a rebuild.
    fn model_id(&self) -> &str;

    /// One fixed-length vector per input text, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError>;
}

#[derive(Debug, Clone, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

/// Client for an Ollama-compatible `/api/embeddings` endpoint.
pub struct OllamaEmbedder {
    endpoint: Url,
    model: String,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str) -> Result<Self, IngestError> {
        let endpoint = Url::parse(base_url)?.join("api/embeddings")?;
        Ok(Self {
            endpoint,
            model: model.to_string(),
            client: reqwest::Client::new(),
        })
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, IngestError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&OllamaEmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IngestError::EmbeddingProvider(format!(
                "{} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let payload: OllamaEmbeddingResponse = response.json().await?;
        if payload.embedding.is_empty() {
            return Err(IngestError::EmbeddingProvider(format!(
                "{} returned an empty vector for model {}",
                self.endpoint, self.model
            )));
        }

        Ok(payload.embedding)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for (index, text) in texts.iter().enumerate() {
            let vector = self.embed_one(text).await?;
            if index % 50 == 0 {
                debug!(embedded = index + 1, total = texts.len(), "embedding chunks");
            }
            vectors.push(vector);
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::OllamaEmbedder;

    #[test]
    fn endpoint_is_joined_onto_the_base_url() {
        let embedder = OllamaEmbedder::new("http://localhost:11434/", "bge-m3").unwrap();
        assert_eq!(embedder.endpoint.as_str(), "http://localhost:11434/api/embeddings");
        assert_eq!(embedder.model, "bge-m3");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(OllamaEmbedder::new("not a url", "bge-m3").is_err());
    }
}
