//! Retrieval-augmented answering over a built index.
//!
//! Thin by design: embed the question, pull the top-k chunks, hand the
//! model a prompt with the retrieved context, and return the answer
//! together with page-exact source citations.

use crate::embeddings::Embedder;
use crate::error::QueryError;
use crate::index::{Retrieved, VectorIndex};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, QueryError>;
}

/// Provenance for one retrieved context, the record the evaluation
/// harness matches answers back to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub chunk_id: String,
    pub source_id: String,
    pub page_number: u32,
    pub score: f32,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SourceRef>,
}

pub struct QueryEngine<'a> {
    index: &'a VectorIndex,
    embedder: &'a dyn Embedder,
    model: &'a dyn LanguageModel,
    top_k: usize,
}

impl<'a> QueryEngine<'a> {
    pub fn new(
        index: &'a VectorIndex,
        embedder: &'a dyn Embedder,
        model: &'a dyn LanguageModel,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            model,
            top_k,
        }
    }

    pub async fn answer(&self, question: &str) -> Result<Answer, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::EmptyQuestion);
        }

        let vectors = self
            .embedder
            .embed_batch(&[question.to_string()])
            .await
            .map_err(QueryError::Ingest)?;
        let query_vector = vectors
            .into_iter()
            .next()
            .ok_or_else(|| QueryError::Provider("embedder returned no vector".to_string()))?;

        let hits = self.index.search(&query_vector, self.top_k);
        let prompt = build_prompt(question, &hits);
        let text = self.model.complete(&prompt).await?;

        Ok(Answer {
            text,
            sources: hits
                .into_iter()
                .map(|hit| SourceRef {
                    chunk_id: hit.chunk.chunk_id,
                    source_id: hit.chunk.source_id,
                    page_number: hit.chunk.page_number,
                    score: hit.score,
                    text: hit.chunk.text,
                })
                .collect(),
        })
    }
}

fn build_prompt(question: &str, hits: &[Retrieved]) -> String {
    let mut prompt = String::from(
        "Answer the question using only the context below. \
         Cite the source and page you relied on. If the context does not \
         contain the answer, say so.\n\n",
    );

    for hit in hits {
        prompt.push_str(&format!(
            "[{} p.{}]\n{}\n\n",
            hit.chunk.source_id, hit.chunk.page_number, hit.chunk.text
        ));
    }

    prompt.push_str(&format!("Question: {question}\nAnswer:"));
    prompt
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Chat-completions client for any OpenAI-compatible endpoint (Groq,
/// Azure OpenAI, a local server).
pub struct OpenAiCompatibleLlm {
    endpoint: Url,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAiCompatibleLlm {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: &str,
    ) -> Result<Self, QueryError> {
        let endpoint = Url::parse(base_url)
            .and_then(|url| url.join("v1/chat/completions"))
            .map_err(|error| QueryError::Provider(error.to_string()))?;
        Ok(Self {
            endpoint,
            api_key,
            model: model.to_string(),
            temperature: 0.3,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleLlm {
    async fn complete(&self, prompt: &str) -> Result<String, QueryError> {
        let mut request = self.client.post(self.endpoint.clone()).json(
            &ChatCompletionRequest {
                model: &self.model,
                messages: vec![ChatMessage {
                    role: "user",
                    content: prompt,
                }],
                temperature: self.temperature,
            },
        );

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(QueryError::Provider(format!(
                "{} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let payload: ChatCompletionResponse = response.json().await?;
        payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| QueryError::Provider("response had no choices".to_string()))
    }
}
