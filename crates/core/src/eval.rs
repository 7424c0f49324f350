//! Export of question/answer/context tuples for an external scorer.
//!
//! Scoring itself happens outside this crate; the contract here is that
//! every retrieved context string ships with provenance accurate enough
//! to match it back to its source document and page.

use crate::error::QueryError;
use crate::query::QueryEngine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextRecord {
    pub text: String,
    pub chunk_id: String,
    pub source_id: String,
    pub page_number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRecord {
    pub question: String,
    pub answer: String,
    pub contexts: Vec<ContextRecord>,
}

pub async fn export_eval_records(
    engine: &QueryEngine<'_>,
    questions: &[String],
) -> Result<Vec<EvalRecord>, QueryError> {
    let mut records = Vec::with_capacity(questions.len());

    for question in questions {
        let answer = engine.answer(question).await?;
        records.push(EvalRecord {
            question: question.clone(),
            answer: answer.text,
            contexts: answer
                .sources
                .into_iter()
                .map(|source| ContextRecord {
                    text: source.text,
                    chunk_id: source.chunk_id,
                    source_id: source.source_id,
                    page_number: source.page_number,
                })
                .collect(),
        });
        info!(question = %question, "evaluated question");
    }

    Ok(records)
}

pub fn write_eval_records(path: &Path, records: &[EvalRecord]) -> Result<(), QueryError> {
    let json = serde_json::to_vec_pretty(records)
        .map_err(crate::error::IngestError::Serialization)?;
    std::fs::write(path, json).map_err(crate::error::IngestError::Io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{export_eval_records, write_eval_records, EvalRecord};
    use crate::embeddings::Embedder;
    use crate::error::{IngestError, QueryError};
    use crate::index::{EmbeddedChunk, VectorIndex};
    use crate::models::Chunk;
    use crate::query::{LanguageModel, QueryEngine};
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct ConstantEmbedder;

    #[async_trait]
    impl Embedder for ConstantEmbedder {
        fn model_id(&self) -> &str {
            "fake-embedder"
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    struct CannedModel;

    #[async_trait]
    impl LanguageModel for CannedModel {
        async fn complete(&self, _prompt: &str) -> Result<String, QueryError> {
            Ok("A canned answer.".to_string())
        }
    }

    fn index() -> VectorIndex {
        VectorIndex::new(vec![EmbeddedChunk {
            chunk: Chunk {
                chunk_id: "c1".to_string(),
                text: "Retinopathy screening is annual.".to_string(),
                source_id: "screening.pdf".to_string(),
                page_number: 12,
                char_span: (0, 32),
            },
            vector: vec![1.0, 0.0],
        }])
    }

    #[tokio::test]
    async fn records_pair_answers_with_provenanced_contexts() {
        let index = index();
        let engine = QueryEngine::new(&index, &ConstantEmbedder, &CannedModel, 3);
        let questions = vec!["How often is retinopathy screening?".to_string()];

        let records = export_eval_records(&engine, &questions).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].answer, "A canned answer.");
        assert_eq!(records[0].contexts.len(), 1);
        assert_eq!(records[0].contexts[0].source_id, "screening.pdf");
        assert_eq!(records[0].contexts[0].page_number, 12);
    }

    #[tokio::test]
    async fn records_round_trip_through_the_export_file() {
        let index = index();
        let engine = QueryEngine::new(&index, &ConstantEmbedder, &CannedModel, 3);
        let questions = vec!["Any question".to_string()];
        let records = export_eval_records(&engine, &questions).await.unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("eval.json");
        write_eval_records(&path, &records).unwrap();

        let restored: Vec<EvalRecord> =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].question, "Any question");
    }
}
