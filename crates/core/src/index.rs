//! In-process vector index over embedded chunks.
//!
//! Deliberately simple storage: the interesting contract is what gets
//! embedded and when the index is rebuilt, not the similarity engine.

use crate::models::Chunk;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct Retrieved {
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VectorIndex {
    chunks: Vec<EmbeddedChunk>,
}

impl VectorIndex {
    pub fn new(chunks: Vec<EmbeddedChunk>) -> Self {
        Self { chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter().map(|entry| &entry.chunk)
    }

    /// Top-k chunks by cosine similarity to the query vector.
    pub fn search(&self, query_vector: &[f32], top_k: usize) -> Vec<Retrieved> {
        let mut scored: Vec<Retrieved> = self
            .chunks
            .iter()
            .map(|entry| Retrieved {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(query_vector, &entry.vector),
            })
            .collect();

        scored.sort_by(|left, right| right.score.total_cmp(&left.score));
        scored.truncate(top_k);
        scored
    }
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }

    let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    let left_norm: f32 = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let right_norm: f32 = right.iter().map(|value| value * value).sum::<f32>().sqrt();

    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }

    dot / (left_norm * right_norm)
}

#[cfg(test)]
mod tests {
    use super::{EmbeddedChunk, VectorIndex};
    use crate::models::Chunk;

    fn entry(id: &str, vector: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk {
            chunk: Chunk {
                chunk_id: id.to_string(),
                text: format!("text for {id}"),
                source_id: "doc.pdf".to_string(),
                page_number: 1,
                char_span: (0, 12),
            },
            vector,
        }
    }

    #[test]
    fn search_ranks_by_cosine_similarity() {
        let index = VectorIndex::new(vec![
            entry("far", vec![0.0, 1.0]),
            entry("near", vec![1.0, 0.05]),
        ]);

        let hits = index.search(&[1.0, 0.0], 2);
        assert_eq!(hits[0].chunk.chunk_id, "near");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn search_truncates_to_top_k() {
        let index = VectorIndex::new(vec![
            entry("a", vec![1.0, 0.0]),
            entry("b", vec![0.9, 0.1]),
            entry("c", vec![0.0, 1.0]),
        ]);

        let hits = index.search(&[1.0, 0.0], 2);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn mismatched_dimensions_score_zero() {
        let index = VectorIndex::new(vec![entry("a", vec![1.0, 0.0, 0.0])]);
        let hits = index.search(&[1.0, 0.0], 1);
        assert_eq!(hits[0].score, 0.0);
    }

    #[test]
    fn index_round_trips_through_json() {
        let index = VectorIndex::new(vec![entry("a", vec![0.25, 0.5])]);
        let serialized = serde_json::to_string(&index).unwrap();
        let restored: VectorIndex = serde_json::from_str(&serialized).unwrap();
        assert_eq!(index, restored);
    }
}
