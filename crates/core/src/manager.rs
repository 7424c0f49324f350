//! Load-or-build orchestration for the persisted index.
//!
//! The persisted state pairs a fingerprint with the serialized index.
//! A matching fingerprint short-circuits the whole pipeline, including
//! every embedding call; anything else reruns ingestion and persists
//! fresh state only after the full pipeline has succeeded. The state
//! file is not locked: one ingestion process at a time is the caller's
//! responsibility.

use crate::boilerplate::CorpusProfile;
use crate::chunking::plan_chunks;
use crate::cleaner::clean_page;
use crate::embeddings::Embedder;
use crate::error::IngestError;
use crate::fingerprint::IndexFingerprint;
use crate::index::{EmbeddedChunk, VectorIndex};
use crate::loader::{load_corpus, SkippedDocument};
use crate::models::{Chunk, IngestionOptions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedIndexState {
    pub fingerprint: IndexFingerprint,
    pub built_at: DateTime<Utc>,
    pub index: VectorIndex,
}

#[derive(Debug)]
pub struct BuildReport {
    pub index: VectorIndex,
    pub fingerprint: IndexFingerprint,
    /// True when the persisted index was still valid and no document
    /// was re-read or re-embedded.
    pub reused: bool,
    pub skipped: Vec<SkippedDocument>,
}

pub struct IndexManager {
    state_path: PathBuf,
}

impl IndexManager {
    pub fn new(state_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
        }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub async fn build_or_load(
        &self,
        folder: &Path,
        options: &IngestionOptions,
        embedder: &dyn Embedder,
    ) -> Result<BuildReport, IngestError> {
        let fingerprint = IndexFingerprint::compute(folder, options, embedder.model_id())?;

        match self.load_state()? {
            Some(state) if state.fingerprint == fingerprint => {
                info!(
                    state = %self.state_path.display(),
                    built_at = %state.built_at.to_rfc3339(),
                    chunks = state.index.len(),
                    "fingerprint matches, reusing persisted index"
                );
                return Ok(BuildReport {
                    index: state.index,
                    fingerprint,
                    reused: true,
                    skipped: Vec::new(),
                });
            }
            Some(state) => {
                info!(
                    state = %self.state_path.display(),
                    stored_built_at = %state.built_at.to_rfc3339(),
                    "fingerprint mismatch, rebuilding index"
                );
            }
            None => {
                info!(state = %self.state_path.display(), "no persisted index, building");
            }
        }

        let (index, skipped) = self.run_pipeline(folder, options, embedder).await?;

        let state = PersistedIndexState {
            fingerprint: fingerprint.clone(),
            built_at: Utc::now(),
            index,
        };
        self.persist_state(&state)?;

        Ok(BuildReport {
            index: state.index,
            fingerprint,
            reused: false,
            skipped,
        })
    }

    /// The full ingestion pipeline: load, corpus-wide pattern scan,
    /// per-page cleaning, chunking, embedding. The corpus scan must
    /// complete before any page is cleaned, since boilerplate detection
    /// needs to have seen the whole corpus.
    async fn run_pipeline(
        &self,
        folder: &Path,
        options: &IngestionOptions,
        embedder: &dyn Embedder,
    ) -> Result<(VectorIndex, Vec<SkippedDocument>), IngestError> {
        let report = load_corpus(folder)?;

        let profile = CorpusProfile::scan(&report.pages);
        let boilerplate = profile.boilerplate_set(&options.boilerplate);
        info!(
            pages = report.pages.len(),
            boilerplate_lines = boilerplate.len(),
            "corpus scan complete"
        );

        let mut chunks: Vec<Chunk> = Vec::new();
        for page in &report.pages {
            let cleaned = clean_page(page, &boilerplate, &options.cleaning);
            chunks.extend(plan_chunks(&cleaned, &options.chunking)?);
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        info!(chunks = chunks.len(), model = embedder.model_id(), "embedding chunks");
        let vectors = embedder.embed_batch(&texts).await?;

        if vectors.len() != chunks.len() {
            return Err(IngestError::EmbeddingProvider(format!(
                "provider returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddedChunk { chunk, vector })
            .collect();

        Ok((VectorIndex::new(entries), report.skipped))
    }

    fn load_state(&self) -> Result<Option<PersistedIndexState>, IngestError> {
        if !self.state_path.exists() {
            return Ok(None);
        }

        let bytes = std::fs::read(&self.state_path)?;
        match serde_json::from_slice(&bytes) {
            Ok(state) => Ok(Some(state)),
            Err(error) => {
                warn!(
                    state = %self.state_path.display(),
                    %error,
                    "persisted index state is unreadable, will rebuild"
                );
                Ok(None)
            }
        }
    }

    fn persist_state(&self, state: &PersistedIndexState) -> Result<(), IngestError> {
        if let Some(parent) = self.state_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let bytes = serde_json::to_vec(state)?;
        std::fs::write(&self.state_path, bytes)?;
        info!(
            state = %self.state_path.display(),
            chunks = state.index.len(),
            "persisted index state"
        );
        Ok(())
    }
}
