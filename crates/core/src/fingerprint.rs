//! Content-hash cache invalidation for the persisted index.
//!
//! The fingerprint is a pure function of sorted, explicit inputs: the
//! document set (relative path, mtime, size), the recognized ingestion
//! options, and the embedding model identity. Equality against the
//! persisted fingerprint is the sole cache-validity signal.

use crate::error::IngestError;
use crate::loader::discover_document_files;
use crate::models::IngestionOptions;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::UNIX_EPOCH;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFingerprint {
    pub document_set_hash: String,
    pub cleaning_config_hash: String,
    pub embedding_model_id: String,
}

impl IndexFingerprint {
    pub fn compute(
        folder: &Path,
        options: &IngestionOptions,
        embedding_model_id: &str,
    ) -> Result<Self, IngestError> {
        Ok(Self {
            document_set_hash: document_set_hash(folder)?,
            cleaning_config_hash: options_hash(options),
            embedding_model_id: embedding_model_id.to_string(),
        })
    }
}

fn document_set_hash(folder: &Path) -> Result<String, IngestError> {
    // discover_document_files returns paths sorted by full path, so the
    // hash never depends on directory iteration order.
    let files = discover_document_files(folder);

    let mut hasher = Sha256::new();
    for path in files {
        let relative = path.strip_prefix(folder).unwrap_or(&path);
        let metadata = std::fs::metadata(&path)?;
        let mtime = metadata
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_nanos())
            .unwrap_or(0);

        hasher.update(relative.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        hasher.update(mtime.to_le_bytes());
        hasher.update(metadata.len().to_le_bytes());
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Hashes every knob that changes what gets embedded: cleaning flags,
/// boilerplate thresholds, and chunk geometry.
fn options_hash(options: &IngestionOptions) -> String {
    let canonical = format!(
        "fix_hyphenation={};remove_boilerplate={};remove_urls={};normalize_medical={};\
         frequency_threshold={};short_line_cutoff={};chunk_size={};chunk_overlap={}",
        options.cleaning.fix_hyphenation,
        options.cleaning.remove_boilerplate,
        options.cleaning.remove_urls,
        options.cleaning.normalize_medical,
        options.boilerplate.frequency_threshold,
        options.boilerplate.short_line_cutoff,
        options.chunking.chunk_size,
        options.chunking.chunk_overlap,
    );

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}
