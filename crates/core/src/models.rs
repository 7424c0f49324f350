use serde::{Deserialize, Serialize};

/// One page of text as it came out of the PDF extractor, before any
/// cleaning. Immutable once loaded; provenance travels with the text.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub source_id: String,
    pub page_number: u32,
    pub raw_text: String,
}

/// Counters reported by the cleaning stage. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleaningStats {
    pub chars_removed: usize,
    pub lines_removed: usize,
}

#[derive(Debug, Clone)]
pub struct CleanedPage {
    pub source_id: String,
    pub page_number: u32,
    pub clean_text: String,
    pub stats: CleaningStats,
}

/// A bounded span of cleaned text sized for embedding. `char_span` is
/// measured in characters of the page's `clean_text`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub chunk_id: String,
    pub text: String,
    pub source_id: String,
    pub page_number: u32,
    pub char_span: (usize, usize),
}

/// Switches for the text cleaning pipeline. Every recognized option is
/// part of the index fingerprint: flipping any of them forces a rebuild.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleaningConfig {
    pub fix_hyphenation: bool,
    pub remove_boilerplate: bool,
    pub remove_urls: bool,
    pub normalize_medical: bool,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            fix_hyphenation: true,
            remove_boilerplate: true,
            remove_urls: true,
            normalize_medical: false,
        }
    }
}

/// Tunables for cross-corpus boilerplate detection. The defaults are
/// starting points, not derived constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoilerplateOptions {
    /// A normalized line is boilerplate when it appears on at least this
    /// fraction of pages.
    pub frequency_threshold: f64,
    /// Lines longer than this never qualify by frequency alone, so a
    /// recurring disclaimer sentence survives cleaning.
    pub short_line_cutoff: usize,
}

impl Default for BoilerplateOptions {
    fn default() -> Self {
        Self {
            frequency_threshold: 0.3,
            short_line_cutoff: 80,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingOptions {
    /// Target chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks. Must be smaller
    /// than `chunk_size`.
    pub chunk_overlap: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
        }
    }
}

/// Everything that determines what gets embedded. Grouped so the
/// fingerprint and the pipeline always see the same knobs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestionOptions {
    pub cleaning: CleaningConfig,
    pub boilerplate: BoilerplateOptions,
    pub chunking: ChunkingOptions,
}
