//! Splits cleaned page text into overlapping, embedding-sized chunks.
//!
//! Chunks never cross a page boundary, so every chunk cites exactly one
//! page. Chunk ids hash provenance and offset only, which keeps them
//! stable across runs over unchanged input.

use crate::error::IngestError;
use crate::models::{CleanedPage, Chunk, ChunkingOptions};
use sha2::{Digest, Sha256};

/// Plans the chunks for one cleaned page. The window advances by
/// `chunk_size - chunk_overlap` characters; the final window is clipped
/// to the page end and emitted even when short. An empty page yields no
/// chunks.
pub fn plan_chunks(page: &CleanedPage, options: &ChunkingOptions) -> Result<Vec<Chunk>, IngestError> {
    if options.chunk_size == 0 {
        return Err(IngestError::InvalidChunkConfig(
            "chunk_size must be positive".to_string(),
        ));
    }
    if options.chunk_overlap >= options.chunk_size {
        return Err(IngestError::InvalidChunkConfig(format!(
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            options.chunk_overlap, options.chunk_size
        )));
    }

    if page.clean_text.is_empty() {
        return Ok(Vec::new());
    }

    // Character positions, not byte offsets: a window must never split a
    // multi-byte character.
    let boundaries: Vec<usize> = page
        .clean_text
        .char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(page.clean_text.len()))
        .collect();
    let total_chars = boundaries.len() - 1;

    let stride = options.chunk_size - options.chunk_overlap;
    let mut chunks = Vec::new();
    let mut start = 0usize;

    loop {
        let end = (start + options.chunk_size).min(total_chars);
        let text = page.clean_text[boundaries[start]..boundaries[end]].to_string();

        chunks.push(Chunk {
            chunk_id: chunk_id(&page.source_id, page.page_number, start),
            text,
            source_id: page.source_id.clone(),
            page_number: page.page_number,
            char_span: (start, end),
        });

        if end == total_chars {
            break;
        }
        start += stride;
    }

    Ok(chunks)
}

/// Deterministic id from provenance and offset. Re-running over
/// unchanged input reproduces identical ids, which cache reuse depends
/// on.
pub fn chunk_id(source_id: &str, page_number: u32, start_offset: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update(page_number.to_le_bytes());
    hasher.update((start_offset as u64).to_le_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::{chunk_id, plan_chunks};
    use crate::error::IngestError;
    use crate::models::{CleanedPage, ChunkingOptions, CleaningStats};

    fn cleaned(text: &str) -> CleanedPage {
        CleanedPage {
            source_id: "doc.pdf".to_string(),
            page_number: 1,
            clean_text: text.to_string(),
            stats: CleaningStats::default(),
        }
    }

    #[test]
    fn windows_cover_the_whole_page_with_bounded_stride() {
        let text = "x".repeat(1_237);
        let options = ChunkingOptions {
            chunk_size: 500,
            chunk_overlap: 100,
        };

        let chunks = plan_chunks(&cleaned(&text), &options).unwrap();

        assert_eq!(chunks.last().unwrap().char_span.1, 1_237);
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].char_span.0 - pair[0].char_span.0, 400);
        }
        assert!(chunks
            .iter()
            .all(|chunk| chunk.char_span.1 - chunk.char_span.0 <= 500));
    }

    #[test]
    fn trailing_short_window_is_emitted() {
        let text = "y".repeat(520);
        let options = ChunkingOptions {
            chunk_size: 500,
            chunk_overlap: 100,
        };

        let chunks = plan_chunks(&cleaned(&text), &options).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].char_span, (400, 520));
        assert_eq!(chunks[1].text.len(), 120);
    }

    #[test]
    fn short_page_yields_a_single_clipped_chunk() {
        let chunks = plan_chunks(
            &cleaned("short page"),
            &ChunkingOptions::default(),
        )
        .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "short page");
    }

    #[test]
    fn empty_page_yields_no_chunks() {
        let chunks = plan_chunks(&cleaned(""), &ChunkingOptions::default()).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn ids_are_stable_across_runs_and_distinct_across_offsets() {
        let text = "z".repeat(900);
        let page = cleaned(&text);
        let options = ChunkingOptions::default();

        let first = plan_chunks(&page, &options).unwrap();
        let second = plan_chunks(&page, &options).unwrap();
        assert_eq!(first, second);
        assert_ne!(first[0].chunk_id, first[1].chunk_id);
        assert_ne!(
            chunk_id("doc.pdf", 1, 0),
            chunk_id("doc.pdf", 2, 0),
        );
    }

    #[test]
    fn multibyte_text_is_split_on_character_boundaries() {
        let text = "é".repeat(610);
        let options = ChunkingOptions {
            chunk_size: 500,
            chunk_overlap: 100,
        };

        let chunks = plan_chunks(&cleaned(&text), &options).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text.chars().count(), 500);
        assert_eq!(chunks[1].char_span, (400, 610));
    }

    #[test]
    fn overlap_must_stay_below_chunk_size() {
        let result = plan_chunks(
            &cleaned("text"),
            &ChunkingOptions {
                chunk_size: 100,
                chunk_overlap: 100,
            },
        );
        assert!(matches!(result, Err(IngestError::InvalidChunkConfig(_))));
    }
}
