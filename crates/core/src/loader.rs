use crate::error::IngestError;
use crate::models::RawPage;
use lopdf::Document;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Extensions the loader recognizes. Anything else in the folder is
/// ignored, not an error.
const DOCUMENT_EXTENSIONS: [&str; 1] = ["pdf"];

pub fn discover_document_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let recognized = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                DOCUMENT_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });

        if recognized {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn source_id_for(path: &Path) -> Result<String, IngestError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
        .ok_or_else(|| {
            IngestError::MissingFileName(format!("path missing filename: {}", path.display()))
        })
}

/// Extracts every non-empty page of one PDF into a [`RawPage`] with
/// page-exact provenance.
pub fn extract_raw_pages(path: &Path) -> Result<Vec<RawPage>, IngestError> {
    let source_id = source_id_for(path)?;
    let document =
        Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

    let mut pages = Vec::new();
    for (page_no, _page_id) in document.get_pages() {
        let text = document
            .extract_text(&[page_no])
            .map_err(|error| IngestError::PdfParse(error.to_string()))?;

        if !text.trim().is_empty() {
            pages.push(RawPage {
                source_id: source_id.clone(),
                page_number: page_no,
                raw_text: text,
            });
        }
    }

    if pages.is_empty() {
        return Err(IngestError::PdfParse(format!(
            "pdf had no readable page text: {}",
            path.display()
        )));
    }

    Ok(pages)
}

#[derive(Debug)]
pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug)]
pub struct LoadReport {
    pub pages: Vec<RawPage>,
    pub skipped: Vec<SkippedDocument>,
}

/// Loads every recognized document under `folder`. A file that fails to
/// parse is recorded and skipped; the load only fails outright when the
/// folder holds no recognized files or every single one is unreadable.
pub fn load_corpus(folder: &Path) -> Result<LoadReport, IngestError> {
    let files = discover_document_files(folder);

    if files.is_empty() {
        return Err(IngestError::NoDocumentsFound {
            folder: folder.to_path_buf(),
        });
    }

    let total = files.len();
    let results: Vec<Result<Vec<RawPage>, SkippedDocument>> = files
        .into_iter()
        .map(|path| {
            extract_raw_pages(&path).map_err(|error| SkippedDocument {
                reason: error.to_string(),
                path,
            })
        })
        .collect();

    let mut pages = Vec::new();
    let mut skipped = Vec::new();
    for result in results {
        match result {
            Ok(file_pages) => pages.extend(file_pages),
            Err(skip) => skipped.push(skip),
        }
    }

    if pages.is_empty() {
        for skip in &skipped {
            warn!(path = %skip.path.display(), reason = %skip.reason, "unreadable document");
        }
        return Err(IngestError::NoDocumentsFound {
            folder: folder.to_path_buf(),
        });
    }

    if !skipped.is_empty() {
        warn!(
            skipped = skipped.len(),
            total, "some documents were unreadable and will be excluded"
        );
    }

    Ok(LoadReport { pages, skipped })
}
