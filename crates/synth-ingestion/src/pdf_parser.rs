//! lopdf-based PDF text extraction.

use std::path::{Path, PathBuf};

use lopdf::Document as PdfDoc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DocumentExtractionError {
    #[error("Unreadable PDF: {0}")]
    Unreadable(#[from] lopdf::Error),

    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF is encrypted")]
    Encrypted,

    #[error("PDF has no pages")]
    NoPages,

    #[error("Text extraction failed on page {page}: {message}")]
    Page { page: u32, message: String },
}

/// Extract the text of every page, in page order, as one string.
/// Pages are separated by a newline; no other page structure is kept.
pub fn extract_text_from_pdf(bytes: &[u8]) -> Result<String, DocumentExtractionError> {
    let pdf = PdfDoc::load_mem(bytes)?;
    extract_document_text(&pdf)
}

/// Same as [`extract_text_from_pdf`] for a file on disk.
pub fn extract_text_from_path(path: &Path) -> Result<String, DocumentExtractionError> {
    let bytes = std::fs::read(path).map_err(|source| DocumentExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    extract_text_from_pdf(&bytes)
}

fn extract_document_text(pdf: &PdfDoc) -> Result<String, DocumentExtractionError> {
    if pdf.is_encrypted() {
        return Err(DocumentExtractionError::Encrypted);
    }

    // BTreeMap keyed by page number, so iteration is page order
    let pages = pdf.get_pages();
    if pages.is_empty() {
        return Err(DocumentExtractionError::NoPages);
    }

    let mut full_text = String::new();
    for &page_num in pages.keys() {
        let page_text = pdf
            .extract_text(&[page_num])
            .map_err(|e| DocumentExtractionError::Page { page: page_num, message: e.to_string() })?;
        if !full_text.is_empty() && !full_text.ends_with('\n') {
            full_text.push('\n');
        }
        full_text.push_str(&page_text);
    }

    debug!("Extracted {} chars from {} pages", full_text.len(), pages.len());
    Ok(full_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use synth_test_utils::build_pdf;

    #[test]
    fn test_extracts_pages_in_order() {
        let bytes = build_pdf(&["Patient reports fever", "Prescribed aspirin"]);
        let text = extract_text_from_pdf(&bytes).unwrap();
        let first = text.find("fever").expect("page 1 text");
        let second = text.find("aspirin").expect("page 2 text");
        assert!(first < second);
    }

    #[test]
    fn test_garbage_bytes_are_an_error() {
        let err = extract_text_from_pdf(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, DocumentExtractionError::Unreadable(_)));
    }

    #[test]
    fn test_reads_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.pdf");
        std::fs::write(&path, build_pdf(&["Chest pain"])).unwrap();
        let text = extract_text_from_path(&path).unwrap();
        assert!(text.contains("Chest pain"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = extract_text_from_path(Path::new("/nonexistent/synth/report.pdf")).unwrap_err();
        assert!(matches!(err, DocumentExtractionError::Io { .. }));
    }
}
