//! synth-ingestion: Document intake.
//! Converts uploaded PDF documents into plain text for entity extraction.

pub mod pdf_parser;

pub use pdf_parser::{extract_text_from_path, extract_text_from_pdf, DocumentExtractionError};
