//! Medical Named Entity Recognition post-processing.
//!
//! Turns the raw sub-word token stream of a token-classification model into
//! whole-word entities, filters and deduplicates them, and renders the source
//! text with those entities highlighted. The model itself sits behind
//! [`NerProvider`].

mod dedup;
mod labels;
mod merger;
mod provider;
pub mod highlight;
pub mod normalize;
pub mod stopwords;

#[cfg(feature = "local-model")]
mod ner_model;

use std::time::Duration;

pub use dedup::Deduplicator;
pub use highlight::{Highlighter, DEFAULT_HIGHLIGHT_STYLE, EMPTY_LISTING};
pub use labels::{BioScheme, Boundary, Category, LabelScheme, ParsedLabel};
pub use merger::{MergerOptions, TokenMerger};
pub use normalize::{normalize_for_inference, normalize_for_match};
pub use provider::{HttpNerConfig, HttpNerProvider, NerProvider};
pub use stopwords::StopwordFilter;

#[cfg(feature = "local-model")]
pub use ner_model::{NerConfig, NerModel};

pub type Result<T> = std::result::Result<T, NerError>;

#[derive(Debug, thiserror::Error)]
pub enum NerError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("NER API error [{status}]: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed token stream: {0}")]
    MalformedResponse(String),

    #[error("NER request timed out after {0:?}")]
    Timeout(Duration),
}

#[cfg(feature = "local-model")]
impl From<candle_core::Error> for NerError {
    fn from(e: candle_core::Error) -> Self {
        NerError::Inference(e.to_string())
    }
}

impl From<std::io::Error> for NerError {
    fn from(e: std::io::Error) -> Self {
        NerError::Download(e.to_string())
    }
}
