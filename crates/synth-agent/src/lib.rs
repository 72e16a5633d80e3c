//! Synth: medical entity extraction, highlighting and term explanation.

pub mod config;
pub mod pipeline;

pub use config::Config;
pub use pipeline::{selection_query, Analysis, ExplainOutcome, Pipeline, EMPTY_SELECTION_WARNING};
