//! synth-common: Shared types and errors used across all Synth crates.

pub mod error;
pub mod entities;

// Re-export commonly used types
pub use entities::{Entity, EntityCollection, HighlightResult, RawToken};
pub use error::{Result, SynthError};
