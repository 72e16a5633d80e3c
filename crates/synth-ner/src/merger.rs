//! Reassembles sub-word tokens into whole-word entities.

use std::sync::Arc;

use synth_common::{EntityCollection, RawToken};
use tracing::debug;

use crate::dedup::Deduplicator;
use crate::labels::{BioScheme, Category, LabelScheme};
use crate::stopwords::StopwordFilter;

#[derive(Debug, Clone, Default)]
pub struct MergerOptions {
    /// Emit spans that start with an orphan continuation as `UNCLASSIFIED`.
    pub keep_unclassified: bool,
    pub extra_stopwords: Vec<String>,
}

/// Merges a model's token stream into an [`EntityCollection`].
#[derive(Clone)]
pub struct TokenMerger {
    scheme: Arc<dyn LabelScheme>,
    dedup: Deduplicator,
}

impl Default for TokenMerger {
    fn default() -> Self {
        Self::new(MergerOptions::default())
    }
}

impl TokenMerger {
    pub fn new(options: MergerOptions) -> Self {
        let stopwords = StopwordFilter::new().with_extra(&options.extra_stopwords);
        Self {
            scheme: Arc::new(BioScheme),
            dedup: Deduplicator::new(stopwords).keep_unclassified(options.keep_unclassified),
        }
    }

    pub fn with_scheme(mut self, scheme: Arc<dyn LabelScheme>) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn deduplicator(&self) -> &Deduplicator {
        &self.dedup
    }

    /// Merge tokens in emission order.
    ///
    /// A continuation token extends the pending span and its own label is
    /// ignored. Any other token closes the pending span and opens a new one
    /// typed by the token's bare category. The first span for a given
    /// lowercase term wins.
    pub fn merge(&self, tokens: &[RawToken]) -> EntityCollection {
        let mut seen = EntityCollection::new();
        let mut current: Option<(String, Category)> = None;

        for token in tokens {
            if token.is_continuation {
                match current {
                    Some((ref mut term, _)) => term.push_str(&token.text),
                    None => current = Some((token.text.clone(), Category::Unclassified)),
                }
                continue;
            }

            if let Some((term, category)) = current.take() {
                self.dedup.finalize(term, category, &mut seen);
            }
            let parsed = self.scheme.parse(&token.label);
            current = Some((token.text.clone(), parsed.category));
        }

        if let Some((term, category)) = current {
            self.dedup.finalize(term, category, &mut seen);
        }

        debug!("Merged {} tokens into {} entities", tokens.len(), seen.len());
        seen
    }
}
