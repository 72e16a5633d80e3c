//! End-to-end analysis: text or PDF in, highlighted entities out, and
//! explanations for the entities a user picks.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use synth_common::{EntityCollection, HighlightResult};
use synth_ingestion::{extract_text_from_pdf, DocumentExtractionError};
use synth_llm::{failure_message, ExplanationProvider, LlmError};
use synth_ner::{
    normalize_for_inference, Highlighter, MergerOptions, NerError, NerProvider, TokenMerger,
};

use crate::config::Config;

/// Shown when an explanation is requested with nothing selected.
pub const EMPTY_SELECTION_WARNING: &str = "Please select at least one entity before sending.";

const DEFAULT_NER_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_EXPLAIN_TIMEOUT: Duration = Duration::from_secs(60);

/// Result of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub text: String,
    pub entities: EntityCollection,
    pub highlight: HighlightResult,
    /// Why extraction produced nothing, when the NER provider failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_failure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExplainOutcome {
    EmptySelection,
    Explained { term: String, text: String },
    Failed { term: String, message: String },
}

impl ExplainOutcome {
    /// The string a display surface shows for this outcome.
    pub fn display_text(&self) -> &str {
        match self {
            ExplainOutcome::EmptySelection => EMPTY_SELECTION_WARNING,
            ExplainOutcome::Explained { text, .. } => text,
            ExplainOutcome::Failed { message, .. } => message,
        }
    }
}

pub struct Pipeline {
    ner: Arc<dyn NerProvider>,
    explainer: Arc<dyn ExplanationProvider>,
    merger: TokenMerger,
    highlighter: Highlighter,
    ner_timeout: Duration,
    explain_timeout: Duration,
}

impl Pipeline {
    pub fn new(ner: Arc<dyn NerProvider>, explainer: Arc<dyn ExplanationProvider>) -> Self {
        Self {
            ner,
            explainer,
            merger: TokenMerger::default(),
            highlighter: Highlighter::default(),
            ner_timeout: DEFAULT_NER_TIMEOUT,
            explain_timeout: DEFAULT_EXPLAIN_TIMEOUT,
        }
    }

    /// Apply merge options, highlight style and timeouts from `config`.
    pub fn with_config(self, config: &Config) -> Self {
        self.with_merger(TokenMerger::new(MergerOptions {
            keep_unclassified: config.ner.keep_unclassified,
            extra_stopwords: config.ner.extra_stopwords.clone(),
        }))
        .with_highlighter(Highlighter::new(config.highlight.style.clone()))
        .with_timeouts(config.ner.timeout(), config.explanation.timeout())
    }

    pub fn with_merger(mut self, merger: TokenMerger) -> Self {
        self.merger = merger;
        self
    }

    pub fn with_highlighter(mut self, highlighter: Highlighter) -> Self {
        self.highlighter = highlighter;
        self
    }

    pub fn with_timeouts(mut self, ner: Duration, explain: Duration) -> Self {
        self.ner_timeout = ner;
        self.explain_timeout = explain;
        self
    }

    /// Run NER over the inference form of `text` and merge the token stream.
    pub async fn extract_entities(&self, text: &str) -> Result<EntityCollection, NerError> {
        let prepared = normalize_for_inference(text);
        let tokens = match timeout(self.ner_timeout, self.ner.tokens(&prepared)).await {
            Ok(result) => result?,
            Err(_) => return Err(NerError::Timeout(self.ner_timeout)),
        };
        let entities = self.merger.merge(&tokens);
        debug!(
            "{} tokens from {} merged into {} entities",
            tokens.len(),
            self.ner.model_id(),
            entities.len()
        );
        Ok(entities)
    }

    /// Extract entities and render the original text with them highlighted.
    ///
    /// A failing NER provider is not fatal: the text is rendered with no
    /// entities and the reason is kept in [`Analysis::extraction_failure`].
    pub async fn analyze(&self, text: &str) -> Analysis {
        let (entities, extraction_failure) = match self.extract_entities(text).await {
            Ok(entities) => (entities, None),
            Err(e) => {
                warn!("NER extraction failed, continuing without entities: {}", e);
                (EntityCollection::new(), Some(e.to_string()))
            }
        };
        let highlight = self.highlighter.render(text, &entities);
        info!("Analysis complete: {} entities", entities.len());
        Analysis {
            text: text.to_string(),
            entities,
            highlight,
            extraction_failure,
        }
    }

    /// Extract the text of a PDF and analyze it.
    pub async fn analyze_document(&self, bytes: &[u8]) -> Result<Analysis, DocumentExtractionError> {
        let text = extract_text_from_pdf(bytes)?;
        Ok(self.analyze(&text).await)
    }

    /// Explain the selected terms as one space-joined query.
    pub async fn explain_selection<S: AsRef<str>>(
        &self,
        entities: &EntityCollection,
        selected: &[S],
    ) -> ExplainOutcome {
        let Some(term) = selection_query(entities, selected) else {
            return ExplainOutcome::EmptySelection;
        };

        match timeout(self.explain_timeout, self.explainer.explain(&term)).await {
            Ok(Ok(text)) => ExplainOutcome::Explained { term, text },
            Ok(Err(e)) => ExplainOutcome::Failed { message: failure_message(&e), term },
            Err(_) => ExplainOutcome::Failed {
                message: failure_message(&LlmError::Timeout(self.explain_timeout)),
                term,
            },
        }
    }
}

/// Selected terms in collection order, joined with spaces.
/// Selections that are not in the collection are ignored.
pub fn selection_query<S: AsRef<str>>(entities: &EntityCollection, selected: &[S]) -> Option<String> {
    let wanted: Vec<String> = selected.iter().map(|s| s.as_ref().to_lowercase()).collect();
    let terms: Vec<&str> = entities
        .iter()
        .filter(|e| wanted.contains(&e.key()))
        .map(|e| e.term.as_str())
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}
