//! NER provider abstraction and the hosted-inference implementation.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use synth_common::RawToken;
use tracing::{debug, info};

use crate::{NerError, Result};

/// A token-classification model seen as a black box.
///
/// Implementations return every non-`O` token in emission order, with
/// continuation fragments flagged and their marker stripped.
#[async_trait]
pub trait NerProvider: Send + Sync {
    async fn tokens(&self, text: &str) -> Result<Vec<RawToken>>;
    fn model_id(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct HttpNerConfig {
    pub endpoint: String,
    pub model_id: String,
    pub api_token: Option<String>,
}

impl Default for HttpNerConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api-inference.huggingface.co/models".to_string(),
            model_id: "d4data/biomedical-ner-all".to_string(),
            api_token: None,
        }
    }
}

/// Hugging Face style inference endpoint for token classification.
pub struct HttpNerProvider {
    url: String,
    model_id: String,
    api_token: Option<SecretString>,
    client: reqwest::Client,
}

impl HttpNerProvider {
    pub fn new(config: HttpNerConfig) -> Self {
        let url = format!("{}/{}", config.endpoint.trim_end_matches('/'), config.model_id);
        info!("NER provider: {}", url);
        Self {
            url,
            model_id: config.model_id,
            api_token: config.api_token.filter(|t| !t.is_empty()).map(SecretString::from),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl NerProvider for HttpNerProvider {
    async fn tokens(&self, text: &str) -> Result<Vec<RawToken>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "inputs": text,
            "parameters": { "aggregation_strategy": "none" },
        });
        let mut req = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.api_token {
            req = req.bearer_auth(token.expose_secret());
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let raw = resp.text().await?;
        if status >= 400 {
            let message = serde_json::from_str::<serde_json::Value>(&raw)
                .ok()
                .and_then(|v| v["error"].as_str().map(str::to_string))
                .unwrap_or(raw);
            return Err(NerError::Api { status, message });
        }

        let tokens = parse_token_records(&raw)?;
        debug!("NER provider returned {} tokens", tokens.len());
        Ok(tokens)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[derive(Debug, Deserialize)]
struct TokenRecord {
    #[serde(alias = "entity_group")]
    entity: String,
    score: f32,
    word: String,
    start: Option<usize>,
    end: Option<usize>,
}

/// Parse a `[{entity, score, word, start, end}, ...]` response body.
/// Records labelled `O` are skipped.
pub(crate) fn parse_token_records(body: &str) -> Result<Vec<RawToken>> {
    let records: Vec<TokenRecord> = serde_json::from_str(body)
        .map_err(|e| NerError::MalformedResponse(e.to_string()))?;

    Ok(records
        .into_iter()
        .filter(|r| r.entity != "O")
        .map(|r| {
            let token = RawToken::from_wordpiece(&r.word, r.entity, r.score);
            match (r.start, r.end) {
                (Some(start), Some(end)) => token.with_offsets(start, end),
                _ => token,
            }
        })
        .collect())
}
