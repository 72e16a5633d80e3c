//! Configuration loading for Synth.
//! Reads synth.toml from the current directory or the path in the SYNTH_CONFIG env var.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use synth_common::{Result, SynthError};
use synth_ner::DEFAULT_HIGHLIGHT_STYLE;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ner: NerConfig,
    #[serde(default)]
    pub explanation: ExplanationConfig,
    #[serde(default)]
    pub highlight: HighlightConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NerBackend {
    /// Hosted token-classification endpoint.
    Http,
    /// In-process Candle model (requires the `local-model` feature).
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NerConfig {
    #[serde(default = "default_ner_backend")]
    pub provider: NerBackend,
    #[serde(default = "default_ner_model")]
    pub model_id: String,
    #[serde(default = "default_ner_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_ner_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub keep_unclassified: bool,
    #[serde(default)]
    pub extra_stopwords: Vec<String>,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "bool_true")]
    pub use_gpu: bool,
}

fn default_ner_backend()  -> NerBackend { NerBackend::Http }
fn default_ner_model()    -> String { "d4data/biomedical-ner-all".to_string() }
fn default_ner_endpoint() -> String { "https://api-inference.huggingface.co/models".to_string() }
fn default_ner_timeout()  -> u64    { 30 }
fn default_max_length()   -> usize  { 512 }
fn bool_true()            -> bool   { true }

impl Default for NerConfig {
    fn default() -> Self {
        Self {
            provider: default_ner_backend(),
            model_id: default_ner_model(),
            endpoint: default_ner_endpoint(),
            api_token: None,
            timeout_secs: default_ner_timeout(),
            keep_unclassified: false,
            extra_stopwords: Vec::new(),
            max_length: default_max_length(),
            use_gpu: bool_true(),
        }
    }
}

impl NerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Token from the file, else SYNTH_HF_TOKEN, else HF_TOKEN.
    pub fn resolved_api_token(&self) -> Option<String> {
        resolve_secret(self.api_token.as_deref(), &["SYNTH_HF_TOKEN", "HF_TOKEN"], env_lookup)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationConfig {
    #[serde(default = "default_explanation_base_url")]
    pub base_url: String,
    #[serde(default = "default_explanation_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub referer: Option<String>,
    #[serde(default = "default_explanation_timeout")]
    pub timeout_secs: u64,
}

fn default_explanation_base_url() -> String { "https://openrouter.ai/api".to_string() }
fn default_explanation_model()    -> String { "openai/gpt-4o-mini".to_string() }
fn default_max_tokens()           -> u32    { 600 }
fn default_explanation_timeout()  -> u64    { 60 }

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            base_url: default_explanation_base_url(),
            model: default_explanation_model(),
            api_key: None,
            max_tokens: default_max_tokens(),
            referer: None,
            timeout_secs: default_explanation_timeout(),
        }
    }
}

impl ExplanationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Key from the file, else SYNTH_OPENROUTER_API_KEY, else OPENROUTER_API_KEY.
    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_secret(
            self.api_key.as_deref(),
            &["SYNTH_OPENROUTER_API_KEY", "OPENROUTER_API_KEY"],
            env_lookup,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightConfig {
    #[serde(default = "default_highlight_style")]
    pub style: String,
}

fn default_highlight_style() -> String { DEFAULT_HIGHLIGHT_STYLE.to_string() }

impl Default for HighlightConfig {
    fn default() -> Self {
        Self { style: default_highlight_style() }
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// First non-empty value among the configured one and the named variables.
fn resolve_secret(
    configured: Option<&str>,
    vars: &[&str],
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    configured
        .map(str::to_string)
        .into_iter()
        .chain(vars.iter().filter_map(|v| lookup(*v)))
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}


impl Config {
    /// Load configuration from synth.toml.
    /// Checks SYNTH_CONFIG env var first, then current directory.
    /// A missing file is not an error: every setting has a default.
    pub fn load() -> Result<Self> {
        let path = std::env::var("SYNTH_CONFIG")
            .unwrap_or_else(|_| "synth.toml".to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("Config file not found: {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.ner.timeout_secs == 0 || self.explanation.timeout_secs == 0 {
            return Err(SynthError::Config("timeout_secs must be greater than zero".to_string()));
        }
        if self.ner.max_length == 0 {
            return Err(SynthError::Config("ner.max_length must be greater than zero".to_string()));
        }
        Ok(())
    }
}
