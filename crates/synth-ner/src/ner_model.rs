//! In-process token classification with Candle.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::distilbert::{Config, DistilBertModel};
use hf_hub::api::sync::Api;
use synth_common::RawToken;
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::provider::NerProvider;
use crate::{NerError, Result};

/// NER configuration.
#[derive(Debug, Clone)]
pub struct NerConfig {
    pub model_id: String,
    pub max_length: usize,
    pub use_gpu: bool,
}

impl Default for NerConfig {
    fn default() -> Self {
        Self {
            model_id: "d4data/biomedical-ner-all".to_string(),
            max_length: 512,
            use_gpu: true,
        }
    }
}

struct Downloaded {
    config: Config,
    hidden_size: usize,
    tokenizer: Tokenizer,
    weights_path: PathBuf,
    label_map: HashMap<usize, String>,
}

/// DistilBERT token classifier loaded from the Hugging Face Hub.
///
/// Cheap to clone; inference runs on the blocking thread pool.
#[derive(Clone)]
pub struct NerModel {
    inner: Arc<Inner>,
}

struct Inner {
    model: DistilBertModel,
    tokenizer: Tokenizer,
    classifier: Linear,
    label_map: HashMap<usize, String>,
    config: NerConfig,
    device: Device,
}

impl NerModel {
    /// Load a NER model from Hugging Face Hub.
    pub async fn new(config: NerConfig) -> Result<Self> {
        let start = Instant::now();
        info!("Loading NER model: {}", config.model_id);

        let device = if config.use_gpu {
            Device::cuda_if_available(0).unwrap_or(Device::Cpu)
        } else {
            Device::Cpu
        };
        debug!("Using device: {:?}", device);

        let model_id = config.model_id.clone();
        let downloaded = tokio::task::spawn_blocking(move || Self::download_model(&model_id))
            .await
            .map_err(|e| NerError::Download(e.to_string()))??;

        info!("Loading model weights from {:?}", downloaded.weights_path);
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[downloaded.weights_path.clone()], DType::F32, &device)
                .map_err(|e| NerError::ModelLoad(e.to_string()))?
        };

        let model = DistilBertModel::load(vb.clone(), &downloaded.config)
            .map_err(|e| NerError::ModelLoad(format!("DistilBertModel: {}", e)))?;

        let num_labels = downloaded.label_map.len().max(1);
        let classifier = candle_nn::linear(downloaded.hidden_size, num_labels, vb.pp("classifier"))
            .map_err(|e| NerError::ModelLoad(format!("Classifier: {}", e)))?;

        info!("NER model loaded in {:?} ({} labels)", start.elapsed(), num_labels);

        Ok(Self {
            inner: Arc::new(Inner {
                model,
                tokenizer: downloaded.tokenizer,
                classifier,
                label_map: downloaded.label_map,
                config,
                device,
            }),
        })
    }

    fn download_model(model_id: &str) -> Result<Downloaded> {
        use hf_hub::{Repo, RepoType};

        let api = Api::new().map_err(|e| NerError::Download(format!("API init: {}", e)))?;
        let api_repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = api_repo
            .get("config.json")
            .map_err(|e| NerError::Download(format!("config.json: {}", e)))?;
        let config_content = std::fs::read_to_string(&config_path)?;

        let config_json: serde_json::Value = serde_json::from_str(&config_content)
            .map_err(|e| NerError::Download(format!("Parse config: {}", e)))?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| NerError::ModelLoad(format!("DistilBERT config: {}", e)))?;
        let hidden_size = config_json["dim"].as_u64().unwrap_or(768) as usize;

        let label_map: HashMap<usize, String> = config_json["id2label"]
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| Some((k.parse().ok()?, v.as_str()?.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        // Prefer tokenizer.json, fall back to building WordPiece from vocab.txt
        let tokenizer = if let Ok(tok_path) = api_repo.get("tokenizer.json") {
            Tokenizer::from_file(&tok_path).map_err(|e| NerError::Tokenization(e.to_string()))?
        } else if let Ok(vocab_path) = api_repo.get("vocab.txt") {
            info!("Building tokenizer from vocab.txt");
            let vocab_content = std::fs::read_to_string(&vocab_path)?;
            let vocab: ahash::AHashMap<String, u32> = vocab_content
                .lines()
                .enumerate()
                .map(|(i, line)| (line.to_string(), i as u32))
                .collect();

            use tokenizers::models::wordpiece::WordPieceBuilder;
            let wordpiece = WordPieceBuilder::new()
                .vocab(vocab)
                .continuing_subword_prefix("##".to_string())
                .max_input_chars_per_word(100)
                .unk_token("[UNK]".to_string())
                .build()
                .map_err(|e| NerError::Tokenization(format!("WordPiece: {}", e)))?;

            let mut tokenizer = Tokenizer::new(wordpiece);
            use tokenizers::normalizers::bert::BertNormalizer;
            tokenizer.with_normalizer(Some(BertNormalizer::new(true, true, Some(false), true)));
            use tokenizers::pre_tokenizers::whitespace::Whitespace;
            tokenizer.with_pre_tokenizer(Some(Whitespace));
            tokenizer
        } else {
            return Err(NerError::Tokenization("No tokenizer found".to_string()));
        };

        let weights_path = api_repo
            .get("model.safetensors")
            .map_err(|e| NerError::Download(format!("Model weights: {}", e)))?;

        Ok(Downloaded { config, hidden_size, tokenizer, weights_path, label_map })
    }

    /// Classify every sub-word token of `text`, dropping `O` and special tokens.
    /// Blocks the calling thread for the length of the forward pass.
    pub fn classify(&self, text: &str) -> Result<Vec<RawToken>> {
        self.inner.classify(text)
    }
}

impl Inner {
    fn classify(&self, text: &str) -> Result<Vec<RawToken>> {
        let start = Instant::now();

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| NerError::Tokenization(e.to_string()))?;

        let len = truncated_len(encoding.get_ids().len(), self.config.max_length);
        if len == 0 {
            return Ok(Vec::new());
        }
        let ids = &encoding.get_ids()[..len];
        let tokens = &encoding.get_tokens()[..len];
        let offsets = &encoding.get_offsets()[..len];
        let special = &encoding.get_special_tokens_mask()[..len];

        let input_ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let mask = Tensor::zeros((1, len), DType::U8, &self.device)?;

        // [1, seq, hidden] -> [seq, num_labels]
        let hidden = self.model.forward(&input_ids, &mask)?;
        let logits = self.classifier.forward(&hidden)?.squeeze(0)?;
        let probs = candle_nn::ops::softmax(&logits, 1)?;
        let preds = probs.argmax(1)?.to_vec1::<u32>()?;
        let probs = probs.to_vec2::<f32>()?;

        let mut out = Vec::new();
        for (i, &pred) in preds.iter().enumerate() {
            if special.get(i).copied().unwrap_or(0) == 1 {
                continue;
            }
            let label = self
                .label_map
                .get(&(pred as usize))
                .map(String::as_str)
                .unwrap_or("O");
            if label == "O" {
                continue;
            }
            let score = probs[i][pred as usize];
            let (s, e) = offsets[i];
            out.push(RawToken::from_wordpiece(&tokens[i], label, score).with_offsets(s, e));
        }

        debug!("Classified {} tokens ({} kept) in {:?}", len, out.len(), start.elapsed());
        Ok(out)
    }
}

/// Number of sub-word tokens the model will see, warning when input is cut.
fn truncated_len(total: usize, max_length: usize) -> usize {
    if total > max_length {
        warn!(
            "Input truncated to {} sub-word tokens, {} dropped; later entities are lost",
            max_length,
            total - max_length
        );
        return max_length;
    }
    total
}

#[async_trait]
impl NerProvider for NerModel {
    async fn tokens(&self, text: &str) -> Result<Vec<RawToken>> {
        let inner = Arc::clone(&self.inner);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || inner.classify(&text))
            .await
            .map_err(|e| NerError::Inference(format!("classification task: {}", e)))?
    }

    fn model_id(&self) -> &str {
        &self.inner.config.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_len_caps_at_max_length() {
        synth_test_utils::init_tracing();
        assert_eq!(truncated_len(700, 512), 512);
        assert_eq!(truncated_len(512, 512), 512);
        assert_eq!(truncated_len(3, 512), 3);
        assert_eq!(truncated_len(0, 512), 0);
    }
}
