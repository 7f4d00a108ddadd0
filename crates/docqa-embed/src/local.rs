//! Local embedding model: BGE-M3 (XLM-RoBERTa) run through candle.
//!
//! Model files (tokenizer.json, config.json, pytorch_model.bin) are loaded
//! from a configured directory; nothing is downloaded at runtime.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result as AnyResult};
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use docqa_core::error::{Error, Result};
use docqa_core::traits::EmbeddingProvider;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;

const EMBED_DIM: usize = 1024;
const MAX_LEN: usize = 256;
const MODEL_NAME: &str = "bge-m3";

pub struct LocalProvider {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    id: String,
}

impl std::fmt::Debug for LocalProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalProvider").field("id", &self.id).finish()
    }
}

impl LocalProvider {
    pub fn new(model_dir: Option<&Path>) -> Result<Self> {
        let dir = resolve_model_dir(model_dir)
            .map_err(|e| Error::Config(format!("local embedding model: {e}")))?;
        let device = select_device();
        let (model, tokenizer) = load_model(&dir, &device)
            .map_err(|e| Error::embedding(format!("loading {MODEL_NAME} from {}: {e}", dir.display())))?;
        tracing::info!(model = MODEL_NAME, dir = %dir.display(), "local embedding model loaded");
        Ok(Self { model, tokenizer, device, id: format!("local:{MODEL_NAME}:d{EMBED_DIM}") })
    }

    fn embed_one(&self, text: &str) -> AnyResult<Vec<f32>> {
        let (input_ids, attention_mask) =
            tokenize_on_device(&self.tokenizer, text, MAX_LEN, &self.device)?;
        let token_type_ids = Tensor::zeros((1, MAX_LEN), DType::I64, &self.device)?;
        let hidden = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let v: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if v.len() != EMBED_DIM {
            return Err(anyhow!("expected dimension {EMBED_DIM}, got {}", v.len()));
        }
        Ok(v)
    }
}

#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn provider_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        EMBED_DIM
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let v = self
                .embed_one(text)
                .map_err(|e| Error::embedding(format!("local embedding: {e}")))?;
            out.push(v);
        }
        Ok(out)
    }
}

fn load_model(model_dir: &Path, device: &Device) -> AnyResult<(XLMRobertaModel, Tokenizer)> {
    let tokenizer_path = model_dir.join("tokenizer.json");
    let tokenizer = Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| anyhow!("tokenizer {}: {e}", tokenizer_path.display()))?;
    let config: XLMRobertaConfig =
        serde_json::from_str(&std::fs::read_to_string(model_dir.join("config.json"))?)?;
    let weights = candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))?;
    let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
    let vb = VarBuilder::from_tensors(weights_map, DType::F32, device);
    let model = XLMRobertaModel::new(&config, vb)?;
    Ok((model, tokenizer))
}

fn resolve_model_dir(configured: Option<&Path>) -> AnyResult<PathBuf> {
    if let Some(dir) = configured {
        if dir.exists() {
            return Ok(dir.to_path_buf());
        }
        return Err(anyhow!("configured model dir does not exist: {}", dir.display()));
    }
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() {
            return Ok(p);
        }
    }
    let fallback = Path::new("models").join(MODEL_NAME);
    if fallback.exists() {
        return Ok(fallback);
    }
    Err(anyhow!("could not locate a {MODEL_NAME} model directory (set embedding.model_dir or APP_MODEL_DIR)"))
}
