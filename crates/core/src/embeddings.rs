use crate::error::EmbedError;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

pub const DEFAULT_MODEL: &str = "paraphrase-multilingual-mpnet-base-v2";

/// Prefix BGE models expect in front of retrieval inputs.
pub const BGE_INSTRUCTION: &str = "Represent this sentence for searching relevant passages: ";

pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    fn model_name(&self) -> &str;

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "char-trigram"
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        Ok(l2_normalize(vector))
    }
}

/// How a pretrained model wants its input text presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProfile {
    /// Mean-pooled multilingual sentence model, raw text.
    Multilingual,
    /// CLS-pooled BGE model, every input carries [`BGE_INSTRUCTION`].
    Bge,
}

impl EmbeddingProfile {
    pub fn prepare(&self, text: &str) -> String {
        match self {
            Self::Multilingual => text.to_string(),
            Self::Bge if text.starts_with(BGE_INSTRUCTION) => text.to_string(),
            Self::Bge => format!("{BGE_INSTRUCTION}{text}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PretrainedModel {
    ParaphraseMultilingualMpnet,
    BgeSmallEn,
    BgeBaseEn,
    BgeLargeEn,
}

impl PretrainedModel {
    pub fn from_name(name: &str) -> Result<Self, EmbedError> {
        let short = name.rsplit('/').next().unwrap_or(name).to_lowercase();
        match short.as_str() {
            "paraphrase-multilingual-mpnet-base-v2" => Ok(Self::ParaphraseMultilingualMpnet),
            "bge-small-en-v1.5" => Ok(Self::BgeSmallEn),
            "bge-base-en-v1.5" => Ok(Self::BgeBaseEn),
            "bge-large-en-v1.5" => Ok(Self::BgeLargeEn),
            _ => Err(EmbedError::UnknownModel(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ParaphraseMultilingualMpnet => "paraphrase-multilingual-mpnet-base-v2",
            Self::BgeSmallEn => "bge-small-en-v1.5",
            Self::BgeBaseEn => "bge-base-en-v1.5",
            Self::BgeLargeEn => "bge-large-en-v1.5",
        }
    }

    pub fn profile(&self) -> EmbeddingProfile {
        match self {
            Self::ParaphraseMultilingualMpnet => EmbeddingProfile::Multilingual,
            Self::BgeSmallEn | Self::BgeBaseEn | Self::BgeLargeEn => EmbeddingProfile::Bge,
        }
    }

    pub fn dimensions(&self) -> usize {
        match self {
            Self::BgeSmallEn => 384,
            Self::ParaphraseMultilingualMpnet | Self::BgeBaseEn => 768,
            Self::BgeLargeEn => 1024,
        }
    }

    #[cfg(feature = "fastembed")]
    fn fastembed_model(&self) -> fastembed::EmbeddingModel {
        match self {
            Self::ParaphraseMultilingualMpnet => fastembed::EmbeddingModel::ParaphraseMLMpnetBaseV2,
            Self::BgeSmallEn => fastembed::EmbeddingModel::BGESmallENV15,
            Self::BgeBaseEn => fastembed::EmbeddingModel::BGEBaseENV15,
            Self::BgeLargeEn => fastembed::EmbeddingModel::BGELargeENV15,
        }
    }
}

/// Pretrained transformer inference through fastembed. The session needs
/// exclusive access while running, so requests take turns on the mutex.
#[cfg(feature = "fastembed")]
pub struct FastEmbedder {
    model: parking_lot::Mutex<fastembed::TextEmbedding>,
    pretrained: PretrainedModel,
}

#[cfg(feature = "fastembed")]
impl FastEmbedder {
    pub fn load(pretrained: PretrainedModel, cache_dir: Option<&Path>) -> Result<Self, EmbedError> {
        let model = fastembed::TextEmbedding::try_new(init_options(pretrained, cache_dir))
            .map_err(|error| EmbedError::Model(error.to_string()))?;

        tracing::info!(model = pretrained.name(), "embedding model loaded");

        Ok(Self {
            model: parking_lot::Mutex::new(model),
            pretrained,
        })
    }
}

#[cfg(feature = "fastembed")]
fn init_options(
    pretrained: PretrainedModel,
    cache_dir: Option<&Path>,
) -> fastembed::TextInitOptions {
    let options = fastembed::TextInitOptions::new(pretrained.fastembed_model())
        .with_show_download_progress(true);
    match cache_dir {
        Some(dir) => options.with_cache_dir(dir.to_path_buf()),
        None => options,
    }
}

#[cfg(feature = "fastembed")]
impl Embedder for FastEmbedder {
    fn dimensions(&self) -> usize {
        self.pretrained.dimensions()
    }

    fn model_name(&self) -> &str {
        self.pretrained.name()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.embed_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or(EmbedError::CountMismatch {
                expected: 1,
                got: 0,
            })
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let profile = self.pretrained.profile();
        let prepared = texts
            .iter()
            .map(|text| profile.prepare(text))
            .collect::<Vec<_>>();

        let mut model = self.model.lock();
        let vectors = model
            .embed(prepared, None)
            .map_err(|error| EmbedError::Model(error.to_string()))?;

        if vectors.len() != texts.len() {
            return Err(EmbedError::CountMismatch {
                expected: texts.len(),
                got: vectors.len(),
            });
        }

        Ok(vectors.into_iter().map(l2_normalize).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderKind {
    Ngram,
    Fastembed,
}

impl FromStr for EmbedderKind {
    type Err = EmbedError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "ngram" => Ok(Self::Ngram),
            "fastembed" | "local" => Ok(Self::Fastembed),
            other => Err(EmbedError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbedderSettings {
    pub kind: EmbedderKind,
    pub model: String,
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbedderSettings {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::Ngram,
            model: DEFAULT_MODEL.to_string(),
            cache_dir: None,
        }
    }
}

pub fn create_embedder(settings: &EmbedderSettings) -> Result<Arc<dyn Embedder>, EmbedError> {
    match settings.kind {
        EmbedderKind::Ngram => Ok(Arc::new(CharacterNgramEmbedder::default())),
        #[cfg(feature = "fastembed")]
        EmbedderKind::Fastembed => {
            let pretrained = PretrainedModel::from_name(&settings.model)?;
            Ok(Arc::new(FastEmbedder::load(
                pretrained,
                settings.cache_dir.as_deref(),
            )?))
        }
        #[cfg(not(feature = "fastembed"))]
        EmbedderKind::Fastembed => Err(EmbedError::Model(
            "transformer embeddings require building with --features fastembed".to_string(),
        )),
    }
}

/// Returns `0.0` for empty or mismatched vectors and for zero norms.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for value in &mut vector {
            *value /= magnitude;
        }
    }
    vector
}

/// Deletes cached downloads of `model` from a Hugging Face style cache
/// (`models--{org}--{name}` directories). Returns what was removed.
pub fn purge_cached_model(cache_dir: &Path, model: &str) -> std::io::Result<Vec<PathBuf>> {
    let short = model.rsplit('/').next().unwrap_or(model).to_lowercase();
    if short.is_empty() || !cache_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut removed = Vec::new();
    for entry in std::fs::read_dir(cache_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if entry.file_type()?.is_dir() && name.starts_with("models--") && name.contains(&short) {
            std::fs::remove_dir_all(entry.path())?;
            removed.push(entry.path());
        }
    }

    removed.sort();
    Ok(removed)
}
