/// Embedding provider trait and FastEmbed implementation
use crate::error::AdvisrError;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Arc;

type Result<T> = std::result::Result<T, AdvisrError>;

/// Supported local models: (name, fastembed model, dimension)
const MODEL_TABLE: &[(&str, EmbeddingModel, usize)] = &[
    ("all-MiniLM-L6-v2", EmbeddingModel::AllMiniLML6V2, 384),
    ("bge-small-en-v1.5", EmbeddingModel::BGESmallENV15, 384),
    ("bge-base-en-v1.5", EmbeddingModel::BGEBaseENV15, 768),
];

/// Trait for embedding providers
///
/// Abstracts over embedding backends so the similarity index can be tested
/// without downloading a model.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batched for efficiency)
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embedding dimension
    fn dimension(&self) -> usize;

    /// Model name
    fn model_name(&self) -> &str;
}

/// FastEmbed provider for local embedding generation
///
/// Models are downloaded on demand to the huggingface cache on first use;
/// the default all-MiniLM-L6-v2 is ~90MB and plenty for short course
/// descriptions.
pub struct FastEmbedProvider {
    model: Arc<TextEmbedding>,
    model_name: String,
    dimension: usize,
}

impl FastEmbedProvider {
    /// Create a provider for the named model
    pub fn new(model_name: &str) -> Result<Self> {
        let (_, embedding_model, dimension) = MODEL_TABLE
            .iter()
            .find(|(name, _, _)| name.eq_ignore_ascii_case(model_name))
            .ok_or_else(|| {
                AdvisrError::Embedding(format!(
                    "Unsupported model: {}. Supported: {}",
                    model_name,
                    MODEL_TABLE
                        .iter()
                        .map(|(n, _, _)| *n)
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })?;

        tracing::info!(
            "Initializing embedding model {} ({}D, downloaded if not cached)",
            model_name,
            dimension
        );

        let init_options =
            InitOptions::new(embedding_model.clone()).with_show_download_progress(true);
        let model = TextEmbedding::try_new(init_options)
            .map_err(|e| AdvisrError::Embedding(e.to_string()))?;

        Ok(Self {
            model: Arc::new(model),
            model_name: model_name.to_string(),
            dimension: *dimension,
        })
    }

    /// Provider with the default model (all-MiniLM-L6-v2)
    pub fn with_default_model() -> Result<Self> {
        Self::new("all-MiniLM-L6-v2")
    }
}

impl EmbeddingProvider for FastEmbedProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(AdvisrError::Embedding("Empty text".to_string()));
        }

        let mut embeddings = self
            .model
            .embed(vec![text.to_string()], None)
            .map_err(|e| AdvisrError::Embedding(e.to_string()))?;

        let embedding = embeddings
            .pop()
            .ok_or_else(|| AdvisrError::Embedding("No embedding generated".to_string()))?;

        if embedding.len() != self.dimension {
            return Err(AdvisrError::Embedding(format!(
                "Dimension mismatch: expected {}, got {}",
                self.dimension,
                embedding.len()
            )));
        }

        Ok(embedding)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self
            .model
            .embed(texts.to_vec(), None)
            .map_err(|e| AdvisrError::Embedding(e.to_string()))?;

        for embedding in &embeddings {
            if embedding.len() != self.dimension {
                return Err(AdvisrError::Embedding(format!(
                    "Dimension mismatch: expected {}, got {}",
                    self.dimension,
                    embedding.len()
                )));
            }
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
