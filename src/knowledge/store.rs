//! In-memory vector store over pre-embedded chunks.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::KnowledgeError;

/// A stored chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeChunk {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// The chunk file produced by the offline ingestion step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkFile {
    pub docs: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
}

/// Nearest-neighbour lookup over embedded chunks.
pub trait KnowledgeBase: Send + Sync {
    /// Up to `n` chunks ranked by similarity to `embedding`, best first.
    fn nearest(&self, embedding: &[f32], n: usize) -> Vec<KnowledgeChunk>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cosine-similarity store held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKnowledgeBase {
    chunks: Vec<KnowledgeChunk>,
}

impl InMemoryKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a chunk file; documents get ids `doc_{i}`.
    pub fn from_chunk_file(file: ChunkFile) -> Result<Self, KnowledgeError> {
        if file.docs.len() != file.embeddings.len() {
            return Err(KnowledgeError::LengthMismatch {
                docs: file.docs.len(),
                embeddings: file.embeddings.len(),
            });
        }
        let mut store = Self::new();
        for (i, (text, embedding)) in file.docs.into_iter().zip(file.embeddings).enumerate() {
            store.add(format!("doc_{i}"), text, embedding);
        }
        Ok(store)
    }

    /// Load a JSON chunk file from disk.
    pub async fn load(path: &Path) -> Result<Self, KnowledgeError> {
        let raw = tokio::fs::read_to_string(path).await?;
        let file: ChunkFile =
            serde_json::from_str(&raw).map_err(|e| KnowledgeError::LoadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        let store = Self::from_chunk_file(file)?;
        info!(path = %path.display(), chunks = store.len(), "Loaded knowledge base");
        Ok(store)
    }

    /// Load a chunk file, falling back to an empty store if it does not exist.
    pub async fn load_or_empty(path: &Path) -> Result<Self, KnowledgeError> {
        match Self::load(path).await {
            Err(KnowledgeError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Knowledge file not found, answering without context");
                Ok(Self::new())
            }
            other => other,
        }
    }

    pub fn add(&mut self, id: impl Into<String>, text: impl Into<String>, embedding: Vec<f32>) {
        self.chunks.push(KnowledgeChunk {
            id: id.into(),
            text: text.into(),
            embedding,
        });
    }
}

impl KnowledgeBase for InMemoryKnowledgeBase {
    fn nearest(&self, embedding: &[f32], n: usize) -> Vec<KnowledgeChunk> {
        let mut scored: Vec<(f32, &KnowledgeChunk)> = self
            .chunks
            .iter()
            .filter(|c| c.embedding.len() == embedding.len())
            .map(|c| (cosine_similarity(&c.embedding, embedding), c))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored
            .into_iter()
            .take(n)
            .map(|(_, c)| c.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }
}

/// Cosine similarity of two equal-length vectors; 0 if either is all zeros.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
