//! Knowledge-base retrieval.
//!
//! The knowledge base is a set of pre-embedded text chunks. A query is
//! embedded with the same model and the closest chunk by cosine similarity
//! is handed to the prompt as context.

pub mod embedder;
pub mod store;

pub use embedder::{Embedder, GeminiEmbedder};
pub use store::{ChunkFile, InMemoryKnowledgeBase, KnowledgeBase, KnowledgeChunk};

use std::sync::Arc;

use tracing::debug;

use crate::error::KnowledgeError;

/// Embeds queries and looks up the nearest chunks.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    knowledge: Arc<dyn KnowledgeBase>,
    top_k: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, knowledge: Arc<dyn KnowledgeBase>) -> Self {
        Self {
            embedder,
            knowledge,
            top_k: 1,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Retrieve context text for `query`, joined by blank lines.
    ///
    /// Returns `Ok(None)` when the knowledge base has nothing to offer.
    pub async fn context_for(&self, query: &str) -> Result<Option<String>, KnowledgeError> {
        if self.knowledge.is_empty() {
            return Ok(None);
        }
        let embedding = self.embedder.embed(query).await?;
        let chunks = self.knowledge.nearest(&embedding, self.top_k);
        debug!(
            hits = chunks.len(),
            best = chunks.first().map(|c| c.id.as_str()).unwrap_or("-"),
            "Retrieved knowledge chunks"
        );
        if chunks.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            chunks
                .into_iter()
                .map(|c| c.text)
                .collect::<Vec<_>>()
                .join("\n\n"),
        ))
    }
}
