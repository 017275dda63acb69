//! Error types for Folio Assist.

use std::time::Duration;

/// Top-level error type for the agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Knowledge base error: {0}")]
    Knowledge(#[from] KnowledgeError),

    #[error("Transcript error: {0}")]
    Transcript(#[from] TranscriptError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised while building a contact classifier from keyword tables.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Invalid pattern for {category} keywords: {source}")]
    Pattern {
        category: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to read keyword tables from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse keyword tables: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Embedding and retrieval errors.
#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("Embedding generation failed: {reason}")]
    EmbeddingFailed { reason: String },

    #[error("Failed to load knowledge chunks from {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("Chunk file is inconsistent: {docs} documents but {embeddings} embeddings")]
    LengthMismatch { docs: usize, embeddings: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transcript log errors.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("Failed to write transcript to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize transcript entry: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for the agent.
pub type Result<T> = std::result::Result<T, Error>;
