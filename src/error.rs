use thiserror::Error;

/// Embedding provider failures.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("cannot embed empty text")]
    EmptyInput,

    #[error("unknown embedding provider: {0}")]
    UnknownProvider(String),

    #[error("embedding provider request failed: {0}")]
    Provider(#[source] anyhow::Error),

    #[error("embedding has dimension {got}, expected {expected}")]
    WrongDimension { expected: usize, got: usize },
}

/// Vector backend failures. Callers must not mask these as "no results".
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query vector has dimension {got}, index expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("vector backend unavailable: {0}")]
    Backend(String),
}

/// Lexical index failures: input validation only, no transient mode.
#[derive(Debug, Error)]
pub enum LexicalError {
    #[error("cannot search with an empty query")]
    EmptyQuery,
}

/// Invalid startup configuration. Fail-fast, never deferred to request time.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("fusion alpha must be within [0, 1], got {0}")]
    AlphaOutOfRange(f32),

    #[error("default_top_k must be at least 1")]
    ZeroTopK,

    #[error("retrieval_timeout_ms must be non-zero")]
    ZeroTimeout,

    #[error("embedding_dim must be non-zero")]
    ZeroEmbeddingDim,
}

/// Total retrieval failure: both the semantic and the lexical branch died.
/// A single-branch failure degrades instead of raising this.
#[derive(Debug, Error)]
#[error("both retrieval branches failed (semantic: {semantic}; lexical: {lexical})")]
pub struct RetrievalError {
    pub semantic: String,
    pub lexical: String,
}

/// Model call failed after the retry budget was exhausted. The only error
/// that surfaces to the user as a failed request.
#[derive(Debug, Error)]
#[error("model call failed after {attempts} attempts: {source}")]
pub struct GenerationError {
    pub attempts: u32,
    #[source]
    pub source: anyhow::Error,
}
