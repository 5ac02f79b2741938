//! Error types for deepwalk.

use thiserror::Error;

/// Boxed error returned by an [`EmbeddingTrainer`](crate::trainer::EmbeddingTrainer).
pub type TrainerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for walk generation, vocabulary and training.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid parameter or selector. Reported before any work begins.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A neighbor reference points outside the enumerated nodes.
    #[error("graph integrity: node {node} lists neighbor {neighbor}, but the graph has {node_count} nodes")]
    GraphIntegrity {
        node: usize,
        neighbor: usize,
        node_count: usize,
    },

    /// A graph node never appeared in the corpus it was counted from.
    #[error("vocabulary does not cover node {node}")]
    UncoveredNode { node: usize },

    /// Failure surfaced by the embedding trainer, passed through as-is.
    #[error("embedding training failed: {0}")]
    Training(#[source] TrainerError),

    /// Malformed line in a graph file.
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }
}

/// Result type for deepwalk operations.
pub type Result<T> = std::result::Result<T, Error>;
