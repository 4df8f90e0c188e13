use thiserror::Error;

pub type Result<T> = std::result::Result<T, NodeError>;

/// Every way the core can refuse an input or a mutation.
///
/// None of these is fatal: the node stays live after any rejection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// Malformed input (missing or ill-typed fields, bad address format).
    #[error("malformed input: {0}")]
    Structural(String),

    /// Hash mismatch, unmet difficulty, broken linkage, stale timestamp,
    /// insufficient accumulated work or a rejected ledger effect.
    #[error("consensus violation: {0}")]
    Consensus(String),

    /// Signature verification failed for a confirmation or withdrawal.
    #[error("authorization failed: {0}")]
    Unauthorized(String),

    /// The chain head moved underneath a candidate block. Retryable.
    #[error("chain head moved: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl NodeError {
    pub fn structural(reason: impl Into<String>) -> Self {
        NodeError::Structural(reason.into())
    }

    pub fn consensus(reason: impl Into<String>) -> Self {
        NodeError::Consensus(reason.into())
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        NodeError::Unauthorized(reason.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, NodeError::Conflict(_))
    }
}

impl From<std::io::Error> for NodeError {
    fn from(err: std::io::Error) -> Self {
        NodeError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for NodeError {
    fn from(err: serde_json::Error) -> Self {
        NodeError::Storage(err.to_string())
    }
}
