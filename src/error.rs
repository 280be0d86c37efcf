use alloy::primitives::Address;
use std::time::Duration;

/// Failures talking to a chain node.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("{op} failed: {message}")]
    Rpc { op: &'static str, message: String },

    #[error("block {0} not found")]
    MissingBlock(u64),

    #[error("failed to decode: {0}")]
    Decode(String),

    #[error("{op} cancelled")]
    Cancelled { op: &'static str },
}

impl ChainError {
    /// Timeouts and transport errors are worth another attempt; a malformed
    /// log or a block the node does not have is not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Rpc { .. })
    }
}

/// Why a tracker cycle did not complete.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error(transparent)]
    Chain(ChainError),

    #[error("direction {direction}: event references unregistered token {token}")]
    UnknownToken { direction: String, token: Address },

    #[error("price quote request failed: {0}")]
    Quote(#[from] reqwest::Error),

    #[error("checkpoint store: {0:#}")]
    Store(eyre::Report),

    #[error("transactions recorded but watermark stayed at {watermark:?}: {error:#}")]
    WatermarkNotAdvanced {
        watermark: Option<u64>,
        error: eyre::Report,
    },

    #[error("cancelled")]
    Cancelled,
}

impl From<ChainError> for TrackerError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::Cancelled { .. } => Self::Cancelled,
            other => Self::Chain(other),
        }
    }
}
