//! Error types for the ingestion sink.

use cosmos_hdfs::BackendError;
use cosmos_notify::NormalizeError;

/// Failures of the upstream channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The channel is at capacity and cannot accept another event.
    #[error("channel is full (capacity {capacity})")]
    Full { capacity: usize },

    /// A transaction operation was called out of order.
    #[error("cannot {op} a transaction that is {state}")]
    InvalidState {
        op: &'static str,
        state: &'static str,
    },

    /// The channel's internal lock was poisoned by a panicking holder.
    #[error("channel lock poisoned")]
    LockPoisoned,
}

/// Ordinary failures while processing one event. Each one causes the
/// owning transaction to roll back.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("cannot parse notification: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("cannot persist record: {0}")]
    Backend(#[from] BackendError),

    #[error("channel failure: {0}")]
    Channel(#[from] ChannelError),
}
