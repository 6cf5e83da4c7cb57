//! Contract with the upstream buffered channel.
//!
//! A channel hands out transactions. Within one transaction the sink takes
//! at most one event and then either commits (the event is consumed) or
//! rolls back (the event becomes available to a later `take`). Every
//! transaction is closed exactly once, whatever the outcome.

use cosmos_types::RawEvent;

use crate::error::ChannelError;

/// A source of transactional event takes.
pub trait Channel: Send + Sync {
    type Transaction: Transaction;

    /// Returns a new, not yet begun transaction.
    fn transaction(&self) -> Self::Transaction;
}

/// One unit of consumption against a [`Channel`].
///
/// Lifecycle: `begin → take* → (commit | rollback)? → close`. Closing
/// without commit or rollback is only valid when nothing was taken.
pub trait Transaction: Send {
    fn begin(&mut self) -> Result<(), ChannelError>;

    /// Takes the next event, or `None` when the channel is empty.
    fn take(&mut self) -> Result<Option<RawEvent>, ChannelError>;

    fn commit(&mut self) -> Result<(), ChannelError>;

    /// Returns every event taken in this transaction to the channel.
    fn rollback(&mut self) -> Result<(), ChannelError>;

    fn close(&mut self);
}
