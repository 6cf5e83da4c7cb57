//! Resource scope around one channel transaction.
//!
//! `TransactionScope` begins the transaction on construction and closes it
//! when dropped, so every exit path of an invocation (early return, error,
//! or panic unwinding) releases the transaction. A scope dropped after a
//! take but before commit or rollback rolls back first.

use cosmos_types::RawEvent;

use crate::channel::Transaction;
use crate::error::ChannelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Pending,
    Committed,
    RolledBack,
}

pub(crate) struct TransactionScope<T: Transaction> {
    txn: T,
    outcome: Outcome,
    taken: bool,
}

impl<T: Transaction> TransactionScope<T> {
    pub(crate) fn begin(mut txn: T) -> Result<Self, ChannelError> {
        if let Err(err) = txn.begin() {
            txn.close();
            return Err(err);
        }
        Ok(Self {
            txn,
            outcome: Outcome::Pending,
            taken: false,
        })
    }

    pub(crate) fn take(&mut self) -> Result<Option<RawEvent>, ChannelError> {
        let event = self.txn.take()?;
        self.taken |= event.is_some();
        Ok(event)
    }

    pub(crate) fn commit(&mut self) -> Result<(), ChannelError> {
        self.txn.commit()?;
        self.outcome = Outcome::Committed;
        Ok(())
    }

    /// Rolls back; failures are logged since there is nothing left to undo.
    pub(crate) fn rollback(&mut self) {
        if self.outcome != Outcome::Pending {
            return;
        }
        match self.txn.rollback() {
            Ok(()) => self.outcome = Outcome::RolledBack,
            Err(err) => tracing::error!(error = %err, "transaction rollback failed"),
        }
    }
}

impl<T: Transaction> Drop for TransactionScope<T> {
    fn drop(&mut self) {
        if self.taken && self.outcome == Outcome::Pending {
            tracing::warn!("transaction abandoned before commit, rolling back");
            self.rollback();
        }
        self.txn.close();
    }
}
