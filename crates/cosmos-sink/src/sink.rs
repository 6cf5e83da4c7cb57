//! The transactional intake loop.
//!
//! One call to [`IntakeLoop::process`] consumes at most one event:
//!
//! ```text
//! START ─ take ─┬─ none ──────────────────────────────► CLOSED     (Backoff)
//!               └─ event ─ normalize ─ (exists → create|append)* ─┬─► COMMITTED (Ready)
//!                                                                 └─► ROLLED_BACK (Backoff)
//! ```
//!
//! Records already written for an event that later rolls back are not
//! retracted; redelivery may append those lines a second time.

use chrono::Utc;
use cosmos_hdfs::{BackendError, StorageBackend};
use cosmos_notify::normalize_event;
use cosmos_types::{RawEvent, StorageRecord};

use crate::channel::Channel;
use crate::error::SinkError;
use crate::format::format_record;
use crate::scope::TransactionScope;

/// What one invocation tells its driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// An event was fully persisted and committed.
    Ready,
    /// No progress was made; the driver should slow down.
    Backoff,
}

/// Pulls events from a channel and appends their attribute updates to
/// per-attribute files through a storage backend.
///
/// The backend is an injected, immutable value; one instance runs one
/// transaction at a time.
#[derive(Debug)]
pub struct IntakeLoop<C, B> {
    channel: C,
    backend: B,
}

impl<C: Channel, B: StorageBackend> IntakeLoop<C, B> {
    pub fn new(channel: C, backend: B) -> Self {
        Self { channel, backend }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Creates the dataset directory if it does not exist yet.
    ///
    /// A failure is logged and otherwise ignored; writes will surface the
    /// problem again on every event.
    pub async fn start(&self) {
        match self.backend.create_dir("").await {
            Ok(()) => tracing::info!("dataset directory ready"),
            Err(err) => tracing::error!(error = %err, "failed to create dataset directory"),
        }
    }

    /// Runs one transaction against the channel.
    ///
    /// Ordinary failures (parse, transport, backend, channel) roll the
    /// transaction back and yield `Status::Backoff`. Panics are not caught;
    /// the transaction is rolled back and closed while unwinding.
    pub async fn process(&self) -> Status {
        let mut scope = match TransactionScope::begin(self.channel.transaction()) {
            Ok(scope) => scope,
            Err(err) => {
                tracing::error!(error = %err, "failed to begin channel transaction");
                return Status::Backoff;
            }
        };

        let event = match scope.take() {
            Ok(Some(event)) => event,
            Ok(None) => {
                tracing::trace!("channel empty");
                return Status::Backoff;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to take event from channel");
                scope.rollback();
                return Status::Backoff;
            }
        };

        let result = match self.persist(&event).await {
            Ok(written) => scope
                .commit()
                .map(|()| written)
                .map_err(SinkError::from),
            Err(err) => Err(err),
        };

        match result {
            Ok(written) => {
                tracing::debug!(records = written, "event persisted, transaction committed");
                Status::Ready
            }
            Err(err) => {
                tracing::error!(error = %err, "event not persisted, rolling back transaction");
                scope.rollback();
                Status::Backoff
            }
        }
    }

    /// Normalizes `event` and writes one record per attribute update, in
    /// payload order. Returns the number of records written.
    async fn persist(&self, event: &RawEvent) -> Result<usize, SinkError> {
        let notification = normalize_event(event)?;

        let mut written = 0;
        for (element, attr) in notification.attribute_updates() {
            // Each attribute gets its own timestamp.
            let record = format_record(&element.entity_id, &element.entity_type, attr, Utc::now());
            tracing::info!(file = %record.key, data = %record.line, "persisting data");
            self.write(&record).await?;
            written += 1;
        }

        Ok(written)
    }

    async fn write(&self, record: &StorageRecord) -> Result<(), BackendError> {
        if self.backend.exists(&record.key).await? {
            self.backend.append(&record.key, &record.line).await
        } else {
            self.backend.create_file(&record.key, &record.line).await
        }
    }
}
