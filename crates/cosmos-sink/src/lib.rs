//! Transactional ingestion sink for cosmos-injector.
//!
//! Consumes context-broker notifications from an upstream channel and
//! appends every attribute update as a line in a per-entity-attribute file
//! on a remote store. An event is acknowledged to the channel only after
//! all of its lines were written; any failure rolls the transaction back so
//! the event is delivered again (at-least-once).
//!
//! # Usage
//!
//! ```rust,ignore
//! use cosmos_hdfs::{HdfsBackend, HdfsConfig};
//! use cosmos_sink::{BackoffPolicy, IntakeLoop, MemoryChannel, SinkRunner};
//!
//! let channel = MemoryChannel::new(1000);
//! let backend = HdfsBackend::new(HdfsConfig::default())?;
//! let runner = SinkRunner::new(IntakeLoop::new(channel.clone(), backend), BackoffPolicy::default());
//! tokio::spawn(runner.run(shutdown_rx));
//! ```

mod channel;
mod error;
pub mod format;
mod memory;
mod runner;
mod scope;
mod sink;

pub use channel::{Channel, Transaction};
pub use error::{ChannelError, SinkError};
pub use format::{format_record, sanitize};
pub use memory::{MemoryChannel, MemoryTransaction, DEFAULT_CAPACITY};
pub use runner::{BackoffPolicy, SinkRunner};
pub use sink::{IntakeLoop, Status};
