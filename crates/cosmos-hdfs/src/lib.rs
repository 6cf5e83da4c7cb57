//! Storage backends for the cosmos-injector historical log.
//!
//! The sink writes through the [`StorageBackend`] capability set. The one
//! production implementation, [`HdfsBackend`], talks to an HDFS cluster over
//! its REST API in either of two flavours:
//!
//! | Flavour | Typical port | Data writes |
//! |---------|--------------|-------------|
//! | HttpFS  | 14000 | single request with `data=true` |
//! | WebHDFS | 50070 | name node answers `307`, data goes to the `Location` |
//!
//! Every operation is a remote call; failures surface as [`BackendError`]
//! and are never dropped silently.

mod backend;
mod client;
mod config;
mod error;

pub use backend::StorageBackend;
pub use client::HdfsBackend;
pub use config::{HdfsApi, HdfsConfig, ParseHdfsApiError};
pub use error::BackendError;
