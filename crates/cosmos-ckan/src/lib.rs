//! Read path from a CKAN open-data portal.
//!
//! [`CkanClient`] lists the packages of an organization and the resources
//! of a package, counts a resource's datastore records and fetches them
//! page by page. [`compute_splits`] cuts a resource into contiguous
//! [`InputSplit`]s so that each can be consumed independently through a
//! [`RecordReader`].

mod client;
mod error;
mod reader;
mod split;

pub use client::{CkanClient, PAGE_SIZE};
pub use error::CkanError;
pub use reader::RecordReader;
pub use split::{compute_splits, InputSplit};
