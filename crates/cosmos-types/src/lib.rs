//! Shared types for the cosmos-injector workspace.
//!
//! This crate holds the canonical in-memory model of a context-broker
//! notification, the raw event shape that travels through the upstream
//! channel, and the derived storage record written to the historical log.
//!
//! Every other crate in the workspace depends on `cosmos-types` for these
//! definitions; it depends on nothing but `serde`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header carrying the payload's declared content type.
pub const CONTENT_TYPE_HEADER: &str = "content-type";

/// A batch of entity/attribute updates delivered as one raw event.
///
/// Produced fresh per raw event by the normalizer and discarded once the
/// owning transaction is committed or rolled back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Subscription that triggered the notification, when the payload names one.
    pub subscription_id: Option<String>,
    /// Broker that originated the notification, when the payload names one.
    pub originator: Option<String>,
    /// Context element updates in payload order.
    pub context_elements: Vec<ContextElementUpdate>,
}

impl Notification {
    /// Iterates every `(element, attribute)` pair in payload order.
    pub fn attribute_updates(
        &self,
    ) -> impl Iterator<Item = (&ContextElementUpdate, &AttributeUpdate)> {
        self.context_elements
            .iter()
            .flat_map(|element| element.attributes.iter().map(move |attr| (element, attr)))
    }

    /// Total number of attribute updates across all elements.
    pub fn attribute_count(&self) -> usize {
        self.context_elements
            .iter()
            .map(|element| element.attributes.len())
            .sum()
    }
}

/// Updates for a single entity, identified by `(entity_id, entity_type)`.
///
/// Uniqueness is not enforced within a notification; duplicates are
/// processed independently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextElementUpdate {
    pub entity_id: String,
    pub entity_type: String,
    pub attributes: Vec<AttributeUpdate>,
}

/// One named, typed value change. The value is opaque text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeUpdate {
    pub name: String,
    pub attr_type: String,
    pub value: String,
}

impl AttributeUpdate {
    pub fn new(
        name: impl Into<String>,
        attr_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            attr_type: attr_type.into(),
            value: value.into(),
        }
    }
}

/// A raw event as carried by the upstream channel: an opaque body plus
/// string headers.
///
/// Header names are stored lowercased so lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEvent {
    body: Vec<u8>,
    headers: BTreeMap<String, String>,
}

impl RawEvent {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Convenience constructor for an event tagged with a content type.
    pub fn with_content_type(body: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self::new(body).with_header(CONTENT_TYPE_HEADER, content_type)
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// The declared content-type tag, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE_HEADER)
    }
}

/// A derived `(key, line)` pair destined for the historical log.
///
/// `key` names the target file; `line` is one record without its trailing
/// newline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageRecord {
    pub key: String,
    pub line: String,
}
