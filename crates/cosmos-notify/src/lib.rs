//! Notification normalization for cosmos-injector.
//!
//! Converts a raw context-broker payload into the canonical
//! [`Notification`](cosmos_types::Notification) model. The wire format is
//! chosen strictly from the content-type tag carried with the payload; the
//! body is never sniffed, and an unrecognized tag is a hard failure.
//!
//! | Tag contains | Parser |
//! |--------------|--------|
//! | `application/json` | serde tree walk (`json`) |
//! | `application/xml`, `text/xml` | DOM walk (`xml`) |
//!
//! Both parsers produce equal `Notification` values for logically
//! equivalent input.

mod error;
mod json;
mod xml;

pub use error::NormalizeError;

use cosmos_types::{Notification, RawEvent};

/// Declared wire format of a notification payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Json,
    Xml,
}

impl ContentType {
    /// Selects a format from a `Content-Type` header value.
    ///
    /// Parameters such as `; charset=utf-8` are tolerated.
    pub fn from_header(value: &str) -> Result<Self, NormalizeError> {
        let lowered = value.to_ascii_lowercase();
        if lowered.contains("application/json") {
            Ok(Self::Json)
        } else if lowered.contains("application/xml") || lowered.contains("text/xml") {
            Ok(Self::Xml)
        } else {
            Err(NormalizeError::UnsupportedContentType(value.to_string()))
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses `body` according to the declared `content_type` tag.
///
/// # Errors
///
/// Returns `NormalizeError::UnsupportedContentType` for an unknown tag,
/// `NormalizeError::Encoding` for non-UTF-8 bodies, and a JSON or XML
/// error when the body does not conform to the declared format.
pub fn normalize(body: &[u8], content_type: &str) -> Result<Notification, NormalizeError> {
    let format = ContentType::from_header(content_type)?;
    let text = std::str::from_utf8(body)?;

    let notification = match format {
        ContentType::Json => json::parse(text)?,
        ContentType::Xml => xml::parse(text)?,
    };

    tracing::debug!(
        format = %format,
        elements = notification.context_elements.len(),
        attributes = notification.attribute_count(),
        "normalized notification"
    );

    Ok(notification)
}

/// Normalizes a channel event using its `content-type` header.
///
/// # Errors
///
/// Returns `NormalizeError::MissingContentType` when the event carries no
/// tag, otherwise anything [`normalize`] returns.
pub fn normalize_event(event: &RawEvent) -> Result<Notification, NormalizeError> {
    let content_type = event
        .content_type()
        .ok_or(NormalizeError::MissingContentType)?;
    normalize(event.body(), content_type)
}
