//! Error types for notification normalization.

/// Errors that can occur while turning a raw payload into a `Notification`.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// The event carried no content-type tag at all.
    #[error("missing content-type header")]
    MissingContentType,

    /// The content-type tag names neither JSON nor XML.
    #[error("unrecognized content type (not JSON nor XML): {0}")]
    UnsupportedContentType(String),

    /// The payload bytes are not valid UTF-8.
    #[error("payload is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// The JSON payload is malformed or does not match the notification shape.
    #[error("invalid JSON notification: {0}")]
    Json(#[from] serde_json::Error),

    /// The XML payload is not well-formed.
    #[error("invalid XML notification: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The XML payload is well-formed but not a notification.
    #[error("malformed XML notification: {0}")]
    XmlStructure(String),
}
