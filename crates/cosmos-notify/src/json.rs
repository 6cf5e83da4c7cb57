//! Structured-text (JSON) notification parsing.
//!
//! The payload is deserialised into a mirror of the NGSI
//! `notifyContextRequest` document and then flattened into the canonical
//! model. Unknown fields (status codes, metadata) are ignored.

use cosmos_types::{AttributeUpdate, ContextElementUpdate, Notification};
use serde::Deserialize;
use serde_json::Value;

use crate::error::NormalizeError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotifyContextRequest {
    #[serde(default)]
    subscription_id: Option<String>,
    #[serde(default)]
    originator: Option<String>,
    context_responses: Vec<ContextElementResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContextElementResponse {
    context_element: ContextElement,
}

#[derive(Debug, Deserialize)]
struct ContextElement {
    id: String,
    #[serde(rename = "type", default)]
    entity_type: String,
    #[serde(default)]
    attributes: Vec<ContextAttribute>,
}

#[derive(Debug, Deserialize)]
struct ContextAttribute {
    name: String,
    #[serde(rename = "type", default)]
    attr_type: String,
    #[serde(default)]
    value: Value,
}

/// Identifiers lose surrounding whitespace, as in the XML parser.
fn identifier(text: String) -> String {
    let trimmed = text.trim();
    if trimmed.len() == text.len() {
        text
    } else {
        trimmed.to_string()
    }
}

/// Renders an attribute value as opaque text. Strings pass through
/// unchanged; any other JSON value keeps its compact JSON form.
fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub(crate) fn parse(text: &str) -> Result<Notification, NormalizeError> {
    let request: NotifyContextRequest = serde_json::from_str(text)?;

    let context_elements = request
        .context_responses
        .into_iter()
        .map(|response| {
            let element = response.context_element;
            ContextElementUpdate {
                entity_id: identifier(element.id),
                entity_type: identifier(element.entity_type),
                attributes: element
                    .attributes
                    .into_iter()
                    .map(|attr| AttributeUpdate {
                        name: identifier(attr.name),
                        attr_type: identifier(attr.attr_type),
                        value: value_text(attr.value),
                    })
                    .collect(),
            }
        })
        .collect();

    Ok(Notification {
        subscription_id: request.subscription_id,
        originator: request.originator,
        context_elements,
    })
}
