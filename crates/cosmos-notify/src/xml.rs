//! Tagged-markup (XML) notification parsing.
//!
//! Walks the DOM of an NGSI `notifyContextRequest` document:
//!
//! ```text
//! notifyContextRequest
//! ├── subscriptionId?
//! ├── originator?
//! └── contextResponseList
//!     └── contextElementResponse*
//!         └── contextElement
//!             ├── entityId[@type] / id
//!             └── contextAttributeList?
//!                 └── contextAttribute* (name, type?, contextValue?)
//! ```

use cosmos_types::{AttributeUpdate, ContextElementUpdate, Notification};
use roxmltree::{Document, Node};

use crate::error::NormalizeError;

const ROOT: &str = "notifyContextRequest";

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.has_tag_name(name))
}

fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.has_tag_name(name))
}

fn required<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
) -> Result<Node<'a, 'input>, NormalizeError> {
    child(node, name).ok_or_else(|| {
        NormalizeError::XmlStructure(format!(
            "<{}> is missing <{}>",
            node.tag_name().name(),
            name
        ))
    })
}

fn trimmed_text(node: Option<Node<'_, '_>>) -> String {
    node.and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

fn parse_element(node: Node<'_, '_>) -> Result<ContextElementUpdate, NormalizeError> {
    let entity = required(node, "entityId")?;
    let entity_type = entity.attribute("type").unwrap_or_default().trim().to_string();
    let entity_id = trimmed_text(Some(required(entity, "id")?));

    let mut attributes = Vec::new();
    if let Some(list) = child(node, "contextAttributeList") {
        for attr in children(list, "contextAttribute") {
            attributes.push(AttributeUpdate {
                name: trimmed_text(Some(required(attr, "name")?)),
                attr_type: trimmed_text(child(attr, "type")),
                // Values are opaque: no trimming.
                value: child(attr, "contextValue")
                    .and_then(|n| n.text())
                    .unwrap_or_default()
                    .to_string(),
            });
        }
    }

    Ok(ContextElementUpdate {
        entity_id,
        entity_type,
        attributes,
    })
}

pub(crate) fn parse(text: &str) -> Result<Notification, NormalizeError> {
    let doc = Document::parse(text)?;
    let root = doc.root_element();

    if !root.has_tag_name(ROOT) {
        return Err(NormalizeError::XmlStructure(format!(
            "unexpected root element <{}>, expected <{ROOT}>",
            root.tag_name().name()
        )));
    }

    let list = required(root, "contextResponseList")?;
    let mut context_elements = Vec::new();
    for response in children(list, "contextElementResponse") {
        context_elements.push(parse_element(required(response, "contextElement")?)?);
    }

    Ok(Notification {
        subscription_id: child(root, "subscriptionId").map(|n| trimmed_text(Some(n))),
        originator: child(root, "originator").map(|n| trimmed_text(Some(n))),
        context_elements,
    })
}
