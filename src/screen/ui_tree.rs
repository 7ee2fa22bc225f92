use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{PilotError, PilotResult};

/// One element of a UI hierarchy dump (`driver.page_source`).
///
/// Built once per parse pass and never mutated afterwards. Only element
/// nodes are kept; text and comment nodes are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UiTreeNode {
    /// Element type name, e.g. `android.widget.EditText`
    pub tag: String,

    /// Raw attributes (`resource-id`, `text`, `class`, `enabled`, `bounds`, ...)
    pub attributes: BTreeMap<String, String>,

    /// Child elements in document order
    pub children: Vec<UiTreeNode>,
}

impl UiTreeNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: UiTreeNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Parse an XML document into a tree rooted at its root element.
    ///
    /// Malformed markup fails as a whole; no partial tree is returned.
    pub fn parse(xml: &str) -> PilotResult<Self> {
        let doc =
            roxmltree::Document::parse(xml).map_err(|e| PilotError::TreeParse(e.to_string()))?;
        Ok(Self::from_element(doc.root_element()))
    }

    fn from_element(node: roxmltree::Node<'_, '_>) -> Self {
        Self {
            tag: node.tag_name().name().to_string(),
            attributes: node
                .attributes()
                .map(|a| (a.name().to_string(), a.value().to_string()))
                .collect(),
            children: node
                .children()
                .filter(|c| c.is_element())
                .map(Self::from_element)
                .collect(),
        }
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(UiTreeNode::node_count).sum::<usize>()
    }
}
