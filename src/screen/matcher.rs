use std::collections::BTreeMap;

use serde::Serialize;

use crate::screen::ui_tree::UiTreeNode;

pub const SEARCH_KEYWORD: &str = "search";

/// A node flagged by one matcher as a possible search control.
///
/// Borrows the node's attributes, so it lives no longer than the tree it was
/// scanned from. Use [`MatchCandidate::into_owned`] to keep it past the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchCandidate<'a> {
    pub element: &'a str,
    pub attributes: &'a BTreeMap<String, String>,
    pub path: String,
    pub is_resource_match: bool,
}

impl MatchCandidate<'_> {
    pub fn resource_id(&self) -> Option<&str> {
        self.attributes.get("resource-id").map(String::as_str)
    }

    pub fn into_owned(self) -> OwnedCandidate {
        OwnedCandidate {
            element: self.element.to_string(),
            attributes: self.attributes.clone(),
            path: self.path,
            is_resource_match: self.is_resource_match,
        }
    }
}

/// Detached copy of a [`MatchCandidate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnedCandidate {
    pub element: String,
    pub attributes: BTreeMap<String, String>,
    pub path: String,
    pub is_resource_match: bool,
}

impl OwnedCandidate {
    pub fn resource_id(&self) -> Option<&str> {
        self.attributes.get("resource-id").map(String::as_str)
    }
}

/// Signature shared by every identification strategy.
pub type Matcher = for<'a> fn(&'a UiTreeNode, &str) -> Option<MatchCandidate<'a>>;

/// Strategies in the order they are tried on each node.
pub const STRATEGIES: [Matcher; 3] = [match_resource_id, match_text, match_class_name];

/// `enabled="true"` (any case). A missing attribute counts as disabled.
pub fn is_enabled(node: &UiTreeNode) -> bool {
    node.attr("enabled")
        .is_some_and(|v| v.to_lowercase() == "true")
}

fn contains_keyword(node: &UiTreeNode, key: &str) -> bool {
    node.attr(key)
        .is_some_and(|v| v.to_lowercase().contains(SEARCH_KEYWORD))
}

fn candidate<'a>(node: &'a UiTreeNode, path: &str, is_resource_match: bool) -> MatchCandidate<'a> {
    MatchCandidate {
        element: &node.tag,
        attributes: &node.attributes,
        path: path.to_string(),
        is_resource_match,
    }
}

pub fn match_resource_id<'a>(node: &'a UiTreeNode, path: &str) -> Option<MatchCandidate<'a>> {
    (contains_keyword(node, "resource-id") && is_enabled(node)).then(|| candidate(node, path, true))
}

pub fn match_text<'a>(node: &'a UiTreeNode, path: &str) -> Option<MatchCandidate<'a>> {
    (contains_keyword(node, "text") && is_enabled(node)).then(|| candidate(node, path, false))
}

pub fn match_class_name<'a>(node: &'a UiTreeNode, path: &str) -> Option<MatchCandidate<'a>> {
    (contains_keyword(node, "class") && is_enabled(node)).then(|| candidate(node, path, false))
}
