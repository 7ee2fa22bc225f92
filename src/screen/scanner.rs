use tracing::{debug, warn};

use crate::error::PilotResult;
use crate::screen::matcher::{MatchCandidate, OwnedCandidate, STRATEGIES};
use crate::screen::ui_tree::UiTreeNode;

// ============================================================================
// Traversal
// ============================================================================

/// Run every strategy over every node, depth-first pre-order.
///
/// Results are in discovery order; a node matched by several strategies
/// appears once per strategy.
pub fn scan(root: &UiTreeNode) -> Vec<MatchCandidate<'_>> {
    let mut results = Vec::new();
    visit(root, "", &mut results);
    results
}

fn visit<'a>(node: &'a UiTreeNode, parent_path: &str, out: &mut Vec<MatchCandidate<'a>>) {
    let path = node_path(parent_path, node);

    for strategy in STRATEGIES {
        if let Some(found) = strategy(node, &path) {
            out.push(found);
        }
    }

    for child in &node.children {
        visit(child, &path, out);
    }
}

/// `parent/tag` with `[bounds]` appended when the node carries bounds.
pub fn node_path(parent_path: &str, node: &UiTreeNode) -> String {
    let mut path = format!("{}/{}", parent_path, node.tag);
    if let Some(bounds) = node.attr("bounds") {
        path.push('[');
        path.push_str(bounds);
        path.push(']');
    }
    path
}

// ============================================================================
// Ranking
// ============================================================================

/// Resource-id matches first. The sort is stable, so discovery order is kept
/// inside each group.
pub fn rank(mut candidates: Vec<MatchCandidate<'_>>) -> Vec<MatchCandidate<'_>> {
    candidates.sort_by_key(|c| !c.is_resource_match);
    candidates
}

// ============================================================================
// Document entry points
// ============================================================================

/// Parse, scan and rank a UI tree document.
pub fn scan_document(xml: &str) -> PilotResult<Vec<OwnedCandidate>> {
    let root = UiTreeNode::parse(xml)?;
    let ranked = rank(scan(&root));

    debug!(
        nodes = root.node_count(),
        candidates = ranked.len(),
        resource_matches = ranked.iter().filter(|c| c.is_resource_match).count(),
        "UI tree scanned"
    );

    Ok(ranked.into_iter().map(MatchCandidate::into_owned).collect())
}

/// Like [`scan_document`], but a malformed document yields an empty list.
pub fn identify_search_surfaces(xml: &str) -> Vec<OwnedCandidate> {
    match scan_document(xml) {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(error = %e, "error parsing UI tree document");
            Vec::new()
        }
    }
}
