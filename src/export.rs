//! Read-only derived views of an investigation tree.
//!
//! The flat form is [`PortableTree`]. The hierarchical form nests children
//! under their parents for visualization; a leaf carries no `children` key
//! at all, which consumers rely on.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

use crate::error::AppResult;
use crate::tree::{InvestigationTree, MetadataValue, NodeStatus, NodeType, PortableTree};

/// Name carried by the empty-tree sentinel.
pub const EMPTY_TREE_NAME: &str = "Empty Tree";

/// One node of the hierarchical export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub description: String,
    pub status: NodeStatus,
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub metadata: BTreeMap<String, MetadataValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<HierarchyNode>,
}

/// Placeholder returned when there is nothing to draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmptyTree {
    pub name: String,
    pub children: Vec<HierarchyNode>,
}

impl Default for EmptyTree {
    fn default() -> Self {
        Self {
            name: EMPTY_TREE_NAME.to_string(),
            children: Vec::new(),
        }
    }
}

/// Hierarchical export: a rooted tree or the empty sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeView {
    Node(HierarchyNode),
    Empty(EmptyTree),
}

impl TreeView {
    /// Whether this is the empty-tree sentinel.
    pub fn is_empty(&self) -> bool {
        matches!(self, TreeView::Empty(_))
    }
}

/// Flat form of the tree.
pub fn portable(tree: &InvestigationTree) -> PortableTree {
    tree.to_portable_form()
}

/// Nest the tree under its root.
///
/// Returns the sentinel when the tree has no nodes or no resolvable root.
/// Nodes reachable twice through inconsistent loaded edges appear once.
pub fn hierarchy(tree: &InvestigationTree) -> TreeView {
    let root_id = match tree.root_id() {
        Some(id) if tree.contains(id) && !tree.is_empty() => id,
        _ => return TreeView::Empty(EmptyTree::default()),
    };

    let mut visited = HashSet::new();
    match build_node(tree, root_id, &mut visited) {
        Some(node) => TreeView::Node(node),
        None => TreeView::Empty(EmptyTree::default()),
    }
}

fn build_node<'a>(
    tree: &'a InvestigationTree,
    id: &'a str,
    visited: &mut HashSet<&'a str>,
) -> Option<HierarchyNode> {
    if !visited.insert(id) {
        debug!(node_id = %id, "Skipping already exported node");
        return None;
    }
    let node = tree.node(id)?;

    let children = tree
        .child_ids(id)
        .into_iter()
        .filter_map(|child| build_node(tree, child, visited))
        .collect();

    Some(HierarchyNode {
        id: node.id.clone(),
        title: node.title.clone(),
        node_type: node.node_type,
        description: node.description.clone(),
        status: node.status,
        confidence: node.confidence,
        evidence: node.evidence.clone(),
        metadata: node.metadata.clone(),
        children,
    })
}

/// Write `value` as pretty-printed JSON, creating parent directories.
pub(crate) fn write_json<T: Serialize>(value: &T, path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(value).map_err(crate::error::TreeError::from)?;
    std::fs::write(path, text)?;
    info!(path = %path.display(), "Wrote JSON export");
    Ok(())
}

/// Write the hierarchical export to `path`.
pub fn write_hierarchy(tree: &InvestigationTree, path: &Path) -> AppResult<TreeView> {
    let view = hierarchy(tree);
    write_json(&view, path)?;
    Ok(view)
}

/// Write the flat export to `path`.
pub fn write_portable(tree: &InvestigationTree, path: &Path) -> AppResult<()> {
    write_json(&tree.to_portable_form(), path)
}
