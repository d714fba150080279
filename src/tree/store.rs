//! Tree Store: node table, parent→children adjacency and the portable form.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

use super::node::{Node, NodeStatus, NodeType, NodeUpdate};
use crate::error::{TreeError, TreeResult};

/// Name used when a tree is created or loaded without one.
pub const DEFAULT_TREE_NAME: &str = "Investigation Tree";

fn default_tree_name() -> String {
    DEFAULT_TREE_NAME.to_string()
}

/// Structural parent→child edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Parent node id.
    pub source: String,
    /// Child node id.
    pub target: String,
}

impl Edge {
    /// Create an edge from `source` to `target`.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Flat, JSON-serializable form of a tree used for persistence.
///
/// Edges are stored independently of `parent_id` so historical data where
/// the two disagree survives a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortableTree {
    #[serde(default = "default_tree_name")]
    pub name: String,
    #[serde(default)]
    pub root_id: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// Hypothesis tree for one investigation.
///
/// Nodes are kept in insertion order. The first parentless node inserted
/// into an empty tree becomes the root and stays the root. Nodes are never
/// removed or reparented.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "PortableTree", into = "PortableTree")]
pub struct InvestigationTree {
    name: String,
    root_id: Option<String>,
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
    children: HashMap<String, Vec<String>>,
}

impl Default for InvestigationTree {
    fn default() -> Self {
        Self::new(DEFAULT_TREE_NAME)
    }
}

impl InvestigationTree {
    /// Create an empty tree.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root_id: None,
            nodes: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            children: HashMap::new(),
        }
    }

    /// Tree name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root node id, if a root has been designated.
    pub fn root_id(&self) -> Option<&str> {
        self.root_id.as_deref()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether a node with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Insert a node and wire its parent edge.
    ///
    /// A `parent_id` that does not resolve is tolerated: the node is stored
    /// without an edge and a warning is logged. Duplicate ids and a second
    /// parentless node are rejected and leave the tree unchanged.
    pub fn add_node(&mut self, node: Node) -> TreeResult<String> {
        if self.contains(&node.id) {
            return Err(TreeError::DuplicateNode { node_id: node.id });
        }

        let id = node.id.clone();
        let mut edge = None;

        match &node.parent_id {
            Some(parent_id) if self.contains(parent_id) => {
                edge = Some(Edge::new(parent_id.clone(), id.clone()));
            }
            Some(parent_id) => {
                warn!(node_id = %id, parent_id = %parent_id, "Parent node not found; storing node without edge");
            }
            None => {
                if let Some(root_id) = &self.root_id {
                    return Err(TreeError::DuplicateRoot {
                        root_id: root_id.clone(),
                        node_id: id,
                    });
                }
                debug!(node_id = %id, "Designating root node");
                self.root_id = Some(id.clone());
            }
        }

        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(node);
        if let Some(edge) = edge {
            self.insert_edge(edge);
        }

        Ok(id)
    }

    fn insert_edge(&mut self, edge: Edge) {
        let targets = self.children.entry(edge.source.clone()).or_default();
        if targets.contains(&edge.target) {
            return;
        }
        targets.push(edge.target.clone());
        self.edges.push(edge);
    }

    /// Borrow a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Copy of a node's current field set.
    pub fn get_node(&self, id: &str) -> Option<Node> {
        self.node(id).cloned()
    }

    /// Merge field updates into a node. Returns `false` for an unknown id.
    pub fn update_node(&mut self, id: &str, update: NodeUpdate) -> bool {
        match self.index.get(id) {
            Some(&i) => {
                self.nodes[i].apply(update);
                true
            }
            None => false,
        }
    }

    /// Set a node's status. Returns `false` for an unknown id.
    pub fn set_status(&mut self, id: &str, status: NodeStatus) -> bool {
        self.update_node(id, NodeUpdate::new().status(status))
    }

    /// Append one evidence item. Returns `false` for an unknown id.
    pub fn append_evidence(&mut self, id: &str, item: impl Into<String>) -> bool {
        match self.index.get(id) {
            Some(&i) => {
                self.nodes[i].evidence.push(item.into());
                true
            }
            None => false,
        }
    }

    /// Ids of direct children, in insertion order, that exist in the tree.
    pub fn child_ids(&self, id: &str) -> Vec<&str> {
        self.children
            .get(id)
            .map(|targets| {
                targets
                    .iter()
                    .filter(|t| self.contains(t))
                    .map(String::as_str)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Direct children, in insertion order.
    pub fn get_children(&self, id: &str) -> Vec<Node> {
        self.child_ids(id)
            .into_iter()
            .filter_map(|child| self.get_node(child))
            .collect()
    }

    /// Nodes from the root down to `id`, inclusive.
    ///
    /// Empty when there is no root, the id is unknown, or no path exists.
    pub fn get_path_to_root(&self, id: &str) -> Vec<Node> {
        let root_id = match &self.root_id {
            Some(root_id) if self.contains(root_id) => root_id.as_str(),
            _ => return Vec::new(),
        };
        if !self.contains(id) {
            return Vec::new();
        }

        // Breadth-first from the root so loaded data with extra edges still
        // yields the shortest path and cycles terminate.
        let mut predecessor: HashMap<&str, &str> = HashMap::new();
        let mut visited: HashSet<&str> = HashSet::from([root_id]);
        let mut queue = VecDeque::from([root_id]);

        while let Some(current) = queue.pop_front() {
            if current == id {
                let mut path = vec![current];
                let mut cursor = current;
                while let Some(&prev) = predecessor.get(cursor) {
                    path.push(prev);
                    cursor = prev;
                }
                path.reverse();
                return path.into_iter().filter_map(|n| self.get_node(n)).collect();
            }
            for child in self.child_ids(current) {
                if visited.insert(child) {
                    predecessor.insert(child, current);
                    queue.push_back(child);
                }
            }
        }

        Vec::new()
    }

    /// Iterate nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Copies of all nodes, in insertion order.
    pub fn get_all_nodes(&self) -> Vec<Node> {
        self.nodes.clone()
    }

    /// Nodes with the given status.
    pub fn get_nodes_by_status(&self, status: NodeStatus) -> Vec<Node> {
        self.nodes
            .iter()
            .filter(|n| n.status == status)
            .cloned()
            .collect()
    }

    /// Nodes with the given type.
    pub fn get_nodes_by_type(&self, node_type: NodeType) -> Vec<Node> {
        self.nodes
            .iter()
            .filter(|n| n.node_type == node_type)
            .cloned()
            .collect()
    }

    /// Structural edges, in insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Flat `{name, root_id, nodes, edges}` form.
    pub fn to_portable_form(&self) -> PortableTree {
        PortableTree {
            name: self.name.clone(),
            root_id: self.root_id.clone(),
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    /// Rebuild a tree from its flat form.
    ///
    /// Node field sets, `root_id` and the edge list are restored exactly as
    /// given; edges are not re-derived from `parent_id`. A repeated node id
    /// keeps the last field set at the first position.
    pub fn from_portable_form(data: PortableTree) -> Self {
        let mut tree = InvestigationTree::new(data.name);
        tree.root_id = data.root_id;

        for node in data.nodes {
            match tree.index.get(&node.id) {
                Some(&i) => {
                    warn!(node_id = %node.id, "Duplicate node in portable form; keeping last");
                    tree.nodes[i] = node;
                }
                None => {
                    tree.index.insert(node.id.clone(), tree.nodes.len());
                    tree.nodes.push(node);
                }
            }
        }

        for edge in data.edges {
            tree.insert_edge(edge);
        }

        tree
    }

    /// Serialize the portable form to a JSON string.
    pub fn to_json(&self) -> TreeResult<String> {
        Ok(serde_json::to_string(&self.to_portable_form())?)
    }

    /// Parse a tree from a portable-form JSON string.
    pub fn from_json(json: &str) -> TreeResult<Self> {
        let data: PortableTree = serde_json::from_str(json)?;
        Ok(Self::from_portable_form(data))
    }
}

impl From<PortableTree> for InvestigationTree {
    fn from(data: PortableTree) -> Self {
        InvestigationTree::from_portable_form(data)
    }
}

impl From<InvestigationTree> for PortableTree {
    fn from(tree: InvestigationTree) -> Self {
        PortableTree {
            name: tree.name,
            root_id: tree.root_id,
            nodes: tree.nodes,
            edges: tree.edges,
        }
    }
}
