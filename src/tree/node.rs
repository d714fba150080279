//! Hypothesis node model: status and type enums, metadata values and updates.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;
use uuid::Uuid;

use crate::error::{TreeError, TreeResult};

/// Field names owned by the node schema. Extra attributes never use these.
pub const SCHEMA_FIELDS: [&str; 9] = [
    "id",
    "parent_id",
    "type",
    "title",
    "description",
    "status",
    "confidence",
    "evidence",
    "metadata",
];

/// Analyst verdict on a hypothesis.
///
/// Any state may move to any other state; only expansion looks at it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Initial state of every generated node.
    #[default]
    Unverified,
    /// Tentatively accepted by the analyst.
    Plausible,
    /// Rejected by the analyst.
    Implausible,
    /// Backed by evidence.
    Confirmed,
}

impl NodeStatus {
    /// All statuses, in declaration order.
    pub const ALL: [NodeStatus; 4] = [
        NodeStatus::Unverified,
        NodeStatus::Plausible,
        NodeStatus::Implausible,
        NodeStatus::Confirmed,
    ];

    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Unverified => "unverified",
            NodeStatus::Plausible => "plausible",
            NodeStatus::Implausible => "implausible",
            NodeStatus::Confirmed => "confirmed",
        }
    }

    /// Whether a node in this state may be expanded without promotion.
    pub fn is_expandable(&self) -> bool {
        matches!(self, NodeStatus::Plausible | NodeStatus::Confirmed)
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unverified" => Ok(NodeStatus::Unverified),
            "plausible" => Ok(NodeStatus::Plausible),
            "implausible" => Ok(NodeStatus::Implausible),
            "confirmed" => Ok(NodeStatus::Confirmed),
            _ => Err(format!(
                "Invalid status: {}. Valid values are: unverified, plausible, implausible, confirmed",
                s
            )),
        }
    }
}

/// Informational classification of a hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// The initial breach description.
    Root,
    /// A vulnerability that was exploited.
    Vulnerability,
    /// The method used to exploit it.
    AttackVector,
    /// Consequence of the breach.
    Impact,
    /// A potential countermeasure.
    Mitigation,
}

impl NodeType {
    /// Get the type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Root => "root",
            NodeType::Vulnerability => "vulnerability",
            NodeType::AttackVector => "attack_vector",
            NodeType::Impact => "impact",
            NodeType::Mitigation => "mitigation",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NodeType {
    type Err = String;

    /// Accepts `attack_vector`, `attack-vector` and `Attack Vector` alike.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "root" => Ok(NodeType::Root),
            "vulnerability" => Ok(NodeType::Vulnerability),
            "attack_vector" => Ok(NodeType::AttackVector),
            "impact" => Ok(NodeType::Impact),
            "mitigation" => Ok(NodeType::Mitigation),
            _ => Err(format!("Unknown node type: {}", s)),
        }
    }
}

/// Scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

/// One hypothesis in the investigation tree.
///
/// `id` and `parent_id` are fixed at creation. Everything else may be
/// rewritten through [`NodeUpdate`]. Attributes outside the schema live in
/// `extra` and serialize flat next to the schema fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier.
    pub id: String,
    /// Parent node; `None` only for the root.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Hypothesis classification.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Short title.
    pub title: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Analyst verdict.
    #[serde(default)]
    pub status: NodeStatus,
    /// Strength of belief (0.0-1.0).
    #[serde(default)]
    pub confidence: f64,
    /// Supporting facts, in insertion order.
    #[serde(default)]
    pub evidence: Vec<String>,
    /// Open scalar metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, MetadataValue>,
    /// Ad-hoc attributes written through updates.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    /// Create a new unverified node with a fresh id.
    pub fn new(node_type: NodeType, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            parent_id: None,
            node_type,
            title: title.into(),
            description: description.into(),
            status: NodeStatus::Unverified,
            confidence: 0.0,
            evidence: Vec::new(),
            metadata: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    /// Set the parent node.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Set the confidence (clamped to 0.0-1.0, NaN becomes 0.0).
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = bounded_confidence(confidence);
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the evidence list.
    pub fn with_evidence(mut self, evidence: Vec<String>) -> Self {
        self.evidence = evidence;
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Whether this node is parentless.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Merge an update into this node.
    pub fn apply(&mut self, update: NodeUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(confidence) = update.confidence {
            self.confidence = confidence;
        }
        if let Some(evidence) = update.evidence {
            self.evidence = evidence;
        }
        if let Some(metadata) = update.metadata {
            self.metadata = metadata;
        }
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(node_type) = update.node_type {
            self.node_type = node_type;
        }
        for (key, value) in update.extra {
            if SCHEMA_FIELDS.contains(&key.as_str()) {
                warn!(node_id = %self.id, field = %key, "Ignoring extra attribute shadowing a schema field");
                continue;
            }
            self.extra.insert(key, value);
        }
    }
}

/// Field updates merged into a stored node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeUpdate {
    pub status: Option<NodeStatus>,
    pub confidence: Option<f64>,
    pub evidence: Option<Vec<String>>,
    pub metadata: Option<BTreeMap<String, MetadataValue>>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub node_type: Option<NodeType>,
    /// Attributes outside the schema, stored without validation.
    pub extra: Map<String, Value>,
}

impl NodeUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status.
    pub fn status(mut self, status: NodeStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the confidence (clamped to 0.0-1.0, NaN becomes 0.0).
    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(bounded_confidence(confidence));
        self
    }

    /// Replace the evidence list.
    pub fn evidence(mut self, evidence: Vec<String>) -> Self {
        self.evidence = Some(evidence);
        self
    }

    /// Replace the metadata map.
    pub fn metadata(mut self, metadata: BTreeMap<String, MetadataValue>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set an arbitrary attribute outside the schema.
    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Parse a raw field map.
    ///
    /// Schema keys are converted to their typed field; any other key is kept
    /// as an extra attribute. `id` and `parent_id` cannot be rewritten.
    pub fn from_fields(fields: Map<String, Value>) -> TreeResult<Self> {
        let mut update = NodeUpdate::new();

        for (key, value) in fields {
            match key.as_str() {
                "id" | "parent_id" => {
                    return Err(invalid(&key, "identity fields cannot be updated"));
                }
                "status" => {
                    let raw = value
                        .as_str()
                        .ok_or_else(|| invalid(&key, "expected a string"))?;
                    update.status = Some(raw.parse().map_err(|e: String| invalid(&key, &e))?);
                }
                "type" => {
                    let raw = value
                        .as_str()
                        .ok_or_else(|| invalid(&key, "expected a string"))?;
                    update.node_type = Some(raw.parse().map_err(|e: String| invalid(&key, &e))?);
                }
                "confidence" => {
                    let confidence = value
                        .as_f64()
                        .ok_or_else(|| invalid(&key, "expected a number"))?;
                    if !(0.0..=1.0).contains(&confidence) {
                        return Err(invalid(&key, "must be between 0.0 and 1.0"));
                    }
                    update.confidence = Some(confidence);
                }
                "title" | "description" => {
                    let text = value
                        .as_str()
                        .ok_or_else(|| invalid(&key, "expected a string"))?
                        .to_string();
                    if key == "title" {
                        update.title = Some(text);
                    } else {
                        update.description = Some(text);
                    }
                }
                "evidence" => {
                    let items: Vec<String> = serde_json::from_value(value)
                        .map_err(|e| invalid(&key, &e.to_string()))?;
                    update.evidence = Some(items);
                }
                "metadata" => {
                    let metadata: BTreeMap<String, MetadataValue> = serde_json::from_value(value)
                        .map_err(|e| invalid(&key, &e.to_string()))?;
                    update.metadata = Some(metadata);
                }
                _ => {
                    update.extra.insert(key, value);
                }
            }
        }

        Ok(update)
    }
}

/// NaN would serialize as `null` and break reloading.
fn bounded_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

fn invalid(field: &str, reason: &str) -> TreeError {
    TreeError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
