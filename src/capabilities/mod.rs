//! External capabilities consumed by the investigation engine.
//!
//! - [`HypothesisGenerator`]: proposes candidate child hypotheses
//! - [`VulnerabilitySearch`]: finds related vulnerability records by keyword
//! - [`TextGenerator`]: free-form completion used by the report
//!
//! The engine never retries these calls; resilience belongs to the
//! implementations (see [`crate::langbase::LangbaseClient`]).

mod langbase;

pub use langbase::{LangbaseHypothesisGenerator, LangbaseTextGenerator};

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::GenerationResult;
use crate::tree::{InvestigationTree, NodeType};

/// What the generator knows about the node being expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentContext {
    /// Parent node id.
    pub id: String,
    /// Parent title.
    pub title: String,
    /// Parent description.
    pub description: String,
    /// Parent classification.
    pub node_type: NodeType,
    /// Titles from the root down to the parent, inclusive.
    pub path: Vec<String>,
}

impl ParentContext {
    /// Build the context for `parent_id`, or `None` if the node is unknown.
    pub fn from_tree(tree: &InvestigationTree, parent_id: &str) -> Option<Self> {
        let parent = tree.node(parent_id)?;
        let mut path: Vec<String> = tree
            .get_path_to_root(parent_id)
            .into_iter()
            .map(|n| n.title)
            .collect();
        if path.is_empty() {
            path.push(parent.title.clone());
        }

        Some(Self {
            id: parent.id.clone(),
            title: parent.title.clone(),
            description: parent.description.clone(),
            node_type: parent.node_type,
            path,
        })
    }
}

/// A related vulnerability, flattened for prompt grounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedRecord {
    /// Record identifier (e.g. a CVE id).
    pub id: String,
    /// English description.
    pub description: String,
}

/// One hypothesis proposed by a generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisCandidate {
    pub title: String,
    pub description: String,
    #[serde(rename = "type", deserialize_with = "lenient_node_type")]
    pub node_type: NodeType,
    pub confidence: f64,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default, alias = "rationale")]
    pub reasoning: String,
}

fn lenient_node_type<'de, D>(deserializer: D) -> Result<NodeType, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

/// Size and sampling limits for a text completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionLimits {
    pub max_tokens: u32,
    pub temperature: f64,
}

impl CompletionLimits {
    /// Limits for the narrative summary.
    pub const SUMMARY: CompletionLimits = CompletionLimits {
        max_tokens: 1000,
        temperature: 0.7,
    };

    /// Limits for the recommendation list.
    pub const RECOMMENDATIONS: CompletionLimits = CompletionLimits {
        max_tokens: 500,
        temperature: 0.7,
    };
}

/// Proposes child hypotheses for a parent node.
#[async_trait]
pub trait HypothesisGenerator: Send + Sync {
    /// Return up to `fan_out` candidates, or fail with a `GenerationError`.
    async fn generate(
        &self,
        parent: &ParentContext,
        related: &[RelatedRecord],
        fan_out: usize,
    ) -> GenerationResult<Vec<HypothesisCandidate>>;
}

/// Keyword search over a vulnerability database.
#[async_trait]
pub trait VulnerabilitySearch: Send + Sync {
    /// Return at most `max_results` records. Never fails: errors yield an empty list.
    async fn search_by_keywords(&self, keywords: &[String], max_results: usize) -> Vec<RelatedRecord>;
}

/// Free-form text completion.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete `prompt` within `limits`.
    async fn complete(&self, prompt: &str, limits: CompletionLimits) -> GenerationResult<String>;
}
