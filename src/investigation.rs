//! Investigation sessions.
//!
//! An [`Investigation`] owns one tree. Mutating operations take `&mut`, so a
//! session shared between tasks must sit behind a `tokio::sync::Mutex`.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::capabilities::{HypothesisGenerator, TextGenerator, VulnerabilitySearch};
use crate::config::Config;
use crate::error::GenerationResult;
use crate::expansion::ExpansionPipeline;
use crate::export::{self, TreeView};
use crate::report::{InvestigationReport, ReportAssembler};
use crate::tree::{InvestigationTree, Node, NodeStatus, NodeType, PortableTree};

/// Title of every root node.
pub const ROOT_TITLE: &str = "Initial Breach";
/// Confidence assigned to the root node.
pub const ROOT_CONFIDENCE: f64 = 0.8;

const NAME_PREFIX_CHARS: usize = 50;

/// One investigation and its tree.
#[derive(Debug, Clone)]
pub struct Investigation {
    pub id: String,
    pub tree: InvestigationTree,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Investigation {
    /// Start a tree for `breach_info` with an unverified root.
    pub fn create(breach_info: &str) -> Self {
        let prefix: String = breach_info.chars().take(NAME_PREFIX_CHARS).collect();
        let mut tree = InvestigationTree::new(format!("Investigation: {}...", prefix));

        let root = Node::new(NodeType::Root, ROOT_TITLE, breach_info).with_confidence(ROOT_CONFIDENCE);
        // An empty tree always accepts its first parentless node.
        let _ = tree.add_node(root);

        Self::from_tree(tree)
    }

    /// Wrap an existing tree in a new investigation.
    pub fn from_tree(tree: InvestigationTree) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            tree,
            created_at: now,
            updated_at: now,
        }
    }

    /// Root node id.
    pub fn root_id(&self) -> Option<&str> {
        self.tree.root_id()
    }

    /// Set a node's status. False if the node is unknown.
    pub fn update_node_status(&mut self, node_id: &str, status: NodeStatus) -> bool {
        let updated = self.tree.set_status(node_id, status);
        if updated {
            self.touch();
            info!(investigation_id = %self.id, node_id = %node_id, status = %status, "Node status updated");
        }
        updated
    }

    /// Hierarchical view of the tree.
    pub fn hierarchy(&self) -> TreeView {
        export::hierarchy(&self.tree)
    }

    /// Flat view of the tree.
    pub fn portable(&self) -> PortableTree {
        self.tree.to_portable_form()
    }

    /// Bump `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Wires the expansion pipeline and report assembler to investigations.
#[derive(Clone)]
pub struct InvestigationService {
    pipeline: ExpansionPipeline,
    reports: ReportAssembler,
    default_fan_out: usize,
}

impl InvestigationService {
    /// Create a new service from an assembled pipeline and report writer.
    pub fn new(pipeline: ExpansionPipeline, reports: ReportAssembler, default_fan_out: usize) -> Self {
        Self {
            pipeline,
            reports,
            default_fan_out,
        }
    }

    /// Build a service from capability implementations and configuration.
    pub fn from_capabilities(
        generator: Arc<dyn HypothesisGenerator>,
        search: Arc<dyn VulnerabilitySearch>,
        text: Arc<dyn TextGenerator>,
        config: &Config,
    ) -> Self {
        Self::new(
            ExpansionPipeline::new(generator, search, config),
            ReportAssembler::new(text),
            config.investigation.fan_out,
        )
    }

    /// Fan-out used when a caller does not specify one.
    pub fn default_fan_out(&self) -> usize {
        self.default_fan_out
    }

    /// Create an investigation and expand its root.
    pub async fn start(
        &self,
        breach_info: &str,
        fan_out: Option<usize>,
        enrich: bool,
    ) -> GenerationResult<Investigation> {
        let mut investigation = Investigation::create(breach_info);
        let root_id = investigation.root_id().unwrap_or_default().to_string();

        let created = self
            .expand(&mut investigation, &root_id, fan_out, enrich)
            .await?;

        info!(
            investigation_id = %investigation.id,
            name = %investigation.tree.name(),
            initial_nodes = created.len(),
            "Investigation started"
        );
        Ok(investigation)
    }

    /// Expand `parent_id` within `investigation`.
    pub async fn expand(
        &self,
        investigation: &mut Investigation,
        parent_id: &str,
        fan_out: Option<usize>,
        enrich: bool,
    ) -> GenerationResult<Vec<String>> {
        let fan_out = fan_out.unwrap_or(self.default_fan_out);
        let result = self
            .pipeline
            .generate_next_level(&mut investigation.tree, parent_id, fan_out, enrich)
            .await;
        // Promotion may have happened even if generation failed.
        investigation.touch();
        result
    }

    /// Assemble the report for `investigation`.
    pub async fn report(&self, investigation: &Investigation) -> InvestigationReport {
        self.reports.assemble(&investigation.tree).await
    }
}
