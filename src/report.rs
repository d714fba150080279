//! Report assembly.
//!
//! Findings are the plausible and confirmed nodes ranked by confidence. The
//! summary and recommendations come from a [`TextGenerator`]; each has a
//! local fallback so assembling a report never fails.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::capabilities::{CompletionLimits, TextGenerator};
use crate::error::AppResult;
use crate::export::{self, TreeView};
use crate::prompts::{recommendations_prompt, summary_prompt};
use crate::tree::{InvestigationTree, Node, NodeStatus, NodeType};

/// Summary used when the tree has no root.
pub const NO_DATA_SUMMARY: &str = "No investigation data available.";
/// Recommendations used when the tree has no root.
pub const NO_DATA_RECOMMENDATIONS: &[&str] = &["No recommendations available."];
/// Recommendations used when generation fails or yields nothing usable.
pub const FALLBACK_RECOMMENDATIONS: &[&str] = &[
    "Implement security patches for identified vulnerabilities.",
    "Review and strengthen access controls.",
    "Enhance monitoring for suspicious activities.",
];

const TOP_FINDINGS: usize = 5;
const MAX_RECOMMENDATIONS: usize = 5;
const SUMMARY_DESCRIPTION_CHARS: usize = 100;

/// A node surfaced in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub status: NodeStatus,
}

impl From<&Node> for Finding {
    fn from(node: &Node) -> Self {
        Self {
            title: node.title.clone(),
            description: node.description.clone(),
            node_type: node.node_type,
            confidence: node.confidence,
            evidence: node.evidence.clone(),
            status: node.status,
        }
    }
}

/// Final investigation report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationReport {
    pub title: String,
    pub summary: String,
    pub findings: Vec<Finding>,
    pub recommendations: Vec<String>,
    pub graph_data: TreeView,
    /// RFC 3339 UTC, millisecond precision.
    pub timestamp: String,
}

/// Plausible and confirmed nodes, highest confidence first.
///
/// Ties keep tree order, plausible nodes before confirmed ones.
pub fn ranked_findings(tree: &InvestigationTree) -> Vec<Finding> {
    let mut nodes = tree.get_nodes_by_status(NodeStatus::Plausible);
    nodes.extend(tree.get_nodes_by_status(NodeStatus::Confirmed));
    nodes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    nodes.iter().map(Finding::from).collect()
}

/// Parse bullet or numbered lines, stripping list markers.
pub fn parse_recommendations(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter_map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .take(MAX_RECOMMENDATIONS)
        .map(str::to_string)
        .collect()
}

/// A bullet marker must be followed by whitespace, so `**bold**` lines are not bullets.
fn strip_list_marker(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix(['-', '*', '•']) {
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            return Some(rest.trim());
        }
        return None;
    }
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(['.', ')']) {
            return Some(rest.trim());
        }
    }
    None
}

/// Fallback one-line summary from local counts.
pub fn fallback_summary(breach_description: &str, confirmed: usize, plausible: usize) -> String {
    let truncated: String = breach_description
        .chars()
        .take(SUMMARY_DESCRIPTION_CHARS)
        .collect();
    format!(
        "Investigation of {}... found {} confirmed and {} plausible findings.",
        truncated, confirmed, plausible
    )
}

fn title_and_description(nodes: &[Node]) -> Vec<(String, String)> {
    nodes
        .iter()
        .map(|n| (n.title.clone(), n.description.clone()))
        .collect()
}

/// Builds reports using a text generator for the narrative parts.
#[derive(Clone)]
pub struct ReportAssembler {
    text: Arc<dyn TextGenerator>,
}

impl ReportAssembler {
    /// Create a new assembler that writes prose with `text`.
    pub fn new(text: Arc<dyn TextGenerator>) -> Self {
        Self { text }
    }

    /// Assemble the report. Never fails.
    pub async fn assemble(&self, tree: &InvestigationTree) -> InvestigationReport {
        let findings = ranked_findings(tree);

        let (summary, recommendations) =
            tokio::join!(self.summary(tree), self.recommendations(tree, &findings));

        info!(
            tree = %tree.name(),
            findings = findings.len(),
            recommendations = recommendations.len(),
            "Report assembled"
        );

        InvestigationReport {
            title: format!("Investigation Report: {}", tree.name()),
            summary,
            findings,
            recommendations,
            graph_data: export::hierarchy(tree),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    async fn summary(&self, tree: &InvestigationTree) -> String {
        let Some(root) = tree.root_id().and_then(|id| tree.node(id)) else {
            return NO_DATA_SUMMARY.to_string();
        };

        let confirmed = tree.get_nodes_by_status(NodeStatus::Confirmed);
        let plausible = tree.get_nodes_by_status(NodeStatus::Plausible);
        let prompt = summary_prompt(
            &root.description,
            &title_and_description(&confirmed),
            &title_and_description(&plausible),
        );

        match self.text.complete(&prompt, CompletionLimits::SUMMARY).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!("Summary generation returned empty text; using fallback");
                fallback_summary(&root.description, confirmed.len(), plausible.len())
            }
            Err(e) => {
                warn!(error = %e, "Summary generation failed; using fallback");
                fallback_summary(&root.description, confirmed.len(), plausible.len())
            }
        }
    }

    async fn recommendations(&self, tree: &InvestigationTree, findings: &[Finding]) -> Vec<String> {
        if tree.root_id().and_then(|id| tree.node(id)).is_none() {
            return to_strings(NO_DATA_RECOMMENDATIONS);
        }

        let top: Vec<(String, String)> = findings
            .iter()
            .take(TOP_FINDINGS)
            .map(|f| (f.title.clone(), f.description.clone()))
            .collect();
        let prompt = recommendations_prompt(&top);

        match self.text.complete(&prompt, CompletionLimits::RECOMMENDATIONS).await {
            Ok(text) => {
                let parsed = parse_recommendations(&text);
                if parsed.is_empty() {
                    warn!("No recommendations parsed from completion; using fallback");
                    to_strings(FALLBACK_RECOMMENDATIONS)
                } else {
                    parsed
                }
            }
            Err(e) => {
                warn!(error = %e, "Recommendation generation failed; using fallback");
                to_strings(FALLBACK_RECOMMENDATIONS)
            }
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Write `report` as pretty-printed JSON, creating parent directories.
pub fn write_report(report: &InvestigationReport, path: &Path) -> AppResult<()> {
    export::write_json(report, path)
}
