//! Command-line interface.
//!
//! Every command prints JSON on stdout. Unknown investigations or nodes exit
//! with code 1.

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use tracing::{error, info};

use crate::export;
use crate::investigation::{Investigation, InvestigationService};
use crate::report;
use crate::storage::Storage;
use crate::tree::{InvestigationTree, Node, NodeStatus, NodeType, NodeUpdate};

/// Breach investigation tree builder.
#[derive(Parser, Debug)]
#[command(name = "breach-investigator", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Investigation subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create an investigation and generate the first level of hypotheses
    Start {
        /// Description of the breach
        #[arg(long)]
        breach_info: String,

        /// Number of initial hypotheses
        #[arg(long)]
        num_nodes: Option<usize>,

        /// Skip NVD enrichment
        #[arg(long)]
        no_enrich: bool,
    },

    /// List stored investigations
    List,

    /// Show an investigation's tree
    Tree {
        investigation: String,

        /// Flat node/edge list instead of the nested view
        #[arg(long)]
        flat: bool,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show a node with its path to the root and its children
    Node { investigation: String, node: String },

    /// Set a node's status: unverified, plausible, implausible, confirmed
    Status {
        investigation: String,
        node: String,
        status: NodeStatus,
    },

    /// Set arbitrary node fields
    Update {
        investigation: String,
        node: String,

        /// key=value; values are parsed as JSON when possible
        #[arg(long = "set", value_parser = parse_key_value, required = true)]
        set: Vec<(String, Value)>,
    },

    /// Generate child hypotheses beneath a node
    Expand {
        investigation: String,
        node: String,

        /// Number of hypotheses to generate
        #[arg(long)]
        num_nodes: Option<usize>,

        /// Skip NVD enrichment
        #[arg(long)]
        no_enrich: bool,
    },

    /// Filter nodes by status and/or type
    Filter {
        investigation: String,

        #[arg(long)]
        status: Option<NodeStatus>,

        #[arg(long = "type")]
        node_type: Option<NodeType>,
    },

    /// Generate, store and print the investigation report
    Report {
        investigation: String,

        /// Also write the report to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Import a tree from its portable JSON form
    Import { file: PathBuf },

    /// Delete an investigation and its reports
    Delete { investigation: String },
}

/// Parse `key=value`, reading the value as JSON if it parses.
pub fn parse_key_value(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Result of CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    /// Create a success result with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    /// Create an error result with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }

    /// Pretty JSON success.
    fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(text) => Self::success(text),
            Err(e) => Self::error(format!("Failed to serialize output: {}", e)),
        }
    }
}

/// Execute a CLI command.
pub async fn execute_command(
    command: Command,
    storage: &dyn Storage,
    service: &InvestigationService,
) -> CliResult {
    match command {
        Command::Start {
            breach_info,
            num_nodes,
            no_enrich,
        } => execute_start(storage, service, &breach_info, num_nodes, !no_enrich).await,
        Command::List => execute_list(storage).await,
        Command::Tree {
            investigation,
            flat,
            output,
        } => execute_tree(storage, &investigation, flat, output).await,
        Command::Node { investigation, node } => execute_node(storage, &investigation, &node).await,
        Command::Status {
            investigation,
            node,
            status,
        } => execute_status(storage, &investigation, &node, status).await,
        Command::Update {
            investigation,
            node,
            set,
        } => execute_update(storage, &investigation, &node, set).await,
        Command::Expand {
            investigation,
            node,
            num_nodes,
            no_enrich,
        } => execute_expand(storage, service, &investigation, &node, num_nodes, !no_enrich).await,
        Command::Filter {
            investigation,
            status,
            node_type,
        } => execute_filter(storage, &investigation, status, node_type).await,
        Command::Report {
            investigation,
            output,
        } => execute_report(storage, service, &investigation, output).await,
        Command::Import { file } => execute_import(storage, file).await,
        Command::Delete { investigation } => execute_delete(storage, &investigation).await,
    }
}

/// Load an investigation or produce the not-found result.
async fn load(storage: &dyn Storage, id: &str) -> Result<Investigation, CliResult> {
    match storage.get_investigation(id).await {
        Ok(Some(investigation)) => Ok(investigation),
        Ok(None) => Err(CliResult::error(format!("Investigation not found: {}", id))),
        Err(e) => {
            error!(investigation_id = %id, error = %e, "Failed to load investigation");
            Err(CliResult::error(format!("Failed to load investigation: {}", e)))
        }
    }
}

async fn save(storage: &dyn Storage, investigation: &Investigation) -> Result<(), CliResult> {
    storage.save_investigation(investigation).await.map_err(|e| {
        error!(investigation_id = %investigation.id, error = %e, "Failed to save investigation");
        CliResult::error(format!("Failed to save investigation: {}", e))
    })
}

fn node_not_found(id: &str) -> CliResult {
    CliResult::error(format!("Node not found: {}", id))
}

async fn execute_start(
    storage: &dyn Storage,
    service: &InvestigationService,
    breach_info: &str,
    num_nodes: Option<usize>,
    enrich: bool,
) -> CliResult {
    let investigation = match service.start(breach_info, num_nodes, enrich).await {
        Ok(investigation) => investigation,
        Err(e) => return CliResult::error(format!("Failed to start investigation: {}", e)),
    };
    if let Err(result) = save(storage, &investigation).await {
        return result;
    }

    info!(investigation_id = %investigation.id, "Investigation created");
    CliResult::json(&json!({
        "investigation_id": investigation.id,
        "tree": investigation.hierarchy(),
    }))
}

async fn execute_list(storage: &dyn Storage) -> CliResult {
    match storage.list_investigations().await {
        Ok(list) => CliResult::json(&list),
        Err(e) => CliResult::error(format!("Failed to list investigations: {}", e)),
    }
}

async fn execute_tree(
    storage: &dyn Storage,
    id: &str,
    flat: bool,
    output: Option<PathBuf>,
) -> CliResult {
    let investigation = match load(storage, id).await {
        Ok(i) => i,
        Err(result) => return result,
    };

    match (flat, output) {
        (true, Some(path)) => match export::write_portable(&investigation.tree, &path) {
            Ok(()) => CliResult::success(format!("Tree written to {}", path.display())),
            Err(e) => CliResult::error(format!("Failed to write tree: {}", e)),
        },
        (false, Some(path)) => match export::write_hierarchy(&investigation.tree, &path) {
            Ok(_) => CliResult::success(format!("Tree written to {}", path.display())),
            Err(e) => CliResult::error(format!("Failed to write tree: {}", e)),
        },
        (true, None) => CliResult::json(&investigation.portable()),
        (false, None) => CliResult::json(&investigation.hierarchy()),
    }
}

async fn execute_node(storage: &dyn Storage, id: &str, node_id: &str) -> CliResult {
    let investigation = match load(storage, id).await {
        Ok(i) => i,
        Err(result) => return result,
    };
    let tree = &investigation.tree;

    let Some(node) = tree.get_node(node_id) else {
        return node_not_found(node_id);
    };
    let path: Vec<Value> = tree
        .get_path_to_root(node_id)
        .into_iter()
        .map(|n| json!({"id": n.id, "title": n.title}))
        .collect();

    CliResult::json(&json!({
        "node": node,
        "path": path,
        "children": tree.get_children(node_id),
    }))
}

async fn execute_status(
    storage: &dyn Storage,
    id: &str,
    node_id: &str,
    status: NodeStatus,
) -> CliResult {
    let mut investigation = match load(storage, id).await {
        Ok(i) => i,
        Err(result) => return result,
    };

    if !investigation.update_node_status(node_id, status) {
        return node_not_found(node_id);
    }
    if let Err(result) = save(storage, &investigation).await {
        return result;
    }
    node_output(&investigation.tree, node_id)
}

async fn execute_update(
    storage: &dyn Storage,
    id: &str,
    node_id: &str,
    set: Vec<(String, Value)>,
) -> CliResult {
    let mut investigation = match load(storage, id).await {
        Ok(i) => i,
        Err(result) => return result,
    };

    let fields: Map<String, Value> = set.into_iter().collect();
    let update = match NodeUpdate::from_fields(fields) {
        Ok(update) => update,
        Err(e) => return CliResult::error(format!("Invalid update: {}", e)),
    };

    if !investigation.tree.update_node(node_id, update) {
        return node_not_found(node_id);
    }
    investigation.touch();
    if let Err(result) = save(storage, &investigation).await {
        return result;
    }
    node_output(&investigation.tree, node_id)
}

fn node_output(tree: &InvestigationTree, node_id: &str) -> CliResult {
    match tree.get_node(node_id) {
        Some(node) => CliResult::json(&node),
        None => node_not_found(node_id),
    }
}

async fn execute_expand(
    storage: &dyn Storage,
    service: &InvestigationService,
    id: &str,
    node_id: &str,
    num_nodes: Option<usize>,
    enrich: bool,
) -> CliResult {
    let mut investigation = match load(storage, id).await {
        Ok(i) => i,
        Err(result) => return result,
    };
    if !investigation.tree.contains(node_id) {
        return node_not_found(node_id);
    }

    let result = service
        .expand(&mut investigation, node_id, num_nodes, enrich)
        .await;
    // Keep the parent's promotion even when generation failed.
    if let Err(save_err) = save(storage, &investigation).await {
        return save_err;
    }

    match result {
        Ok(created) => {
            let nodes: Vec<Node> = created
                .iter()
                .filter_map(|child| investigation.tree.get_node(child))
                .collect();
            CliResult::json(&json!({ "parent_id": node_id, "created": nodes }))
        }
        Err(e) => CliResult::error(format!("Expansion failed: {}", e)),
    }
}

async fn execute_filter(
    storage: &dyn Storage,
    id: &str,
    status: Option<NodeStatus>,
    node_type: Option<NodeType>,
) -> CliResult {
    let investigation = match load(storage, id).await {
        Ok(i) => i,
        Err(result) => return result,
    };

    let tree = &investigation.tree;
    let nodes: Vec<Node> = match (status, node_type) {
        (Some(status), node_type) => tree
            .get_nodes_by_status(status)
            .into_iter()
            .filter(|n| node_type.map_or(true, |t| n.node_type == t))
            .collect(),
        (None, Some(node_type)) => tree.get_nodes_by_type(node_type),
        (None, None) => tree.get_all_nodes(),
    };

    CliResult::json(&nodes)
}

async fn execute_report(
    storage: &dyn Storage,
    service: &InvestigationService,
    id: &str,
    output: Option<PathBuf>,
) -> CliResult {
    let investigation = match load(storage, id).await {
        Ok(i) => i,
        Err(result) => return result,
    };

    let report = service.report(&investigation).await;

    if let Err(e) = storage.save_report(&investigation.id, &report).await {
        return CliResult::error(format!("Failed to store report: {}", e));
    }
    if let Some(path) = output {
        if let Err(e) = report::write_report(&report, &path) {
            return CliResult::error(format!("Failed to write report: {}", e));
        }
        info!(path = %path.display(), "Report written");
    }

    CliResult::json(&report)
}

async fn execute_import(storage: &dyn Storage, file: PathBuf) -> CliResult {
    let text = match std::fs::read_to_string(&file) {
        Ok(text) => text,
        Err(e) => return CliResult::error(format!("Failed to read {}: {}", file.display(), e)),
    };
    let tree = match InvestigationTree::from_json(&text) {
        Ok(tree) => tree,
        Err(e) => return CliResult::error(format!("Invalid tree file: {}", e)),
    };

    let investigation = Investigation::from_tree(tree);
    if let Err(result) = save(storage, &investigation).await {
        return result;
    }
    CliResult::json(&json!({
        "investigation_id": investigation.id,
        "name": investigation.tree.name(),
        "nodes": investigation.tree.len(),
    }))
}

async fn execute_delete(storage: &dyn Storage, id: &str) -> CliResult {
    match storage.delete_investigation(id).await {
        Ok(true) => CliResult::success(format!("Deleted investigation {}", id)),
        Ok(false) => CliResult::error(format!("Investigation not found: {}", id)),
        Err(e) => CliResult::error(format!("Failed to delete investigation: {}", e)),
    }
}
