//! # Breach Investigator
//!
//! Builds and tracks a tree of hypotheses explaining a security breach.
//!
//! ## Components
//!
//! - **Tree Store** ([`tree`]): nodes, single-root invariant, structural queries
//! - **Expansion** ([`expansion`]): grows a node's children through a
//!   [`capabilities::HypothesisGenerator`], optionally grounded in NVD results
//! - **Export** ([`export`]): flat and nested JSON views
//! - **Report** ([`report`]): ranked findings, summary and recommendations
//!
//! ## Architecture
//!
//! ```text
//! CLI → InvestigationService → ExpansionPipeline → Langbase Pipes (HTTP)
//!              ↓                      ↓
//!        SQLite (State)          NVD CVE API (HTTP)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use breach_investigator::capabilities::{LangbaseHypothesisGenerator, LangbaseTextGenerator};
//! use breach_investigator::{Config, InvestigationService, LangbaseClient, NvdClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let langbase = LangbaseClient::new(&config.langbase, config.request.clone())?;
//!     let service = InvestigationService::from_capabilities(
//!         Arc::new(LangbaseHypothesisGenerator::new(langbase.clone(), &config)),
//!         Arc::new(NvdClient::new(&config.nvd, &config.request)?),
//!         Arc::new(LangbaseTextGenerator::new(langbase, &config)),
//!         &config,
//!     );
//!     let investigation = service.start("Customer data exfiltrated via VPN", None, true).await?;
//!     println!("{}", investigation.tree.to_json()?);
//!     Ok(())
//! }
//! ```

/// External capabilities (generation, search, text) and their Langbase implementations.
pub mod capabilities;
/// Command-line interface.
pub mod cli;
/// Configuration loaded from the environment.
pub mod config;
/// Error types and result aliases.
pub mod error;
/// Expansion pipeline and keyword extraction.
pub mod expansion;
/// Flat and hierarchical exports.
pub mod export;
/// Investigation sessions and the service wiring them to the engine.
pub mod investigation;
/// Langbase API client and types for pipe communication.
pub mod langbase;
/// NVD CVE API client.
pub mod nvd;
/// System prompts for Langbase pipes.
pub mod prompts;
/// Report assembly.
pub mod report;
/// SQLite storage layer for persistence.
pub mod storage;
/// Investigation tree model and store.
pub mod tree;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use investigation::{Investigation, InvestigationService};
pub use langbase::LangbaseClient;
pub use nvd::NvdClient;
