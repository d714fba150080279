//! Storage layer for investigation persistence.
//!
//! Investigations are saved whole: the tree is stored in its portable JSON
//! form and rebuilt on load. Reports are appended per investigation.

mod sqlite;

pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageResult;
use crate::investigation::Investigation;
use crate::report::InvestigationReport;

/// Listing entry for a stored investigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationSummary {
    /// Investigation identifier.
    pub id: String,
    /// Tree name.
    pub name: String,
    /// Number of nodes at the last save.
    pub node_count: i64,
    /// When the investigation was created.
    pub created_at: DateTime<Utc>,
    /// When the investigation was last saved.
    pub updated_at: DateTime<Utc>,
}

/// A report as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    /// Report identifier.
    pub id: String,
    /// Owning investigation.
    pub investigation_id: String,
    /// The report document.
    pub report: InvestigationReport,
    /// When the report was stored.
    pub created_at: DateTime<Utc>,
}

/// Storage backend trait.
///
/// Unknown ids are reported as `None`/`false`, never as errors.
#[async_trait]
pub trait Storage: Send + Sync {
    // Investigation operations

    /// Insert or replace an investigation.
    async fn save_investigation(&self, investigation: &Investigation) -> StorageResult<()>;
    /// Load an investigation by ID.
    async fn get_investigation(&self, id: &str) -> StorageResult<Option<Investigation>>;
    /// List investigations, most recently updated first.
    async fn list_investigations(&self) -> StorageResult<Vec<InvestigationSummary>>;
    /// Delete an investigation and its reports. False if it did not exist.
    async fn delete_investigation(&self, id: &str) -> StorageResult<bool>;

    // Report operations

    /// Store a report for an investigation; returns the report ID.
    async fn save_report(
        &self,
        investigation_id: &str,
        report: &InvestigationReport,
    ) -> StorageResult<String>;
    /// Most recently stored report for an investigation.
    async fn get_latest_report(&self, investigation_id: &str) -> StorageResult<Option<StoredReport>>;
}
