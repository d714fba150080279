use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

use super::{InvestigationSummary, Storage, StoredReport};
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};
use crate::investigation::Investigation;
use crate::report::InvestigationReport;
use crate::tree::InvestigationTree;

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed storage implementation
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (creating if needed) the database at `config.path`.
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true)
            .foreign_keys(true);

        Self::connect(options, config.max_connections).await
    }

    /// Private in-memory database, for tests and throwaway runs.
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .foreign_keys(true);

        // Each connection to :memory: is a separate database.
        Self::connect(options, 1).await
    }

    async fn connect(options: SqliteConnectOptions, max_connections: u32) -> StorageResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| StorageError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn save_investigation(&self, investigation: &Investigation) -> StorageResult<()> {
        let tree = serde_json::to_string(&investigation.tree)?;

        sqlx::query(
            r#"
            INSERT INTO investigations (id, name, tree, node_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                tree = excluded.tree,
                node_count = excluded.node_count,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&investigation.id)
        .bind(investigation.tree.name())
        .bind(&tree)
        .bind(investigation.tree.len() as i64)
        .bind(timestamp(&investigation.created_at))
        .bind(timestamp(&investigation.updated_at))
        .execute(&self.pool)
        .await?;

        debug!(
            investigation_id = %investigation.id,
            nodes = investigation.tree.len(),
            "Investigation saved"
        );
        Ok(())
    }

    async fn get_investigation(&self, id: &str) -> StorageResult<Option<Investigation>> {
        let row: Option<InvestigationRow> = sqlx::query_as(
            r#"
            SELECT id, tree, created_at, updated_at
            FROM investigations
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Investigation::try_from).transpose()
    }

    async fn list_investigations(&self) -> StorageResult<Vec<InvestigationSummary>> {
        let rows: Vec<SummaryRow> = sqlx::query_as(
            r#"
            SELECT id, name, node_count, created_at, updated_at
            FROM investigations
            ORDER BY updated_at DESC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_investigation(&self, id: &str) -> StorageResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM reports WHERE investigation_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM investigations WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn save_report(
        &self,
        investigation_id: &str,
        report: &InvestigationReport,
    ) -> StorageResult<String> {
        let id = Uuid::new_v4().to_string();
        let body = serde_json::to_string(report)?;

        sqlx::query(
            r#"
            INSERT INTO reports (id, investigation_id, report, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(investigation_id)
        .bind(&body)
        .bind(timestamp(&Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Query {
            message: format!("Failed to save report for {}: {}", investigation_id, e),
        })?;

        Ok(id)
    }

    async fn get_latest_report(&self, investigation_id: &str) -> StorageResult<Option<StoredReport>> {
        let row: Option<ReportRow> = sqlx::query_as(
            r#"
            SELECT id, investigation_id, report, created_at
            FROM reports
            WHERE investigation_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT 1
            "#,
        )
        .bind(investigation_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(StoredReport::try_from).transpose()
    }
}

// Internal row types for SQLx mapping
#[derive(sqlx::FromRow)]
struct InvestigationRow {
    id: String,
    tree: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<InvestigationRow> for Investigation {
    type Error = StorageError;

    fn try_from(row: InvestigationRow) -> Result<Self, Self::Error> {
        let tree: InvestigationTree = serde_json::from_str(&row.tree)?;
        Ok(Self {
            id: row.id,
            tree,
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        })
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: String,
    name: String,
    node_count: i64,
    created_at: String,
    updated_at: String,
}

impl From<SummaryRow> for InvestigationSummary {
    fn from(row: SummaryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            node_count: row.node_count,
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReportRow {
    id: String,
    investigation_id: String,
    report: String,
    created_at: String,
}

impl TryFrom<ReportRow> for StoredReport {
    type Error = StorageError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            investigation_id: row.investigation_id,
            report: serde_json::from_str(&row.report)?,
            created_at: parse_timestamp(&row.created_at),
        })
    }
}
