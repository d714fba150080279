//! Integration tests for SQLite storage layer
//!
//! Tests database operations using an in-memory SQLite database, plus one
//! file-backed database to check persistence across connections.

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;

use breach_investigator::config::DatabaseConfig;
use breach_investigator::export::{EmptyTree, TreeView};
use breach_investigator::investigation::Investigation;
use breach_investigator::report::InvestigationReport;
use breach_investigator::storage::{SqliteStorage, Storage};
use breach_investigator::tree::{Node, NodeStatus, NodeType, NodeUpdate};

/// Create an in-memory storage instance for testing
async fn create_test_storage() -> SqliteStorage {
    SqliteStorage::new_in_memory()
        .await
        .expect("Failed to create in-memory storage")
}

fn sample_investigation() -> Investigation {
    let mut investigation = Investigation::create("Ransomware encrypted file servers after VPN login");
    let root = investigation.root_id().unwrap().to_string();
    let child = investigation
        .tree
        .add_node(
            Node::new(NodeType::AttackVector, "VPN credential theft", "Password spray")
                .with_parent(&root)
                .with_confidence(0.6)
                .with_metadata("reasoning", "Many failed logins"),
        )
        .unwrap();
    investigation.tree.update_node(
        &child,
        NodeUpdate::new()
            .status(NodeStatus::Plausible)
            .field("ticket", json!("INC-42")),
    );
    investigation
}

fn sample_report(title: &str) -> InvestigationReport {
    InvestigationReport {
        title: title.to_string(),
        summary: "summary".to_string(),
        findings: vec![],
        recommendations: vec!["Enable MFA".to_string()],
        graph_data: TreeView::Empty(EmptyTree::default()),
        timestamp: Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod investigation_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_save_and_get_roundtrip() {
        let storage = create_test_storage().await;
        let investigation = sample_investigation();

        storage.save_investigation(&investigation).await.unwrap();
        let loaded = storage
            .get_investigation(&investigation.id)
            .await
            .unwrap()
            .expect("investigation should exist");

        assert_eq!(loaded.id, investigation.id);
        assert_eq!(loaded.tree.to_portable_form(), investigation.tree.to_portable_form());
        assert_eq!(loaded.tree.root_id(), investigation.tree.root_id());
        assert_eq!(
            loaded.created_at.timestamp_micros(),
            investigation.created_at.timestamp_micros()
        );
    }

    #[tokio::test]
    async fn test_get_unknown_is_none() {
        let storage = create_test_storage().await;
        assert!(storage.get_investigation("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_is_upsert() {
        let storage = create_test_storage().await;
        let mut investigation = sample_investigation();
        storage.save_investigation(&investigation).await.unwrap();

        let root = investigation.root_id().unwrap().to_string();
        investigation.update_node_status(&root, NodeStatus::Confirmed);
        storage.save_investigation(&investigation).await.unwrap();

        let list = storage.list_investigations().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].node_count, 2);

        let loaded = storage.get_investigation(&investigation.id).await.unwrap().unwrap();
        assert_eq!(loaded.tree.get_node(&root).unwrap().status, NodeStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_list_most_recent_first() {
        let storage = create_test_storage().await;

        let mut older = Investigation::create("older breach");
        older.updated_at = Utc::now() - Duration::hours(1);
        let newer = Investigation::create("newer breach");

        storage.save_investigation(&older).await.unwrap();
        storage.save_investigation(&newer).await.unwrap();

        let list = storage.list_investigations().await.unwrap();
        let ids: Vec<&str> = list.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![newer.id.as_str(), older.id.as_str()]);
        assert_eq!(list[1].name, "Investigation: older breach...");
    }

    #[tokio::test]
    async fn test_delete_investigation() {
        let storage = create_test_storage().await;
        let investigation = sample_investigation();
        storage.save_investigation(&investigation).await.unwrap();
        storage
            .save_report(&investigation.id, &sample_report("r"))
            .await
            .unwrap();

        assert!(storage.delete_investigation(&investigation.id).await.unwrap());
        assert!(!storage.delete_investigation(&investigation.id).await.unwrap());
        assert!(storage.get_investigation(&investigation.id).await.unwrap().is_none());
        assert!(storage.get_latest_report(&investigation.id).await.unwrap().is_none());
    }
}

#[cfg(test)]
mod report_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_latest_report_wins() {
        let storage = create_test_storage().await;
        let investigation = sample_investigation();
        storage.save_investigation(&investigation).await.unwrap();

        storage
            .save_report(&investigation.id, &sample_report("first"))
            .await
            .unwrap();
        let second_id = storage
            .save_report(&investigation.id, &sample_report("second"))
            .await
            .unwrap();

        let latest = storage
            .get_latest_report(&investigation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, second_id);
        assert_eq!(latest.report.title, "second");
        assert_eq!(latest.investigation_id, investigation.id);
    }

    #[tokio::test]
    async fn test_report_requires_investigation() {
        let storage = create_test_storage().await;
        let result = storage.save_report("missing", &sample_report("orphan")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_no_report_is_none() {
        let storage = create_test_storage().await;
        assert!(storage.get_latest_report("missing").await.unwrap().is_none());
    }
}

#[cfg(test)]
mod file_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_file_database_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("nested").join("investigations.db"),
            max_connections: 2,
        };
        let investigation = sample_investigation();

        {
            let storage = SqliteStorage::new(&config).await.unwrap();
            storage.save_investigation(&investigation).await.unwrap();
            storage.pool().close().await;
        }

        let storage = SqliteStorage::new(&config).await.unwrap();
        let loaded = storage.get_investigation(&investigation.id).await.unwrap().unwrap();
        assert_eq!(loaded.tree.len(), 2);
    }
}
