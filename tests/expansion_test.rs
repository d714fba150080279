//! Integration tests for the expansion pipeline
//!
//! Generation and search capabilities are replaced with mockall mocks.

mod common;

use async_trait::async_trait;
use mockall::mock;
use pretty_assertions::assert_eq;
use std::sync::Arc;

use breach_investigator::capabilities::{
    HypothesisCandidate, HypothesisGenerator, ParentContext, RelatedRecord, VulnerabilitySearch,
};
use breach_investigator::error::{GenerationError, GenerationResult, LangbaseError};
use breach_investigator::expansion::ExpansionPipeline;
use breach_investigator::tree::{InvestigationTree, MetadataValue, Node, NodeStatus, NodeType};

mock! {
    pub Generator {}

    #[async_trait]
    impl HypothesisGenerator for Generator {
        async fn generate(
            &self,
            parent: &ParentContext,
            related: &[RelatedRecord],
            fan_out: usize,
        ) -> GenerationResult<Vec<HypothesisCandidate>>;
    }
}

mock! {
    pub Search {}

    #[async_trait]
    impl VulnerabilitySearch for Search {
        async fn search_by_keywords(&self, keywords: &[String], max_results: usize) -> Vec<RelatedRecord>;
    }
}

fn candidate(title: &str, confidence: f64) -> HypothesisCandidate {
    HypothesisCandidate {
        title: title.to_string(),
        description: format!("{} description", title),
        node_type: NodeType::AttackVector,
        confidence,
        evidence: vec![format!("{} evidence", title)],
        reasoning: format!("{} reasoning", title),
    }
}

fn tree_with_root() -> (InvestigationTree, String) {
    let mut tree = InvestigationTree::new("test");
    let root = tree
        .add_node(
            Node::new(
                NodeType::Root,
                "Initial Breach",
                "Attackers exploited the Citrix gateway and dumped Active Directory",
            )
            .with_confidence(0.8),
        )
        .unwrap();
    (tree, root)
}

fn pipeline(generator: MockGenerator, search: MockSearch) -> ExpansionPipeline {
    let config = common::test_config("http://localhost");
    ExpansionPipeline::new(Arc::new(generator), Arc::new(search), &config)
        .with_max_related(5)
        .with_keyword_limit(10)
}

#[tokio::test]
async fn test_expand_creates_children_in_generator_order() {
    let (mut tree, root) = tree_with_root();

    let mut generator = MockGenerator::new();
    generator
        .expect_generate()
        .withf(|parent, related, fan_out| {
            parent.title == "Initial Breach" && related.is_empty() && *fan_out == 3
        })
        .times(1)
        .returning(|_, _, _| Ok(vec![candidate("one", 0.9), candidate("two", 0.4), candidate("three", 0.1)]));
    let mut search = MockSearch::new();
    search.expect_search_by_keywords().times(0);

    let ids = pipeline(generator, search)
        .generate_next_level(&mut tree, &root, 3, false)
        .await
        .unwrap();

    assert_eq!(ids.len(), 3);
    let titles: Vec<String> = ids.iter().map(|id| tree.get_node(id).unwrap().title).collect();
    assert_eq!(titles, vec!["one", "two", "three"]);

    let children: Vec<String> = tree.get_children(&root).into_iter().map(|n| n.id).collect();
    assert_eq!(children, ids);

    let first = tree.get_node(&ids[0]).unwrap();
    assert_eq!(first.parent_id.as_deref(), Some(root.as_str()));
    assert_eq!(first.status, NodeStatus::Unverified);
    assert_eq!(first.confidence, 0.9);
    assert_eq!(first.evidence, vec!["one evidence".to_string()]);
    assert_eq!(
        first.metadata.get("reasoning"),
        Some(&MetadataValue::Text("one reasoning".to_string()))
    );
}

#[tokio::test]
async fn test_expand_promotes_unverified_parent() {
    let (mut tree, root) = tree_with_root();
    assert_eq!(tree.get_node(&root).unwrap().status, NodeStatus::Unverified);

    let mut generator = MockGenerator::new();
    generator
        .expect_generate()
        .returning(|_, _, _| Ok(vec![candidate("only", 0.5)]));

    let ids = pipeline(generator, MockSearch::new())
        .generate_next_level(&mut tree, &root, 3, false)
        .await
        .unwrap();

    assert_eq!(ids.len(), 1);
    assert_eq!(tree.get_node(&root).unwrap().status, NodeStatus::Plausible);
}

#[tokio::test]
async fn test_expand_promotes_implausible_but_keeps_confirmed() {
    let (mut tree, root) = tree_with_root();

    tree.set_status(&root, NodeStatus::Implausible);
    let mut generator = MockGenerator::new();
    generator.expect_generate().returning(|_, _, _| Ok(vec![]));
    let pipeline = pipeline(generator, MockSearch::new());

    pipeline.generate_next_level(&mut tree, &root, 2, false).await.unwrap();
    assert_eq!(tree.get_node(&root).unwrap().status, NodeStatus::Plausible);

    tree.set_status(&root, NodeStatus::Confirmed);
    pipeline.generate_next_level(&mut tree, &root, 2, false).await.unwrap();
    assert_eq!(tree.get_node(&root).unwrap().status, NodeStatus::Confirmed);
}

#[tokio::test]
async fn test_expand_unknown_parent_is_empty_without_calls() {
    let (mut tree, _) = tree_with_root();
    let before = tree.len();

    let mut generator = MockGenerator::new();
    generator.expect_generate().times(0);
    let mut search = MockSearch::new();
    search.expect_search_by_keywords().times(0);

    let ids = pipeline(generator, search)
        .generate_next_level(&mut tree, "missing", 3, true)
        .await
        .unwrap();

    assert!(ids.is_empty());
    assert_eq!(tree.len(), before);
}

#[tokio::test]
async fn test_expand_drops_extra_candidates() {
    let (mut tree, root) = tree_with_root();

    let mut generator = MockGenerator::new();
    generator.expect_generate().returning(|_, _, _| {
        Ok(vec![
            candidate("a", 0.5),
            candidate("b", 0.5),
            candidate("c", 0.5),
        ])
    });

    let ids = pipeline(generator, MockSearch::new())
        .generate_next_level(&mut tree, &root, 2, false)
        .await
        .unwrap();

    assert_eq!(ids.len(), 2);
    assert_eq!(tree.len(), 3);
}

#[tokio::test]
async fn test_expand_zero_fan_out_skips_generation() {
    let (mut tree, root) = tree_with_root();

    let mut generator = MockGenerator::new();
    generator.expect_generate().times(0);

    let ids = pipeline(generator, MockSearch::new())
        .generate_next_level(&mut tree, &root, 0, true)
        .await
        .unwrap();

    assert!(ids.is_empty());
    assert_eq!(tree.get_node(&root).unwrap().status, NodeStatus::Plausible);
}

#[tokio::test]
async fn test_expand_with_enrichment_passes_related_records() {
    let (mut tree, root) = tree_with_root();

    let mut search = MockSearch::new();
    search
        .expect_search_by_keywords()
        .withf(|keywords, max| {
            *max == 5
                && keywords.len() <= 10
                && keywords.contains(&"citrix".to_string())
                && !keywords.contains(&"the".to_string())
        })
        .times(1)
        .returning(|_, _| {
            vec![RelatedRecord {
                id: "CVE-2023-3519".to_string(),
                description: "Citrix ADC unauthenticated RCE".to_string(),
            }]
        });

    let mut generator = MockGenerator::new();
    generator
        .expect_generate()
        .withf(|_, related, _| related.len() == 1 && related[0].id == "CVE-2023-3519")
        .times(1)
        .returning(|_, _, _| Ok(vec![candidate("Citrix RCE", 0.85)]));

    let ids = pipeline(generator, search)
        .generate_next_level(&mut tree, &root, 1, true)
        .await
        .unwrap();
    assert_eq!(ids.len(), 1);
}

#[tokio::test]
async fn test_expand_with_empty_search_still_generates() {
    let (mut tree, root) = tree_with_root();

    let mut search = MockSearch::new();
    search.expect_search_by_keywords().returning(|_, _| vec![]);
    let mut generator = MockGenerator::new();
    generator
        .expect_generate()
        .withf(|_, related, _| related.is_empty())
        .returning(|_, _, _| Ok(vec![candidate("x", 0.3)]));

    let ids = pipeline(generator, search)
        .generate_next_level(&mut tree, &root, 1, true)
        .await
        .unwrap();
    assert_eq!(ids.len(), 1);
}

#[tokio::test]
async fn test_generation_failure_propagates_and_keeps_promotion() {
    let (mut tree, root) = tree_with_root();

    let mut generator = MockGenerator::new();
    generator.expect_generate().returning(|_, _, _| {
        Err(GenerationError::Backend(LangbaseError::Timeout { timeout_ms: 100 }))
    });

    let result = pipeline(generator, MockSearch::new())
        .generate_next_level(&mut tree, &root, 3, false)
        .await;

    assert!(matches!(
        result,
        Err(GenerationError::Backend(LangbaseError::Timeout { timeout_ms: 100 }))
    ));
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.get_node(&root).unwrap().status, NodeStatus::Plausible);
}

#[tokio::test]
async fn test_out_of_range_confidence_inserts_nothing() {
    let (mut tree, root) = tree_with_root();

    let mut generator = MockGenerator::new();
    generator
        .expect_generate()
        .returning(|_, _, _| Ok(vec![candidate("fine", 0.5), candidate("bad", 1.7)]));

    let result = pipeline(generator, MockSearch::new())
        .generate_next_level(&mut tree, &root, 2, false)
        .await;

    assert!(matches!(result, Err(GenerationError::Malformed { .. })));
    assert_eq!(tree.len(), 1);
}

#[tokio::test]
async fn test_parent_context_carries_path() {
    let (mut tree, root) = tree_with_root();
    let child = tree
        .add_node(Node::new(NodeType::Vulnerability, "Citrix CVE", "Unpatched ADC").with_parent(&root))
        .unwrap();

    let mut generator = MockGenerator::new();
    generator
        .expect_generate()
        .withf(|parent, _, _| {
            parent.path == vec!["Initial Breach".to_string(), "Citrix CVE".to_string()]
                && parent.node_type == NodeType::Vulnerability
        })
        .times(1)
        .returning(|_, _, _| Ok(vec![candidate("deeper", 0.2)]));

    let ids = pipeline(generator, MockSearch::new())
        .generate_next_level(&mut tree, &child, 1, false)
        .await
        .unwrap();

    let path: Vec<String> = tree
        .get_path_to_root(&ids[0])
        .into_iter()
        .map(|n| n.title)
        .collect();
    assert_eq!(path, vec!["Initial Breach", "Citrix CVE", "deeper"]);
}
