//! Expansion pipeline: grows the investigation tree one level at a time.
//!
//! The pipeline reads the parent, optionally gathers related vulnerabilities
//! through a [`VulnerabilitySearch`], asks a [`HypothesisGenerator`] for
//! candidates and attaches them as unverified children. It never retries.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::capabilities::{HypothesisGenerator, ParentContext, RelatedRecord, VulnerabilitySearch};
use crate::config::Config;
use crate::error::{GenerationError, GenerationResult};
use crate::tree::{InvestigationTree, Node, NodeStatus};

/// Words ignored when extracting search keywords.
const STOPWORDS: &[&str] = &[
    "the", "and", "a", "an", "in", "on", "at", "to", "for", "with", "by", "of", "from", "as",
    "is", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did", "but",
    "or", "if", "then", "else", "when", "where", "why", "how", "all", "any", "both", "each",
    "few", "more", "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same",
    "so", "than", "too", "very", "can", "will", "just", "should", "now",
];

const TRIM_CHARS: &[char] = &['.', ',', ';', ':', '!', '?', '(', ')', '[', ']', '{', '}', '"', '\''];

/// Derive search keywords from a node's title and description.
///
/// Lowercases, strips surrounding punctuation, drops stopwords and words of
/// three characters or fewer, deduplicates, then orders longest first (ties
/// alphabetical) and keeps at most `limit`. Deterministic for a given input.
pub fn extract_keywords(title: &str, description: &str, limit: usize) -> Vec<String> {
    let combined = format!("{} {}", title, description).to_lowercase();

    let unique: BTreeSet<&str> = combined
        .split_whitespace()
        .map(|word| word.trim_matches(TRIM_CHARS))
        .filter(|word| word.chars().count() > 3 && !STOPWORDS.contains(word))
        .collect();

    let mut keywords: Vec<String> = unique.into_iter().map(str::to_string).collect();
    keywords.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    keywords.truncate(limit);
    keywords
}

/// Generates and attaches child hypotheses.
#[derive(Clone)]
pub struct ExpansionPipeline {
    generator: Arc<dyn HypothesisGenerator>,
    search: Arc<dyn VulnerabilitySearch>,
    max_related: usize,
    keyword_limit: usize,
}

impl ExpansionPipeline {
    /// Create a new pipeline over the given generation and search capabilities.
    pub fn new(
        generator: Arc<dyn HypothesisGenerator>,
        search: Arc<dyn VulnerabilitySearch>,
        config: &Config,
    ) -> Self {
        Self {
            generator,
            search,
            max_related: config.nvd.max_results,
            keyword_limit: config.investigation.keyword_limit,
        }
    }

    /// Override how many related records enrichment requests.
    pub fn with_max_related(mut self, max_related: usize) -> Self {
        self.max_related = max_related;
        self
    }

    /// Override the keyword cap used for enrichment.
    pub fn with_keyword_limit(mut self, keyword_limit: usize) -> Self {
        self.keyword_limit = keyword_limit;
        self
    }

    /// Expand `parent_id` with up to `fan_out` new children.
    ///
    /// Returns the new node ids in generator order. An unknown parent yields
    /// an empty list. A parent that is neither plausible nor confirmed is
    /// promoted to plausible before generation, and stays promoted if the
    /// generator fails. Generator failures propagate unchanged; candidates
    /// with confidence outside [0, 1] fail the whole call before anything is
    /// inserted.
    pub async fn generate_next_level(
        &self,
        tree: &mut InvestigationTree,
        parent_id: &str,
        fan_out: usize,
        enrich: bool,
    ) -> GenerationResult<Vec<String>> {
        let status = match tree.node(parent_id) {
            Some(parent) => parent.status,
            None => {
                warn!(parent_id = %parent_id, "Expansion requested for unknown node");
                return Ok(Vec::new());
            }
        };

        if !status.is_expandable() {
            tree.set_status(parent_id, NodeStatus::Plausible);
            info!(parent_id = %parent_id, from = %status, "Promoted parent to plausible before expansion");
        }

        if fan_out == 0 {
            return Ok(Vec::new());
        }

        let Some(context) = ParentContext::from_tree(tree, parent_id) else {
            return Ok(Vec::new());
        };

        let related = if enrich {
            self.related_records(&context).await
        } else {
            Vec::new()
        };

        let mut candidates = self
            .generator
            .generate(&context, &related, fan_out)
            .await
            .map_err(|e| {
                error!(parent_id = %parent_id, error = %e, "Hypothesis generation failed");
                e
            })?;

        if candidates.len() > fan_out {
            warn!(
                parent_id = %parent_id,
                requested = fan_out,
                returned = candidates.len(),
                "Generator returned more candidates than requested; dropping extras"
            );
            candidates.truncate(fan_out);
        }

        if let Some(bad) = candidates
            .iter()
            .find(|c| !(0.0..=1.0).contains(&c.confidence))
        {
            return Err(GenerationError::Malformed {
                message: format!(
                    "Candidate '{}' has confidence {} outside [0, 1]",
                    bad.title, bad.confidence
                ),
            });
        }

        let mut created = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let mut node = Node::new(candidate.node_type, candidate.title, candidate.description)
                .with_parent(parent_id)
                .with_confidence(candidate.confidence)
                .with_evidence(candidate.evidence);
            if !candidate.reasoning.is_empty() {
                node = node.with_metadata("reasoning", candidate.reasoning);
            }

            match tree.add_node(node) {
                Ok(id) => created.push(id),
                Err(e) => error!(parent_id = %parent_id, error = %e, "Failed to attach generated node"),
            }
        }

        info!(
            parent_id = %parent_id,
            requested = fan_out,
            created = created.len(),
            related = related.len(),
            "Expanded node"
        );
        Ok(created)
    }

    async fn related_records(&self, context: &ParentContext) -> Vec<RelatedRecord> {
        let keywords = extract_keywords(&context.title, &context.description, self.keyword_limit);
        if keywords.is_empty() || self.max_related == 0 {
            debug!(parent_id = %context.id, "No keywords for enrichment");
            return Vec::new();
        }

        let mut records = self
            .search
            .search_by_keywords(&keywords, self.max_related)
            .await;
        records.truncate(self.max_related);
        debug!(parent_id = %context.id, keywords = ?keywords, found = records.len(), "Enrichment complete");
        records
    }
}
