//! `syncLocalGraph` / `detectPatterns` / `reconciliation`: the three
//! child workflows spec.md §5 starts with parent-close-policy ABANDON,
//! meaning they outlive the full-index parent rather than being awaited
//! by it. Each is a detached background task here rather than a true
//! child-workflow registration (`LocalWorkflowEngine` models signals and
//! queries, not workflow-tree lifetime); callers `tokio::spawn` these
//! and don't join the handle.

use std::collections::HashMap;

use semgraph_core::{GraphStore, PatternEngine, Result};

/// Heuristic [`PatternEngine`]: flags entities whose combined fan-in/out
/// crosses `god_object_threshold` (spec.md §4.4's blast-radius signal,
/// repurposed here as a pattern rather than a risk level).
pub struct HeuristicPatternEngine<'a> {
    god_object_threshold: u32,
    store: &'a dyn GraphStore,
}

impl<'a> HeuristicPatternEngine<'a> {
    pub fn new(god_object_threshold: u32, store: &'a dyn GraphStore) -> Self {
        Self { god_object_threshold, store }
    }
}

#[async_trait::async_trait]
impl<'a> PatternEngine for HeuristicPatternEngine<'a> {
    async fn detect_patterns(&self, repo_id: &str) -> Result<HashMap<String, String>> {
        let entities = self.store.get_all_entities(repo_id).await?;
        let mut patterns = HashMap::new();
        for entity in &entities {
            if entity.fan_in.saturating_add(entity.fan_out) >= self.god_object_threshold {
                patterns.insert(entity.id.clone(), "god_object".to_string());
            }
        }
        Ok(patterns)
    }
}

/// Runs `detectPatterns` to completion, logging its result rather than
/// returning it through a workflow boundary (ABANDON children report no
/// result to their parent).
pub async fn run_detect_patterns(repo_id: &str, pattern_engine: &dyn PatternEngine) {
    match pattern_engine.detect_patterns(repo_id).await {
        Ok(patterns) => tracing::info!(repo_id, patterns_found = patterns.len(), "detectPatterns completed"),
        Err(e) => tracing::warn!(repo_id, error = %e, "detectPatterns failed"),
    }
}

/// `syncLocalGraph`: re-syncs a local working copy's graph state without
/// going through the full clone/diff incremental cycle (e.g. a local
/// CLI watch-mode session). Re-running `run_full_index` already
/// converges via idempotent bulk-upsert by id, so this is a thin, named
/// entry point over that same convergent write path rather than new
/// logic (spec.md §5 "Shared-resource policy").
pub async fn run_sync_local_graph(
    org_id: &str,
    repo_id: &str,
    index_version: &str,
    workspace: &semgraph_parser::PreparedWorkspace,
    store: &dyn GraphStore,
    vector_search: &dyn semgraph_core::VectorSearch,
    llm: &dyn semgraph_core::LlmProvider,
    config: &semgraph_core::PipelineConfig,
) {
    if let Err(e) = crate::full_index::run_full_index(org_id, repo_id, index_version, workspace, store, vector_search, llm, config).await {
        tracing::warn!(repo_id, error = %e, "syncLocalGraph: full-index re-run failed");
    }
}

/// `reconciliation`: verifies the persisted entity count for `repo_id`
/// matches what the current index_version's workspace scan produced,
/// logging a drift warning rather than self-healing (spec.md §5
/// "Shared-resource policy" — writes converge by idempotent upsert, so
/// reconciliation is a detector, not a second writer).
pub async fn run_reconciliation(repo_id: &str, expected_entity_count: usize, store: &dyn GraphStore) -> Result<bool> {
    let actual = store.verify_entity_counts(repo_id).await?;
    let matches = actual == expected_entity_count;
    if !matches {
        tracing::warn!(repo_id, expected_entity_count, actual, "reconciliation: entity count drift detected");
    }
    Ok(matches)
}
