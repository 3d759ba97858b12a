//! Incremental-index workflow (spec.md §4.7): debounce loop, diff,
//! fallback guard, reindex batches, edge repair, embedding update,
//! cascade re-justification, cache invalidation, `IndexEvent` write,
//! finalize status.

use std::collections::HashSet;
use std::time::Duration;

use semgraph_core::{
    CacheStore, CascadeStatus, GitHost, GraphStore, IndexEvent, IndexEventType, LlmProvider,
    PipelineConfig, RelationalStore, RepoStatus, Result, VectorSearch,
};
use semgraph_parser::{Indexer, NullScipPlugin, PreparedWorkspace, RustTreeSitterPlugin, ScipPlugin, TreeSitterPlugin};
use tokio::sync::mpsc;

use crate::local_engine::Signal;

/// Waits out the debounce window (spec.md §4.7 "Debounce loop"):
/// restarts the wait any time a push signal arrives during it, and only
/// returns once a full `quiet_period` has elapsed with no signals.
/// Returns the most recent `afterSha` carried by any signal received.
pub async fn debounce(signals: &mut mpsc::Receiver<Signal>, quiet_period: Duration, mut latest_after_sha: String) -> String {
    loop {
        match tokio::time::timeout(quiet_period, signals.recv()).await {
            Ok(Some(signal)) => {
                if let Some(sha) = signal.payload.get("after_sha").and_then(|v| v.as_str()) {
                    latest_after_sha = sha.to_string();
                }
                // pendingSignal observed; loop resets the wait.
            }
            Ok(None) => return latest_after_sha, // sender dropped, stop waiting
            Err(_) => return latest_after_sha,   // quiet period elapsed with no signal
        }
    }
}

fn partition_batches(paths: &[String], batch_size: usize) -> Vec<Vec<String>> {
    paths.chunks(batch_size.max(1)).map(|c| c.to_vec()).collect()
}

const NULL_SHA: &str = "0000000000000000000000000000000000000000";

/// Outcome of routing one push signal (spec.md §8 boundary behaviors).
pub enum PushOutcome {
    /// `before_sha` was the all-zero sentinel (ref creation); no workflow ran.
    Ignored,
    Full(crate::full_index::FullIndexReport),
    Incremental(Box<IndexEvent>),
}

/// Routes a push to the right workflow rather than always running the
/// incremental cycle: ignored on the all-zero `before_sha` sentinel, a
/// full re-index when `before_sha` doesn't match the repo's last
/// indexed sha (the incremental diff can't be trusted against history
/// it didn't observe), otherwise the incremental cycle.
#[allow(clippy::too_many_arguments)]
pub async fn handle_push_signal(
    org_id: &str,
    repo_id: &str,
    before_sha: &str,
    after_sha: &str,
    commit_message: Option<String>,
    workspace: &PreparedWorkspace,
    git_host: &dyn GitHost,
    store: &dyn GraphStore,
    relational: &dyn RelationalStore,
    vector_search: &dyn VectorSearch,
    llm: &dyn LlmProvider,
    cache: &dyn CacheStore,
    config: &PipelineConfig,
    workflow_id: &str,
) -> Result<PushOutcome> {
    if before_sha == NULL_SHA {
        return Ok(PushOutcome::Ignored);
    }

    let last_indexed_sha = relational.get_last_indexed_sha(repo_id).await?;
    if last_indexed_sha.as_deref() != Some(before_sha) {
        let report = crate::full_index::run_full_index(org_id, repo_id, after_sha, workspace, store, vector_search, llm, config).await?;
        relational.set_last_indexed_sha(repo_id, after_sha).await?;
        return Ok(PushOutcome::Full(report));
    }

    let event = run_incremental_cycle(
        org_id, repo_id, before_sha, after_sha, commit_message, workspace, git_host, store, relational, vector_search, llm, cache, config, workflow_id,
    )
    .await?;
    relational.set_last_indexed_sha(repo_id, after_sha).await?;
    Ok(PushOutcome::Incremental(Box::new(event)))
}

/// Runs one full incremental cycle for a push from `before_sha` to
/// `after_sha`, after the debounce loop (if any) has already settled.
#[allow(clippy::too_many_arguments)]
pub async fn run_incremental_cycle(
    org_id: &str,
    repo_id: &str,
    before_sha: &str,
    after_sha: &str,
    commit_message: Option<String>,
    workspace: &PreparedWorkspace,
    git_host: &dyn GitHost,
    store: &dyn GraphStore,
    relational: &dyn RelationalStore,
    vector_search: &dyn VectorSearch,
    llm: &dyn LlmProvider,
    cache: &dyn CacheStore,
    config: &PipelineConfig,
    workflow_id: &str,
) -> Result<IndexEvent> {
    let started = std::time::Instant::now();
    let mut extraction_errors = Vec::new();

    // 1. Pull and diff.
    let diff = git_host.diff_paths(repo_id, before_sha, after_sha).await?;
    let changed_files = diff.added_or_modified.len() + diff.removed.len();

    // 2. Fallback guard.
    if changed_files > config.fallback_threshold_files {
        let event = IndexEvent {
            org_id: org_id.to_string(),
            repo_id: repo_id.to_string(),
            push_sha: after_sha.to_string(),
            commit_message,
            event_type: IndexEventType::ForcePushReindex,
            files_changed: changed_files,
            entities_added: 0,
            entities_updated: 0,
            entities_deleted: 0,
            edges_repaired: 0,
            embeddings_updated: 0,
            cascade_status: CascadeStatus::Skipped,
            cascade_entities: 0,
            duration_ms: started.elapsed().as_millis() as u64,
            workflow_id: workflow_id.to_string(),
            extraction_errors,
            created_at: chrono::Utc::now(),
        };
        store.append_index_event(event.clone()).await?;
        return Ok(event);
    }

    // 3. Reindex batches.
    let scip = NullScipPlugin;
    let rust_plugin = RustTreeSitterPlugin::new();
    let plugins: Vec<&dyn TreeSitterPlugin> = vec![&rust_plugin];
    let indexer = Indexer::new(&scip as &dyn ScipPlugin, plugins, config);

    let mut entities_added_or_updated = 0usize;
    for batch in partition_batches(&diff.added_or_modified, config.reindex_batch_size) {
        let batch_report = indexer.index_paths(workspace, &batch, org_id, repo_id, after_sha, store).await?;
        entities_added_or_updated += batch_report.entities_written;
        extraction_errors.extend(batch_report.extraction_errors);
    }

    // 4. Diff apply: remove entities for deleted paths.
    let entities_deleted = store.delete_entities_by_file_paths(repo_id, &diff.removed).await?;

    // 5. Edge repair: drop edges left dangling by deletions, then re-sync.
    let edges_repaired = store.delete_dangling_edges(repo_id).await?;

    // 6. Embedding update.
    let embedding_report = semgraph_vector::embed_repo(org_id, repo_id, store, vector_search, config, |_, _| {}).await?;

    // 7. Cascade re-justification: the changed-entity set is every
    // surviving entity touched by this push's files.
    let mut changed_entity_ids: HashSet<String> = HashSet::new();
    for path in diff.added_or_modified.iter().chain(diff.removed.iter()) {
        for entity in store.get_entities_by_file(repo_id, path).await? {
            changed_entity_ids.insert(entity.id);
        }
    }
    let (justifications, _justify_report) = semgraph_justify::justify_repo(repo_id, store, llm, config, &changed_entity_ids).await?;
    let justification_list: Vec<_> = justifications.into_values().collect();
    store.bulk_upsert_justifications(justification_list.clone()).await?;

    let entities = store.get_all_entities(repo_id).await?;
    let edges = store.get_all_edges(repo_id).await?;
    let feature_aggregations = semgraph_justify::aggregate_features(repo_id, &entities, &justification_list, &edges);
    store.bulk_upsert_feature_aggregations(feature_aggregations).await?;
    let health_report = semgraph_justify::build_health_report(repo_id, &entities, &justification_list);
    store.upsert_health_report(health_report).await?;

    // 8. Invalidate caches for the affected repo.
    cache.invalidate(&format!("repo:{repo_id}:health")).await?;
    cache.invalidate(&format!("repo:{repo_id}:features")).await?;

    // 9. Write IndexEvent.
    let cascade_status = if extraction_errors.is_empty() { CascadeStatus::Completed } else { CascadeStatus::Failed };
    let event = IndexEvent {
        org_id: org_id.to_string(),
        repo_id: repo_id.to_string(),
        push_sha: after_sha.to_string(),
        commit_message,
        event_type: IndexEventType::Incremental,
        files_changed: changed_files,
        entities_added: entities_added_or_updated,
        entities_updated: 0,
        entities_deleted,
        edges_repaired,
        embeddings_updated: embedding_report.documents_embedded,
        cascade_status,
        cascade_entities: changed_entity_ids.len(),
        duration_ms: started.elapsed().as_millis() as u64,
        workflow_id: workflow_id.to_string(),
        extraction_errors,
        created_at: chrono::Utc::now(),
    };
    store.append_index_event(event.clone()).await?;

    // 10. Finalize status.
    relational.update_repo_status(repo_id, RepoStatus::Ready, None).await?;

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use semgraph_core::{Entity, EntityKind};
    use semgraph_graph::InMemoryGraphStore;
    use semgraph_justify::HeuristicLlmProvider;
    use semgraph_vector::LocalHashingVectorSearch;
    use std::fs;
    use tempfile::tempdir;

    struct StaticDiff {
        added_or_modified: Vec<String>,
        removed: Vec<String>,
    }

    #[async_trait::async_trait]
    impl GitHost for StaticDiff {
        async fn diff_paths(&self, _repo_id: &str, _before_sha: &str, _after_sha: &str) -> Result<semgraph_core::DiffResult> {
            Ok(semgraph_core::DiffResult { added_or_modified: self.added_or_modified.clone(), removed: self.removed.clone() })
        }
    }

    #[derive(Default)]
    struct NoopRelationalStore;

    #[async_trait::async_trait]
    impl RelationalStore for NoopRelationalStore {
        async fn create_repo(&self, _repo_id: &str, _org_id: &str) -> Result<()> {
            Ok(())
        }
        async fn get_repo_status(&self, _repo_id: &str) -> Result<Option<RepoStatus>> {
            Ok(None)
        }
        async fn update_repo_status(&self, _repo_id: &str, _status: RepoStatus, _error_message: Option<String>) -> Result<()> {
            Ok(())
        }
        async fn get_last_indexed_sha(&self, _repo_id: &str) -> Result<Option<String>> {
            Ok(None)
        }
        async fn set_last_indexed_sha(&self, _repo_id: &str, _sha: &str) -> Result<()> {
            Ok(())
        }
        async fn delete_repo(&self, _repo_id: &str) -> Result<()> {
            Ok(())
        }
        async fn create_pipeline_run(&self, run: semgraph_core::PipelineRun) -> Result<()> {
            let _ = run;
            Ok(())
        }
        async fn update_pipeline_run(&self, run: semgraph_core::PipelineRun) -> Result<()> {
            let _ = run;
            Ok(())
        }
        async fn get_pipeline_run(&self, _id: &str) -> Result<Option<semgraph_core::PipelineRun>> {
            Ok(None)
        }
    }

    fn workspace_with_two_files(dir: &std::path::Path) -> PreparedWorkspace {
        fs::write(dir.join("Cargo.toml"), "[package]\nname=\"demo\"\n").unwrap();
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::write(dir.join("src/lib.rs"), "pub fn run() {\n    helper();\n}\nfn helper() {}\n").unwrap();
        PreparedWorkspace { root: dir.to_path_buf(), languages: vec!["rust".to_string()], workspace_roots: vec![dir.to_path_buf()], head_sha: "after".to_string() }
    }

    #[tokio::test]
    async fn fallback_guard_writes_a_force_push_event_without_reindexing() {
        let dir = tempdir().unwrap();
        let workspace = workspace_with_two_files(dir.path());
        let store = InMemoryGraphStore::new();
        let vector_search = LocalHashingVectorSearch::new(Default::default());
        let llm = HeuristicLlmProvider::new();
        let cache = crate::cache::LocalCacheStore::new();
        let relational = NoopRelationalStore::default();
        let mut config = PipelineConfig::default();
        config.fallback_threshold_files = 1;

        let many_changed: Vec<String> = (0..5).map(|i| format!("src/f{i}.rs")).collect();
        let git_host = StaticDiff { added_or_modified: many_changed, removed: vec![] };

        let event = run_incremental_cycle(
            "org", "repo", "before", "after", None, &workspace, &git_host, &store, &relational, &vector_search, &llm, &cache, &config, "wf-1",
        )
        .await
        .unwrap();

        assert_eq!(event.event_type, IndexEventType::ForcePushReindex);
        assert_eq!(store.get_all_entities("repo").await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn incremental_cycle_reindexes_changed_files_and_justifies_them() {
        let dir = tempdir().unwrap();
        let workspace = workspace_with_two_files(dir.path());
        let store = InMemoryGraphStore::new();
        let vector_search = LocalHashingVectorSearch::new(Default::default());
        let llm = HeuristicLlmProvider::new();
        let cache = crate::cache::LocalCacheStore::new();
        let relational = NoopRelationalStore::default();
        let config = PipelineConfig::default();

        let git_host = StaticDiff { added_or_modified: vec!["src/lib.rs".to_string()], removed: vec![] };

        let event = run_incremental_cycle(
            "org", "repo", "before", "after", Some("add helper".to_string()), &workspace, &git_host, &store, &relational, &vector_search, &llm, &cache, &config, "wf-1",
        )
        .await
        .unwrap();

        assert_eq!(event.event_type, IndexEventType::Incremental);
        assert!(event.entities_added > 0);
        assert_eq!(event.cascade_status, CascadeStatus::Completed);

        let justifications = store.get_justifications("repo").await.unwrap();
        assert!(!justifications.is_empty());
    }

    #[tokio::test]
    async fn debounce_resets_on_a_signal_and_returns_its_sha() {
        let (tx, mut rx) = mpsc::channel(4);
        let quiet_period = Duration::from_millis(20);

        let debounced = tokio::spawn(async move { debounce(&mut rx, quiet_period, "before".to_string()).await });

        tokio::time::sleep(Duration::from_millis(5)).await;
        tx.send(Signal { name: "push".to_string(), payload: serde_json::json!({"after_sha": "sha-2"}) }).await.unwrap();
        drop(tx);

        let result = debounced.await.unwrap();
        assert_eq!(result, "sha-2");
    }

    #[tokio::test]
    async fn removed_paths_delete_entities_and_dangling_edges() {
        let store = InMemoryGraphStore::new();
        let mut file_entity = Entity::new("org", "repo", "v0", EntityKind::File, "gone.rs", "gone.rs", "rust");
        file_entity.id = "gone-file".to_string();
        store.bulk_upsert_entities(vec![file_entity]).await.unwrap();
        let edge = semgraph_core::Edge {
            key: semgraph_core::hashing::edge_hash("entities/gone-file", "entities/gone-file", semgraph_core::EdgeKind::Contains),
            from: "entities/gone-file".to_string(),
            to: "entities/gone-file".to_string(),
            kind: semgraph_core::EdgeKind::Contains,
        };
        store.bulk_upsert_edges(vec![edge]).await.unwrap();

        let deleted = store.delete_entities_by_file_paths("repo", &["gone.rs".to_string()]).await.unwrap();
        assert_eq!(deleted, 1);
        let repaired = store.delete_dangling_edges("repo").await.unwrap();
        assert_eq!(repaired, 1);
        assert!(store.get_all_edges("repo").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn push_with_null_before_sha_is_ignored() {
        let dir = tempdir().unwrap();
        let workspace = workspace_with_two_files(dir.path());
        let store = InMemoryGraphStore::new();
        let vector_search = LocalHashingVectorSearch::new(Default::default());
        let llm = HeuristicLlmProvider::new();
        let cache = crate::cache::LocalCacheStore::new();
        let relational = NoopRelationalStore::default();
        let config = PipelineConfig::default();
        let git_host = StaticDiff { added_or_modified: vec!["src/lib.rs".to_string()], removed: vec![] };

        let outcome = handle_push_signal(
            "org", "repo", NULL_SHA, "after", None, &workspace, &git_host, &store, &relational, &vector_search, &llm, &cache, &config, "wf-1",
        )
        .await
        .unwrap();

        assert!(matches!(outcome, PushOutcome::Ignored));
        assert_eq!(store.get_all_entities("repo").await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn push_with_unknown_before_sha_triggers_a_full_reindex() {
        let dir = tempdir().unwrap();
        let workspace = workspace_with_two_files(dir.path());
        let store = InMemoryGraphStore::new();
        let vector_search = LocalHashingVectorSearch::new(Default::default());
        let llm = HeuristicLlmProvider::new();
        let cache = crate::cache::LocalCacheStore::new();
        let relational = NoopRelationalStore::default(); // get_last_indexed_sha always returns None
        let config = PipelineConfig::default();
        let git_host = StaticDiff { added_or_modified: vec!["src/lib.rs".to_string()], removed: vec![] };

        let outcome = handle_push_signal(
            "org", "repo", "stale-before", "after", None, &workspace, &git_host, &store, &relational, &vector_search, &llm, &cache, &config, "wf-1",
        )
        .await
        .unwrap();

        match outcome {
            PushOutcome::Full(report) => assert!(report.entities_written > 0),
            _ => panic!("expected a full reindex"),
        }
    }

    #[tokio::test]
    async fn push_with_matching_before_sha_runs_incrementally() {
        let dir = tempdir().unwrap();
        let workspace = workspace_with_two_files(dir.path());
        let store = InMemoryGraphStore::new();
        let vector_search = LocalHashingVectorSearch::new(Default::default());
        let llm = HeuristicLlmProvider::new();
        let cache = crate::cache::LocalCacheStore::new();
        let relational = KnownShaRelationalStore::new("before".to_string());
        let config = PipelineConfig::default();
        let git_host = StaticDiff { added_or_modified: vec!["src/lib.rs".to_string()], removed: vec![] };

        let outcome = handle_push_signal(
            "org", "repo", "before", "after", None, &workspace, &git_host, &store, &relational, &vector_search, &llm, &cache, &config, "wf-1",
        )
        .await
        .unwrap();

        assert!(matches!(outcome, PushOutcome::Incremental(_)));
    }

    struct KnownShaRelationalStore {
        last_indexed_sha: std::sync::Mutex<String>,
    }

    impl KnownShaRelationalStore {
        fn new(sha: String) -> Self {
            Self { last_indexed_sha: std::sync::Mutex::new(sha) }
        }
    }

    #[async_trait::async_trait]
    impl RelationalStore for KnownShaRelationalStore {
        async fn create_repo(&self, _repo_id: &str, _org_id: &str) -> Result<()> {
            Ok(())
        }
        async fn get_repo_status(&self, _repo_id: &str) -> Result<Option<RepoStatus>> {
            Ok(None)
        }
        async fn update_repo_status(&self, _repo_id: &str, _status: RepoStatus, _error_message: Option<String>) -> Result<()> {
            Ok(())
        }
        async fn get_last_indexed_sha(&self, _repo_id: &str) -> Result<Option<String>> {
            Ok(Some(self.last_indexed_sha.lock().unwrap().clone()))
        }
        async fn set_last_indexed_sha(&self, _repo_id: &str, sha: &str) -> Result<()> {
            *self.last_indexed_sha.lock().unwrap() = sha.to_string();
            Ok(())
        }
        async fn delete_repo(&self, _repo_id: &str) -> Result<()> {
            Ok(())
        }
        async fn create_pipeline_run(&self, run: semgraph_core::PipelineRun) -> Result<()> {
            let _ = run;
            Ok(())
        }
        async fn update_pipeline_run(&self, run: semgraph_core::PipelineRun) -> Result<()> {
            let _ = run;
            Ok(())
        }
        async fn get_pipeline_run(&self, _id: &str) -> Result<Option<semgraph_core::PipelineRun>> {
            Ok(None)
        }
    }
}
