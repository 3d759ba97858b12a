//! Abstract interfaces to every external collaborator. Every other crate
//! in the workspace depends only on these traits, never on a concrete
//! store/provider (spec.md §2 component 1, §9 "lazily-initialized global
//! client handles become process-wide state with explicit init/teardown").

use async_trait::async_trait;
use std::collections::HashMap;

use crate::model::*;
use crate::Result;

/// Graph-store port (spec.md §6 "Graph-store port").
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn bulk_upsert_entities(&self, entities: Vec<Entity>) -> Result<usize>;
    async fn bulk_upsert_edges(&self, edges: Vec<Edge>) -> Result<usize>;
    async fn bulk_upsert_justifications(&self, justifications: Vec<Justification>) -> Result<usize>;
    async fn bulk_upsert_feature_aggregations(&self, aggs: Vec<FeatureAggregation>) -> Result<usize>;
    async fn bulk_upsert_adrs(&self, adrs: Vec<Adr>) -> Result<usize>;
    async fn upsert_health_report(&self, report: HealthReport) -> Result<()>;

    async fn get_all_entities(&self, repo_id: &str) -> Result<Vec<Entity>>;
    async fn get_all_edges(&self, repo_id: &str) -> Result<Vec<Edge>>;
    async fn get_entities_by_file(&self, repo_id: &str, file_path: &str) -> Result<Vec<Entity>>;
    async fn get_file_paths(&self, repo_id: &str) -> Result<Vec<String>>;
    async fn get_justifications(&self, repo_id: &str) -> Result<Vec<Justification>>;
    async fn get_justification(&self, entity_id: &str) -> Result<Option<Justification>>;
    async fn get_domain_ontology(&self, repo_id: &str) -> Result<Option<DomainOntology>>;
    async fn get_feature_aggregations(&self, repo_id: &str) -> Result<Vec<FeatureAggregation>>;
    async fn get_callees_of(&self, entity_id: &str) -> Result<Vec<String>>;
    async fn get_callers_of(&self, entity_id: &str) -> Result<Vec<String>>;

    async fn bootstrap_graph_schema(&self) -> Result<()>;
    async fn delete_stale_by_index_version(&self, repo_id: &str, current_version: &str) -> Result<usize>;
    async fn verify_entity_counts(&self, repo_id: &str) -> Result<usize>;
    async fn delete_repo_data(&self, repo_id: &str) -> Result<()>;
    async fn delete_entities_by_file_paths(&self, repo_id: &str, paths: &[String]) -> Result<usize>;
    /// Removes edges whose `_from`/`_to` no longer resolves to a live
    /// entity (spec.md §3 Edge invariant b), the "edge repair" step of
    /// the incremental workflow (spec.md §4.7 step 5).
    async fn delete_dangling_edges(&self, repo_id: &str) -> Result<usize>;
    async fn get_index_events(&self, repo_id: &str) -> Result<Vec<IndexEvent>>;
    async fn append_index_event(&self, event: IndexEvent) -> Result<()>;
}

/// Relational-store port (spec.md §6 "Relational-store port"). Trimmed to
/// the repo/run-tracking surface this core actually drives; PR-review and
/// installation management belong to the out-of-scope GitHub-integration
/// collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoStatus {
    Pending,
    Indexing,
    Embedding,
    Justifying,
    Ready,
    Error,
    EmbedFailed,
    JustifyFailed,
}

use serde::{Deserialize, Serialize};

#[async_trait]
pub trait RelationalStore: Send + Sync {
    async fn create_repo(&self, repo_id: &str, org_id: &str) -> Result<()>;
    async fn get_repo_status(&self, repo_id: &str) -> Result<Option<RepoStatus>>;
    async fn update_repo_status(&self, repo_id: &str, status: RepoStatus, error_message: Option<String>) -> Result<()>;
    async fn get_last_indexed_sha(&self, repo_id: &str) -> Result<Option<String>>;
    async fn set_last_indexed_sha(&self, repo_id: &str, sha: &str) -> Result<()>;
    async fn delete_repo(&self, repo_id: &str) -> Result<()>;

    async fn create_pipeline_run(&self, run: PipelineRun) -> Result<()>;
    async fn update_pipeline_run(&self, run: PipelineRun) -> Result<()>;
    async fn get_pipeline_run(&self, run_id: &str) -> Result<Option<PipelineRun>>;
}

/// Cache-store port (spec.md §6).
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn set_if_not_exists(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool>;
    async fn invalidate(&self, key: &str) -> Result<()>;
}

/// Vector-search port (spec.md §6).
#[async_trait]
pub trait VectorSearch: Send + Sync {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;
    async fn upsert(&self, ids: Vec<String>, vectors: Vec<Vec<f32>>, metadata: Vec<HashMap<String, String>>) -> Result<()>;
    async fn delete_orphaned(&self, repo_id: &str, current_keys: &[String]) -> Result<usize>;
}

/// LLM-provider port. The prompt text itself is composed externally
/// (spec.md §1 Non-goals); this port only carries the structured
/// generation contract the justification engine needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredJustification {
    pub entity_id: String,
    pub taxonomy: Taxonomy,
    pub confidence: f32,
    pub business_purpose: String,
    pub domain_concepts: Vec<String>,
    pub feature_tag: String,
    pub semantic_triples: Vec<(String, String, String)>,
    pub compliance_tags: Vec<String>,
    pub architectural_pattern: Option<String>,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// `prompts` is keyed by `entity_id`; a conforming implementation
    /// returns at most one result per requested id, never inventing ids
    /// that weren't requested (spec.md §4.6.3).
    async fn generate_structured(
        &self,
        model: &str,
        prompts: HashMap<String, String>,
    ) -> Result<HashMap<String, StructuredJustification>>;
}

/// Workflow-engine port (spec.md §6).
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    async fn start_workflow(&self, workflow_id: &str, workflow_type: &str, input: serde_json::Value) -> Result<()>;
    async fn signal_workflow(&self, workflow_id: &str, signal_name: &str, payload: serde_json::Value) -> Result<()>;
    async fn get_workflow_execution(&self, workflow_id: &str) -> Result<Option<serde_json::Value>>;
}

/// Git-host port: the clone/diff/PR-comment mechanics themselves are an
/// external collaborator (spec.md §1); this is the minimal contract the
/// core needs back.
#[async_trait]
pub trait GitHost: Send + Sync {
    async fn diff_paths(&self, repo_id: &str, before_sha: &str, after_sha: &str) -> Result<DiffResult>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffResult {
    pub added_or_modified: Vec<String>,
    pub removed: Vec<String>,
}

/// Pattern-engine port: architectural/anti-pattern detection over the
/// graph, invoked by the `detectPatterns` workflow (spec.md §2 component 6).
#[async_trait]
pub trait PatternEngine: Send + Sync {
    async fn detect_patterns(&self, repo_id: &str) -> Result<HashMap<String, String>>;
}
