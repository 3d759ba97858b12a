use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Every entity is scoped by `(org_id, repo_id)` and stamped with the
/// `index_version` of the run that wrote it (spec.md §3).
pub type OrgId = String;
pub type RepoId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    File,
    Directory,
    Module,
    Namespace,
    Function,
    Method,
    Class,
    Struct,
    Interface,
    Variable,
    Type,
    Enum,
    Decorator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Calls,
    Contains,
    Imports,
    Implements,
    Inherits,
    References,
    Exports,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Normal,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarantineReason {
    FileTooLarge,
    ExtractionTimeout,
}

/// Record of when an entity was created/touched, following the teacher's
/// `Metadata` convention (`codegraph-core::node::CodeNode`), so aggregate
/// builders have a stable field to age/sort by without re-deriving it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Metadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
        }
    }
}

/// A node of the semantic code graph (spec.md §3 "Entity").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// `entityHash(repo_id, file_path, kind, name, signature?)`.
    pub id: String,
    pub org_id: OrgId,
    pub repo_id: RepoId,
    pub index_version: String,
    pub kind: EntityKind,
    pub name: String,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub language: String,
    pub signature: Option<String>,
    pub exported: bool,
    pub doc: Option<String>,
    /// Name of the enclosing class/module, for methods/members.
    pub parent: Option<String>,
    /// Capped at `max_body_lines` during extraction.
    pub body: String,

    // Computed fields (spec.md §4.4), filled in by the graph-analysis engine.
    pub fan_in: u32,
    pub fan_out: u32,
    pub risk_level: RiskLevel,
    pub pagerank: f64,
    pub pagerank_percentile: u8,

    // Quarantine fields.
    pub quarantined: bool,
    pub quarantine_reason: Option<QuarantineReason>,

    pub metadata: Metadata,
}

impl Entity {
    /// A fresh, un-analyzed entity. Callers fill `id` via
    /// [`crate::hashing::entity_hash`] before persisting.
    pub fn new(
        org_id: impl Into<OrgId>,
        repo_id: impl Into<RepoId>,
        index_version: impl Into<String>,
        kind: EntityKind,
        name: impl Into<String>,
        file_path: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            org_id: org_id.into(),
            repo_id: repo_id.into(),
            index_version: index_version.into(),
            kind,
            name: name.into(),
            file_path: file_path.into(),
            start_line: 0,
            end_line: 0,
            language: language.into(),
            signature: None,
            exported: false,
            doc: None,
            parent: None,
            body: String::new(),
            fan_in: 0,
            fan_out: 0,
            risk_level: RiskLevel::Normal,
            pagerank: 0.0,
            pagerank_percentile: 0,
            quarantined: false,
            quarantine_reason: None,
            metadata: Metadata::default(),
        }
    }

    pub fn quarantine(mut self, reason: QuarantineReason) -> Self {
        self.quarantined = true;
        self.quarantine_reason = Some(reason);
        self
    }

    pub fn is_function_like(&self) -> bool {
        matches!(self.kind, EntityKind::Function | EntityKind::Method)
    }
}

/// A typed, directed edge between two entities (spec.md §3 "Edge").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// `deterministic hash(_from || _to || kind)`.
    pub key: String,
    /// `collection/id`, e.g. `entities/<id>`.
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

/// One per entity, replaceable (spec.md §3 "Justification").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Taxonomy {
    Vertical,
    Horizontal,
    Utility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Heuristic,
    Fast,
    Standard,
    Premium,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Justification {
    pub entity_id: String,
    pub taxonomy: Taxonomy,
    pub confidence: f32,
    pub business_purpose: String,
    pub domain_concepts: Vec<String>,
    pub feature_tag: String,
    pub semantic_triples: Vec<(String, String, String)>,
    pub compliance_tags: Vec<String>,
    pub architectural_pattern: Option<String>,
    pub model_tier: ModelTier,
    pub model_used: Option<String>,
    pub quality_score: f32,
    pub quality_flags: Vec<String>,
    /// Content hash of the entity's body at justification time; drives staleness.
    pub body_hash: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
}

impl Justification {
    pub fn is_current(&self) -> bool {
        self.valid_to.is_none()
    }
}

/// A compact set of recognized domain terms, learned per repo (spec.md §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainOntology {
    pub repo_id: RepoId,
    pub terms: Vec<String>,
    pub categories: Vec<String>,
    pub feature_areas: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxonomyBreakdown {
    pub vertical: usize,
    pub horizontal: usize,
    pub utility: usize,
}

/// Per `feature_tag` rollup (spec.md §3 "FeatureAggregation").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureAggregation {
    pub repo_id: RepoId,
    pub feature_tag: String,
    pub entity_count: usize,
    pub entry_points: Vec<String>,
    pub taxonomy_breakdown: TaxonomyBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthRisk {
    pub entity_id: String,
    pub severity: RiskSeverity,
    pub reason: String,
}

/// Per-repo risk/coverage rollup (spec.md §3 "HealthReport").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub repo_id: RepoId,
    pub risks: Vec<HealthRisk>,
    pub average_confidence: f32,
    pub coverage: f32,
    pub generated_at: DateTime<Utc>,
}

/// One notable architectural decision (spec.md §3 "ADR").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adr {
    pub repo_id: RepoId,
    pub title: String,
    pub context: String,
    pub decision: String,
    pub consequences: String,
    pub referenced_entities: Vec<String>,
    pub feature_areas: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexEventType {
    Incremental,
    ForcePushReindex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeStatus {
    Completed,
    Skipped,
    Failed,
}

/// Immutable log of each incremental cycle (spec.md §3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEvent {
    pub org_id: OrgId,
    pub repo_id: RepoId,
    pub push_sha: String,
    pub commit_message: Option<String>,
    pub event_type: IndexEventType,
    pub files_changed: usize,
    pub entities_added: usize,
    pub entities_updated: usize,
    pub entities_deleted: usize,
    pub edges_repaired: usize,
    pub embeddings_updated: usize,
    pub cascade_status: CascadeStatus,
    pub cascade_entities: usize,
    pub duration_ms: u64,
    pub workflow_id: String,
    pub extraction_errors: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStepName {
    Clone,
    Wipe,
    Scip,
    Parse,
    Finalize,
    Embed,
    GraphSync,
    PatternDetection,
}

pub const PIPELINE_STEP_ORDER: [PipelineStepName; 8] = [
    PipelineStepName::Clone,
    PipelineStepName::Wipe,
    PipelineStepName::Scip,
    PipelineStepName::Parse,
    PipelineStepName::Finalize,
    PipelineStepName::Embed,
    PipelineStepName::GraphSync,
    PipelineStepName::PatternDetection,
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStep {
    pub name: PipelineStepName,
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl PipelineStep {
    pub fn pending(name: PipelineStepName) -> Self {
        Self {
            name,
            status: StepStatus::Pending,
            started_at: None,
            finished_at: None,
            error_message: None,
        }
    }
}

/// Per-run tracking in the relational store (spec.md §3 "PipelineRun").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: String,
    pub repo_id: RepoId,
    pub steps: Vec<PipelineStep>,
}

impl PipelineRun {
    pub fn new(id: impl Into<String>, repo_id: impl Into<RepoId>) -> Self {
        Self {
            id: id.into(),
            repo_id: repo_id.into(),
            steps: PIPELINE_STEP_ORDER.iter().map(|n| PipelineStep::pending(*n)).collect(),
        }
    }

    pub fn step_mut(&mut self, name: PipelineStepName) -> Option<&mut PipelineStep> {
        self.steps.iter_mut().find(|s| s.name == name)
    }
}

/// `{entities, edges}` compact envelope for graph upload / sync-local-graph
/// (spec.md §6 "Persistent snapshot format").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactEntity {
    pub key: String,
    pub kind: EntityKind,
    pub name: String,
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub repo_id: RepoId,
    pub org_id: OrgId,
    pub entities: Vec<CompactEntity>,
    pub edges: Vec<CompactEdge>,
    pub rules: Option<HashMap<String, String>>,
    pub patterns: Option<HashMap<String, String>>,
}

impl GraphSnapshot {
    /// MessagePack-encode the envelope and return `(bytes, hex checksum)`
    /// per spec.md §6.
    pub fn encode(&self) -> crate::Result<(Vec<u8>, String)> {
        let bytes = rmp_serde::to_vec_named(self)
            .map_err(|e| crate::CodeGraphError::SnapshotCodec(e.to_string()))?;
        let checksum = crate::hashing::hex_sha256(&bytes);
        Ok((bytes, checksum))
    }

    pub fn decode(bytes: &[u8]) -> crate::Result<Self> {
        rmp_serde::from_slice(bytes).map_err(|e| crate::CodeGraphError::SnapshotCodec(e.to_string()))
    }
}

#[cfg(test)]
mod snapshot_tests {
    use super::*;

    #[test]
    fn encode_then_decode_yields_identical_entities_edges_and_checksum() {
        let snapshot = GraphSnapshot {
            repo_id: "repo1".to_string(),
            org_id: "org1".to_string(),
            entities: vec![CompactEntity { key: "e1".to_string(), kind: EntityKind::Function, name: "foo".to_string(), file_path: "a.rs".to_string() }],
            edges: vec![CompactEdge { from: "e1".to_string(), to: "e1".to_string(), kind: EdgeKind::Calls }],
            rules: None,
            patterns: None,
        };

        let (bytes_a, checksum_a) = snapshot.encode().unwrap();
        let (bytes_b, checksum_b) = snapshot.encode().unwrap();
        assert_eq!(checksum_a, checksum_b);
        assert_eq!(bytes_a, bytes_b);

        let decoded = GraphSnapshot::decode(&bytes_a).unwrap();
        assert_eq!(decoded.entities.len(), snapshot.entities.len());
        assert_eq!(decoded.entities[0].key, snapshot.entities[0].key);
        assert_eq!(decoded.edges.len(), snapshot.edges.len());
        let (redecoded_bytes, redecoded_checksum) = decoded.encode().unwrap();
        assert_eq!(redecoded_checksum, checksum_a);
        assert_eq!(redecoded_bytes, bytes_a);
    }
}
