//! Full-index workflow (spec.md §2 "Workflows", data flow diagram):
//! `indexRepo` → graph analysis → `embedRepo` → `discoverOntology` →
//! `justifyRepo` → `generateHealthReport`. Each step is a
//! self-sufficient activity: it re-fetches from the graph store and
//! writes its own results back, carrying only counts across the
//! boundary (spec.md §4.8 payload discipline).

use std::collections::HashSet;

use semgraph_core::{GraphStore, LlmProvider, PipelineConfig, Result, VectorSearch};
use semgraph_justify::aggregation::{aggregate_features, build_health_report, synthesize_adrs};
use semgraph_parser::{Indexer, NullScipPlugin, PreparedWorkspace, RustTreeSitterPlugin, ScipPlugin, TreeSitterPlugin};
use serde::Serialize;

use crate::ontology::discover_ontology;

#[derive(Debug, Clone, Default, Serialize)]
pub struct FullIndexReport {
    pub entities_written: usize,
    pub edges_written: usize,
    pub quarantined_paths: usize,
    pub documents_embedded: usize,
    pub ontology_terms: usize,
    pub justifications_written: usize,
    pub health_risks: usize,
}

const ADR_TOP_N: usize = 5;

/// Runs the complete pipeline for one prepared workspace. `org_id`/
/// `repo_id`/`index_version` scope every write; callers own workspace
/// preparation (cloning or the local-upload path) before calling in.
pub async fn run_full_index(
    org_id: &str,
    repo_id: &str,
    index_version: &str,
    workspace: &PreparedWorkspace,
    store: &dyn GraphStore,
    vector_search: &dyn VectorSearch,
    llm: &dyn LlmProvider,
    config: &PipelineConfig,
) -> Result<FullIndexReport> {
    let mut report = FullIndexReport::default();

    // indexRepo: SCIP pass + tree-sitter fallback.
    let scip = NullScipPlugin;
    let rust_plugin = RustTreeSitterPlugin::new();
    let plugins: Vec<&dyn TreeSitterPlugin> = vec![&rust_plugin];
    let indexer = Indexer::new(&scip as &dyn ScipPlugin, plugins, config);
    let indexing_report = indexer.index(workspace, org_id, repo_id, index_version, store).await?;
    report.entities_written = indexing_report.entities_written;
    report.edges_written = indexing_report.edges_written;
    report.quarantined_paths = indexing_report.quarantined_paths.len();

    // Graph analysis: weighted PageRank, fan-in/fan-out, risk tagging,
    // persisted back onto the entities (spec.md §4.4).
    let mut entities = store.get_all_entities(repo_id).await?;
    let edges = store.get_all_edges(repo_id).await?;
    let centrality = semgraph_graph::weighted_pagerank(&entities, &edges, config);
    semgraph_graph::apply_centrality(&mut entities, &centrality);
    store.bulk_upsert_entities(entities.clone()).await?;

    // embedRepo.
    let embedding_report = semgraph_vector::embed_repo(org_id, repo_id, store, vector_search, config, |_, _| {}).await?;
    report.documents_embedded = embedding_report.documents_embedded;

    // discoverOntology (transient; see `crate::ontology`).
    let ontology = discover_ontology(repo_id, &entities);
    report.ontology_terms = ontology.terms.len();

    // justifyRepo: nothing has changed yet on a full index, so the
    // cascade's changed-entity set is empty.
    let (justifications, justify_report) = semgraph_justify::justify_repo(repo_id, store, llm, config, &HashSet::new()).await?;
    let justification_list: Vec<_> = justifications.into_values().collect();
    store.bulk_upsert_justifications(justification_list.clone()).await?;
    report.justifications_written = justify_report.entities_reused
        + justify_report.entities_dead_code
        + justify_report.entities_heuristic
        + justify_report.entities_llm
        + justify_report.entities_fallback;

    // Context propagation (spec.md §4.6.5); feature aggregation, health
    // report, and ADR synthesis (spec.md §4.6.6).
    let feature_aggregations = aggregate_features(repo_id, &entities, &justification_list, &edges);
    store.bulk_upsert_feature_aggregations(feature_aggregations.clone()).await?;

    let health_report = build_health_report(repo_id, &entities, &justification_list);
    report.health_risks = health_report.risks.len();
    store.upsert_health_report(health_report).await?;

    let adrs = synthesize_adrs(repo_id, &feature_aggregations, &justification_list, ADR_TOP_N);
    store.bulk_upsert_adrs(adrs).await?;

    Ok(report)
}
