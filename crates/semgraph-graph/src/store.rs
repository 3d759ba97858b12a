//! In-memory reference [`GraphStore`] implementation. Grounded in the
//! teacher's `CodeGraph` (`codegraph-graph/src/graph.rs`): `DashMap`
//! per-collection caches plus a `parking_lot::RwLock`-guarded stats block,
//! with the RocksDB-backed persistence layer dropped — this is the
//! in-process store the graph-analysis engine and workflows drive directly
//! in tests and single-node deployments.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use semgraph_core::{
    Adr, DomainOntology, Edge, EdgeKind, Entity, FeatureAggregation, GraphStore, HealthReport,
    IndexEvent, Justification, Result,
};

#[derive(Debug, Default)]
struct StoreStats {
    entity_writes: AtomicU64,
    edge_writes: AtomicU64,
}

/// Keyed by `repo_id`, then by entity/edge id, mirroring the collection
/// layout the spec's graph-store contract assumes (`entities`, `edges`,
/// `justifications`, ... all scoped per repo).
#[derive(Default)]
pub struct InMemoryGraphStore {
    entities: DashMap<String, DashMap<String, Entity>>,
    edges: DashMap<String, DashMap<String, Edge>>,
    justifications: DashMap<String, Justification>,
    feature_aggregations: DashMap<String, Vec<FeatureAggregation>>,
    adrs: DashMap<String, Vec<Adr>>,
    health_reports: DashMap<String, HealthReport>,
    domain_ontologies: DashMap<String, DomainOntology>,
    index_events: DashMap<String, Vec<IndexEvent>>,
    stats: Arc<RwLock<StoreStats>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entities_for(&self, repo_id: &str) -> dashmap::mapref::one::Ref<'_, String, DashMap<String, Entity>> {
        self.entities.entry(repo_id.to_string()).or_default();
        self.entities.get(repo_id).expect("just inserted")
    }

    fn edges_for(&self, repo_id: &str) -> dashmap::mapref::one::Ref<'_, String, DashMap<String, Edge>> {
        self.edges.entry(repo_id.to_string()).or_default();
        self.edges.get(repo_id).expect("just inserted")
    }

    fn strip_collection(id: &str) -> &str {
        id.rsplit('/').next().unwrap_or(id)
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn bulk_upsert_entities(&self, entities: Vec<Entity>) -> Result<usize> {
        let count = entities.len();
        for entity in entities {
            let repo_id = entity.repo_id.clone();
            self.entities_for(&repo_id).insert(entity.id.clone(), entity);
        }
        self.stats.write().entity_writes.fetch_add(count as u64, Ordering::Relaxed);
        Ok(count)
    }

    async fn bulk_upsert_edges(&self, edges: Vec<Edge>) -> Result<usize> {
        let count = edges.len();
        for edge in edges {
            // Edges aren't repo-scoped in their own struct; infer the repo
            // from whichever entity collection currently owns the `from` id.
            let from_id = Self::strip_collection(&edge.from).to_string();
            let repo_id = self
                .entities
                .iter()
                .find(|e| e.value().contains_key(&from_id))
                .map(|e| e.key().clone())
                .unwrap_or_else(|| "_unscoped".to_string());
            self.edges_for(&repo_id).insert(edge.key.clone(), edge);
        }
        self.stats.write().edge_writes.fetch_add(count as u64, Ordering::Relaxed);
        Ok(count)
    }

    async fn bulk_upsert_justifications(&self, justifications: Vec<Justification>) -> Result<usize> {
        let count = justifications.len();
        for j in justifications {
            self.justifications.insert(j.entity_id.clone(), j);
        }
        Ok(count)
    }

    async fn bulk_upsert_feature_aggregations(&self, aggs: Vec<FeatureAggregation>) -> Result<usize> {
        let count = aggs.len();
        let mut by_repo: HashMap<String, Vec<FeatureAggregation>> = HashMap::new();
        for agg in aggs {
            by_repo.entry(agg.repo_id.clone()).or_default().push(agg);
        }
        for (repo_id, mut new_aggs) in by_repo {
            self.feature_aggregations.entry(repo_id).or_default().append(&mut new_aggs);
        }
        Ok(count)
    }

    async fn bulk_upsert_adrs(&self, adrs: Vec<Adr>) -> Result<usize> {
        let count = adrs.len();
        let mut by_repo: HashMap<String, Vec<Adr>> = HashMap::new();
        for adr in adrs {
            by_repo.entry(adr.repo_id.clone()).or_default().push(adr);
        }
        for (repo_id, mut new_adrs) in by_repo {
            self.adrs.entry(repo_id).or_default().append(&mut new_adrs);
        }
        Ok(count)
    }

    async fn upsert_health_report(&self, report: HealthReport) -> Result<()> {
        self.health_reports.insert(report.repo_id.clone(), report);
        Ok(())
    }

    async fn get_all_entities(&self, repo_id: &str) -> Result<Vec<Entity>> {
        Ok(self
            .entities
            .get(repo_id)
            .map(|m| m.iter().map(|e| e.value().clone()).collect())
            .unwrap_or_default())
    }

    async fn get_all_edges(&self, repo_id: &str) -> Result<Vec<Edge>> {
        Ok(self
            .edges
            .get(repo_id)
            .map(|m| m.iter().map(|e| e.value().clone()).collect())
            .unwrap_or_default())
    }

    async fn get_entities_by_file(&self, repo_id: &str, file_path: &str) -> Result<Vec<Entity>> {
        Ok(self
            .entities
            .get(repo_id)
            .map(|m| m.iter().filter(|e| e.value().file_path == file_path).map(|e| e.value().clone()).collect())
            .unwrap_or_default())
    }

    async fn get_file_paths(&self, repo_id: &str) -> Result<Vec<String>> {
        let mut paths: Vec<String> = self
            .entities
            .get(repo_id)
            .map(|m| m.iter().map(|e| e.value().file_path.clone()).collect::<std::collections::HashSet<_>>())
            .unwrap_or_default()
            .into_iter()
            .collect();
        paths.sort();
        Ok(paths)
    }

    async fn get_justifications(&self, repo_id: &str) -> Result<Vec<Justification>> {
        let entity_ids: std::collections::HashSet<String> = self
            .entities
            .get(repo_id)
            .map(|m| m.iter().map(|e| e.key().clone()).collect())
            .unwrap_or_default();
        Ok(self
            .justifications
            .iter()
            .filter(|j| entity_ids.contains(j.key()))
            .map(|j| j.value().clone())
            .collect())
    }

    async fn get_justification(&self, entity_id: &str) -> Result<Option<Justification>> {
        Ok(self.justifications.get(entity_id).map(|j| j.value().clone()))
    }

    async fn get_domain_ontology(&self, repo_id: &str) -> Result<Option<DomainOntology>> {
        Ok(self.domain_ontologies.get(repo_id).map(|o| o.value().clone()))
    }

    async fn get_feature_aggregations(&self, repo_id: &str) -> Result<Vec<FeatureAggregation>> {
        Ok(self.feature_aggregations.get(repo_id).map(|v| v.clone()).unwrap_or_default())
    }

    async fn get_callees_of(&self, entity_id: &str) -> Result<Vec<String>> {
        for repo_edges in self.edges.iter() {
            let found: Vec<String> = repo_edges
                .value()
                .iter()
                .filter(|e| e.value().kind == EdgeKind::Calls && Self::strip_collection(&e.value().from) == entity_id)
                .map(|e| Self::strip_collection(&e.value().to).to_string())
                .collect();
            if !found.is_empty() {
                return Ok(found);
            }
        }
        Ok(Vec::new())
    }

    async fn get_callers_of(&self, entity_id: &str) -> Result<Vec<String>> {
        for repo_edges in self.edges.iter() {
            let found: Vec<String> = repo_edges
                .value()
                .iter()
                .filter(|e| e.value().kind == EdgeKind::Calls && Self::strip_collection(&e.value().to) == entity_id)
                .map(|e| Self::strip_collection(&e.value().from).to_string())
                .collect();
            if !found.is_empty() {
                return Ok(found);
            }
        }
        Ok(Vec::new())
    }

    async fn bootstrap_graph_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn delete_stale_by_index_version(&self, repo_id: &str, current_version: &str) -> Result<usize> {
        let Some(entities) = self.entities.get(repo_id) else {
            return Ok(0);
        };
        let stale: Vec<String> = entities
            .iter()
            .filter(|e| e.value().index_version != current_version)
            .map(|e| e.key().clone())
            .collect();
        for id in &stale {
            entities.remove(id);
        }
        Ok(stale.len())
    }

    async fn verify_entity_counts(&self, repo_id: &str) -> Result<usize> {
        Ok(self.entities.get(repo_id).map(|m| m.len()).unwrap_or(0))
    }

    async fn delete_repo_data(&self, repo_id: &str) -> Result<()> {
        self.entities.remove(repo_id);
        self.edges.remove(repo_id);
        self.feature_aggregations.remove(repo_id);
        self.adrs.remove(repo_id);
        self.health_reports.remove(repo_id);
        self.domain_ontologies.remove(repo_id);
        self.index_events.remove(repo_id);
        Ok(())
    }

    async fn delete_entities_by_file_paths(&self, repo_id: &str, paths: &[String]) -> Result<usize> {
        let Some(entities) = self.entities.get(repo_id) else {
            return Ok(0);
        };
        let path_set: std::collections::HashSet<&String> = paths.iter().collect();
        let doomed: Vec<String> = entities
            .iter()
            .filter(|e| path_set.contains(&e.value().file_path))
            .map(|e| e.key().clone())
            .collect();
        for id in &doomed {
            entities.remove(id);
        }
        Ok(doomed.len())
    }

    async fn delete_dangling_edges(&self, repo_id: &str) -> Result<usize> {
        let Some(edges) = self.edges.get(repo_id) else {
            return Ok(0);
        };
        let live_ids: std::collections::HashSet<String> = self
            .entities
            .get(repo_id)
            .map(|m| m.iter().map(|e| e.key().clone()).collect())
            .unwrap_or_default();
        let dangling: Vec<String> = edges
            .iter()
            .filter(|e| {
                !live_ids.contains(Self::strip_collection(&e.value().from)) || !live_ids.contains(Self::strip_collection(&e.value().to))
            })
            .map(|e| e.key().clone())
            .collect();
        for key in &dangling {
            edges.remove(key);
        }
        Ok(dangling.len())
    }

    async fn get_index_events(&self, repo_id: &str) -> Result<Vec<IndexEvent>> {
        Ok(self.index_events.get(repo_id).map(|v| v.clone()).unwrap_or_default())
    }

    async fn append_index_event(&self, event: IndexEvent) -> Result<()> {
        self.index_events.entry(event.repo_id.clone()).or_default().push(event);
        Ok(())
    }
}
