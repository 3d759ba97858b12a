//! Weighted PageRank, fan-in/fan-out, and risk tagging (spec.md §4.4).
//!
//! Grounded in the teacher's power-iteration style used for query
//! optimization stats (`codegraph-graph/src/graph.rs`'s `QueryStats`), but
//! the algorithm itself has no teacher counterpart — PageRank is new, and
//! follows the damping/epsilon/iteration-cap contract the spec states
//! directly.

use std::collections::HashMap;

use semgraph_core::{Edge, EdgeKind, Entity, PipelineConfig, RiskLevel};

/// Edge weights by kind, documented per the spec's Open Question (§9):
/// `calls > imports > references > contains(=0)`. `implements`/`inherits`
/// carry the same weight as `imports` (both express a structural,
/// non-call dependency); `exports` is weighted below `references` since
/// it is the weakest form of directed relationship.
pub fn edge_weight(kind: EdgeKind) -> f64 {
    match kind {
        EdgeKind::Calls => 1.0,
        EdgeKind::Imports => 0.6,
        EdgeKind::Implements => 0.6,
        EdgeKind::Inherits => 0.6,
        EdgeKind::References => 0.4,
        EdgeKind::Exports => 0.3,
        EdgeKind::Contains => 0.0,
    }
}

#[derive(Debug, Clone, Default)]
pub struct CentralityResult {
    /// entity id -> weighted PageRank score
    pub pagerank: HashMap<String, f64>,
    /// entity id -> 0..=100 percentile rank
    pub percentile: HashMap<String, u8>,
    pub fan_in: HashMap<String, u32>,
    pub fan_out: HashMap<String, u32>,
    pub risk_level: HashMap<String, RiskLevel>,
}

/// Compute fan-in/fan-out over `calls` edges only (spec.md §4.4), for
/// every entity of kind function/method.
pub fn compute_fan_in_out(entities: &[Entity], edges: &[Edge]) -> (HashMap<String, u32>, HashMap<String, u32>) {
    let mut fan_in: HashMap<String, u32> = HashMap::new();
    let mut fan_out: HashMap<String, u32> = HashMap::new();

    let function_ids: std::collections::HashSet<&str> = entities
        .iter()
        .filter(|e| e.is_function_like())
        .map(|e| e.id.as_str())
        .collect();

    for edge in edges {
        if edge.kind != EdgeKind::Calls {
            continue;
        }
        let from_id = strip_collection(&edge.from);
        let to_id = strip_collection(&edge.to);
        if function_ids.contains(from_id) {
            *fan_out.entry(from_id.to_string()).or_insert(0) += 1;
        }
        if function_ids.contains(to_id) {
            *fan_in.entry(to_id.to_string()).or_insert(0) += 1;
        }
    }

    (fan_in, fan_out)
}

fn strip_collection(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

/// Weighted PageRank over every entity (spec.md §4.4).
///
/// Contracts honored:
/// - empty graph -> empty outputs.
/// - single node -> score 1.0, percentile 100.
/// - unknown node ids on edges are ignored.
/// - `contains` edges (weight 0) are excluded from effective transitions.
/// - dangling nodes (zero effective out-weight) redistribute via teleport.
pub fn weighted_pagerank(entities: &[Entity], edges: &[Edge], config: &PipelineConfig) -> CentralityResult {
    let mut result = CentralityResult::default();
    if entities.is_empty() {
        return result;
    }

    let ids: Vec<String> = entities.iter().map(|e| e.id.clone()).collect();
    let index_of: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();
    let n = ids.len();

    if n == 1 {
        result.pagerank.insert(ids[0].clone(), 1.0);
        result.percentile.insert(ids[0].clone(), 100);
        let (fan_in, fan_out) = compute_fan_in_out(entities, edges);
        apply_risk(&mut result, entities, config, fan_in, fan_out);
        return result;
    }

    // Build weighted adjacency: out_edges[i] = Vec<(j, weight)>, skipping
    // unknown endpoints and zero-weight (contains) edges.
    let mut out_edges: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    let mut out_weight_sum = vec![0.0f64; n];

    for edge in edges {
        let w = edge_weight(edge.kind);
        if w <= 0.0 {
            continue;
        }
        let from_id = strip_collection(&edge.from);
        let to_id = strip_collection(&edge.to);
        let (Some(&i), Some(&j)) = (index_of.get(from_id), index_of.get(to_id)) else {
            continue;
        };
        out_edges[i].push((j, w));
        out_weight_sum[i] += w;
    }

    let d = config.pagerank_damping;
    let teleport = (1.0 - d) / n as f64;

    let mut scores = vec![1.0 / n as f64; n];

    for _ in 0..config.pagerank_max_iterations {
        let dangling_mass: f64 = (0..n)
            .filter(|&i| out_weight_sum[i] == 0.0)
            .map(|i| scores[i])
            .sum();

        let mut next = vec![teleport + d * dangling_mass / n as f64; n];

        for (i, edges_from_i) in out_edges.iter().enumerate() {
            if out_weight_sum[i] == 0.0 {
                continue;
            }
            let contribution = d * scores[i] / out_weight_sum[i];
            for &(j, w) in edges_from_i {
                next[j] += contribution * w;
            }
        }

        let delta: f64 = next.iter().zip(scores.iter()).map(|(a, b)| (a - b).abs()).sum();
        scores = next;
        if delta < config.pagerank_epsilon {
            break;
        }
    }

    for (i, id) in ids.iter().enumerate() {
        result.pagerank.insert(id.clone(), scores[i]);
    }

    // Percentile: rank ascending, map to 0..=100, ties share a rank band.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap());
    for (rank, &i) in order.iter().enumerate() {
        let pct = if n == 1 { 100 } else { (rank * 100 / (n - 1)) as u8 };
        result.percentile.insert(ids[i].clone(), pct);
    }

    let (fan_in, fan_out) = compute_fan_in_out(entities, edges);
    apply_risk(&mut result, entities, config, fan_in, fan_out);
    result
}

fn apply_risk(
    result: &mut CentralityResult,
    entities: &[Entity],
    config: &PipelineConfig,
    fan_in: HashMap<String, u32>,
    fan_out: HashMap<String, u32>,
) {
    for entity in entities {
        let fi = *fan_in.get(&entity.id).unwrap_or(&0);
        let fo = *fan_out.get(&entity.id).unwrap_or(&0);
        result.risk_level.insert(entity.id.clone(), config.risk_level(fi, fo));
    }
    result.fan_in = fan_in;
    result.fan_out = fan_out;
}

/// Apply a [`CentralityResult`] back onto owned entities (spec.md §4.4
/// "Persist fan_in, fan_out, risk_level, pagerank, pagerank_percentile
/// back onto the entities").
pub fn apply_centrality(entities: &mut [Entity], result: &CentralityResult) {
    for entity in entities.iter_mut() {
        entity.fan_in = *result.fan_in.get(&entity.id).unwrap_or(&0);
        entity.fan_out = *result.fan_out.get(&entity.id).unwrap_or(&0);
        entity.risk_level = *result.risk_level.get(&entity.id).unwrap_or(&RiskLevel::Normal);
        entity.pagerank = *result.pagerank.get(&entity.id).unwrap_or(&0.0);
        entity.pagerank_percentile = *result.percentile.get(&entity.id).unwrap_or(&0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semgraph_core::EntityKind;

    fn entity(id: &str, kind: EntityKind) -> Entity {
        let mut e = Entity::new("org", "repo", "v1", kind, id, "f.rs", "rust");
        e.id = id.to_string();
        e
    }

    fn edge(from: &str, to: &str, kind: EdgeKind) -> Edge {
        Edge { key: format!("{from}-{to}"), from: format!("entities/{from}"), to: format!("entities/{to}"), kind }
    }

    #[test]
    fn empty_graph_yields_empty_outputs() {
        let result = weighted_pagerank(&[], &[], &PipelineConfig::default());
        assert!(result.pagerank.is_empty());
        assert!(result.percentile.is_empty());
    }

    #[test]
    fn single_node_scores_one_full_percentile() {
        let entities = vec![entity("a", EntityKind::Function)];
        let result = weighted_pagerank(&entities, &[], &PipelineConfig::default());
        assert_eq!(result.pagerank["a"], 1.0);
        assert_eq!(result.percentile["a"], 100);
    }

    #[test]
    fn linear_chain_sink_has_highest_score() {
        // a -> b -> c (calls); expect score(c) > score(b) > score(a).
        let entities = vec![
            entity("a", EntityKind::Function),
            entity("b", EntityKind::Function),
            entity("c", EntityKind::Function),
        ];
        let edges = vec![edge("a", "b", EdgeKind::Calls), edge("b", "c", EdgeKind::Calls)];
        let result = weighted_pagerank(&entities, &edges, &PipelineConfig::default());
        assert!(result.pagerank["c"] > result.pagerank["b"]);
        assert!(result.pagerank["b"] > result.pagerank["a"]);
        assert_eq!(result.percentile["c"], 100);
        assert_eq!(result.percentile["a"], 0);
    }

    #[test]
    fn cyclic_graph_converges_to_near_equal_scores() {
        let entities = vec![
            entity("a", EntityKind::Function),
            entity("b", EntityKind::Function),
            entity("c", EntityKind::Function),
        ];
        let edges = vec![
            edge("a", "b", EdgeKind::Calls),
            edge("b", "c", EdgeKind::Calls),
            edge("c", "a", EdgeKind::Calls),
        ];
        let result = weighted_pagerank(&entities, &edges, &PipelineConfig::default());
        let scores: Vec<f64> = ["a", "b", "c"].iter().map(|id| result.pagerank[*id]).collect();
        let max = scores.iter().cloned().fold(f64::MIN, f64::max);
        let min = scores.iter().cloned().fold(f64::MAX, f64::min);
        assert!(max - min < 1e-2, "expected near-equal scores, got {:?}", scores);
    }

    #[test]
    fn unknown_node_ids_on_edges_are_ignored() {
        let entities = vec![entity("a", EntityKind::Function), entity("b", EntityKind::Function)];
        let edges = vec![edge("a", "b", EdgeKind::Calls), edge("a", "ghost", EdgeKind::Calls)];
        // Should not panic and should still converge.
        let result = weighted_pagerank(&entities, &edges, &PipelineConfig::default());
        assert_eq!(result.pagerank.len(), 2);
    }

    #[test]
    fn contains_edges_excluded_from_transitions() {
        // A file "contains" two functions that otherwise don't interact;
        // contains-only edges must not inflate either score above the other.
        let entities = vec![
            entity("file", EntityKind::File),
            entity("a", EntityKind::Function),
            entity("b", EntityKind::Function),
        ];
        let edges = vec![edge("file", "a", EdgeKind::Contains), edge("file", "b", EdgeKind::Contains)];
        let result = weighted_pagerank(&entities, &edges, &PipelineConfig::default());
        assert!((result.pagerank["a"] - result.pagerank["b"]).abs() < 1e-9);
    }

    #[test]
    fn risk_level_reflects_fan_in_out_threshold() {
        let mut entities = vec![entity("hub", EntityKind::Function)];
        let mut edges = Vec::new();
        for i in 0..12 {
            let caller = format!("caller{i}");
            entities.push(entity(&caller, EntityKind::Function));
            edges.push(edge(&caller, "hub", EdgeKind::Calls));
        }
        let config = PipelineConfig::default();
        let centrality = weighted_pagerank(&entities, &edges, &config);
        apply_centrality(&mut entities, &centrality);
        let hub = entities.iter().find(|e| e.id == "hub").unwrap();
        assert_eq!(hub.fan_in, 12);
        assert_eq!(hub.risk_level, RiskLevel::High);
    }

    #[test]
    fn weight_ordering_matches_spec_open_question() {
        assert!(edge_weight(EdgeKind::Calls) > edge_weight(EdgeKind::Imports));
        assert!(edge_weight(EdgeKind::Imports) > edge_weight(EdgeKind::References));
        assert!(edge_weight(EdgeKind::References) > edge_weight(EdgeKind::Contains));
        assert_eq!(edge_weight(EdgeKind::Contains), 0.0);
    }
}
