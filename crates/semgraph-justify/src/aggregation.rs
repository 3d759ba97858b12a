//! Feature aggregation, health reporting, and ADR synthesis
//! (spec.md §4.6.6).

use std::collections::{HashMap, HashSet};

use semgraph_core::{
    Adr, Edge, EdgeKind, Entity, FeatureAggregation, HealthReport, HealthRisk, Justification,
    RiskLevel, RiskSeverity, TaxonomyBreakdown,
};

fn strip_collection(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

/// Entities in `group_ids` that receive at least one inbound `calls`
/// edge from an entity outside the group (spec.md §4.6.6 "entry_points").
fn entry_points(group_ids: &HashSet<&str>, edges: &[Edge]) -> Vec<String> {
    let mut entries = HashSet::new();
    for edge in edges {
        if edge.kind != EdgeKind::Calls {
            continue;
        }
        let from = strip_collection(&edge.from);
        let to = strip_collection(&edge.to);
        if group_ids.contains(to) && !group_ids.contains(from) {
            entries.insert(to.to_string());
        }
    }
    let mut entries: Vec<String> = entries.into_iter().collect();
    entries.sort();
    entries
}

/// Groups justifications by `feature_tag`, one [`FeatureAggregation`]
/// per tag (spec.md §4.6.6).
pub fn aggregate_features(repo_id: &str, entities: &[Entity], justifications: &[Justification], edges: &[Edge]) -> Vec<FeatureAggregation> {
    let by_id: HashMap<&str, &Entity> = entities.iter().map(|e| (e.id.as_str(), e)).collect();

    let mut by_tag: HashMap<&str, Vec<&Justification>> = HashMap::new();
    for j in justifications {
        by_tag.entry(j.feature_tag.as_str()).or_default().push(j);
    }

    let mut aggregations: Vec<FeatureAggregation> = by_tag
        .into_iter()
        .map(|(tag, group)| {
            let group_ids: HashSet<&str> = group.iter().map(|j| j.entity_id.as_str()).collect();
            let mut breakdown = TaxonomyBreakdown::default();
            for j in &group {
                match j.taxonomy {
                    semgraph_core::Taxonomy::Vertical => breakdown.vertical += 1,
                    semgraph_core::Taxonomy::Horizontal => breakdown.horizontal += 1,
                    semgraph_core::Taxonomy::Utility => breakdown.utility += 1,
                }
            }
            FeatureAggregation {
                repo_id: repo_id.to_string(),
                feature_tag: tag.to_string(),
                entity_count: group.len(),
                entry_points: entry_points(&group_ids, edges)
                    .into_iter()
                    .filter(|id| by_id.contains_key(id.as_str()))
                    .collect(),
                taxonomy_breakdown: breakdown,
            }
        })
        .collect();

    aggregations.sort_by(|a, b| b.entity_count.cmp(&a.entity_count).then_with(|| a.feature_tag.cmp(&b.feature_tag)));
    aggregations
}

const LOW_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Summarizes risks, severity counts, and overall confidence/coverage
/// for a repo (spec.md §4.6.6 "HealthReport").
pub fn build_health_report(repo_id: &str, entities: &[Entity], justifications: &[Justification]) -> HealthReport {
    let by_entity: HashMap<&str, &Justification> = justifications.iter().map(|j| (j.entity_id.as_str(), j)).collect();
    let mut risks = Vec::new();

    for entity in entities {
        if entity.risk_level == RiskLevel::High {
            risks.push(HealthRisk {
                entity_id: entity.id.clone(),
                severity: RiskSeverity::High,
                reason: "High blast radius (fan_in/fan_out above threshold).".to_string(),
            });
        }
        if let Some(j) = by_entity.get(entity.id.as_str()) {
            if j.feature_tag == "dead_code" {
                risks.push(HealthRisk {
                    entity_id: entity.id.clone(),
                    severity: RiskSeverity::Low,
                    reason: "Unreferenced and unexported; likely dead code.".to_string(),
                });
            } else if j.confidence < LOW_CONFIDENCE_THRESHOLD {
                risks.push(HealthRisk {
                    entity_id: entity.id.clone(),
                    severity: RiskSeverity::Medium,
                    reason: format!("Low-confidence justification ({:.2}).", j.confidence),
                });
            }
        }
    }

    let average_confidence = if justifications.is_empty() {
        0.0
    } else {
        justifications.iter().map(|j| j.confidence).sum::<f32>() / justifications.len() as f32
    };

    let coverage = if entities.is_empty() {
        0.0
    } else {
        justifications.len() as f32 / entities.len() as f32
    };

    HealthReport {
        repo_id: repo_id.to_string(),
        risks,
        average_confidence,
        coverage,
        generated_at: chrono::Utc::now(),
    }
}

/// One ADR per top feature aggregation, written off the justifications
/// of its entry points (spec.md §4.6.6 "ADR synthesizer"). Truly a
/// stand-in for a structured LLM call (spec.md §1 Non-goals): this
/// composes deterministic prose rather than invoking a model.
pub fn synthesize_adrs(repo_id: &str, aggregations: &[FeatureAggregation], justifications: &[Justification], top_n: usize) -> Vec<Adr> {
    let by_entity: HashMap<&str, &Justification> = justifications.iter().map(|j| (j.entity_id.as_str(), j)).collect();

    aggregations
        .iter()
        .take(top_n)
        .map(|agg| {
            let entry_purposes: Vec<&str> = agg
                .entry_points
                .iter()
                .filter_map(|id| by_entity.get(id.as_str()))
                .map(|j| j.business_purpose.as_str())
                .collect();

            let context = if entry_purposes.is_empty() {
                format!("The \"{}\" feature area has {} entities with no external entry points.", agg.feature_tag, agg.entity_count)
            } else {
                format!(
                    "The \"{}\" feature area has {} entities, entered via: {}.",
                    agg.feature_tag,
                    agg.entity_count,
                    entry_purposes.join("; ")
                )
            };

            Adr {
                repo_id: repo_id.to_string(),
                title: format!("Adopt a dedicated \"{}\" feature boundary", agg.feature_tag),
                context,
                decision: format!("Treat \"{}\" as a cohesive feature area for review and ownership.", agg.feature_tag),
                consequences: format!(
                    "{} vertical, {} horizontal, {} utility entities now share a feature tag for aggregation and health reporting.",
                    agg.taxonomy_breakdown.vertical, agg.taxonomy_breakdown.horizontal, agg.taxonomy_breakdown.utility
                ),
                referenced_entities: agg.entry_points.clone(),
                feature_areas: vec![agg.feature_tag.clone()],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::fallback_justification;
    use semgraph_core::{EntityKind, ModelTier, Taxonomy};

    fn entity(id: &str, risk: RiskLevel) -> Entity {
        let mut e = Entity::new("org", "repo", "v1", EntityKind::Function, id, "a.rs", "rust");
        e.id = id.to_string();
        e.risk_level = risk;
        e
    }

    fn justification(entity_id: &str, feature_tag: &str, confidence: f32, taxonomy: Taxonomy) -> Justification {
        let e = Entity::new("org", "repo", "v1", EntityKind::Function, entity_id, "a.rs", "rust");
        let mut j = fallback_justification(&e, taxonomy, confidence, ModelTier::Fast, "does things".into(), feature_tag.into(), "hash");
        j.entity_id = entity_id.to_string();
        j
    }

    #[test]
    fn aggregates_by_feature_tag_and_sorts_by_size() {
        let entities = vec![entity("a", RiskLevel::Normal), entity("b", RiskLevel::Normal), entity("c", RiskLevel::Normal)];
        let justifications = vec![
            justification("a", "billing", 0.9, Taxonomy::Vertical),
            justification("b", "billing", 0.9, Taxonomy::Vertical),
            justification("c", "auth", 0.9, Taxonomy::Vertical),
        ];
        let aggs = aggregate_features("repo", &entities, &justifications, &[]);
        assert_eq!(aggs[0].feature_tag, "billing");
        assert_eq!(aggs[0].entity_count, 2);
        assert_eq!(aggs[1].feature_tag, "auth");
    }

    #[test]
    fn finds_entry_points_called_from_outside_the_group() {
        let entities = vec![entity("outside", RiskLevel::Normal), entity("a", RiskLevel::Normal)];
        let justifications = vec![justification("a", "billing", 0.9, Taxonomy::Vertical)];
        let edges = vec![Edge { key: "k".into(), from: "entities/outside".into(), to: "entities/a".into(), kind: EdgeKind::Calls }];
        let aggs = aggregate_features("repo", &entities, &justifications, &edges);
        assert_eq!(aggs[0].entry_points, vec!["a".to_string()]);
    }

    #[test]
    fn health_report_flags_high_risk_and_low_confidence() {
        let entities = vec![entity("risky", RiskLevel::High), entity("unsure", RiskLevel::Normal)];
        let justifications = vec![
            justification("risky", "billing", 0.9, Taxonomy::Vertical),
            justification("unsure", "billing", 0.2, Taxonomy::Vertical),
        ];
        let report = build_health_report("repo", &entities, &justifications);
        assert_eq!(report.risks.len(), 2);
        assert!(report.risks.iter().any(|r| r.entity_id == "risky" && r.severity == RiskSeverity::High));
        assert!(report.risks.iter().any(|r| r.entity_id == "unsure" && r.severity == RiskSeverity::Medium));
        assert!((report.coverage - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn synthesizes_one_adr_per_top_feature() {
        let entities = vec![entity("a", RiskLevel::Normal)];
        let justifications = vec![justification("a", "billing", 0.9, Taxonomy::Vertical)];
        let edges = vec![Edge { key: "k".into(), from: "entities/outside".into(), to: "entities/a".into(), kind: EdgeKind::Calls }];
        let aggs = aggregate_features("repo", &entities, &justifications, &edges);
        let adrs = synthesize_adrs("repo", &aggs, &justifications, 5);
        assert_eq!(adrs.len(), 1);
        assert!(adrs[0].title.contains("billing"));
        assert!(adrs[0].context.contains("does things"));
    }
}
