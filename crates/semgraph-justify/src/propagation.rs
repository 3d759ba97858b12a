//! Context propagation (spec.md §4.6.5): after all levels are
//! justified, feature tags and domain concepts flow from children
//! upward and from parents downward. Kept as a side table distinct
//! from each entity's primary [`Justification`] (recorded as an Open
//! Question resolution in `DESIGN.md`, since the persisted schema has
//! no secondary tag fields to overwrite).

use std::collections::{HashMap, HashSet};

use semgraph_core::{Edge, EdgeKind, Entity, Justification};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagatedTags {
    pub feature_tag: Option<String>,
    pub domain_concepts: Vec<String>,
}

fn strip_collection(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

fn callee_ids(entity_id: &str, edges: &[Edge]) -> Vec<&str> {
    edges
        .iter()
        .filter(|e| matches!(e.kind, EdgeKind::Calls | EdgeKind::References) && strip_collection(&e.from) == entity_id)
        .map(|e| strip_collection(&e.to))
        .collect()
}

/// Most-frequent `feature_tag` among an entity's direct callees, or
/// `None` if it has no callees with a justification.
fn most_frequent_callee_tag(entity_id: &str, edges: &[Edge], justifications: &HashMap<String, Justification>) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for callee in callee_ids(entity_id, edges) {
        if let Some(j) = justifications.get(callee) {
            *counts.entry(j.feature_tag.as_str()).or_insert(0) += 1;
        }
    }
    counts.into_iter().max_by_key(|(_, count)| *count).map(|(tag, _)| tag.to_string())
}

/// Computes one [`PropagatedTags`] per entity: `feature_tag` inherited
/// from the parent class when the entity's own justification has none
/// worth overriding, aggregated upward from callees otherwise; domain
/// concepts are the union of callee concepts.
pub fn propagate(entities: &[Entity], edges: &[Edge], justifications: &HashMap<String, Justification>) -> HashMap<String, PropagatedTags> {
    let mut result = HashMap::new();

    for entity in entities {
        let upward_tag = most_frequent_callee_tag(&entity.id, edges, justifications);

        let downward_tag = entity.parent.as_ref().and_then(|parent_name| {
            entities
                .iter()
                .find(|e| &e.name == parent_name && e.file_path == entity.file_path)
                .and_then(|parent| justifications.get(&parent.id))
                .map(|j| j.feature_tag.clone())
        });

        let own_tag_is_generic = justifications.get(&entity.id).map(|j| j.feature_tag == "general" || j.feature_tag.is_empty()).unwrap_or(true);

        let feature_tag = if own_tag_is_generic {
            downward_tag.or(upward_tag)
        } else {
            None
        };

        let mut domain_concepts: Vec<String> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for callee in callee_ids(&entity.id, edges) {
            if let Some(j) = justifications.get(callee) {
                for concept in &j.domain_concepts {
                    if seen.insert(concept.as_str()) {
                        domain_concepts.push(concept.clone());
                    }
                }
            }
        }

        result.insert(entity.id.clone(), PropagatedTags { feature_tag, domain_concepts });
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::fallback_justification;
    use semgraph_core::{EntityKind, ModelTier, Taxonomy};

    fn entity(id: &str, name: &str, parent: Option<&str>) -> Entity {
        let mut e = Entity::new("org", "repo", "v1", EntityKind::Function, name, "a.rs", "rust");
        e.id = id.to_string();
        e.parent = parent.map(|p| p.to_string());
        e
    }

    fn calls(from: &str, to: &str) -> Edge {
        Edge { key: format!("{from}-{to}"), from: format!("entities/{from}"), to: format!("entities/{to}"), kind: EdgeKind::Calls }
    }

    fn justification_with_tag(entity_id: &str, tag: &str) -> Justification {
        let e = Entity::new("org", "repo", "v1", EntityKind::Function, entity_id, "a.rs", "rust");
        let mut j = fallback_justification(&e, Taxonomy::Utility, 0.6, ModelTier::Heuristic, "x".into(), tag.into(), "hash");
        j.entity_id = entity_id.to_string();
        j
    }

    #[test]
    fn method_inherits_parent_class_feature_tag_when_generic() {
        let parent = entity("class", "Checkout", None);
        let method = entity("method", "run", Some("Checkout"));
        let entities = vec![parent, method];

        let mut justifications = HashMap::new();
        justifications.insert("class".to_string(), justification_with_tag("class", "billing"));
        justifications.insert("method".to_string(), justification_with_tag("method", "general"));

        let propagated = propagate(&entities, &[], &justifications);
        assert_eq!(propagated["method"].feature_tag, Some("billing".to_string()));
    }

    #[test]
    fn aggregates_most_frequent_callee_tag_upward() {
        let caller = entity("caller", "orchestrate", None);
        let callee_a = entity("a", "a", None);
        let callee_b = entity("b", "b", None);
        let entities = vec![caller, callee_a, callee_b];
        let edges = vec![calls("caller", "a"), calls("caller", "b")];

        let mut justifications = HashMap::new();
        justifications.insert("caller".to_string(), justification_with_tag("caller", "general"));
        justifications.insert("a".to_string(), justification_with_tag("a", "billing"));
        justifications.insert("b".to_string(), justification_with_tag("b", "billing"));

        let propagated = propagate(&entities, &edges, &justifications);
        assert_eq!(propagated["caller"].feature_tag, Some("billing".to_string()));
    }

    #[test]
    fn non_generic_own_tag_is_left_untouched() {
        let caller = entity("caller", "orchestrate", None);
        let callee = entity("a", "a", None);
        let entities = vec![caller, callee];
        let edges = vec![calls("caller", "a")];

        let mut justifications = HashMap::new();
        justifications.insert("caller".to_string(), justification_with_tag("caller", "auth"));
        justifications.insert("a".to_string(), justification_with_tag("a", "billing"));

        let propagated = propagate(&entities, &edges, &justifications);
        assert_eq!(propagated["caller"].feature_tag, None);
    }
}
