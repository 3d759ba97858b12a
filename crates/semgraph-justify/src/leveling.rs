//! Topological leveling (spec.md §4.6.1): orders entities so every
//! `calls`/`references` dependency points from a later level to an
//! earlier one. Utilities (no outbound dependencies) land first, entry
//! points last; cycles are broken by picking the lowest-ID node.

use std::collections::{HashMap, HashSet};

use semgraph_core::{Edge, EdgeKind, Entity};

/// Direct callee ids (via `Calls`/`References` edges) for every entity.
fn callee_map(entities: &[Entity], edges: &[Edge]) -> HashMap<String, HashSet<String>> {
    let known: HashSet<&str> = entities.iter().map(|e| e.id.as_str()).collect();
    let mut callees: HashMap<String, HashSet<String>> = entities.iter().map(|e| (e.id.clone(), HashSet::new())).collect();

    for edge in edges {
        if !matches!(edge.kind, EdgeKind::Calls | EdgeKind::References) {
            continue;
        }
        let Some(from) = strip_collection(&edge.from) else { continue };
        let Some(to) = strip_collection(&edge.to) else { continue };
        if from == to || !known.contains(to) {
            continue;
        }
        callees.entry(from.to_string()).or_default().insert(to.to_string());
    }

    callees
}

fn strip_collection(id: &str) -> Option<&str> {
    id.rsplit('/').next()
}

/// Returns ordered levels of entity IDs. Every entity appears exactly
/// once, in the earliest level its callees allow.
pub fn topological_levels(entities: &[Entity], edges: &[Edge]) -> Vec<Vec<String>> {
    let callees = callee_map(entities, edges);
    let mut remaining: HashSet<String> = entities.iter().map(|e| e.id.clone()).collect();
    let mut levels = Vec::new();

    while !remaining.is_empty() {
        let mut ready: Vec<String> = remaining
            .iter()
            .filter(|id| callees.get(*id).map(|c| c.iter().all(|callee| !remaining.contains(callee))).unwrap_or(true))
            .cloned()
            .collect();

        if ready.is_empty() {
            // Cycle: force progress by releasing the lowest-ID node.
            let mut sorted: Vec<&String> = remaining.iter().collect();
            sorted.sort();
            ready.push(sorted[0].clone());
        }

        ready.sort();
        for id in &ready {
            remaining.remove(id);
        }
        levels.push(ready);
    }

    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use semgraph_core::EntityKind;

    fn entity(id: &str) -> Entity {
        let mut e = Entity::new("org", "repo", "v1", EntityKind::Function, id, "a.rs", "rust");
        e.id = id.to_string();
        e
    }

    fn calls(from: &str, to: &str) -> Edge {
        Edge {
            key: format!("{from}->{to}"),
            from: format!("entities/{from}"),
            to: format!("entities/{to}"),
            kind: EdgeKind::Calls,
        }
    }

    #[test]
    fn utility_with_no_callees_lands_in_first_level() {
        let entities = vec![entity("util"), entity("caller")];
        let edges = vec![calls("caller", "util")];
        let levels = topological_levels(&entities, &edges);
        assert_eq!(levels[0], vec!["util".to_string()]);
        assert_eq!(levels[1], vec!["caller".to_string()]);
    }

    #[test]
    fn independent_entities_share_a_level() {
        let entities = vec![entity("a"), entity("b")];
        let levels = topological_levels(&entities, &[]);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0], vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn cycles_are_broken_by_lowest_id() {
        let entities = vec![entity("a"), entity("b")];
        let edges = vec![calls("a", "b"), calls("b", "a")];
        let levels = topological_levels(&entities, &edges);
        let total: usize = levels.iter().map(|l| l.len()).sum();
        assert_eq!(total, 2);
        // "a" is released first since it sorts lowest among the stuck set.
        assert_eq!(levels[0], vec!["a".to_string()]);
    }
}
