//! Context assembly (spec.md §4.6.2 step 4, §4.6.5): everything the
//! prompt builder and the propagation pass need about an entity's
//! neighborhood.

use std::collections::HashMap;

use semgraph_core::{Edge, EdgeKind, Entity, EntityKind, Justification};

#[derive(Debug, Clone)]
pub struct Neighbor {
    pub id: String,
    pub name: String,
    pub kind: EntityKind,
}

/// Everything the justification pipeline knows about one entity's
/// neighborhood before generation (spec.md §4.6.2 step 4).
#[derive(Debug, Clone, Default)]
pub struct EntityContext {
    pub callers: Vec<Neighbor>,
    pub callees: Vec<Neighbor>,
    pub test_assertions: Vec<String>,
    pub parent_justification: Option<Justification>,
    pub sibling_names: Vec<String>,
    pub callee_justifications: HashMap<String, Justification>,
}

fn strip_collection(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

fn neighbor_lookup(entities: &[Entity]) -> HashMap<&str, &Entity> {
    entities.iter().map(|e| (e.id.as_str(), e)).collect()
}

/// Direct callers/callees of `entity_id` via `Calls` edges.
fn direct_neighbors(entity_id: &str, edges: &[Edge], by_id: &HashMap<&str, &Entity>) -> (Vec<Neighbor>, Vec<Neighbor>) {
    let mut callers = Vec::new();
    let mut callees = Vec::new();

    for edge in edges {
        if edge.kind != EdgeKind::Calls {
            continue;
        }
        let from = strip_collection(&edge.from);
        let to = strip_collection(&edge.to);

        if to == entity_id {
            if let Some(e) = by_id.get(from) {
                callers.push(Neighbor { id: e.id.clone(), name: e.name.clone(), kind: e.kind });
            }
        }
        if from == entity_id {
            if let Some(e) = by_id.get(to) {
                callees.push(Neighbor { id: e.id.clone(), name: e.name.clone(), kind: e.kind });
            }
        }
    }

    (callers, callees)
}

/// Assertion-bearing lines from test files that call into `entity_id`,
/// a best-effort signal (spec.md §4.6.2 step 4 "test context").
fn test_assertions(entity_id: &str, edges: &[Edge], by_id: &HashMap<&str, &Entity>) -> Vec<String> {
    let mut assertions = Vec::new();
    for edge in edges {
        if edge.kind != EdgeKind::Calls || strip_collection(&edge.to) != entity_id {
            continue;
        }
        let Some(caller) = by_id.get(strip_collection(&edge.from)) else { continue };
        let path = caller.file_path.to_lowercase();
        if !(path.contains("test") || path.contains("spec")) {
            continue;
        }
        for line in caller.body.lines() {
            if line.contains("assert") {
                assertions.push(line.trim().to_string());
            }
        }
    }
    assertions
}

fn sibling_names(entity: &Entity, entities: &[Entity]) -> Vec<String> {
    let Some(parent) = &entity.parent else { return Vec::new() };
    entities
        .iter()
        .filter(|e| e.id != entity.id && e.parent.as_deref() == Some(parent.as_str()))
        .map(|e| e.name.clone())
        .collect()
}

fn parent_justification(entity: &Entity, entities: &[Entity], justifications: &HashMap<String, Justification>) -> Option<Justification> {
    let parent_name = entity.parent.as_ref()?;
    let parent_entity = entities.iter().find(|e| &e.name == parent_name && e.file_path == entity.file_path)?;
    justifications.get(&parent_entity.id).cloned()
}

/// Builds the full context for one entity. `justifications` holds every
/// justification resolved at a lower level so far (spec.md §4.6.2 step 4
/// "callee justifications").
pub fn assemble(
    entity: &Entity,
    entities: &[Entity],
    edges: &[Edge],
    justifications: &HashMap<String, Justification>,
) -> EntityContext {
    let by_id = neighbor_lookup(entities);
    let (callers, callees) = direct_neighbors(&entity.id, edges, &by_id);
    let test_assertions = test_assertions(&entity.id, edges, &by_id);
    let sibling_names = sibling_names(entity, entities);
    let parent_justification = parent_justification(entity, entities, justifications);

    let callee_justifications = callees
        .iter()
        .filter_map(|c| justifications.get(&c.id).map(|j| (c.id.clone(), j.clone())))
        .collect();

    EntityContext { callers, callees, test_assertions, parent_justification, sibling_names, callee_justifications }
}
