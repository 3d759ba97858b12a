//! Dead-code short-circuit and name/path heuristic classification
//! (spec.md §4.6.2 steps 1-2), both of which skip the LLM entirely.

use semgraph_core::{Edge, EdgeKind, Entity, Justification, ModelTier, Taxonomy};

/// True when no inbound `calls`/`imports`/`references` edge targets this
/// entity — the dependency-graph half of the dead-code check.
pub fn has_no_inbound_references(entity_id: &str, edges: &[Edge]) -> bool {
    !edges.iter().any(|e| {
        matches!(e.kind, EdgeKind::Calls | EdgeKind::Imports | EdgeKind::References) && e.to.ends_with(entity_id)
    })
}

/// Step 1: an unexported entity with zero inbound references is dead
/// code. Emits directly, skipping both heuristics and the LLM.
pub fn dead_code_short_circuit(entity: &Entity, edges: &[Edge], body_hash: &str) -> Option<Justification> {
    if entity.exported || !has_no_inbound_references(&entity.id, edges) {
        return None;
    }
    Some(fallback_justification(
        entity,
        Taxonomy::Utility,
        0.7,
        ModelTier::Heuristic,
        "Unreferenced and unexported; likely dead code.".to_string(),
        "dead_code".to_string(),
        body_hash,
    ))
}

struct HeuristicMatch {
    taxonomy: Taxonomy,
    business_purpose: &'static str,
    feature_tag: &'static str,
}

/// Step 2: name/path heuristics (spec.md §4.6.2 step 2). Returns `None`
/// when nothing matches, letting the entity fall through to the LLM.
pub fn heuristic_classification(entity: &Entity, body_hash: &str) -> Option<Justification> {
    let name = entity.name.to_lowercase();
    let path = entity.file_path.to_lowercase();

    let matched = if path.contains("lib/utils/") || path.contains("/utils/") {
        Some(HeuristicMatch { taxonomy: Taxonomy::Utility, business_purpose: "Shared utility helper.", feature_tag: "utility" })
    } else if name.starts_with("format") {
        Some(HeuristicMatch { taxonomy: Taxonomy::Utility, business_purpose: "Formats a value for display.", feature_tag: "formatting" })
    } else if name.starts_with("parse") {
        Some(HeuristicMatch { taxonomy: Taxonomy::Utility, business_purpose: "Parses input into a structured value.", feature_tag: "parsing" })
    } else if name.starts_with("sanitize") {
        Some(HeuristicMatch { taxonomy: Taxonomy::Utility, business_purpose: "Sanitizes untrusted input.", feature_tag: "sanitization" })
    } else if path.contains("api/") && path.contains("route") {
        Some(HeuristicMatch { taxonomy: Taxonomy::Vertical, business_purpose: "HTTP route entry point.", feature_tag: "api-routing" })
    } else if name == "main" || path.ends_with("main.rs") {
        Some(HeuristicMatch { taxonomy: Taxonomy::Vertical, business_purpose: "Process entry point.", feature_tag: "entrypoint" })
    } else if path.contains("cli") {
        Some(HeuristicMatch { taxonomy: Taxonomy::Vertical, business_purpose: "Command-line entry point.", feature_tag: "cli" })
    } else {
        None
    };

    matched.map(|m| {
        fallback_justification(
            entity,
            m.taxonomy,
            0.6,
            ModelTier::Heuristic,
            m.business_purpose.to_string(),
            m.feature_tag.to_string(),
            body_hash,
        )
    })
}

/// Shared by both heuristic paths and the terminal-LLM-failure fallback
/// (spec.md §4.6.2 step 6), differing only in confidence/tier/text.
pub fn fallback_justification(
    entity: &Entity,
    taxonomy: Taxonomy,
    confidence: f32,
    tier: ModelTier,
    business_purpose: String,
    feature_tag: String,
    body_hash: &str,
) -> Justification {
    let now = chrono::Utc::now();
    Justification {
        entity_id: entity.id.clone(),
        taxonomy,
        confidence,
        business_purpose,
        domain_concepts: Vec::new(),
        feature_tag,
        semantic_triples: Vec::new(),
        compliance_tags: Vec::new(),
        architectural_pattern: None,
        model_tier: tier,
        model_used: None,
        quality_score: confidence,
        quality_flags: Vec::new(),
        body_hash: body_hash.to_string(),
        valid_from: now,
        valid_to: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semgraph_core::EntityKind;

    fn entity(name: &str, path: &str, exported: bool) -> Entity {
        let mut e = Entity::new("org", "repo", "v1", EntityKind::Function, name, path, "rust");
        e.id = format!("id-{name}");
        e.exported = exported;
        e
    }

    #[test]
    fn unexported_entity_with_no_inbound_refs_is_dead_code() {
        let e = entity("helper", "a.rs", false);
        let justification = dead_code_short_circuit(&e, &[], "hash").unwrap();
        assert_eq!(justification.feature_tag, "dead_code");
        assert_eq!(justification.confidence, 0.7);
        assert_eq!(justification.model_tier, ModelTier::Heuristic);
    }

    #[test]
    fn exported_entity_is_never_dead_code() {
        let e = entity("helper", "a.rs", true);
        assert!(dead_code_short_circuit(&e, &[], "hash").is_none());
    }

    #[test]
    fn entity_with_inbound_call_is_not_dead_code() {
        let e = entity("helper", "a.rs", false);
        let edge = Edge { key: "k".into(), from: "entities/caller".into(), to: format!("entities/{}", e.id), kind: EdgeKind::Calls };
        assert!(dead_code_short_circuit(&e, &[edge], "hash").is_none());
    }

    #[test]
    fn name_prefix_parse_classifies_as_utility() {
        let e = entity("parseConfig", "src/config.rs", true);
        let justification = heuristic_classification(&e, "hash").unwrap();
        assert_eq!(justification.taxonomy, Taxonomy::Utility);
        assert_eq!(justification.feature_tag, "parsing");
    }

    #[test]
    fn main_function_classifies_as_vertical_entrypoint() {
        let e = entity("main", "src/main.rs", true);
        let justification = heuristic_classification(&e, "hash").unwrap();
        assert_eq!(justification.taxonomy, Taxonomy::Vertical);
        assert_eq!(justification.feature_tag, "entrypoint");
    }

    #[test]
    fn unmatched_entity_falls_through_to_llm() {
        let e = entity("processOrder", "src/orders.rs", true);
        assert!(heuristic_classification(&e, "hash").is_none());
    }
}
