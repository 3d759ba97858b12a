//! Prompt assembly (spec.md §4.6.2 step 5): turns an entity plus its
//! [`crate::context::EntityContext`] into the single-entity prompt text
//! sent to an [`semgraph_core::LlmProvider`], and the matching parser
//! used by [`crate::provider::HeuristicLlmProvider`].

use std::collections::HashMap;

use semgraph_core::Entity;

use crate::context::EntityContext;

fn join_names(names: impl Iterator<Item = String>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

/// Builds the prompt text for one entity. Field order is fixed and
/// terminated by a `BODY:` marker so [`parse`] can split header from
/// source text unambiguously.
pub fn build_prompt(entity: &Entity, context: &EntityContext) -> String {
    let callee_purposes: String = context
        .callee_justifications
        .iter()
        .map(|(id, j)| {
            let name = context.callees.iter().find(|c| &c.id == id).map(|c| c.name.as_str()).unwrap_or(id.as_str());
            format!("{name}: {}", j.business_purpose)
        })
        .collect::<Vec<_>>()
        .join("; ");

    format!(
        "ENTITY_ID: {}\nENTITY_NAME: {}\nENTITY_KIND: {:?}\nENTITY_PATH: {}\nSIGNATURE: {}\nDOC: {}\nCALLERS: {}\nCALLEES: {}\nCALLEE_PURPOSES: {}\nTEST_ASSERTIONS: {}\nPARENT_JUSTIFICATION: {}\nSIBLINGS: {}\nBODY:\n{}\n",
        entity.id,
        entity.name,
        entity.kind,
        entity.file_path,
        entity.signature.clone().unwrap_or_else(|| "(none)".to_string()),
        entity.doc.clone().unwrap_or_else(|| "(none)".to_string()),
        join_names(context.callers.iter().map(|c| c.name.clone())),
        join_names(context.callees.iter().map(|c| c.name.clone())),
        callee_purposes,
        context.test_assertions.join(" | "),
        context.parent_justification.as_ref().map(|j| j.business_purpose.clone()).unwrap_or_else(|| "(none)".to_string()),
        context.sibling_names.join(", "),
        entity.body,
    )
}

#[derive(Debug, Clone, Default)]
pub struct ParsedPrompt {
    pub entity_id: String,
    pub entity_name: String,
    pub entity_path: String,
    pub callers: Vec<String>,
    pub callees: Vec<String>,
    pub callee_purposes: HashMap<String, String>,
    pub body: String,
}

fn field(line: &str, key: &str) -> Option<String> {
    line.strip_prefix(key).map(|rest| rest.trim().to_string())
}

fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

/// Parses a prompt built by [`build_prompt`] back into its fields. Any
/// malformed or missing field is left at its default rather than erroring:
/// the provider is best-effort by design.
pub fn parse(prompt: &str) -> ParsedPrompt {
    let mut parsed = ParsedPrompt::default();
    let mut lines = prompt.lines();

    while let Some(line) = lines.next() {
        if let Some(value) = field(line, "ENTITY_ID:") {
            parsed.entity_id = value;
        } else if let Some(value) = field(line, "ENTITY_NAME:") {
            parsed.entity_name = value;
        } else if let Some(value) = field(line, "ENTITY_PATH:") {
            parsed.entity_path = value;
        } else if let Some(value) = field(line, "CALLERS:") {
            parsed.callers = split_list(&value);
        } else if let Some(value) = field(line, "CALLEES:") {
            parsed.callees = split_list(&value);
        } else if let Some(value) = field(line, "CALLEE_PURPOSES:") {
            for entry in value.split(';') {
                if let Some((name, purpose)) = entry.split_once(':') {
                    parsed.callee_purposes.insert(name.trim().to_string(), purpose.trim().to_string());
                }
            }
        } else if line.starts_with("BODY:") {
            parsed.body = lines.collect::<Vec<_>>().join("\n");
            break;
        }
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use semgraph_core::EntityKind;

    #[test]
    fn builds_and_parses_round_trip() {
        let mut entity = Entity::new("org", "repo", "v1", EntityKind::Function, "processOrder", "src/billing/order.rs", "rust");
        entity.id = "id-1".to_string();
        entity.body = "fn process_order() {}".to_string();

        let context = EntityContext::default();
        let prompt = build_prompt(&entity, &context);
        let parsed = parse(&prompt);

        assert_eq!(parsed.entity_id, "id-1");
        assert_eq!(parsed.entity_name, "processOrder");
        assert_eq!(parsed.entity_path, "src/billing/order.rs");
        assert_eq!(parsed.body, "fn process_order() {}");
    }

    #[test]
    fn carries_callee_purposes_through_for_grounding() {
        use crate::context::Neighbor;

        let mut entity = Entity::new("org", "repo", "v1", EntityKind::Function, "checkout", "src/billing/checkout.rs", "rust");
        entity.id = "id-2".to_string();

        let mut context = EntityContext::default();
        context.callees.push(Neighbor { id: "callee-1".to_string(), name: "chargeCard".to_string(), kind: EntityKind::Function });
        context.callee_justifications.insert(
            "callee-1".to_string(),
            crate::heuristics::fallback_justification(
                &Entity::new("org", "repo", "v1", EntityKind::Function, "chargeCard", "x.rs", "rust"),
                semgraph_core::Taxonomy::Vertical,
                0.8,
                semgraph_core::ModelTier::Fast,
                "Charges a payment card.".to_string(),
                "billing".to_string(),
                "hash",
            ),
        );

        let prompt = build_prompt(&entity, &context);
        let parsed = parse(&prompt);
        assert_eq!(parsed.callee_purposes.get("chargeCard").map(|s| s.as_str()), Some("Charges a payment card."));
    }
}
