//! Top-level orchestrator (spec.md §4.6.2): runs the full per-entity
//! pipeline level by level so a level's justifications are available
//! as callee context for the level above it.

use std::collections::{HashMap, HashSet};

use semgraph_core::{
    Edge, Entity, GraphStore, Justification, LlmProvider, PipelineConfig, Result, RiskLevel, Taxonomy,
};

use crate::batcher::{self, BatchCandidate};
use crate::context;
use crate::heuristics;
use crate::leveling;
use crate::prompting;
use crate::routing;
use crate::staleness;

#[derive(Debug, Clone, Default)]
pub struct JustifyReport {
    pub entities_reused: usize,
    pub entities_dead_code: usize,
    pub entities_heuristic: usize,
    pub entities_llm: usize,
    pub entities_fallback: usize,
}

fn risk_level_of(entity: &Entity) -> RiskLevel {
    entity.risk_level
}

fn quality_score(confidence: f32, context: &context::EntityContext) -> f32 {
    let mut score = confidence;
    if !context.callee_justifications.is_empty() {
        score += 0.05;
    }
    if !context.test_assertions.is_empty() {
        score += 0.05;
    }
    score.min(1.0)
}

fn quality_flags(confidence: f32, context: &context::EntityContext) -> Vec<String> {
    let mut flags = Vec::new();
    if confidence < 0.5 {
        flags.push("low_confidence".to_string());
    }
    if context.callee_justifications.is_empty() && !context.callees.is_empty() {
        flags.push("ungrounded_callees".to_string());
    }
    flags
}

async fn call_with_retries(
    llm: &dyn LlmProvider,
    model: &str,
    prompts: HashMap<String, String>,
) -> HashMap<String, semgraph_core::StructuredJustification> {
    for attempt in 0..2 {
        match llm.generate_structured(model, prompts.clone()).await {
            Ok(results) => return results,
            Err(err) => {
                tracing::warn!(attempt, model, error = %err, "llm generation failed");
            }
        }
    }
    HashMap::new()
}

/// Recovers entities missing from a batch response by asking the
/// provider for each one individually (spec.md §4.6.2 step 6).
async fn retry_missing_individually(
    llm: &dyn LlmProvider,
    model: &str,
    prompts: &HashMap<String, String>,
    results: &mut HashMap<String, semgraph_core::StructuredJustification>,
) {
    let missing: Vec<&String> = prompts.keys().filter(|id| !results.contains_key(*id)).collect();
    for id in missing {
        let mut single = HashMap::new();
        single.insert(id.clone(), prompts[id].clone());
        if let Ok(mut single_result) = llm.generate_structured(model, single).await {
            if let Some(sj) = single_result.remove(id) {
                results.insert(id.clone(), sj);
            }
        }
    }
}

fn structured_to_justification(
    sj: semgraph_core::StructuredJustification,
    tier: semgraph_core::ModelTier,
    model: &str,
    body_hash: &str,
    context: &context::EntityContext,
) -> Justification {
    let confidence = sj.confidence;
    Justification {
        entity_id: sj.entity_id,
        taxonomy: sj.taxonomy,
        confidence,
        business_purpose: sj.business_purpose,
        domain_concepts: sj.domain_concepts,
        feature_tag: sj.feature_tag,
        semantic_triples: sj.semantic_triples,
        compliance_tags: sj.compliance_tags,
        architectural_pattern: sj.architectural_pattern,
        model_tier: tier,
        model_used: Some(model.to_string()),
        quality_score: quality_score(confidence, context),
        quality_flags: quality_flags(confidence, context),
        body_hash: body_hash.to_string(),
        valid_from: chrono::Utc::now(),
        valid_to: None,
    }
}

fn terminal_fallback(entity: &Entity, body_hash: &str, tier: semgraph_core::ModelTier, error: &str) -> Justification {
    heuristics::fallback_justification(
        entity,
        Taxonomy::Utility,
        0.3,
        tier,
        format!("Justification generation failed: {error}"),
        "unknown".to_string(),
        body_hash,
    )
}

/// Runs the complete justification pipeline for a repo. `callee_changed_set`
/// drives staleness on incremental runs (empty on a full index run, where
/// nothing is considered "changed" by the cascade).
pub async fn justify_repo(
    repo_id: &str,
    store: &dyn GraphStore,
    llm: &dyn LlmProvider,
    config: &PipelineConfig,
    callee_changed_set: &HashSet<String>,
) -> Result<(HashMap<String, Justification>, JustifyReport)> {
    let entities: Vec<Entity> = store.get_all_entities(repo_id).await?;
    let edges: Vec<Edge> = store.get_all_edges(repo_id).await?;
    let prior: HashMap<String, Justification> =
        store.get_justifications(repo_id).await?.into_iter().map(|j| (j.entity_id.clone(), j)).collect();

    let by_id: HashMap<&str, &Entity> = entities.iter().map(|e| (e.id.as_str(), e)).collect();
    let callees_of = leveling_callees(&entities, &edges);

    let levels = leveling::topological_levels(&entities, &edges);
    let mut justifications: HashMap<String, Justification> = HashMap::new();
    let mut report = JustifyReport::default();

    for level in levels {
        let mut pending_candidates: Vec<(BatchCandidate, semgraph_core::ModelTier)> = Vec::new();

        for entity_id in &level {
            let Some(entity) = by_id.get(entity_id.as_str()) else { continue };
            let body_hash = staleness::body_hash(&entity.body);
            let empty_callees = Vec::new();
            let callees = callees_of.get(entity_id.as_str()).unwrap_or(&empty_callees);

            if let Some(prev) = prior.get(*entity_id) {
                if staleness::is_unchanged(Some(&prev.body_hash), &entity.body, callees, callee_changed_set) {
                    justifications.insert(entity_id.clone(), prev.clone());
                    report.entities_reused += 1;
                    continue;
                }
            }

            if let Some(justification) = heuristics::dead_code_short_circuit(entity, &edges, &body_hash) {
                justifications.insert(entity_id.clone(), justification);
                report.entities_dead_code += 1;
                continue;
            }

            if let Some(justification) = heuristics::heuristic_classification(entity, &body_hash) {
                justifications.insert(entity_id.clone(), justification);
                report.entities_heuristic += 1;
                continue;
            }

            let tier = routing::route(entity.pagerank_percentile, risk_level_of(entity));
            let entity_context = context::assemble(entity, &entities, &edges, &justifications);
            let prompt = prompting::build_prompt(entity, &entity_context);
            pending_candidates.push((BatchCandidate { entity_id: entity_id.clone(), tier, prompt }, tier));
        }

        let candidates: Vec<BatchCandidate> = pending_candidates.into_iter().map(|(c, _)| c).collect();
        for batch in batcher::pack_batches(&candidates) {
            let model = routing::model_name(batch.tier);
            let prompts: HashMap<String, String> =
                batch.entity_ids.iter().cloned().zip(batch.prompts.iter().cloned()).collect();

            let mut results = call_with_retries(llm, model, prompts.clone()).await;
            retry_missing_individually(llm, model, &prompts, &mut results).await;

            for entity_id in &batch.entity_ids {
                let Some(entity) = by_id.get(entity_id.as_str()) else { continue };
                let body_hash = staleness::body_hash(&entity.body);
                let entity_context = context::assemble(entity, &entities, &edges, &justifications);

                let justification = match results.remove(entity_id) {
                    Some(sj) => {
                        report.entities_llm += 1;
                        structured_to_justification(sj, batch.tier, model, &body_hash, &entity_context)
                    }
                    None => {
                        report.entities_fallback += 1;
                        terminal_fallback(entity, &body_hash, batch.tier, "no response from provider")
                    }
                };
                justifications.insert(entity_id.clone(), justification);
            }
        }
    }

    Ok((justifications, report))
}

fn leveling_callees(entities: &[Entity], edges: &[Edge]) -> HashMap<&str, Vec<String>> {
    let known: HashSet<&str> = entities.iter().map(|e| e.id.as_str()).collect();
    let mut map: HashMap<&str, Vec<String>> = entities.iter().map(|e| (e.id.as_str(), Vec::new())).collect();
    for edge in edges {
        if !matches!(edge.kind, semgraph_core::EdgeKind::Calls | semgraph_core::EdgeKind::References) {
            continue;
        }
        let from = edge.from.rsplit('/').next().unwrap_or(&edge.from);
        let to = edge.to.rsplit('/').next().unwrap_or(&edge.to);
        if known.contains(from) && known.contains(to) {
            map.entry(from).or_default().push(to.to_string());
        }
    }
    map
}
