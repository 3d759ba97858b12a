//! Dynamic batcher (spec.md §4.6.3): groups entities by model tier,
//! then packs tier-homogeneous batches under a token budget so a
//! single LLM call never exceeds what its tier's model can hold.

use semgraph_core::ModelTier;

/// A conservative characters-per-token ratio for budgeting prompts
/// before they're tokenized by the actual model.
const CHARS_PER_TOKEN: usize = 4;

/// One entity queued for justification, already leveled and routed.
#[derive(Debug, Clone)]
pub struct BatchCandidate {
    pub entity_id: String,
    pub tier: ModelTier,
    /// The assembled prompt text for this entity alone.
    pub prompt: String,
}

/// A tier-homogeneous group of candidates ready for one LLM call.
/// `len() == 1` means the richer single-entity prompt path; more than
/// one means a batch prompt keyed by `entityId`.
#[derive(Debug, Clone)]
pub struct Batch {
    pub tier: ModelTier,
    pub entity_ids: Vec<String>,
    pub prompts: Vec<String>,
}

fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(CHARS_PER_TOKEN)
}

/// Context window budget per tier, in tokens. Larger tiers afford
/// bigger batches; `Heuristic` never reaches the batcher since it
/// skips the LLM entirely.
fn tier_token_budget(tier: ModelTier) -> usize {
    match tier {
        ModelTier::Heuristic => 0,
        ModelTier::Fast => 4_096,
        ModelTier::Standard => 16_384,
        ModelTier::Premium => 32_768,
    }
}

/// Packs `candidates` into tier-homogeneous batches, each under its
/// tier's token budget. Candidates keep their relative order.
pub fn pack_batches(candidates: &[BatchCandidate]) -> Vec<Batch> {
    let mut by_tier: Vec<(ModelTier, Vec<&BatchCandidate>)> = Vec::new();
    for candidate in candidates {
        match by_tier.iter_mut().find(|(tier, _)| *tier == candidate.tier) {
            Some((_, group)) => group.push(candidate),
            None => by_tier.push((candidate.tier, vec![candidate])),
        }
    }

    let mut batches = Vec::new();
    for (tier, group) in by_tier {
        let budget = tier_token_budget(tier);
        let mut current = Batch { tier, entity_ids: Vec::new(), prompts: Vec::new() };
        let mut current_tokens = 0usize;

        for candidate in group {
            let tokens = estimate_tokens(&candidate.prompt);
            if !current.entity_ids.is_empty() && current_tokens + tokens > budget {
                batches.push(current);
                current = Batch { tier, entity_ids: Vec::new(), prompts: Vec::new() };
                current_tokens = 0;
            }
            current.entity_ids.push(candidate.entity_id.clone());
            current.prompts.push(candidate.prompt.clone());
            current_tokens += tokens;
        }

        if !current.entity_ids.is_empty() {
            batches.push(current);
        }
    }

    batches
}

/// Builds the single combined prompt for a multi-entity batch: each
/// entity's prompt, tagged so the LLM can return one result per
/// `entityId` (spec.md §4.6.3).
pub fn batch_prompt(batch: &Batch) -> String {
    batch
        .entity_ids
        .iter()
        .zip(batch.prompts.iter())
        .map(|(id, prompt)| format!("### entityId: {id}\n{prompt}"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, tier: ModelTier, prompt_len: usize) -> BatchCandidate {
        BatchCandidate { entity_id: id.to_string(), tier, prompt: "x".repeat(prompt_len) }
    }

    #[test]
    fn groups_by_tier_and_keeps_single_entity_batch_alone() {
        let candidates = vec![candidate("a", ModelTier::Fast, 10), candidate("b", ModelTier::Premium, 10)];
        let batches = pack_batches(&candidates);
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn packs_multiple_small_prompts_into_one_batch() {
        let candidates = vec![candidate("a", ModelTier::Fast, 40), candidate("b", ModelTier::Fast, 40)];
        let batches = pack_batches(&candidates);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].entity_ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn splits_into_new_batch_once_budget_exceeded() {
        // Each prompt costs ~1025 tokens (4100 chars / 4); fast budget is 4096.
        let candidates = vec![
            candidate("a", ModelTier::Fast, 4100),
            candidate("b", ModelTier::Fast, 4100),
            candidate("c", ModelTier::Fast, 4100),
            candidate("d", ModelTier::Fast, 4100),
            candidate("e", ModelTier::Fast, 4100),
        ];
        let batches = pack_batches(&candidates);
        assert!(batches.len() >= 2);
        for batch in &batches {
            let total: usize = batch.prompts.iter().map(|p| estimate_tokens(p)).sum();
            assert!(total <= tier_token_budget(ModelTier::Fast));
        }
    }

    #[test]
    fn a_single_oversized_prompt_still_forms_its_own_batch() {
        let candidates = vec![candidate("a", ModelTier::Fast, 100_000)];
        let batches = pack_batches(&candidates);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].entity_ids, vec!["a".to_string()]);
    }

    #[test]
    fn batch_prompt_tags_each_entity_by_id() {
        let batch = Batch {
            tier: ModelTier::Fast,
            entity_ids: vec!["a".to_string(), "b".to_string()],
            prompts: vec!["prompt-a".to_string(), "prompt-b".to_string()],
        };
        let text = batch_prompt(&batch);
        assert!(text.contains("entityId: a"));
        assert!(text.contains("prompt-a"));
        assert!(text.contains("entityId: b"));
    }
}
