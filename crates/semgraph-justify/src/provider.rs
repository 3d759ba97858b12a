//! A deterministic, local stand-in for [`semgraph_core::LlmProvider`]
//! (spec.md §1 Non-goals: "the model itself remains out of scope").
//! Parses the structured prompt text built by [`crate::prompting`] and
//! synthesizes a plausible justification from entity name, path, and
//! callee context — the same role [`semgraph_vector::LocalHashingVectorSearch`]
//! plays for embeddings.

use std::collections::HashMap;

use async_trait::async_trait;
use semgraph_core::{LlmProvider, Result, StructuredJustification, Taxonomy};

use crate::prompting::ParsedPrompt;

#[derive(Debug, Clone, Default)]
pub struct HeuristicLlmProvider;

impl HeuristicLlmProvider {
    pub fn new() -> Self {
        Self
    }
}

const STOPWORDS: &[&str] = &["get", "set", "the", "a", "an", "of", "for", "to", "and", "new", "is"];

/// Splits `camelCase`/`snake_case`/`PascalCase` names into lowercase
/// words, dropping stopwords.
fn name_tokens(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for ch in name.chars() {
        if ch == '_' || ch == '-' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if ch.is_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push(ch.to_ascii_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words.into_iter().filter(|w| !STOPWORDS.contains(&w.as_str()) && !w.is_empty()).collect()
}

fn feature_tag_from_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    segments
        .iter()
        .position(|s| *s == "src")
        .and_then(|i| segments.get(i + 1))
        .filter(|s| !s.ends_with(".rs"))
        .map(|s| s.to_string())
        .unwrap_or_else(|| "general".to_string())
}

fn architectural_pattern(name: &str) -> Option<String> {
    let suffixes = [("repository", "repository"), ("service", "service"), ("controller", "controller"), ("handler", "handler"), ("factory", "factory")];
    let lower = name.to_lowercase();
    suffixes.iter().find(|(suffix, _)| lower.ends_with(suffix)).map(|(_, pattern)| pattern.to_string())
}

fn compliance_tags(path: &str) -> Vec<String> {
    let lower = path.to_lowercase();
    let mut tags = Vec::new();
    if lower.contains("auth") {
        tags.push("authentication".to_string());
    }
    if lower.contains("payment") || lower.contains("billing") {
        tags.push("financial".to_string());
    }
    if lower.contains("pii") || lower.contains("user") {
        tags.push("pii".to_string());
    }
    tags
}

fn taxonomy_for(parsed: &ParsedPrompt) -> Taxonomy {
    if parsed.callers.is_empty() && !parsed.callees.is_empty() {
        Taxonomy::Vertical
    } else if parsed.callees.len() > 2 {
        Taxonomy::Horizontal
    } else {
        Taxonomy::Horizontal
    }
}

fn business_purpose(parsed: &ParsedPrompt, tokens: &[String]) -> String {
    let subject = if tokens.is_empty() { parsed.entity_name.clone() } else { tokens.join(" ") };
    if parsed.callees.is_empty() {
        format!("Implements {subject}.")
    } else {
        let callees = parsed.callees.join(", ");
        format!("Implements {subject}, coordinating with {callees}.")
    }
}

fn semantic_triples(parsed: &ParsedPrompt) -> Vec<(String, String, String)> {
    parsed.callees.iter().take(5).map(|callee| (parsed.entity_name.clone(), "calls".to_string(), callee.clone())).collect()
}

fn domain_concepts(tokens: &[String], parsed: &ParsedPrompt) -> Vec<String> {
    let mut concepts: Vec<String> = tokens.to_vec();
    for purpose in parsed.callee_purposes.values() {
        for word in purpose.split_whitespace() {
            let cleaned: String = word.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_lowercase();
            if cleaned.len() > 4 && !STOPWORDS.contains(&cleaned.as_str()) && !concepts.contains(&cleaned) {
                concepts.push(cleaned);
            }
        }
    }
    concepts.truncate(8);
    concepts
}

fn justify_one(entity_id: &str, prompt: &str) -> StructuredJustification {
    let parsed = crate::prompting::parse(prompt);
    let tokens = name_tokens(&parsed.entity_name);

    StructuredJustification {
        entity_id: entity_id.to_string(),
        taxonomy: taxonomy_for(&parsed),
        confidence: 0.55,
        business_purpose: business_purpose(&parsed, &tokens),
        domain_concepts: domain_concepts(&tokens, &parsed),
        feature_tag: feature_tag_from_path(&parsed.entity_path),
        semantic_triples: semantic_triples(&parsed),
        compliance_tags: compliance_tags(&parsed.entity_path),
        architectural_pattern: architectural_pattern(&parsed.entity_name),
    }
}

#[async_trait]
impl LlmProvider for HeuristicLlmProvider {
    async fn generate_structured(&self, _model: &str, prompts: HashMap<String, String>) -> Result<HashMap<String, StructuredJustification>> {
        Ok(prompts.iter().map(|(entity_id, prompt)| (entity_id.clone(), justify_one(entity_id, prompt))).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_prompt(name: &str, path: &str, callees: &str) -> String {
        format!(
            "ENTITY_ID: id-1\nENTITY_NAME: {name}\nENTITY_KIND: function\nENTITY_PATH: {path}\nSIGNATURE: (none)\nDOC: (none)\nCALLERS: \nCALLEES: {callees}\nCALLEE_PURPOSES: \nTEST_ASSERTIONS: \nPARENT_JUSTIFICATION: (none)\nSIBLINGS: \nBODY:\nfn {name}() {{}}\n"
        )
    }

    #[tokio::test]
    async fn returns_one_result_per_requested_entity() {
        let provider = HeuristicLlmProvider::new();
        let mut prompts = HashMap::new();
        prompts.insert("a".to_string(), sample_prompt("processOrder", "src/billing/order.rs", ""));
        prompts.insert("b".to_string(), sample_prompt("userRepository", "src/auth/user.rs", ""));

        let results = provider.generate_structured("fast-tier-model", prompts).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.contains_key("a"));
        assert!(results.contains_key("b"));
    }

    #[tokio::test]
    async fn derives_feature_tag_from_path_and_pattern_from_name() {
        let provider = HeuristicLlmProvider::new();
        let mut prompts = HashMap::new();
        prompts.insert("b".to_string(), sample_prompt("userRepository", "src/auth/user.rs", ""));
        let results = provider.generate_structured("fast-tier-model", prompts).await.unwrap();
        let result = &results["b"];
        assert_eq!(result.feature_tag, "auth");
        assert_eq!(result.architectural_pattern.as_deref(), Some("repository"));
        assert!(result.compliance_tags.contains(&"authentication".to_string()));
    }

    #[tokio::test]
    async fn never_invents_ids_outside_the_request() {
        let provider = HeuristicLlmProvider::new();
        let mut prompts = HashMap::new();
        prompts.insert("only".to_string(), sample_prompt("foo", "src/foo.rs", ""));
        let results = provider.generate_structured("fast-tier-model", prompts).await.unwrap();
        assert_eq!(results.keys().collect::<Vec<_>>(), vec!["only"]);
    }
}
