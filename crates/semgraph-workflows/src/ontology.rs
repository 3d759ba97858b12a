//! Domain-ontology discovery, the step between `embedRepo` and
//! `justifyRepo` in the full-index chain (spec.md §4, "discoverOntology").
//! The graph-store port exposes `get_domain_ontology` but no writer
//! (Open Question, recorded in `DESIGN.md`): this reference
//! implementation computes the ontology transiently each run rather
//! than persisting it.

use std::collections::HashMap;

use semgraph_core::{DomainOntology, Entity};

const STOPWORDS: &[&str] = &["get", "set", "the", "a", "an", "of", "for", "to", "and", "new", "is", "fn", "mod"];
const MAX_TERMS: usize = 30;

fn split_identifier(name: &str) -> Vec<String> {
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
    words
}

fn top_level_directory(file_path: &str) -> Option<&str> {
    let segments: Vec<&str> = file_path.split('/').collect();
    let src_index = segments.iter().position(|s| *s == "src")?;
    segments.get(src_index + 1).filter(|s| !s.ends_with(".rs")).copied()
}

/// Builds a [`DomainOntology`]: the most frequent identifier terms
/// across every exported entity, and feature areas inferred from the
/// top-level directories under `src/`.
pub fn discover_ontology(repo_id: &str, entities: &[Entity]) -> DomainOntology {
    let mut term_counts: HashMap<String, usize> = HashMap::new();
    let mut categories: Vec<String> = Vec::new();

    for entity in entities {
        if !entity.exported {
            continue;
        }
        for word in split_identifier(&entity.name) {
            if word.len() > 2 && !STOPWORDS.contains(&word.as_str()) {
                *term_counts.entry(word).or_insert(0) += 1;
            }
        }
        if let Some(dir) = top_level_directory(&entity.file_path) {
            if !categories.contains(&dir.to_string()) {
                categories.push(dir.to_string());
            }
        }
    }

    let mut terms: Vec<(String, usize)> = term_counts.into_iter().collect();
    terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    terms.truncate(MAX_TERMS);
    let terms: Vec<String> = terms.into_iter().map(|(term, _)| term).collect();

    categories.sort();
    let feature_areas = categories.clone();

    DomainOntology { repo_id: repo_id.to_string(), terms, categories, feature_areas }
}
