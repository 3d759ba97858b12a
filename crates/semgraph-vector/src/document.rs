//! Embeddable-document construction (spec.md §4.5 steps 1-3). One
//! document per non-file entity plus a fallback file document for files
//! that produced zero code entities, so every file stays searchable.

use std::collections::{HashMap, HashSet};

use semgraph_core::{Entity, EntityKind, Justification, PipelineConfig};

#[derive(Debug, Clone)]
pub struct EmbeddableDocument {
    pub entity_id: String,
    pub entity_key: String,
    pub kind: EntityKind,
    pub name: String,
    pub file_path: String,
    pub text_content: String,
}

fn kind_header(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::File => "file",
        EntityKind::Directory => "directory",
        EntityKind::Module => "module",
        EntityKind::Namespace => "namespace",
        EntityKind::Function => "function",
        EntityKind::Method => "method",
        EntityKind::Class => "class",
        EntityKind::Struct => "struct",
        EntityKind::Interface => "interface",
        EntityKind::Variable => "variable",
        EntityKind::Type => "type",
        EntityKind::Enum => "enum",
        EntityKind::Decorator => "decorator",
    }
}

/// Builds the document text for one non-file entity: a kind-labeled
/// header, signature, doc, business-purpose text when a justification
/// exists, then the body, truncated per `max_body_chars`.
fn build_document_text(entity: &Entity, justification: Option<&Justification>, config: &PipelineConfig) -> String {
    let mut parts = Vec::new();
    parts.push(format!("[{}] {}", kind_header(entity.kind), entity.name));
    if let Some(sig) = &entity.signature {
        parts.push(sig.clone());
    }
    if let Some(doc) = &entity.doc {
        parts.push(doc.clone());
    }
    if let Some(j) = justification {
        parts.push(format!("Purpose: {}", j.business_purpose));
        if !j.domain_concepts.is_empty() {
            parts.push(format!("Concepts: {}", j.domain_concepts.join(", ")));
        }
    }

    let mut body = entity.body.clone();
    if body.len() > config.max_body_chars {
        body = body.chars().take(config.max_body_chars).collect();
    }
    if !body.is_empty() {
        parts.push(body);
    }

    parts.join("\n\n")
}

/// `entity_key` the vector metadata/orphan-deletion pass key on: stable
/// across re-embeds of the same entity, distinct from the content-hash
/// `entity_id` so a vector driver can key its own index however it likes.
fn entity_key(entity: &Entity) -> String {
    format!("{}/{}", entity.repo_id, entity.id)
}

/// Builds one document per non-file entity in `entities`, plus a
/// fallback document for every file path that produced zero code
/// entities (spec.md §4.5 step 3).
pub fn build_documents(
    entities: &[Entity],
    justifications: &HashMap<String, Justification>,
    config: &PipelineConfig,
) -> Vec<EmbeddableDocument> {
    let mut documents = Vec::new();
    let mut files_with_code: HashSet<&str> = HashSet::new();

    for entity in entities {
        if entity.kind == EntityKind::File {
            continue;
        }
        files_with_code.insert(entity.file_path.as_str());
        let text_content = build_document_text(entity, justifications.get(&entity.id), config);
        documents.push(EmbeddableDocument {
            entity_id: entity.id.clone(),
            entity_key: entity_key(entity),
            kind: entity.kind,
            name: entity.name.clone(),
            file_path: entity.file_path.clone(),
            text_content,
        });
    }

    for entity in entities {
        if entity.kind != EntityKind::File {
            continue;
        }
        if files_with_code.contains(entity.file_path.as_str()) {
            continue;
        }
        documents.push(EmbeddableDocument {
            entity_id: entity.id.clone(),
            entity_key: entity_key(entity),
            kind: EntityKind::File,
            name: entity.name.clone(),
            file_path: entity.file_path.clone(),
            text_content: format!("[file] {}", entity.file_path),
        });
    }

    documents
}

#[cfg(test)]
mod tests {
    use super::*;
    use semgraph_core::Taxonomy;

    fn function_entity(file_path: &str, name: &str) -> Entity {
        let mut e = Entity::new("org", "repo", "v1", EntityKind::Function, name, file_path, "rust");
        e.id = format!("id-{name}");
        e.signature = Some(format!("fn {name}()"));
        e
    }

    fn file_entity(file_path: &str) -> Entity {
        let mut e = Entity::new("org", "repo", "v1", EntityKind::File, file_path, file_path, "rust");
        e.id = format!("id-{file_path}");
        e
    }

    #[test]
    fn builds_one_document_per_non_file_entity() {
        let entities = vec![function_entity("a.rs", "foo"), function_entity("a.rs", "bar")];
        let docs = build_documents(&entities, &HashMap::new(), &PipelineConfig::default());
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| d.kind == EntityKind::Function));
    }

    #[test]
    fn emits_fallback_document_for_file_with_no_code_entities() {
        let entities = vec![file_entity("empty.rs")];
        let docs = build_documents(&entities, &HashMap::new(), &PipelineConfig::default());
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].kind, EntityKind::File);
    }

    #[test]
    fn skips_file_document_when_file_has_code_entities() {
        let entities = vec![file_entity("a.rs"), function_entity("a.rs", "foo")];
        let docs = build_documents(&entities, &HashMap::new(), &PipelineConfig::default());
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].kind, EntityKind::Function);
    }

    #[test]
    fn enriches_text_with_business_purpose_when_justified() {
        let entity = function_entity("a.rs", "foo");
        let justification = Justification {
            entity_id: entity.id.clone(),
            taxonomy: Taxonomy::Vertical,
            confidence: 0.9,
            business_purpose: "Validates user input".to_string(),
            domain_concepts: vec!["validation".to_string()],
            feature_tag: "input-validation".to_string(),
            semantic_triples: vec![],
            compliance_tags: vec![],
            architectural_pattern: None,
            model_tier: semgraph_core::ModelTier::Fast,
            model_used: Some("fast".to_string()),
            quality_score: 0.9,
            quality_flags: vec![],
            body_hash: "hash".to_string(),
            valid_from: chrono::Utc::now(),
            valid_to: None,
        };
        let mut justifications = HashMap::new();
        justifications.insert(entity.id.clone(), justification);
        let docs = build_documents(&[entity], &justifications, &PipelineConfig::default());
        assert!(docs[0].text_content.contains("Validates user input"));
    }
}
