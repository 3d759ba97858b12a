//! The `embedRepo` activity (spec.md §4.5): fetches entities for a file
//! batch, builds documents, embeds in sub-batches, upserts, and finally
//! deletes orphaned vectors.

use std::collections::HashMap;

use semgraph_core::{GraphStore, PipelineConfig, Result, VectorSearch};

use crate::document::{build_documents, EmbeddableDocument};

#[derive(Debug, Default, Clone)]
pub struct EmbeddingReport {
    pub documents_embedded: usize,
    pub orphans_deleted: usize,
}

fn document_metadata(org_id: &str, repo_id: &str, doc: &EmbeddableDocument) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    metadata.insert("org_id".to_string(), org_id.to_string());
    metadata.insert("repo_id".to_string(), repo_id.to_string());
    metadata.insert("entity_key".to_string(), doc.entity_key.clone());
    metadata.insert("kind".to_string(), format!("{:?}", doc.kind));
    metadata.insert("name".to_string(), doc.name.clone());
    metadata.insert("file_path".to_string(), doc.file_path.clone());
    metadata.insert("text_content".to_string(), doc.text_content.clone());
    metadata
}

/// Embeds every entity for `repo_id` and upserts into `vector_search`,
/// then removes vectors for entities that no longer exist (spec.md §4.5
/// steps 4-5). `heartbeat` is invoked after each sub-batch, mirroring the
/// durable-activity heartbeat contract (spec.md §4.8).
pub async fn embed_repo(
    org_id: &str,
    repo_id: &str,
    store: &dyn GraphStore,
    vector_search: &dyn VectorSearch,
    config: &PipelineConfig,
    mut heartbeat: impl FnMut(usize, usize),
) -> Result<EmbeddingReport> {
    let entities = store.get_all_entities(repo_id).await?;
    let justifications = store
        .get_justifications(repo_id)
        .await?
        .into_iter()
        .filter(|j| j.is_current())
        .map(|j| (j.entity_id.clone(), j))
        .collect();

    let documents = build_documents(&entities, &justifications, config);
    let subbatch = config.embed_subbatch.max(1);
    let total_batches = documents.len().div_ceil(subbatch);

    let mut current_keys = Vec::with_capacity(documents.len());
    let mut embedded = 0usize;

    for (batch_index, batch) in documents.chunks(subbatch).enumerate() {
        let texts: Vec<String> = batch.iter().map(|d| d.text_content.clone()).collect();
        let vectors = vector_search.embed(texts).await?;

        let ids: Vec<String> = batch.iter().map(|d| d.entity_key.clone()).collect();
        let metadata: Vec<HashMap<String, String>> = batch.iter().map(|d| document_metadata(org_id, repo_id, d)).collect();

        vector_search.upsert(ids.clone(), vectors, metadata).await?;
        current_keys.extend(ids);
        embedded += batch.len();

        heartbeat(batch_index + 1, total_batches);
    }

    let orphans_deleted = vector_search.delete_orphaned(repo_id, &current_keys).await?;

    Ok(EmbeddingReport { documents_embedded: embedded, orphans_deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_provider::LocalHashingVectorSearch;
    use semgraph_core::{Entity, EntityKind};
    use semgraph_graph::InMemoryGraphStore;

    #[tokio::test]
    async fn embeds_entities_and_removes_stale_vectors_on_rerun() {
        let store = InMemoryGraphStore::new();
        let mut entity = Entity::new("org", "repo", "v1", EntityKind::Function, "foo", "a.rs", "rust");
        entity.id = "e1".to_string();
        store.bulk_upsert_entities(vec![entity]).await.unwrap();

        let vector_search = LocalHashingVectorSearch::default();
        let config = PipelineConfig::default();

        let report = embed_repo("org", "repo", &store, &vector_search, &config, |_, _| {}).await.unwrap();
        assert_eq!(report.documents_embedded, 1);
        assert_eq!(vector_search.len(), 1);

        store.delete_repo_data("repo").await.unwrap();
        let mut entity2 = Entity::new("org", "repo", "v1", EntityKind::Function, "bar", "b.rs", "rust");
        entity2.id = "e2".to_string();
        store.bulk_upsert_entities(vec![entity2]).await.unwrap();

        let report2 = embed_repo("org", "repo", &store, &vector_search, &config, |_, _| {}).await.unwrap();
        assert_eq!(report2.documents_embedded, 1);
        assert_eq!(report2.orphans_deleted, 1);
        assert_eq!(vector_search.len(), 1);
    }

    #[tokio::test]
    async fn heartbeats_once_per_subbatch() {
        let store = InMemoryGraphStore::new();
        let mut entities = Vec::new();
        for i in 0..25 {
            let mut e = Entity::new("org", "repo", "v1", EntityKind::Function, format!("f{i}"), "a.rs", "rust");
            e.id = format!("e{i}");
            entities.push(e);
        }
        store.bulk_upsert_entities(entities).await.unwrap();

        let vector_search = LocalHashingVectorSearch::default();
        let config = PipelineConfig::default(); // embed_subbatch = 10

        let mut heartbeats = 0usize;
        embed_repo("org", "repo", &store, &vector_search, &config, |_, _| heartbeats += 1).await.unwrap();
        assert_eq!(heartbeats, 3); // ceil(25 / 10)
    }
}
