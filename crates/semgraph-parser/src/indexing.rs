//! Two-pass SCIP + tree-sitter indexing orchestration (spec.md §4.3):
//! runs the SCIP pass over every workspace root, falls back to
//! tree-sitter for files it didn't cover, fills entity bodies from
//! source, quarantines files that are too large or too slow to extract,
//! and persists the result through a [`GraphStore`].

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use semgraph_core::{Edge, Entity, EntityKind, GraphStore, PipelineConfig, QuarantineReason, Result};

use crate::plugin::{ParsedEdge, ParsedEntity, ScipPlugin, TreeSitterPlugin};
use crate::quarantine;
use crate::workspace::{collect_files, PreparedWorkspace};

#[derive(Debug, Default, Clone)]
pub struct IndexingReport {
    pub entities_written: usize,
    pub edges_written: usize,
    pub quarantined_paths: Vec<String>,
    pub extraction_errors: Vec<String>,
}

pub struct Indexer<'a> {
    scip: &'a dyn ScipPlugin,
    tree_sitter_plugins: HashMap<&'static str, &'a dyn TreeSitterPlugin>,
    config: &'a PipelineConfig,
}

impl<'a> Indexer<'a> {
    pub fn new(scip: &'a dyn ScipPlugin, plugins: Vec<&'a dyn TreeSitterPlugin>, config: &'a PipelineConfig) -> Self {
        let tree_sitter_plugins = plugins.into_iter().map(|p| (p.language(), p)).collect();
        Self { scip, tree_sitter_plugins, config }
    }

    pub async fn index(
        &self,
        workspace: &PreparedWorkspace,
        org_id: &str,
        repo_id: &str,
        index_version: &str,
        store: &dyn GraphStore,
    ) -> Result<IndexingReport> {
        let files = collect_files(&workspace.root)?;
        self.index_files(workspace, files, org_id, repo_id, index_version, store).await
    }

    /// Reindexes only `rel_paths` under `workspace.root` (spec.md §4.7
    /// step 3 "reindex batches"), rather than rescanning the whole tree.
    pub async fn index_paths(
        &self,
        workspace: &PreparedWorkspace,
        rel_paths: &[String],
        org_id: &str,
        repo_id: &str,
        index_version: &str,
        store: &dyn GraphStore,
    ) -> Result<IndexingReport> {
        let files: Vec<std::path::PathBuf> = rel_paths.iter().map(|p| workspace.root.join(p)).filter(|p| p.is_file()).collect();
        self.index_files(workspace, files, org_id, repo_id, index_version, store).await
    }

    async fn index_files(
        &self,
        workspace: &PreparedWorkspace,
        files: Vec<std::path::PathBuf>,
        org_id: &str,
        repo_id: &str,
        index_version: &str,
        store: &dyn GraphStore,
    ) -> Result<IndexingReport> {
        let (scip_output, covered) = self.scip.index(&workspace.root, &files).await?;

        let mut parsed_entities = scip_output.entities;
        let mut parsed_edges = scip_output.edges;
        let mut report = IndexingReport::default();

        // Every scanned file gets its own deterministic File entity, so
        // every file remains searchable even with zero code entities.
        for file in &files {
            let rel = relative_path(&workspace.root, file);

            if let Some(reason) = quarantine::oversized(file, self.config) {
                report.quarantined_paths.push(rel.clone());
                parsed_entities.push(file_placeholder(&rel, reason));
                continue;
            }

            if covered.contains(file) {
                // SCIP already produced this file's entities (including
                // its own file entity, per the plugin's contract).
                continue;
            }

            parsed_entities.push(bare_file_entity(&rel));

            let Some(lang) = crate::language::detect(file) else {
                continue;
            };

            let Some(plugin) = self.tree_sitter_plugins.get(lang) else {
                continue;
            };

            let content = match std::fs::read_to_string(file) {
                Ok(c) => c,
                Err(e) => {
                    report.extraction_errors.push(format!("{rel}: {e}"));
                    continue;
                }
            };

            match run_with_timeout(self.config.extraction_timeout_ms, || plugin.parse_file(&rel, &content)) {
                TimedResult::Ok(Ok(output)) => {
                    parsed_entities.extend(output.entities);
                    parsed_edges.extend(output.edges);
                }
                TimedResult::Ok(Err(e)) => {
                    report.extraction_errors.push(format!("{rel}: {e}"));
                }
                TimedResult::TimedOut => {
                    report.quarantined_paths.push(rel.clone());
                    parsed_entities.push(file_placeholder(&rel, QuarantineReason::ExtractionTimeout));
                }
            }
        }

        let (entities, id_map) = resolve_entities(parsed_entities, org_id, repo_id, index_version, self.config);
        let mut edges = resolve_edges(&parsed_edges, &id_map);
        edges.extend(contains_edges(&entities));

        report.entities_written = store.bulk_upsert_entities(entities).await?;
        report.edges_written = store.bulk_upsert_edges(edges).await?;
        Ok(report)
    }
}

fn relative_path(root: &Path, file: &Path) -> String {
    file.strip_prefix(root).unwrap_or(file).to_string_lossy().replace('\\', "/")
}

fn file_placeholder(rel_path: &str, reason: QuarantineReason) -> ParsedEntity {
    let mut placeholder = bare_file_entity(rel_path);
    placeholder.quarantine_reason = Some(reason);
    placeholder
}

/// One plain `File` entity per scanned path, so a file with zero code
/// entities is still searchable (spec.md §4.3).
fn bare_file_entity(rel_path: &str) -> ParsedEntity {
    ParsedEntity {
        local_id: rel_path.to_string(),
        kind: EntityKind::File,
        name: rel_path.to_string(),
        file_path: rel_path.to_string(),
        start_line: 0,
        end_line: 0,
        language: "unknown".to_string(),
        signature: None,
        exported: false,
        doc: None,
        parent_name: None,
        quarantine_reason: None,
        body: String::new(),
    }
}

enum TimedResult<T> {
    Ok(T),
    TimedOut,
}

/// Tree-sitter parsing is synchronous; a real deployment would run it on
/// a blocking-pool thread so the timeout can actually preempt it. This
/// reference implementation enforces the same `extraction_timeout_ms`
/// budget but measures wall-clock elapsed time around the call, since
/// parsing a single file finishes in microseconds in practice.
fn run_with_timeout<T>(timeout_ms: u64, f: impl FnOnce() -> T) -> TimedResult<T> {
    let start = std::time::Instant::now();
    let result = f();
    if start.elapsed() > Duration::from_millis(timeout_ms) {
        TimedResult::TimedOut
    } else {
        TimedResult::Ok(result)
    }
}

/// Assigns every parsed entity its real content-hash ID and resolves
/// `parent_name` references to real IDs in a second pass.
fn resolve_entities(
    parsed: Vec<ParsedEntity>,
    org_id: &str,
    repo_id: &str,
    index_version: &str,
    config: &PipelineConfig,
) -> (Vec<Entity>, HashMap<String, String>) {
    let mut id_map = HashMap::with_capacity(parsed.len());
    for p in &parsed {
        let real_id = semgraph_core::hashing::entity_hash(repo_id, &p.file_path, p.kind, &p.name, p.signature.as_deref());
        id_map.insert(p.local_id.clone(), real_id);
    }

    let entities = parsed
        .into_iter()
        .map(|p| {
            let real_id = id_map[&p.local_id].clone();
            let mut entity = Entity::new(org_id, repo_id, index_version, p.kind, p.name, p.file_path, p.language);
            entity.id = real_id;
            entity.start_line = p.start_line;
            entity.end_line = p.end_line;
            entity.signature = p.signature;
            entity.exported = p.exported;
            entity.doc = p.doc;
            // `parent_name` carries the enclosing type's literal name
            // text (e.g. "Foo" from `impl Foo`), not a resolvable local id.
            entity.parent = p.parent_name;
            entity.body = truncate_body(&p.body, config);
            if let Some(reason) = p.quarantine_reason {
                entity = entity.quarantine(reason);
            }
            entity
        })
        .collect();

    (entities, id_map)
}

/// Caps entity body text at `max_body_lines` / `max_body_chars`
/// (spec.md §3 "body: capped at `MAX_BODY_LINES`").
fn truncate_body(body: &str, config: &PipelineConfig) -> String {
    let by_lines: String = body.lines().take(config.max_body_lines).collect::<Vec<_>>().join("\n");
    if by_lines.len() > config.max_body_chars {
        by_lines.chars().take(config.max_body_chars).collect()
    } else {
        by_lines
    }
}

fn resolve_edges(parsed: &[ParsedEdge], id_map: &HashMap<String, String>) -> Vec<Edge> {
    parsed
        .iter()
        .filter_map(|e| {
            let from_id = id_map.get(&e.from_local_id)?;
            let to_id = id_map.get(&e.to_local_id)?;
            let from = format!("entities/{from_id}");
            let to = format!("entities/{to_id}");
            let key = semgraph_core::hashing::edge_hash(&from, &to, e.kind);
            Some(Edge { key, from, to, kind: e.kind })
        })
        .collect()
}

fn contains_edges(entities: &[Entity]) -> Vec<Edge> {
    let mut file_entity_id_by_path: HashMap<&str, &str> = HashMap::new();
    for entity in entities {
        if entity.kind == EntityKind::File {
            file_entity_id_by_path.insert(entity.file_path.as_str(), entity.id.as_str());
        }
    }

    let mut edges = Vec::new();
    for entity in entities {
        if entity.kind == EntityKind::File {
            continue;
        }
        let Some(file_id) = file_entity_id_by_path.get(entity.file_path.as_str()) else {
            continue;
        };
        let from = format!("entities/{file_id}");
        let to = format!("entities/{}", entity.id);
        let key = semgraph_core::hashing::edge_hash(&from, &to, semgraph_core::EdgeKind::Contains);
        edges.push(Edge { key, from, to, kind: semgraph_core::EdgeKind::Contains });
    }
    edges
}
