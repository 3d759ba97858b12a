//! SCIP and tree-sitter plugin ports (spec.md §4.3). Real SCIP indexer
//! binaries and every non-Rust tree-sitter grammar are external/heavy
//! collaborators out of scope for this workspace; `NullScipPlugin` exists
//! so the two-pass contract (SCIP first, tree-sitter fills the rest) is
//! still exercised end-to-end.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use semgraph_core::{EdgeKind, EntityKind, QuarantineReason, Result};

/// A pre-hash entity, keyed by a `local_id` unique within one plugin run
/// (typically the qualified name within its file), resolved to a real
/// content-hash ID once the indexing pipeline has every entity in hand.
#[derive(Debug, Clone)]
pub struct ParsedEntity {
    pub local_id: String,
    pub kind: EntityKind,
    pub name: String,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub language: String,
    pub signature: Option<String>,
    pub exported: bool,
    pub doc: Option<String>,
    pub parent_name: Option<String>,
    pub quarantine_reason: Option<QuarantineReason>,
    /// Raw source text spanning the node; truncated to
    /// `max_body_lines`/`max_body_chars` once the pipeline has a
    /// [`semgraph_core::PipelineConfig`] in hand.
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct ParsedEdge {
    pub from_local_id: String,
    pub to_local_id: String,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Default)]
pub struct PluginOutput {
    pub entities: Vec<ParsedEntity>,
    pub edges: Vec<ParsedEdge>,
}

/// Runs a compiled SCIP indexer over workspace roots for one language
/// (spec.md §4.3 step 1). Reports which files it achieved precise symbol
/// coverage for; the tree-sitter fallback only runs over the remainder.
#[async_trait]
pub trait ScipPlugin: Send + Sync {
    fn language(&self) -> &'static str;
    async fn index(&self, workspace_root: &Path, files: &[PathBuf]) -> Result<(PluginOutput, HashSet<PathBuf>)>;
}

/// Reports zero coverage for every language, standing in for the absence
/// of a real SCIP indexer binary in this workspace.
pub struct NullScipPlugin;

#[async_trait]
impl ScipPlugin for NullScipPlugin {
    fn language(&self) -> &'static str {
        "*"
    }

    async fn index(&self, _workspace_root: &Path, _files: &[PathBuf]) -> Result<(PluginOutput, HashSet<PathBuf>)> {
        Ok((PluginOutput::default(), HashSet::new()))
    }
}

/// Parses a single file's source with a tree-sitter grammar (spec.md §4.3
/// step 2, the fallback pass).
pub trait TreeSitterPlugin: Send + Sync {
    fn language(&self) -> &'static str;
    fn parse_file(&self, file_path: &str, content: &str) -> Result<PluginOutput>;
}
