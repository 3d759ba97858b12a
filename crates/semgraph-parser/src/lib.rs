//! Workspace preparation and two-pass SCIP + tree-sitter indexing
//! (spec.md §4.2, §4.3).

pub mod indexing;
pub mod language;
pub mod plugin;
pub mod quarantine;
pub mod rust_plugin;
pub mod workspace;

pub use indexing::{IndexingReport, Indexer};
pub use plugin::{NullScipPlugin, ParsedEdge, ParsedEntity, PluginOutput, ScipPlugin, TreeSitterPlugin};
pub use rust_plugin::RustTreeSitterPlugin;
pub use workspace::{collect_files, LocalWorkspacePort, PreparedWorkspace, WorkspacePort, WorkspaceSource};
