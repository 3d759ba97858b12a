//! Task queues, the local workflow engine, and the top-level workflows
//! (full-index, incremental-index, and the ABANDON-policy children
//! syncLocalGraph/detectPatterns/reconciliation) that drive the rest of
//! the workspace's crates (spec.md §2, §4.7, §5).

pub mod cache;
pub mod full_index;
pub mod incremental;
pub mod local_engine;
pub mod ontology;
pub mod patterns;
pub mod queue;

pub use cache::LocalCacheStore;
pub use full_index::{run_full_index, FullIndexReport};
pub use incremental::{debounce, handle_push_signal, run_incremental_cycle, PushOutcome};
pub use local_engine::{running_workflows, workflow_id, LocalWorkflowEngine, Signal};
pub use ontology::discover_ontology;
pub use patterns::{run_detect_patterns, run_reconciliation, run_sync_local_graph, HeuristicPatternEngine};
pub use queue::{HeavyComputeQueue, LightLlmQueue, Task};
