//! Topological leveling, heuristic classification, model-tier routing,
//! the dynamic batcher, staleness detection, context propagation, and
//! feature/health/ADR synthesis (spec.md §4.6).

pub mod aggregation;
pub mod batcher;
pub mod context;
pub mod engine;
pub mod heuristics;
pub mod leveling;
pub mod propagation;
pub mod prompting;
pub mod provider;
pub mod routing;
pub mod staleness;

pub use aggregation::{aggregate_features, build_health_report, synthesize_adrs};
pub use batcher::{pack_batches, Batch, BatchCandidate};
pub use context::{assemble as assemble_context, EntityContext, Neighbor};
pub use engine::{justify_repo, JustifyReport};
pub use heuristics::{dead_code_short_circuit, fallback_justification, heuristic_classification};
pub use leveling::topological_levels;
pub use propagation::{propagate, PropagatedTags};
pub use prompting::{build_prompt, parse as parse_prompt, ParsedPrompt};
pub use provider::HeuristicLlmProvider;
pub use routing::{model_name, route};
pub use staleness::{body_hash, is_unchanged};
