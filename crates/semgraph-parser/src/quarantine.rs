//! Quarantine handling (spec.md §4.3): files too large or too slow to
//! extract get exactly one placeholder entity and the pipeline continues.

use std::collections::HashSet;
use std::path::Path;

use semgraph_core::{Entity, EntityKind, PipelineConfig, QuarantineReason};

/// Checks the file-size boundary only; the timeout boundary is enforced
/// by wrapping the actual extraction call in `tokio::time::timeout` at
/// the call site, since a size check is synchronous but a timeout is not.
pub fn oversized(path: &Path, config: &PipelineConfig) -> Option<QuarantineReason> {
    let meta = std::fs::metadata(path).ok()?;
    if meta.len() > config.max_file_size_bytes {
        Some(QuarantineReason::FileTooLarge)
    } else {
        None
    }
}

/// Exactly one placeholder entity per quarantined path (spec.md §4.3).
pub fn placeholder_entity(
    org_id: &str,
    repo_id: &str,
    index_version: &str,
    file_path: &str,
    language: &str,
    reason: QuarantineReason,
) -> Entity {
    Entity::new(org_id, repo_id, index_version, EntityKind::File, file_path, file_path, language)
        .quarantine(reason)
}

/// Paths that were quarantined on a previous run but extract cleanly now
/// (spec.md §4.3 `shouldHealQuarantine`, scenario (f)). Callers use the
/// result to invalidate and re-run downstream work for those paths.
pub fn should_heal_quarantine(previously_quarantined: &[String], now_extracts_ok: &HashSet<String>) -> Vec<String> {
    let mut healed: Vec<String> = previously_quarantined
        .iter()
        .filter(|p| now_extracts_ok.contains(p.as_str()))
        .cloned()
        .collect();
    healed.sort();
    healed
}
