//! Staleness detection (spec.md §4.6.4): a prior justification is reused
//! when its entity's body is unchanged and none of its callees changed;
//! otherwise the entity is re-justified.

use std::collections::HashSet;

use semgraph_core::hashing::hex_sha256;

pub fn body_hash(body: &str) -> String {
    hex_sha256(body.as_bytes())
}

/// `true` when the prior justification can be reused as-is.
pub fn is_unchanged(
    prev_body_hash: Option<&str>,
    current_body: &str,
    callees: &[String],
    callee_changed_set: &HashSet<String>,
) -> bool {
    let body_unchanged = prev_body_hash == Some(body_hash(current_body).as_str());
    let no_callee_changed = callees.iter().all(|c| !callee_changed_set.contains(c));
    body_unchanged && no_callee_changed
}
