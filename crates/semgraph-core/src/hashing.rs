use sha2::{Digest, Sha256};

use crate::model::{EdgeKind, EntityKind};

/// Hex-encode the full SHA-256 digest of `bytes`, used for the snapshot
/// checksum (spec.md §6) and for `Justification::body_hash` (spec.md §3).
pub fn hex_sha256(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex_encode(&digest)
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Truncate a SHA-256 digest to its first 16 bytes (128 bits), hex-encoded.
fn truncated_hash(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0u8]); // separator byte, avoids "ab"+"c" == "a"+"bc" collisions
        }
        hasher.update(part.as_bytes());
    }
    let digest = hasher.finalize();
    hex_encode(&digest[..16])
}

/// `entityHash(repo_id, file_path, kind, name, signature?) -> 128-bit hash`
/// (spec.md §4.1). Pure and order-independent of sibling entities;
/// insensitive to whitespace in `body` (body never enters the hash);
/// sensitive to signature changes.
pub fn entity_hash(
    repo_id: &str,
    file_path: &str,
    kind: EntityKind,
    name: &str,
    signature: Option<&str>,
) -> String {
    truncated_hash(&[
        repo_id,
        file_path,
        kind_tag(kind),
        name,
        signature.unwrap_or(""),
    ])
}

/// `edgeHash(_from, _to, kind) -> 128-bit hash` (spec.md §4.1).
pub fn edge_hash(from: &str, to: &str, kind: EdgeKind) -> String {
    truncated_hash(&[from, to, edge_kind_tag(kind)])
}

fn kind_tag(kind: EntityKind) -> &'static str {
    use EntityKind::*;
    match kind {
        File => "file",
        Directory => "directory",
        Module => "module",
        Namespace => "namespace",
        Function => "function",
        Method => "method",
        Class => "class",
        Struct => "struct",
        Interface => "interface",
        Variable => "variable",
        Type => "type",
        Enum => "enum",
        Decorator => "decorator",
    }
}

fn edge_kind_tag(kind: EdgeKind) -> &'static str {
    use EdgeKind::*;
    match kind {
        Calls => "calls",
        Contains => "contains",
        Imports => "imports",
        Implements => "implements",
        Inherits => "inherits",
        References => "references",
        Exports => "exports",
    }
}
