//! Shape validation for the graph-upload contract (spec.md §6
//! "Graph-upload endpoint contract": rejects with 400-equivalent on shape
//! errors). Grounded in the teacher's `FilePathValidator`/`Validate`
//! pattern (`codegraph-core/src/validation.rs`), trimmed to the fields
//! this spec's upload contract actually names.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("entity missing required field '{0}'")]
    EntityMissingField(&'static str),
    #[error("edge missing required field '{0}'")]
    EdgeMissingField(&'static str),
    #[error("file_path must not be empty")]
    EmptyFilePath,
}

/// Minimal shape a caller must supply for an entity in the upload payload,
/// prior to the server stamping `org_id`/`repo_id` (spec.md §6).
#[derive(Debug, Clone)]
pub struct RawEntityShape<'a> {
    pub id: &'a str,
    pub kind: &'a str,
    pub name: &'a str,
    pub file_path: &'a str,
}

pub fn validate_raw_entity(shape: &RawEntityShape<'_>) -> Result<(), ShapeError> {
    if shape.id.is_empty() {
        return Err(ShapeError::EntityMissingField("id"));
    }
    if shape.kind.is_empty() {
        return Err(ShapeError::EntityMissingField("kind"));
    }
    if shape.name.is_empty() {
        return Err(ShapeError::EntityMissingField("name"));
    }
    if shape.file_path.is_empty() {
        return Err(ShapeError::EmptyFilePath);
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct RawEdgeShape<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub kind: &'a str,
}

pub fn validate_raw_edge(shape: &RawEdgeShape<'_>) -> Result<(), ShapeError> {
    if shape.from.is_empty() {
        return Err(ShapeError::EdgeMissingField("_from"));
    }
    if shape.to.is_empty() {
        return Err(ShapeError::EdgeMissingField("_to"));
    }
    if shape.kind.is_empty() {
        return Err(ShapeError::EdgeMissingField("kind"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_entity_missing_name() {
        let shape = RawEntityShape { id: "1", kind: "function", name: "", file_path: "a.rs" };
        assert_eq!(validate_raw_entity(&shape), Err(ShapeError::EntityMissingField("name")));
    }

    #[test]
    fn accepts_well_formed_entity() {
        let shape = RawEntityShape { id: "1", kind: "function", name: "foo", file_path: "a.rs" };
        assert!(validate_raw_entity(&shape).is_ok());
    }

    #[test]
    fn rejects_edge_missing_to() {
        let shape = RawEdgeShape { from: "entities/1", to: "", kind: "calls" };
        assert_eq!(validate_raw_edge(&shape), Err(ShapeError::EdgeMissingField("_to")));
    }
}
