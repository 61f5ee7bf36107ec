//! MeshError: unified error type for simplex-forge public APIs
//!
//! Every fallible operation on meshes, attributes, operations and multi-mesh
//! hierarchies reports failures through this enum. Expected failures (stale
//! tuples, rejected edits) are ordinary values; structural inconsistencies are
//! also surfaced here after the `debug_invariants!` check had its chance to
//! abort loudly.

use thiserror::Error;

use crate::topology::primitive::PrimitiveType;

/// Unified error type for simplex-forge operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// A tuple's connectivity hash no longer matches the cell it references.
    #[error("stale tuple: cell {cell} has hash {found}, tuple carries {expected}")]
    StaleTuple { cell: i64, expected: i64, found: i64 },
    /// The tuple references a simplex that has been deleted.
    #[error("tuple references deleted cell {0}")]
    DeletedSimplex(i64),
    /// An invariant rejected the proposed operation.
    #[error("invariant `{invariant}` rejected the operation")]
    InvariantViolation { invariant: String },
    /// A throw-on-conflict attribute strategy saw two different values.
    #[error("conflicting values for attribute `{attribute}`")]
    AttributeConflict { attribute: String },
    /// Parent/child maps no longer commute.
    #[error("structural inconsistency: {0}")]
    StructuralInconsistency(String),
    /// Attribute growth could not reserve enough memory.
    #[error("could not reserve {requested} new {primitive:?} ids")]
    CapacityExceeded {
        primitive: PrimitiveType,
        requested: usize,
    },
    /// Input cells do not form a valid manifold simplicial complex.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),
    /// The operation is not defined for this mesh kind or simplex.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),
    /// No attribute with that name exists on the requested primitive.
    #[error("attribute `{0}` not found")]
    AttributeNotFound(String),
    /// A handle was used with the wrong scalar type.
    #[error("attribute `{name}` holds {actual} values, requested {requested}")]
    AttributeTypeMismatch {
        name: String,
        actual: &'static str,
        requested: &'static str,
    },
    /// An attribute with that name already exists and replacement was not requested.
    #[error("attribute `{0}` already exists")]
    DuplicateAttribute(String),
    /// The handle belongs to another mesh.
    #[error("attribute handle belongs to a different mesh")]
    ForeignHandle,
    /// Value slice length does not match the attribute arity.
    #[error("attribute `{name}` has arity {expected}, got {found} values")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    /// No child mesh with that id is registered.
    #[error("no child mesh with id {0}")]
    UnknownChild(usize),
    /// The operation must be performed on the root of the hierarchy.
    #[error("mesh is not the root of its hierarchy")]
    NotRoot,
    /// A parent/child map handed to registration is malformed.
    #[error("invalid multi-mesh map: {0}")]
    InvalidMap(String),
}

impl MeshError {
    /// True for failures a scheduler should skip rather than report.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MeshError::StaleTuple { .. }
                | MeshError::DeletedSimplex(_)
                | MeshError::InvariantViolation { .. }
                | MeshError::AttributeConflict { .. }
                | MeshError::CapacityExceeded { .. }
        )
    }
}
