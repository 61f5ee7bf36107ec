#![cfg_attr(docsrs, feature(doc_cfg))]
//! # simplex-forge
//!
//! simplex-forge is a library for editing simplicial meshes (point, edge,
//! triangle and tetrahedral) through local operations that either commit as a
//! whole or leave the mesh observably unchanged.
//!
//! ## Features
//! - Tuple navigation: a tuple names one flag (vertex ⊂ edge ⊂ face ⊂ cell) of
//!   a top cell and carries the cell's connectivity hash, so stale handles are
//!   detected instead of silently followed
//! - Typed attributes on every simplex dimension, with per-thread nested
//!   scopes that buffer writes until the outermost commit
//! - Edge split, collapse and swap, gated by composable invariants and driven
//!   by per-attribute merge strategies
//! - Multi-mesh hierarchies: child meshes mapped onto parent simplices follow
//!   every parent edit, and structural hashes locate diverging subtrees
//! - A scheduler that sweeps an operation over every edge, optionally in
//!   parallel with Rayon
//! - Serde snapshots of meshes and hierarchies
//!
//! ## Determinism
//!
//! All randomized decisions use `SmallRng` seeds drawn from
//! [`SchedulerOptions`](operations::SchedulerOptions), so sequential runs are
//! reproducible. Unit tests fix seeds explicitly.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! simplex-forge = "0.3"
//! # Optional features:
//! # features = ["strict-invariants"]
//! ```
//!
//! ```
//! use simplex_forge::prelude::*;
//!
//! let mesh = Mesh::tri_mesh(&[[0, 1, 2], [0, 2, 3]]).unwrap();
//! let edge = mesh.find_simplex(&[0, 2]).unwrap();
//! let record = EdgeSplit::with_defaults().execute(&mesh, &edge.tuple()).unwrap();
//! assert_eq!(mesh.count(PrimitiveType::Face), 4);
//! assert!(record.return_tuple.is_some());
//! ```

pub mod attribute;
pub mod debug_invariants;
pub mod geometry;
pub mod invariants;
pub mod mesh;
pub mod mesh_error;
pub mod multimesh;
pub mod operations;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::attribute::{
        Accessor, AttributeScalar, AttributeType, MeshAttributeHandle, Rational,
        TypedAttributeHandle,
    };
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::invariants::{
        InteriorSimplexInvariant, Invariant, InvariantCollection, MaxEdgeLength,
        MinEdgeLength, MinIncidentValence, MultiMeshLinkConditionInvariant,
        SimplexInversionInvariant, SubstructureTopologyPreservingInvariant,
    };
    pub use crate::mesh::snapshot::{HierarchySnapshot, MeshSnapshot};
    pub use crate::mesh::{BuildOptions, Mesh, ScopeGuard};
    pub use crate::mesh_error::MeshError;
    pub use crate::multimesh::{MapValidator, StructuralSnapshot, extract_child_mesh};
    pub use crate::operations::{
        AttributeStrategy, CollapseSettings, EdgeCollapse, EdgeSplit, EdgeSwap, MergeStrategy,
        Operation, OperationKind, OperationRecord, ScheduleOrder, Scheduler, SchedulerOptions,
        SchedulerStats, SplitSettings, SplitStrategy, SwapSettings,
    };
    pub use crate::topology::{IdSimplex, MeshKind, PrimitiveType, Simplex, Tuple};
}
