//! Topological vocabulary: primitives, darts, tuples and simplices.
//!
//! - [`primitive`]: simplex dimensions and the closed set of mesh kinds
//! - [`orientation`]: the permutation group darts live in
//! - [`tables`]: per-dimension switch and face tables
//! - [`tuple`] / [`simplex`]: the navigation handles
//! - [`link`]: combinatorial links used by the link condition

pub mod link;
pub mod orientation;
pub mod primitive;
pub mod simplex;
pub mod tables;
pub mod tuple;

pub use orientation::{DartPerm, Orientation, Perm};
pub use primitive::{MeshKind, PrimitiveType};
pub use simplex::{IdSimplex, Simplex};
pub use tuple::Tuple;
