//! Simplex: a dimension-tagged tuple.

use serde::{Deserialize, Serialize};

use super::primitive::PrimitiveType;
use super::tuple::Tuple;

/// A simplex named through one of its flags. Two simplices are the same
/// geometric entity when their ids agree, regardless of the tuple used;
/// compare with [`Mesh::simplex_is_equal`](crate::mesh::Mesh::simplex_is_equal).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Simplex {
    primitive: PrimitiveType,
    tuple: Tuple,
}

impl Simplex {
    #[inline]
    pub fn new(primitive: PrimitiveType, tuple: Tuple) -> Self {
        Self { primitive, tuple }
    }

    #[inline]
    pub fn vertex(tuple: Tuple) -> Self {
        Self::new(PrimitiveType::Vertex, tuple)
    }

    #[inline]
    pub fn edge(tuple: Tuple) -> Self {
        Self::new(PrimitiveType::Edge, tuple)
    }

    #[inline]
    pub fn face(tuple: Tuple) -> Self {
        Self::new(PrimitiveType::Face, tuple)
    }

    #[inline]
    pub fn tetrahedron(tuple: Tuple) -> Self {
        Self::new(PrimitiveType::Tetrahedron, tuple)
    }

    #[inline]
    pub fn primitive_type(&self) -> PrimitiveType {
        self.primitive
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.primitive.dimension()
    }

    #[inline]
    pub fn tuple(&self) -> Tuple {
        self.tuple
    }
}

/// A simplex named by `(primitive, global id)`, as reported by operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdSimplex {
    pub primitive: PrimitiveType,
    pub id: i64,
}

impl IdSimplex {
    #[inline]
    pub fn new(primitive: PrimitiveType, id: i64) -> Self {
        Self { primitive, id }
    }
}
