//! Primitive (simplex dimension) and mesh-kind metadata.

use serde::{Deserialize, Serialize};

/// Simplex dimensions addressed by tuples and attributes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimitiveType {
    /// 0-simplex.
    Vertex,
    /// 1-simplex.
    Edge,
    /// 2-simplex.
    Face,
    /// 3-simplex.
    Tetrahedron,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 4] = [
        PrimitiveType::Vertex,
        PrimitiveType::Edge,
        PrimitiveType::Face,
        PrimitiveType::Tetrahedron,
    ];

    /// Topological dimension of the primitive.
    #[inline]
    pub fn dimension(self) -> usize {
        match self {
            PrimitiveType::Vertex => 0,
            PrimitiveType::Edge => 1,
            PrimitiveType::Face => 2,
            PrimitiveType::Tetrahedron => 3,
        }
    }

    /// Primitive with the given dimension.
    ///
    /// # Panics
    /// Panics if `dim > 3`.
    #[inline]
    pub fn from_dimension(dim: usize) -> Self {
        match dim {
            0 => PrimitiveType::Vertex,
            1 => PrimitiveType::Edge,
            2 => PrimitiveType::Face,
            3 => PrimitiveType::Tetrahedron,
            _ => panic!("no primitive of dimension {dim}"),
        }
    }
}

/// Closed set of simplicial mesh kinds. They differ only in top dimension and
/// in which connectivity table set they navigate with.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum MeshKind {
    /// Vertices only.
    Point,
    /// Polylines.
    Edge,
    /// Triangle surfaces.
    Tri,
    /// Tetrahedral volumes.
    Tet,
}

impl MeshKind {
    #[inline]
    pub fn top_dimension(self) -> usize {
        match self {
            MeshKind::Point => 0,
            MeshKind::Edge => 1,
            MeshKind::Tri => 2,
            MeshKind::Tet => 3,
        }
    }

    #[inline]
    pub fn top_simplex_type(self) -> PrimitiveType {
        PrimitiveType::from_dimension(self.top_dimension())
    }

    /// Kind whose top simplex has dimension `dim`.
    pub fn from_top_dimension(dim: usize) -> Option<Self> {
        match dim {
            0 => Some(MeshKind::Point),
            1 => Some(MeshKind::Edge),
            2 => Some(MeshKind::Tri),
            3 => Some(MeshKind::Tet),
            _ => None,
        }
    }

    /// Number of vertices of a top cell.
    #[inline]
    pub fn cell_size(self) -> usize {
        self.top_dimension() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_round_trip() {
        for p in PrimitiveType::ALL {
            assert_eq!(PrimitiveType::from_dimension(p.dimension()), p);
        }
        for d in 0..4 {
            let kind = MeshKind::from_top_dimension(d).unwrap();
            assert_eq!(kind.top_dimension(), d);
            assert_eq!(kind.cell_size(), d + 1);
        }
        assert!(MeshKind::from_top_dimension(4).is_none());
    }
}
