//! Edge swap as a split followed by a collapse onto an opposite vertex.

use hashbrown::HashSet;

use super::collapse::collapse_local;
use super::split::split_local;
use super::{Operation, OperationKind, OperationRecord, OperationSettings, SwapSettings};
use crate::invariants::topological::multimesh_link_condition;
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::simplex::IdSimplex;
use crate::topology::tuple::Tuple;

/// Replaces an interior edge `(a, b)` by edges from `x`, the third vertex of
/// the input tuple's flag.
///
/// The edge is split at `m` and `m` is then collapsed onto `x`. In a
/// triangle mesh this is the classic flip; the return tuple sits on `x`, on
/// one of the new edges.
#[derive(Clone, Debug)]
pub struct EdgeSwap {
    settings: OperationSettings,
}

impl Default for EdgeSwap {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl EdgeSwap {
    pub fn new(settings: impl Into<OperationSettings>) -> Self {
        Self {
            settings: settings.into(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(SwapSettings::default())
    }
}

impl Operation for EdgeSwap {
    fn kind(&self) -> OperationKind {
        OperationKind::Swap
    }

    fn settings(&self) -> &OperationSettings {
        &self.settings
    }

    fn apply(&self, mesh: &Mesh, t: &Tuple) -> Result<OperationRecord, MeshError> {
        if mesh.top_dimension() < 2 {
            return Err(MeshError::UnsupportedOperation("swaps need a surface or a volume"));
        }
        let flag = mesh.flag_vertices(t);
        let (a, b, x) = (flag[0], flag[1], flag[2]);
        if mesh.is_boundary_vertices(&[a, b], t.global_cid()) {
            return Err(MeshError::UnsupportedOperation("boundary edges cannot be swapped"));
        }
        let strategies = &self.settings.strategies;

        let split = split_local(mesh, t, strategies)?;
        let m = split.new_vertex.ok_or_else(|| {
            MeshError::StructuralInconsistency("split produced no vertex".into())
        })?;
        let inner = mesh.find_simplex(&[m, x]).ok_or_else(|| {
            MeshError::StructuralInconsistency(format!("split left no edge between {m} and {x}"))
        })?;
        if !multimesh_link_condition(mesh, m, x) {
            return Err(MeshError::InvariantViolation {
                invariant: "multimesh_link_condition".into(),
            });
        }
        let collapse = collapse_local(mesh, &inner.tuple(), strategies)?;

        let split_created: HashSet<IdSimplex> = split.region.created.iter().copied().collect();
        let collapse_deleted: HashSet<IdSimplex> = collapse.region.deleted.iter().copied().collect();
        let created = split
            .region
            .created
            .iter()
            .chain(&collapse.region.created)
            .filter(|s| !collapse_deleted.contains(*s))
            .copied()
            .collect();
        let deleted = split
            .region
            .deleted
            .iter()
            .chain(collapse.region.deleted.iter().filter(|s| !split_created.contains(*s)))
            .copied()
            .collect();

        let return_tuple = collapse.region.new_cells.iter().find_map(|&c| {
            let y = mesh
                .cell_vertices(c)
                .into_iter()
                .find(|&v| v != x && v != a && v != b)?;
            mesh.tuple_with_vertices(c, &[x, y])
        });
        let mut children = split.children;
        children.extend(collapse.children);
        Ok(OperationRecord {
            kind: OperationKind::Swap,
            return_tuple,
            created,
            deleted,
            children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DebugInvariants;
    use crate::topology::primitive::PrimitiveType;

    #[test]
    fn flip_in_a_quad() {
        let m = Mesh::tri_mesh(&[[0, 1, 2], [0, 2, 3]]).unwrap();
        // flag (0, 2, 1): swap the diagonal 0-2 towards 1
        let t = m.tuple_with_vertices(0, &[0, 2, 1]).unwrap();
        let record = EdgeSwap::with_defaults().execute(&m, &t).unwrap();
        assert!(m.validate_invariants().is_ok());
        assert!(m.find_simplex(&[0, 2]).is_none());
        assert!(m.find_simplex(&[1, 3]).is_some());
        assert_eq!(m.count(PrimitiveType::Face), 2);
        assert_eq!(m.count(PrimitiveType::Edge), 5);
        assert_eq!(m.count(PrimitiveType::Vertex), 4);
        let r = record.return_tuple.unwrap();
        assert_eq!(m.flag_vertices(&r)[..2], [1, 3]);
        // the temporary midpoint is neither created nor deleted
        assert!(!record
            .created
            .iter()
            .any(|s| s.primitive == PrimitiveType::Vertex));
        assert!(!record
            .deleted
            .iter()
            .any(|s| s.primitive == PrimitiveType::Vertex));
    }

    #[test]
    fn boundary_edges_are_not_swapped() {
        let m = Mesh::tri_mesh(&[[0, 1, 2], [0, 2, 3]]).unwrap();
        let t = m.find_simplex(&[0, 1]).unwrap().tuple();
        assert!(EdgeSwap::with_defaults().execute(&m, &t).is_err());
        assert_eq!(m.count(PrimitiveType::Edge), 5);
    }
}
