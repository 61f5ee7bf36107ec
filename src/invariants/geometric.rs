//! Invariants over vertex positions.

use super::Invariant;
use crate::attribute::MeshAttributeHandle;
use crate::geometry::{cell_orientation, edge_length};
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::simplex::Simplex;
use crate::topology::tuple::Tuple;

fn input_length(mesh: &Mesh, positions: &MeshAttributeHandle, simplex: &Simplex) -> Option<f64> {
    if mesh.top_dimension() == 0 {
        return None;
    }
    let flag = mesh.flag_vertices(&simplex.tuple());
    edge_length(mesh, positions, flag[0], flag[1]).ok()
}

/// Only edges at least `min` long are touched.
#[derive(Clone, Copy, Debug)]
pub struct MinEdgeLength {
    pub positions: MeshAttributeHandle,
    pub min: f64,
}

impl MinEdgeLength {
    pub fn new(positions: MeshAttributeHandle, min: f64) -> Self {
        Self { positions, min }
    }
}

impl Invariant for MinEdgeLength {
    fn name(&self) -> &str {
        "min_edge_length"
    }

    fn before(&self, mesh: &Mesh, simplex: &Simplex) -> bool {
        input_length(mesh, &self.positions, simplex).is_some_and(|l| l >= self.min)
    }
}

/// Only edges at most `max` long are touched.
#[derive(Clone, Copy, Debug)]
pub struct MaxEdgeLength {
    pub positions: MeshAttributeHandle,
    pub max: f64,
}

impl MaxEdgeLength {
    pub fn new(positions: MeshAttributeHandle, max: f64) -> Self {
        Self { positions, max }
    }
}

impl Invariant for MaxEdgeLength {
    fn name(&self) -> &str {
        "max_edge_length"
    }

    fn before(&self, mesh: &Mesh, simplex: &Simplex) -> bool {
        input_length(mesh, &self.positions, simplex).is_some_and(|l| l <= self.max)
    }
}

/// New cells keep the orientation of the cells they replace and are not
/// degenerate. Exact when positions are `Rational`.
///
/// A new cell is compared with the removed cell it shares the most vertex
/// positions with, so meshes whose cells are not all ordered the same way
/// are judged cell by cell.
#[derive(Clone, Copy, Debug)]
pub struct SimplexInversionInvariant {
    pub positions: MeshAttributeHandle,
}

impl SimplexInversionInvariant {
    pub fn new(positions: MeshAttributeHandle) -> Self {
        Self { positions }
    }
}

impl Invariant for SimplexInversionInvariant {
    fn name(&self) -> &str {
        "simplex_inversion"
    }

    fn after(&self, mesh: &Mesh, before: &[Tuple], after: &[Tuple]) -> bool {
        let sources = mesh.parent_scope(|| {
            before
                .iter()
                .map(|t| {
                    let c = t.global_cid();
                    Ok((mesh.cell_vertices(c), cell_orientation(mesh, &self.positions, c)?))
                })
                .collect::<Result<Vec<(Vec<i64>, i8)>, MeshError>>()
        });
        let Ok(sources) = sources else {
            return false;
        };
        if sources.iter().any(|(_, sign)| *sign == 0) {
            return false;
        }
        after.iter().all(|t| {
            let c = t.global_cid();
            let Ok(sign) = cell_orientation(mesh, &self.positions, c) else {
                return false;
            };
            let vertices = mesh.cell_vertices(c);
            let source = sources.iter().max_by_key(|(old, _)| {
                old.iter().zip(&vertices).filter(|(x, y)| x == y).count()
            });
            match source {
                Some((_, expected)) => sign == *expected,
                None => sign == 1,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::primitive::PrimitiveType;

    #[test]
    fn edge_length_bounds() {
        let m = Mesh::tri_mesh(&[[0, 1, 2]]).unwrap();
        let pos = m
            .create_attribute::<f64>("position", PrimitiveType::Vertex, &[0.0, 0.0])
            .unwrap();
        let acc = m.accessor(&pos);
        acc.set_vector(1, &[2.0, 0.0]);
        acc.set_vector(2, &[0.0, 1.0]);
        let handle = m.attributes().erase(pos);
        let e01 = m.find_simplex(&[0, 1]).unwrap();
        let e02 = m.find_simplex(&[0, 2]).unwrap();
        let long = MinEdgeLength::new(handle, 1.5);
        let short = MaxEdgeLength::new(handle, 1.5);
        assert!(long.before(&m, &e01));
        assert!(!long.before(&m, &e02));
        assert!(!short.before(&m, &e01));
        assert!(short.before(&m, &e02));
    }

    #[test]
    fn degenerate_cells_fail_inversion() {
        let m = Mesh::tri_mesh(&[[0, 1, 2]]).unwrap();
        let pos = m
            .create_attribute::<f64>("position", PrimitiveType::Vertex, &[0.0, 0.0])
            .unwrap();
        let acc = m.accessor(&pos);
        acc.set_vector(1, &[1.0, 0.0]);
        let inv = SimplexInversionInvariant::new(m.attributes().erase(pos));
        let t = m.tuple_from_id(PrimitiveType::Face, 0);
        assert!(!inv.after(&m, &[], &[t]));
        acc.set_vector(2, &[0.0, 1.0]);
        assert!(inv.after(&m, &[], &[t]));
        assert!(inv.after(&m, &[t], &[t]));
    }

    #[test]
    fn mixed_local_orders_are_judged_per_cell() {
        use crate::operations::{EdgeSplit, Operation, SplitSettings};

        // [0,1,2] is counter-clockwise, [1,2,3] clockwise
        let m = Mesh::tri_mesh(&[[0, 1, 2], [1, 2, 3]]).unwrap();
        let pos = m
            .create_attribute::<f64>("position", PrimitiveType::Vertex, &[0.0, 0.0])
            .unwrap();
        let acc = m.accessor(&pos);
        acc.set_vector(1, &[1.0, 0.0]);
        acc.set_vector(2, &[0.0, 1.0]);
        acc.set_vector(3, &[1.0, 1.0]);
        let handle = m.attributes().erase(pos);
        assert_eq!(crate::geometry::cell_orientation(&m, &handle, 0).unwrap(), 1);
        assert_eq!(crate::geometry::cell_orientation(&m, &handle, 1).unwrap(), -1);

        let settings =
            SplitSettings::default().with_invariant(SimplexInversionInvariant::new(handle));
        let e = m.find_simplex(&[1, 2]).unwrap();
        EdgeSplit::new(settings).execute(&m, &e.tuple()).unwrap();
        assert_eq!(m.count(PrimitiveType::Face), 4);
    }
}
