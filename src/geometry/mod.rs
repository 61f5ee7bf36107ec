//! Geometry over vertex position attributes.
//!
//! Positions are any `Double` or `Rational` vertex attribute; orientation
//! tests on `Rational` positions are exact.

pub mod predicates;

use crate::attribute::{AttributeType, AttributeValues, MeshAttributeHandle, Rational};
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;

pub use predicates::{orient2d, orient3d, signed_area, signed_volume};

fn check_positions(mesh: &Mesh, positions: &MeshAttributeHandle) -> Result<(), MeshError> {
    if positions.primitive_type().dimension() != 0 {
        return Err(MeshError::UnsupportedOperation(
            "positions must be a vertex attribute",
        ));
    }
    match positions.held_type() {
        AttributeType::Double | AttributeType::Rational => {
            if positions.mesh_id == mesh.attributes().id() {
                Ok(())
            } else {
                Err(MeshError::ForeignHandle)
            }
        }
        _ => Err(MeshError::UnsupportedOperation(
            "positions must hold Double or Rational values",
        )),
    }
}

/// Position of vertex `v` as floats.
pub fn position(mesh: &Mesh, positions: &MeshAttributeHandle, v: i64) -> Vec<f64> {
    mesh.attributes().values(positions, v).to_f64()
}

/// Euclidean distance between two vertices.
pub fn edge_length(
    mesh: &Mesh,
    positions: &MeshAttributeHandle,
    a: i64,
    b: i64,
) -> Result<f64, MeshError> {
    check_positions(mesh, positions)?;
    let pa = position(mesh, positions, a);
    let pb = position(mesh, positions, b);
    Ok(pa
        .iter()
        .zip(&pb)
        .map(|(x, y)| (y - x) * (y - x))
        .sum::<f64>()
        .sqrt())
}

/// Orientation sign of top cell `c` in its local vertex order.
///
/// The positions' arity must equal the mesh dimension.
pub fn cell_orientation(
    mesh: &Mesh,
    positions: &MeshAttributeHandle,
    c: i64,
) -> Result<i8, MeshError> {
    check_positions(mesh, positions)?;
    if mesh.top_dimension() == 0 {
        return Ok(1);
    }
    let vertices = mesh.cell_vertices(c);
    let sign = match positions.held_type() {
        AttributeType::Rational => {
            let points: Vec<Vec<Rational>> = vertices
                .iter()
                .map(|&v| match mesh.attributes().values(positions, v) {
                    AttributeValues::Rational(p) => p,
                    _ => Vec::new(),
                })
                .collect();
            predicates::simplex_orientation(&points)
        }
        _ => {
            let points: Vec<Vec<f64>> = vertices
                .iter()
                .map(|&v| position(mesh, positions, v))
                .collect();
            predicates::simplex_orientation(&points)
        }
    };
    sign.ok_or(MeshError::UnsupportedOperation(
        "orientation needs positions with as many coordinates as the mesh dimension",
    ))
}

/// Length, area or volume of top cell `c`.
pub fn cell_measure(mesh: &Mesh, positions: &MeshAttributeHandle, c: i64) -> Result<f64, MeshError> {
    check_positions(mesh, positions)?;
    let points: Vec<Vec<f64>> = mesh
        .cell_vertices(c)
        .iter()
        .map(|&v| position(mesh, positions, v))
        .collect();
    Ok(predicates::simplex_measure(&points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::primitive::PrimitiveType;

    #[test]
    fn orientation_follows_local_order() {
        let m = Mesh::tri_mesh(&[[0, 1, 2]]).unwrap();
        let h = m
            .create_attribute::<f64>("pos", PrimitiveType::Vertex, &[0.0, 0.0])
            .unwrap();
        let acc = m.accessor(&h);
        acc.set_vector(1, &[1.0, 0.0]);
        acc.set_vector(2, &[0.0, 1.0]);
        let erased = m.attributes().erase(h);
        assert_eq!(cell_orientation(&m, &erased, 0).unwrap(), 1);
        assert!((cell_measure(&m, &erased, 0).unwrap() - 0.5).abs() < 1e-12);
        assert!((edge_length(&m, &erased, 1, 2).unwrap() - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn integer_positions_are_rejected() {
        let m = Mesh::tri_mesh(&[[0, 1, 2]]).unwrap();
        let h = m
            .create_attribute::<i64>("pos", PrimitiveType::Vertex, &[0, 0])
            .unwrap();
        let erased = m.attributes().erase(h);
        assert!(cell_orientation(&m, &erased, 0).is_err());
    }
}
