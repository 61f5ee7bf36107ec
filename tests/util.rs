#![allow(dead_code)]
use simplex_forge::prelude::*;

/// Triangulated `n x n` grid of unit squares, each cut along its diagonal.
pub fn grid_cells(n: i64) -> Vec<[i64; 3]> {
    let mut cells = Vec::new();
    for i in 0..n {
        for j in 0..n {
            let v = i * (n + 1) + j;
            cells.push([v, v + 1, v + n + 2]);
            cells.push([v, v + n + 2, v + n + 1]);
        }
    }
    cells
}

pub fn grid(n: i64) -> Mesh {
    Mesh::tri_mesh(&grid_cells(n)).unwrap()
}

/// Attach planar grid positions to a mesh built by [`grid`].
pub fn grid_positions(mesh: &Mesh, n: i64) -> TypedAttributeHandle<f64> {
    let pos = mesh
        .create_attribute::<f64>("position", PrimitiveType::Vertex, &[0.0, 0.0])
        .unwrap();
    let acc = mesh.accessor(&pos);
    for i in 0..=n {
        for j in 0..=n {
            acc.set_vector(i * (n + 1) + j, &[j as f64, i as f64]);
        }
    }
    pos
}

/// Vertex, edge, face and tetrahedron counts.
pub fn counts(mesh: &Mesh) -> Vec<usize> {
    (0..=mesh.top_dimension())
        .map(|k| mesh.count(PrimitiveType::from_dimension(k)))
        .collect()
}

pub fn new_vertex(record: &OperationRecord) -> i64 {
    record
        .created
        .iter()
        .find(|s| s.primitive == PrimitiveType::Vertex)
        .map(|s| s.id)
        .expect("operation created no vertex")
}
