//! Connectivity construction from top-cell vertex lists.

use hashbrown::HashMap;
use itertools::Itertools;

use super::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::primitive::PrimitiveType;

/// Options for [`Mesh::from_cells_with`].
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    /// Run the full structural check after construction.
    pub validate: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { validate: true }
    }
}

impl BuildOptions {
    /// Skip the post-construction check (large inputs known to be valid).
    pub fn unchecked() -> Self {
        Self { validate: false }
    }
}

fn sorted_key(vertices: impl IntoIterator<Item = i64>) -> Vec<i64> {
    vertices.into_iter().sorted_unstable().collect()
}

/// Populate an empty mesh. Every write goes to committed storage.
pub(super) fn initialize<C: AsRef<[i64]>>(mesh: &Mesh, cells: &[C]) -> Result<(), MeshError> {
    let d = mesh.top_dimension();
    let n = d + 1;
    let tables = mesh.tables();

    let mut max_vertex = -1i64;
    for (c, cell) in cells.iter().enumerate() {
        let cell = cell.as_ref();
        if cell.len() != n {
            return Err(MeshError::InvalidTopology(format!(
                "cell {c} has {} vertices, expected {n}",
                cell.len()
            )));
        }
        if cell.iter().any(|&v| v < 0) {
            return Err(MeshError::InvalidTopology(format!("cell {c} has a negative vertex id")));
        }
        if !cell.iter().all_unique() {
            return Err(MeshError::InvalidTopology(format!("cell {c} repeats a vertex")));
        }
        max_vertex = max_vertex.max(cell.iter().copied().max().unwrap_or(-1));
    }

    if d == 0 {
        mesh.reserve(PrimitiveType::Vertex, (max_vertex + 1) as usize)?;
        for cell in cells {
            mesh.set_active(0, cell.as_ref()[0], true);
        }
        return Ok(());
    }

    let top = mesh.top_simplex_type();
    mesh.reserve(PrimitiveType::Vertex, (max_vertex + 1) as usize)?;
    let cell_ids = mesh.reserve(top, cells.len())?;

    // k-face ids, 0 < k < d
    let mut face_ids: Vec<HashMap<Vec<i64>, i64>> = vec![HashMap::new(); d];
    let mut face_counts = vec![0i64; d];
    let mut cell_faces: Vec<Vec<Vec<i64>>> = vec![Vec::with_capacity(cells.len()); d];
    for cell in cells {
        let cell = cell.as_ref();
        for k in 1..d {
            let mut ids = Vec::with_capacity(tables.face_count(k));
            for local in tables.faces(k) {
                let key = sorted_key(local.iter().map(|&l| cell[l as usize]));
                let next = &mut face_counts[k];
                let id = *face_ids[k].entry(key).or_insert_with(|| {
                    let id = *next;
                    *next += 1;
                    id
                });
                ids.push(id);
            }
            cell_faces[k].push(ids);
        }
    }
    for k in 1..d {
        mesh.reserve(PrimitiveType::from_dimension(k), face_counts[k] as usize)?;
    }

    // facet adjacency
    let mut facets: HashMap<Vec<i64>, Vec<(usize, usize)>> = HashMap::new();
    for (c, cell) in cells.iter().enumerate() {
        let cell = cell.as_ref();
        for i in 0..n {
            let key = sorted_key((0..n).filter(|&j| j != i).map(|j| cell[j]));
            facets.entry(key).or_default().push((c, i));
        }
    }
    let mut neighbors = vec![vec![-1i64; n]; cells.len()];
    for (key, incident) in &facets {
        match incident.as_slice() {
            [_] => {}
            [(c0, i0), (c1, i1)] => {
                neighbors[*c0][*i0] = cell_ids[*c1];
                neighbors[*c1][*i1] = cell_ids[*c0];
            }
            _ => {
                return Err(MeshError::InvalidTopology(format!(
                    "facet {key:?} is shared by {} cells",
                    incident.len()
                )));
            }
        }
    }

    let conn = mesh.conn();
    for (c, cell) in cells.iter().enumerate() {
        let cell = cell.as_ref();
        let cid = cell_ids[c];
        mesh.attributes().write(&conn.faces[0], cid, cell);
        for k in 1..d {
            mesh.set_cell_faces(k, cid, &cell_faces[k][c]);
        }
        mesh.attributes()
            .write(mesh.neighbor_handle(), cid, &neighbors[c]);
        mesh.set_active(d, cid, true);
        for &v in cell {
            if !mesh.is_active_dim(0, v) {
                mesh.set_active(0, v, true);
                mesh.set_coface(0, v, cid);
            }
        }
        for k in 1..d {
            for &f in &cell_faces[k][c] {
                if !mesh.is_active_dim(k, f) {
                    mesh.set_active(k, f, true);
                    mesh.set_coface(k, f, cid);
                }
            }
        }
    }
    log::debug!(
        "built {:?} mesh: {} vertices, {} cells",
        mesh.kind(),
        max_vertex + 1,
        cells.len()
    );
    Ok(())
}
