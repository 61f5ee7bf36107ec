//! Region rewrite: replace a set of top cells by new ones and repair every
//! incidence around them.
//!
//! Split and collapse both reduce to "remove these cells, add cells with
//! these vertex lists". Faces are identified by their sorted vertex keys, so
//! a face of a new cell that already existed keeps its id (and its
//! attributes); everything else is reserved fresh. All writes go through the
//! calling thread's scope.

use hashbrown::{HashMap, HashSet};
use itertools::Itertools;

use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::primitive::PrimitiveType;
use crate::topology::simplex::IdSimplex;

pub(crate) type FaceKey = Vec<i64>;

pub(crate) fn sorted_key(vertices: impl IntoIterator<Item = i64>) -> FaceKey {
    vertices.into_iter().sorted_unstable().collect()
}

/// Outcome of [`rewrite_region`].
#[derive(Debug, Default)]
pub(crate) struct RegionEdit {
    pub created: Vec<IdSimplex>,
    pub deleted: Vec<IdSimplex>,
    /// Ids of the new top cells, in input order.
    pub new_cells: Vec<i64>,
    pub removed_cells: Vec<i64>,
    /// Surviving cells outside the region whose adjacency changed.
    pub touched_cells: Vec<i64>,
    /// Faces of the removed cells before the edit, per dimension.
    pub old_ids: Vec<HashMap<FaceKey, i64>>,
    /// Faces of the new cells after the edit, per dimension.
    pub new_ids: Vec<HashMap<FaceKey, i64>>,
}

impl RegionEdit {
    /// True when the `k`-face with this key did not exist before the edit.
    pub fn is_fresh(&self, k: usize, key: &FaceKey) -> bool {
        self.new_ids[k]
            .get(key)
            .is_some_and(|id| self.created.contains(&IdSimplex::new(PrimitiveType::from_dimension(k), *id)))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Incidence {
    /// New cell (input index) and the local vertex opposite the facet.
    New(usize, usize),
    /// Surviving cell and the local vertex opposite the facet.
    Kept(i64, usize),
}

/// Replace `removed` by cells spanning `new_cells`.
///
/// Vertices referenced by `new_cells` must be live, or reserved by the
/// caller (they are activated here and reported as created). Local vertex
/// order of each new cell is kept as given.
pub(crate) fn rewrite_region(
    mesh: &Mesh,
    removed: &[i64],
    new_cells: &[Vec<i64>],
) -> Result<RegionEdit, MeshError> {
    let d = mesh.top_dimension();
    if d == 0 {
        return Err(MeshError::UnsupportedOperation("point meshes have no local edits"));
    }
    let n = d + 1;
    let top = mesh.top_simplex_type();
    let tables = mesh.tables();
    let removed_set: HashSet<i64> = removed.iter().copied().collect();

    for cell in new_cells {
        if cell.len() != n || !cell.iter().all_unique() {
            return Err(MeshError::InvalidTopology(format!(
                "replacement cell {cell:?} is not a {d}-simplex"
            )));
        }
    }
    let vertex_capacity = mesh.capacity(PrimitiveType::Vertex) as i64;
    if let Some(v) = new_cells.iter().flatten().find(|&&v| v < 0 || v >= vertex_capacity) {
        return Err(MeshError::InvalidTopology(format!("vertex {v} was never reserved")));
    }
    if !new_cells.iter().map(|c| sorted_key(c.iter().copied())).all_unique() {
        return Err(MeshError::InvalidTopology("replacement cells repeat".into()));
    }

    // faces before the edit
    let mut old_ids: Vec<HashMap<FaceKey, i64>> = vec![HashMap::new(); n];
    let mut old_home: Vec<HashMap<FaceKey, i64>> = vec![HashMap::new(); n];
    for &c in removed {
        let cv = mesh.cell_vertices(c);
        for (k, faces) in (0..n).map(|k| (k, tables.faces(k))) {
            for (j, local) in faces.iter().enumerate() {
                let key = sorted_key(local.iter().map(|&l| cv[l as usize]));
                old_home[k].entry(key.clone()).or_insert(c);
                old_ids[k].entry(key).or_insert_with(|| mesh.face_id(k, c, j));
            }
        }
    }

    let mut new_keys: Vec<Vec<Vec<FaceKey>>> = Vec::with_capacity(new_cells.len());
    let mut all_new: Vec<HashSet<FaceKey>> = vec![HashSet::new(); n];
    for cell in new_cells {
        let per_k: Vec<Vec<FaceKey>> = (0..n)
            .map(|k| {
                tables
                    .faces(k)
                    .iter()
                    .map(|local| sorted_key(local.iter().map(|&l| cell[l as usize])))
                    .collect()
            })
            .collect();
        for (k, keys) in per_k.iter().enumerate() {
            all_new[k].extend(keys.iter().cloned());
        }
        new_keys.push(per_k);
    }

    // where old faces go: some surviving cell, or nowhere
    let mut survivors: Vec<HashMap<FaceKey, i64>> = vec![HashMap::new(); n];
    for k in 0..d {
        for (key, &home) in &old_home[k] {
            if all_new[k].contains(key) {
                continue;
            }
            if let Some(s) = mesh
                .cells_containing(key, home)
                .into_iter()
                .find(|c| !removed_set.contains(c))
            {
                survivors[k].insert(key.clone(), s);
            }
        }
    }

    // faces of new cells that exist outside the region
    let mut outside: Vec<HashMap<FaceKey, i64>> = vec![HashMap::new(); n];
    let mut facets: HashMap<FaceKey, Vec<Incidence>> = HashMap::new();
    let mut seen_kept: HashSet<(i64, usize)> = HashSet::new();
    for k in 1..d {
        for key in &all_new[k] {
            if old_ids[k].contains_key(key) {
                continue;
            }
            if let Some(s) = mesh.find_simplex(key) {
                outside[k].insert(key.clone(), mesh.simplex_id(&s));
                if k == d - 1 {
                    for c in mesh.cells_containing(key, s.tuple().global_cid()) {
                        if removed_set.contains(&c) {
                            continue;
                        }
                        let cv = mesh.cell_vertices(c);
                        if let Some(i) = cv.iter().position(|v| !key.contains(v)) {
                            if seen_kept.insert((c, i)) {
                                facets.entry(key.clone()).or_default().push(Incidence::Kept(c, i));
                            }
                        }
                    }
                }
            }
        }
    }
    if d == 1 {
        // facets are vertices; look for cells outside the region sharing them
        for key in &all_new[0] {
            let v = key[0];
            if !mesh.is_active_dim(0, v) {
                continue;
            }
            for c in mesh.vertex_star(v) {
                if removed_set.contains(&c) {
                    continue;
                }
                let cv = mesh.cell_vertices(c);
                if let Some(i) = cv.iter().position(|&u| u != v) {
                    if seen_kept.insert((c, i)) {
                        facets.entry(key.clone()).or_default().push(Incidence::Kept(c, i));
                    }
                }
            }
        }
    }
    for &c in removed {
        let cv = mesh.cell_vertices(c);
        for (i, nb) in mesh.neighbors(c).into_iter().enumerate() {
            if nb < 0 || removed_set.contains(&nb) {
                continue;
            }
            let key = sorted_key(cv.iter().enumerate().filter(|&(j, _)| j != i).map(|(_, &v)| v));
            let nv = mesh.cell_vertices(nb);
            if let Some(j) = nv.iter().position(|v| !key.contains(v)) {
                if seen_kept.insert((nb, j)) {
                    facets.entry(key).or_default().push(Incidence::Kept(nb, j));
                }
            }
        }
    }
    for (idx, cell) in new_cells.iter().enumerate() {
        for i in 0..n {
            let key = sorted_key((0..n).filter(|&j| j != i).map(|j| cell[j]));
            facets.entry(key).or_default().push(Incidence::New(idx, i));
        }
    }
    if let Some((key, incident)) = facets.iter().find(|(_, v)| v.len() > 2) {
        return Err(MeshError::InvalidTopology(format!(
            "edit would share facet {key:?} among {} cells",
            incident.len()
        )));
    }

    // ---- mutation ------------------------------------------------------
    let mut edit = RegionEdit {
        removed_cells: removed.to_vec(),
        ..RegionEdit::default()
    };
    let cell_ids = mesh.reserve(top, new_cells.len())?;
    edit.new_cells = cell_ids.clone();

    let mut new_ids: Vec<HashMap<FaceKey, i64>> = vec![HashMap::new(); n];
    for key in &all_new[0] {
        let v = key[0];
        new_ids[0].insert(key.clone(), v);
        if !mesh.is_active_dim(0, v) {
            mesh.set_active(0, v, true);
            edit.created.push(IdSimplex::new(PrimitiveType::Vertex, v));
        }
    }
    for k in 1..d {
        let primitive = PrimitiveType::from_dimension(k);
        let fresh: Vec<&FaceKey> = all_new[k]
            .iter()
            .filter(|key| !old_ids[k].contains_key(*key) && !outside[k].contains_key(*key))
            .sorted_unstable()
            .collect();
        let ids = mesh.reserve(primitive, fresh.len())?;
        for (key, id) in fresh.into_iter().zip(ids) {
            new_ids[k].insert(key.clone(), id);
            mesh.set_active(k, id, true);
            edit.created.push(IdSimplex::new(primitive, id));
        }
        for key in &all_new[k] {
            if let Some(&id) = old_ids[k].get(key).or_else(|| outside[k].get(key)) {
                new_ids[k].insert(key.clone(), id);
            }
        }
    }

    let conn = mesh.conn();
    for (idx, cell) in new_cells.iter().enumerate() {
        let cid = cell_ids[idx];
        mesh.attributes().write(&conn.faces[0], cid, cell);
        for k in 1..d {
            let ids: Vec<i64> = new_keys[idx][k].iter().map(|key| new_ids[k][key]).collect();
            mesh.set_cell_faces(k, cid, &ids);
        }
        mesh.set_active(d, cid, true);
        new_ids[d].insert(new_keys[idx][d][0].clone(), cid);
        edit.created.push(IdSimplex::new(top, cid));
    }
    // every face of a new cell is backed by a new cell
    for (idx, per_k) in new_keys.iter().enumerate() {
        for k in 0..d {
            for key in &per_k[k] {
                if outside[k].contains_key(key) {
                    continue;
                }
                mesh.set_coface(k, new_ids[k][key], cell_ids[idx]);
            }
        }
    }

    let mut touched: HashSet<i64> = HashSet::new();
    for incident in facets.values() {
        match incident.as_slice() {
            [Incidence::New(a, i)] => mesh.set_neighbor(cell_ids[*a], *i, -1),
            [Incidence::Kept(c, i)] => {
                mesh.set_neighbor(*c, *i, -1);
                touched.insert(*c);
            }
            [x, y] => {
                for (from, to) in [(x, y), (y, x)] {
                    let target = match to {
                        Incidence::New(b, _) => cell_ids[*b],
                        Incidence::Kept(c, _) => *c,
                    };
                    match from {
                        Incidence::New(a, i) => mesh.set_neighbor(cell_ids[*a], *i, target),
                        Incidence::Kept(c, i) => {
                            if mesh.neighbor(*c, *i) != target {
                                mesh.set_neighbor(*c, *i, target);
                                touched.insert(*c);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    for &c in removed {
        mesh.set_active(d, c, false);
        mesh.bump_hash(c);
        edit.deleted.push(IdSimplex::new(top, c));
    }
    for k in 0..d {
        let primitive = PrimitiveType::from_dimension(k);
        for (key, &id) in old_ids[k].iter().sorted_unstable_by_key(|(_, id)| **id) {
            if all_new[k].contains(key) {
                continue;
            }
            match survivors[k].get(key) {
                Some(&s) => mesh.set_coface(k, id, s),
                None => {
                    mesh.set_active(k, id, false);
                    edit.deleted.push(IdSimplex::new(primitive, id));
                }
            }
        }
    }
    for &c in touched.iter().sorted_unstable() {
        mesh.bump_hash(c);
        edit.touched_cells.push(c);
    }

    edit.old_ids = old_ids;
    edit.new_ids = new_ids;
    log::trace!(
        "rewrote {} cells into {}: +{} -{} simplices",
        removed.len(),
        new_cells.len(),
        edit.created.len(),
        edit.deleted.len()
    );
    Ok(edit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DebugInvariants;

    #[test]
    fn retriangulating_a_quad_keeps_the_boundary() {
        let m = Mesh::tri_mesh(&[[0, 1, 2], [0, 2, 3]]).unwrap();
        let edit = rewrite_region(&m, &[0, 1], &[vec![0, 1, 3], vec![1, 2, 3]]).unwrap();
        assert!(m.validate_invariants().is_ok());
        assert_eq!(m.count(PrimitiveType::Face), 2);
        assert_eq!(m.count(PrimitiveType::Edge), 5);
        assert!(m.find_simplex(&[0, 2]).is_none());
        assert!(m.find_simplex(&[1, 3]).is_some());
        // one edge out, one in, boundary ids kept
        let edges_out: Vec<_> = edit
            .deleted
            .iter()
            .filter(|s| s.primitive == PrimitiveType::Edge)
            .collect();
        assert_eq!(edges_out.len(), 1);
        assert!(edit.is_fresh(1, &vec![1, 3]));
        assert!(!edit.is_fresh(1, &vec![0, 1]));
    }

    #[test]
    fn inserting_an_interior_vertex() {
        let m = Mesh::tri_mesh(&[[0, 1, 2], [0, 2, 3], [0, 3, 4]]).unwrap();
        let unreserved = rewrite_region(&m, &[0], &[vec![5, 1, 2]]).unwrap_err();
        assert!(matches!(unreserved, MeshError::InvalidTopology(_)));

        let v = m.reserve(PrimitiveType::Vertex, 1).unwrap()[0];
        let hash_before = m.cell_hash(1);
        let edit = rewrite_region(&m, &[0], &[vec![0, 1, v], vec![0, v, 2], vec![v, 1, 2]]).unwrap();
        assert!(m.validate_invariants().is_ok());
        assert_eq!(m.count(PrimitiveType::Face), 5);
        assert_eq!(m.count(PrimitiveType::Edge), 10);
        assert!(edit.created.contains(&IdSimplex::new(PrimitiveType::Vertex, v)));
        assert_eq!(edit.touched_cells, vec![1]);
        assert_ne!(m.cell_hash(1), hash_before);
        assert_eq!(m.valence(v), 3);
    }

    #[test]
    fn three_cells_on_a_facet_are_rejected() {
        let m = Mesh::tri_mesh(&[[0, 1, 2], [0, 2, 3]]).unwrap();
        m.reserve(PrimitiveType::Vertex, 1).unwrap();
        let err = rewrite_region(&m, &[], &[vec![0, 2, 4]]).unwrap_err();
        assert!(matches!(err, MeshError::InvalidTopology(_)));
    }
}
