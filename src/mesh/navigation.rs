//! Tuple navigation and incidence queries.

use hashbrown::HashSet;

use super::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::orientation::DartPerm;
use crate::topology::primitive::PrimitiveType;
use crate::topology::simplex::{IdSimplex, Simplex};
use crate::topology::tables::Dart;
use crate::topology::tuple::Tuple;

impl Mesh {
    // ---- darts ----------------------------------------------------------

    #[inline]
    pub(crate) fn dart(&self, t: &Tuple) -> &'static Dart {
        self.tables().dart(t.local_vid, t.local_eid, t.local_fid)
    }

    #[inline]
    fn tuple_in(&self, cell: i64, dart: &Dart) -> Tuple {
        Tuple::new(
            dart.local[0],
            dart.local[1],
            dart.local[2],
            cell,
            self.cell_hash(cell),
        )
    }

    /// The tuple of `cell` whose flag starts with the given global vertices,
    /// remaining local vertices following in ascending local order.
    pub fn tuple_with_vertices(&self, cell: i64, prefix: &[i64]) -> Option<Tuple> {
        let n = self.top_dimension() + 1;
        if prefix.len() > n {
            return None;
        }
        let vertices = self.cell_vertices(cell);
        let mut images = [0u8, 1, 2, 3];
        let mut used = [false; 4];
        for (slot, v) in prefix.iter().enumerate() {
            let local = vertices.iter().position(|x| x == v)?;
            if used[local] {
                return None;
            }
            used[local] = true;
            images[slot] = local as u8;
        }
        let mut slot = prefix.len();
        for (local, taken) in used.iter().enumerate().take(n) {
            if !taken {
                images[slot] = local as u8;
                slot += 1;
            }
        }
        let dart = self.tables().dart_of_perm(&DartPerm::new_unchecked(images));
        Some(self.tuple_in(cell, dart))
    }

    /// Global vertices of the tuple's flag, `D + 1` entries.
    pub fn flag_vertices(&self, t: &Tuple) -> Vec<i64> {
        let perm = self.dart(t).perm;
        let vertices = self.cell_vertices(t.global_cid);
        (0..=self.top_dimension())
            .map(|i| vertices[perm.0[i] as usize])
            .collect()
    }

    /// Ordered global vertices of a simplex, following its tuple's flag.
    pub fn simplex_vertices(&self, simplex: &Simplex) -> Vec<i64> {
        let mut flag = self.flag_vertices(&simplex.tuple());
        flag.truncate(simplex.dimension() + 1);
        flag
    }

    /// Global vertex id of the tuple's vertex.
    #[inline]
    pub fn vertex_id(&self, t: &Tuple) -> i64 {
        self.id(t, PrimitiveType::Vertex)
    }

    // ---- switches -------------------------------------------------------

    /// Flip one incidence of the tuple.
    ///
    /// # Panics
    /// Panics when switching the top dimension across a boundary facet, or
    /// when `primitive` exceeds the mesh dimension.
    pub fn switch_tuple(&self, t: &Tuple, primitive: PrimitiveType) -> Tuple {
        match self.try_switch_tuple(t, primitive) {
            Some(s) => s,
            None => panic!("switch_tuple({primitive:?}) crossed the boundary"),
        }
    }

    /// As [`Self::switch_tuple`], returning `None` on the boundary.
    pub fn try_switch_tuple(&self, t: &Tuple, primitive: PrimitiveType) -> Option<Tuple> {
        let k = primitive.dimension();
        let d = self.top_dimension();
        assert!(k <= d, "cannot switch {primitive:?} in a {d}-dimensional mesh");
        if k < d {
            let tables = self.tables();
            let idx = tables.dart_index(t.local_vid, t.local_eid, t.local_fid);
            let dart = tables.switch(idx, k);
            return Some(Tuple::new(
                dart.local[0],
                dart.local[1],
                dart.local[2],
                t.global_cid,
                t.hash,
            ));
        }
        if d == 0 {
            return None;
        }
        let perm = self.dart(t).perm;
        let opposite = perm.0[d] as usize;
        let neighbor = self.neighbor(t.global_cid, opposite);
        if neighbor < 0 {
            return None;
        }
        let vertices = self.cell_vertices(t.global_cid);
        let prefix: Vec<i64> = (0..d).map(|i| vertices[perm.0[i] as usize]).collect();
        self.tuple_with_vertices(neighbor, &prefix)
    }

    /// Apply switches left to right.
    pub fn switch_tuples(&self, t: &Tuple, sequence: &[PrimitiveType]) -> Tuple {
        sequence
            .iter()
            .fold(*t, |acc, &p| self.switch_tuple(&acc, p))
    }

    #[inline]
    pub fn switch_vertex(&self, t: &Tuple) -> Tuple {
        self.switch_tuple(t, PrimitiveType::Vertex)
    }

    #[inline]
    pub fn switch_edge(&self, t: &Tuple) -> Tuple {
        self.switch_tuple(t, PrimitiveType::Edge)
    }

    #[inline]
    pub fn switch_face(&self, t: &Tuple) -> Tuple {
        self.switch_tuple(t, PrimitiveType::Face)
    }

    #[inline]
    pub fn switch_tetrahedron(&self, t: &Tuple) -> Tuple {
        self.switch_tuple(t, PrimitiveType::Tetrahedron)
    }

    /// Parity of the tuple's dart.
    #[inline]
    pub fn is_ccw(&self, t: &Tuple) -> bool {
        self.dart(t).ccw
    }

    // ---- ids ------------------------------------------------------------

    /// Global id of the `primitive`-face selected by the tuple.
    pub fn id(&self, t: &Tuple, primitive: PrimitiveType) -> i64 {
        let k = primitive.dimension();
        let d = self.top_dimension();
        assert!(k <= d, "no {primitive:?} in a {d}-dimensional mesh");
        if k == d {
            return t.global_cid;
        }
        let dart = self.dart(t);
        self.face_id(k, t.global_cid, dart.local[k] as usize)
    }

    #[inline]
    pub fn simplex_id(&self, simplex: &Simplex) -> i64 {
        self.id(&simplex.tuple(), simplex.primitive_type())
    }

    #[inline]
    pub fn id_simplex(&self, simplex: &Simplex) -> IdSimplex {
        IdSimplex::new(simplex.primitive_type(), self.simplex_id(simplex))
    }

    /// True when both simplices name the same entity.
    pub fn simplex_is_equal(&self, a: &Simplex, b: &Simplex) -> bool {
        a.primitive_type() == b.primitive_type() && self.simplex_id(a) == self.simplex_id(b)
    }

    /// Local face index of `k`-simplex `id` within cell `c`.
    pub(crate) fn local_face_of(&self, k: usize, c: i64, id: i64) -> Option<usize> {
        self.cell_face_ids(k, c).iter().position(|&f| f == id)
    }

    /// Global vertices of a `k`-simplex given by id (sorted by local order in
    /// its coface).
    pub fn id_simplex_vertices(&self, simplex: IdSimplex) -> Vec<i64> {
        let k = simplex.primitive.dimension();
        let c = self.coface(k, simplex.id);
        if k == self.top_dimension() {
            return self.cell_vertices(c);
        }
        let Some(j) = self.local_face_of(k, c, simplex.id) else {
            return Vec::new();
        };
        let vertices = self.cell_vertices(c);
        self.tables().faces(k)[j]
            .iter()
            .map(|&l| vertices[l as usize])
            .collect()
    }

    /// A tuple whose `primitive`-face is the simplex `id`.
    pub fn tuple_from_id(&self, primitive: PrimitiveType, id: i64) -> Tuple {
        let k = primitive.dimension();
        let c = self.coface(k, id);
        if k == self.top_dimension() {
            return self.tuple_in(c, &self.tables().darts()[0]);
        }
        let vertices = self.id_simplex_vertices(IdSimplex::new(primitive, id));
        self.tuple_with_vertices(c, &vertices).unwrap_or(Tuple::NULL)
    }

    /// Live simplices of a dimension, one tuple each.
    pub fn simplices(&self, primitive: PrimitiveType) -> Vec<Tuple> {
        self.simplex_ids(primitive)
            .into_iter()
            .map(|id| self.tuple_from_id(primitive, id))
            .collect()
    }

    /// Live simplex ids of a dimension.
    pub fn simplex_ids(&self, primitive: PrimitiveType) -> Vec<i64> {
        let k = primitive.dimension();
        (0..self.capacity(primitive) as i64)
            .filter(|&id| self.is_active_dim(k, id))
            .collect()
    }

    /// Number of live simplices of a dimension.
    pub fn count(&self, primitive: PrimitiveType) -> usize {
        let k = primitive.dimension();
        (0..self.capacity(primitive) as i64)
            .filter(|&id| self.is_active_dim(k, id))
            .count()
    }

    // ---- validity -------------------------------------------------------

    /// A tuple is valid when its cell is alive and the hash is current.
    pub fn is_valid(&self, t: &Tuple) -> bool {
        self.check_tuple(t).is_ok()
    }

    pub fn check_tuple(&self, t: &Tuple) -> Result<(), MeshError> {
        if t.is_null() || !self.is_active_dim(self.top_dimension(), t.global_cid) {
            return Err(MeshError::DeletedSimplex(t.global_cid));
        }
        let found = self.cell_hash(t.global_cid);
        if found != t.hash {
            return Err(MeshError::StaleTuple {
                cell: t.global_cid,
                expected: t.hash,
                found,
            });
        }
        Ok(())
    }

    /// Refresh a tuple's hash if its cell survived. A tuple into a deleted
    /// cell stays stale.
    pub fn resurrect_tuple(&self, t: &Tuple) -> Result<Tuple, MeshError> {
        if t.is_null() || !self.is_active_dim(self.top_dimension(), t.global_cid) {
            return Err(MeshError::StaleTuple {
                cell: t.global_cid,
                expected: t.hash,
                found: -1,
            });
        }
        Ok(t.with_hash(self.cell_hash(t.global_cid)))
    }

    // ---- incidence ------------------------------------------------------

    /// Top cells containing every vertex of `vertices`, reached from `start`
    /// through facets that contain them. `start` comes first.
    pub(crate) fn cells_containing(&self, vertices: &[i64], start: i64) -> Vec<i64> {
        let d = self.top_dimension();
        if d == 0 {
            return vec![start];
        }
        let mut out = vec![start];
        let mut seen: HashSet<i64> = HashSet::new();
        seen.insert(start);
        let mut head = 0;
        while head < out.len() {
            let c = out[head];
            head += 1;
            let cell = self.cell_vertices(c);
            for (i, v) in cell.iter().enumerate() {
                if vertices.contains(v) {
                    continue;
                }
                let n = self.neighbor(c, i);
                if n >= 0 && seen.insert(n) {
                    out.push(n);
                }
            }
        }
        out
    }

    /// Ids of the top cells incident to vertex `v`.
    pub fn vertex_star(&self, v: i64) -> Vec<i64> {
        if !self.is_active_dim(0, v) {
            return Vec::new();
        }
        self.cells_containing(&[v], self.coface(0, v))
    }

    /// Top cells containing the simplex, as tuples whose flags start with the
    /// simplex's vertices in the same order.
    pub fn top_cofaces(&self, simplex: &Simplex) -> Vec<Tuple> {
        let vertices = self.simplex_vertices(simplex);
        self.cells_containing(&vertices, simplex.tuple().global_cid)
            .into_iter()
            .filter_map(|c| self.tuple_with_vertices(c, &vertices))
            .collect()
    }

    /// Number of distinct vertices sharing an edge with `v`.
    pub fn valence(&self, v: i64) -> usize {
        let mut others: HashSet<i64> = HashSet::new();
        for c in self.vertex_star(v) {
            for u in self.cell_vertices(c) {
                if u != v {
                    others.insert(u);
                }
            }
        }
        others.len()
    }

    /// True when the simplex lies in a boundary facet. Top cells are never
    /// boundary.
    pub fn is_boundary(&self, simplex: &Simplex) -> bool {
        let d = self.top_dimension();
        if d == 0 || simplex.dimension() == d {
            return false;
        }
        let vertices = self.simplex_vertices(simplex);
        self.is_boundary_vertices(&vertices, simplex.tuple().global_cid)
    }

    pub(crate) fn is_boundary_vertices(&self, vertices: &[i64], start: i64) -> bool {
        self.cells_containing(vertices, start).into_iter().any(|c| {
            self.cell_vertices(c)
                .iter()
                .enumerate()
                .any(|(i, v)| !vertices.contains(v) && self.neighbor(c, i) < 0)
        })
    }

    /// Boundary check by id.
    pub fn is_boundary_id(&self, simplex: IdSimplex) -> bool {
        let d = self.top_dimension();
        let k = simplex.primitive.dimension();
        if d == 0 || k == d || !self.is_active_dim(k, simplex.id) {
            return false;
        }
        let vertices = self.id_simplex_vertices(simplex);
        self.is_boundary_vertices(&vertices, self.coface(k, simplex.id))
    }

    /// A live simplex spanned by exactly these global vertices, with its flag
    /// in the given order.
    pub fn find_simplex(&self, vertices: &[i64]) -> Option<Simplex> {
        let first = *vertices.first()?;
        if vertices.len() > self.top_dimension() + 1 {
            return None;
        }
        let primitive = PrimitiveType::from_dimension(vertices.len() - 1);
        self.vertex_star(first).into_iter().find_map(|c| {
            self.tuple_with_vertices(c, vertices)
                .map(|t| Simplex::new(primitive, t))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_triangles() -> Mesh {
        Mesh::tri_mesh(&[[0, 1, 2], [0, 2, 3]]).unwrap()
    }

    #[test]
    fn switches_are_involutions_on_interior_darts() {
        let m = two_triangles();
        for t in m.simplices(PrimitiveType::Face) {
            for t0 in [t, m.switch_vertex(&t), m.switch_edge(&t)] {
                for p in [PrimitiveType::Vertex, PrimitiveType::Edge, PrimitiveType::Face] {
                    if let Some(s) = m.try_switch_tuple(&t0, p) {
                        assert_eq!(m.switch_tuple(&s, p), t0);
                    }
                }
            }
        }
    }

    #[test]
    fn switch_face_crosses_shared_edge() {
        let m = two_triangles();
        let e = m.find_simplex(&[0, 2]).unwrap();
        let t = e.tuple();
        let across = m.switch_face(&t);
        assert_ne!(across.global_cid(), t.global_cid());
        assert_eq!(m.vertex_id(&across), 0);
        assert_eq!(m.id(&across, PrimitiveType::Edge), m.id(&t, PrimitiveType::Edge));
        assert_ne!(m.is_ccw(&across), m.is_ccw(&t));
    }

    #[test]
    fn boundary_and_valence() {
        let m = two_triangles();
        let shared = m.find_simplex(&[0, 2]).unwrap();
        let outer = m.find_simplex(&[0, 1]).unwrap();
        assert!(!m.is_boundary(&shared));
        assert!(m.is_boundary(&outer));
        assert_eq!(m.valence(0), 3);
        assert_eq!(m.valence(1), 2);
        assert_eq!(m.top_cofaces(&shared).len(), 2);
        assert_eq!(m.count(PrimitiveType::Edge), 5);
    }

    #[test]
    fn tuple_from_id_selects_the_simplex() {
        let m = Mesh::tet_mesh(&[[0, 1, 2, 3], [1, 2, 3, 4]]).unwrap();
        for p in PrimitiveType::ALL {
            for id in m.simplex_ids(p) {
                let t = m.tuple_from_id(p, id);
                assert_eq!(m.id(&t, p), id);
                assert!(m.is_valid(&t));
            }
        }
        assert_eq!(m.count(PrimitiveType::Face), 7);
        assert_eq!(m.count(PrimitiveType::Edge), 9);
    }

    #[test]
    fn stale_tuples_are_detected_and_resurrected() {
        let m = two_triangles();
        let t = m.tuple_from_id(PrimitiveType::Face, 0);
        m.bump_hash(0);
        assert!(matches!(m.check_tuple(&t), Err(MeshError::StaleTuple { .. })));
        let r = m.resurrect_tuple(&t).unwrap();
        assert!(m.is_valid(&r));
        assert!(r.same_dart(&t));
    }
}
