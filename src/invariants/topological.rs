//! Combinatorial invariants.

use hashbrown::HashSet;

use super::Invariant;
use crate::attribute::TypedAttributeHandle;
use crate::mesh::Mesh;
use crate::topology::link::edge_link_condition;
use crate::topology::primitive::PrimitiveType;
use crate::topology::simplex::Simplex;
use crate::topology::tuple::Tuple;

/// Rejects edits whose input `primitive`-face touches the boundary.
#[derive(Clone, Copy, Debug)]
pub struct InteriorSimplexInvariant {
    pub primitive: PrimitiveType,
}

impl InteriorSimplexInvariant {
    pub fn new(primitive: PrimitiveType) -> Self {
        Self { primitive }
    }
}

impl Invariant for InteriorSimplexInvariant {
    fn name(&self) -> &str {
        "interior_simplex"
    }

    fn before(&self, mesh: &Mesh, simplex: &Simplex) -> bool {
        if self.primitive.dimension() > mesh.top_dimension() {
            return true;
        }
        !mesh.is_boundary(&Simplex::new(self.primitive, simplex.tuple()))
    }
}

/// Every vertex of the new cells keeps at least `min` neighbours.
#[derive(Clone, Copy, Debug)]
pub struct MinIncidentValence {
    pub min: usize,
}

impl MinIncidentValence {
    pub fn new(min: usize) -> Self {
        Self { min }
    }
}

impl Invariant for MinIncidentValence {
    fn name(&self) -> &str {
        "min_incident_valence"
    }

    fn after(&self, mesh: &Mesh, _before: &[Tuple], after: &[Tuple]) -> bool {
        let mut seen = HashSet::new();
        after
            .iter()
            .flat_map(|t| mesh.cell_vertices(t.global_cid()))
            .filter(|v| seen.insert(*v))
            .all(|v| mesh.valence(v) >= self.min)
    }
}

fn endpoints(mesh: &Mesh, simplex: &Simplex) -> Option<(i64, i64)> {
    if mesh.top_dimension() == 0 {
        return None;
    }
    let flag = mesh.flag_vertices(&simplex.tuple());
    Some((flag[0], flag[1]))
}

/// Child vertex whose image is parent vertex `v`.
fn child_vertex(parent: &Mesh, child: &Mesh, v: i64) -> Option<i64> {
    let s = parent.find_simplex(&[v])?;
    let images = parent.map_to_child(child, &s).ok()?;
    images.first().map(|c| child.simplex_id(c))
}

/// Link condition of edge `(a, b)` in `mesh` and, through the maps, in every
/// descendant that sees both endpoints.
pub(crate) fn multimesh_link_condition(mesh: &Mesh, a: i64, b: i64) -> bool {
    if mesh.top_dimension() > 0 && !edge_link_condition(mesh, a, b) {
        return false;
    }
    for child in mesh.multi_mesh().children() {
        let (Some(u), Some(w)) = (child_vertex(mesh, &child, a), child_vertex(mesh, &child, b)) else {
            continue;
        };
        // both endpoints are in the child: it must collapse the same edge,
        // not merge two of its vertices
        if child.top_dimension() == 0 || child.find_simplex(&[u, w]).is_none() {
            return false;
        }
        if !multimesh_link_condition(&child, u, w) {
            return false;
        }
    }
    true
}

/// Edge link condition on the mesh and every mapped child.
#[derive(Clone, Copy, Debug, Default)]
pub struct MultiMeshLinkConditionInvariant;

impl Invariant for MultiMeshLinkConditionInvariant {
    fn name(&self) -> &str {
        "multimesh_link_condition"
    }

    fn before(&self, mesh: &Mesh, simplex: &Simplex) -> bool {
        match endpoints(mesh, simplex) {
            Some((a, b)) => multimesh_link_condition(mesh, a, b),
            None => false,
        }
    }
}

/// Keeps an edge-tagged substructure from changing topology under a
/// collapse: tagged edges never fold onto each other, and two tagged
/// regions never get joined through an untagged edge.
#[derive(Clone, Copy, Debug)]
pub struct SubstructureTopologyPreservingInvariant {
    pub tag: TypedAttributeHandle<i64>,
    pub value: i64,
}

impl SubstructureTopologyPreservingInvariant {
    pub fn new(tag: TypedAttributeHandle<i64>, value: i64) -> Self {
        Self { tag, value }
    }

    fn neighbors(mesh: &Mesh, v: i64) -> HashSet<i64> {
        mesh.vertex_star(v)
            .into_iter()
            .flat_map(|c| mesh.cell_vertices(c))
            .filter(|&u| u != v)
            .collect()
    }
}

impl Invariant for SubstructureTopologyPreservingInvariant {
    fn name(&self) -> &str {
        "substructure_topology"
    }

    fn before(&self, mesh: &Mesh, simplex: &Simplex) -> bool {
        if self.tag.primitive_type() != PrimitiveType::Edge {
            return true;
        }
        let Some((a, b)) = endpoints(mesh, simplex) else {
            return true;
        };
        let acc = mesh.accessor(&self.tag);
        let tagged = |x: i64, y: i64| {
            mesh.find_simplex(&[x, y])
                .is_some_and(|e| acc.scalar(mesh.simplex_id(&e)) == self.value)
        };
        let na = Self::neighbors(mesh, a);
        let nb = Self::neighbors(mesh, b);
        if tagged(a, b) {
            !na.intersection(&nb).any(|&x| tagged(a, x) && tagged(b, x))
        } else {
            let a_on = na.iter().any(|&x| tagged(a, x));
            let b_on = nb.iter().any(|&x| tagged(b, x));
            !(a_on && b_on)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fan() -> Mesh {
        // hexagon around vertex 0
        Mesh::tri_mesh(&[
            [0, 1, 2],
            [0, 2, 3],
            [0, 3, 4],
            [0, 4, 5],
            [0, 5, 6],
            [0, 6, 1],
        ])
        .unwrap()
    }

    #[test]
    fn interior_and_boundary_edges() {
        let m = fan();
        let inner = m.find_simplex(&[0, 1]).unwrap();
        let outer = m.find_simplex(&[1, 2]).unwrap();
        let inv = InteriorSimplexInvariant::new(PrimitiveType::Edge);
        assert!(inv.before(&m, &inner));
        assert!(!inv.before(&m, &outer));
    }

    #[test]
    fn link_condition_on_a_fan() {
        let m = fan();
        let inv = MultiMeshLinkConditionInvariant;
        assert!(inv.before(&m, &m.find_simplex(&[0, 1]).unwrap()));
    }

    #[test]
    fn substructure_edges_do_not_fold() {
        let m = fan();
        let tag = m.create_attribute::<i64>("feature", PrimitiveType::Edge, &[0]).unwrap();
        let acc = m.accessor(&tag);
        for pair in [[1, 2], [2, 3]] {
            let e = m.find_simplex(&pair).unwrap();
            acc.set_scalar(m.simplex_id(&e), 1);
        }
        let inv = SubstructureTopologyPreservingInvariant::new(tag, 1);
        // 1 and 2 share no tagged neighbour
        assert!(inv.before(&m, &m.find_simplex(&[1, 2]).unwrap()));
        // 0 is off the feature, 1 is on it: joining them is fine
        assert!(inv.before(&m, &m.find_simplex(&[0, 1]).unwrap()));
        // tag 0-2 as well: now 1-2 and 0-2 share tagged neighbour 2 with 0-1
        let e02 = m.find_simplex(&[0, 2]).unwrap();
        acc.set_scalar(m.simplex_id(&e02), 1);
        let e01 = m.find_simplex(&[0, 1]).unwrap();
        acc.set_scalar(m.simplex_id(&e01), 1);
        assert!(!inv.before(&m, &e01));
        // untagged edge between two tagged vertices
        assert!(!inv.before(&m, &m.find_simplex(&[0, 3]).unwrap()));
    }

    #[test]
    fn valence_after_edit() {
        let m = fan();
        let t = m.tuple_from_id(PrimitiveType::Face, 0);
        assert!(MinIncidentValence::new(3).after(&m, &[], &[t]));
        assert!(!MinIncidentValence::new(4).after(&m, &[], &[t]));
    }
}
