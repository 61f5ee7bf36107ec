//! Links of simplices and the edge-collapse link condition.
//!
//! Boundary is handled by coning every boundary facet to a dummy vertex, so
//! the same test works for interior and boundary edges.

use hashbrown::HashSet;
use itertools::Itertools;

use crate::mesh::Mesh;

/// Vertex id standing in for "outside the mesh".
pub const DUMMY_VERTEX: i64 = -1;

/// Link of the simplex spanned by `vertices`, as sorted vertex lists.
///
/// `start` must be a live top cell containing every vertex in `vertices`.
pub fn link(mesh: &Mesh, vertices: &[i64], start: i64) -> HashSet<Vec<i64>> {
    let mut out = HashSet::new();
    for c in mesh.cells_containing(vertices, start) {
        let cell = mesh.cell_vertices(c);
        let rest: Vec<i64> = cell
            .iter()
            .copied()
            .filter(|v| !vertices.contains(v))
            .collect();
        for subset in rest.iter().copied().powerset() {
            if !subset.is_empty() {
                out.insert(subset.into_iter().sorted_unstable().collect());
            }
        }
        if mesh.top_dimension() == 0 {
            continue;
        }
        for (i, &opposite) in cell.iter().enumerate() {
            if vertices.contains(&opposite) || mesh.neighbor(c, i) >= 0 {
                continue;
            }
            let facet_rest: Vec<i64> = rest.iter().copied().filter(|&v| v != opposite).collect();
            for subset in facet_rest.into_iter().powerset() {
                let mut with_dummy = subset;
                with_dummy.push(DUMMY_VERTEX);
                with_dummy.sort_unstable();
                out.insert(with_dummy);
            }
        }
    }
    out
}

/// True when collapsing edge `(a, b)` keeps the complex a manifold:
/// `lk(a) ∩ lk(b) == lk(ab)`.
///
/// Returns `false` if `a` and `b` share no live cell.
pub fn edge_link_condition(mesh: &Mesh, a: i64, b: i64) -> bool {
    let Some(start) = mesh
        .vertex_star(a)
        .into_iter()
        .find(|&c| mesh.cell_vertices(c).contains(&b))
    else {
        return false;
    };
    let la = link(mesh, &[a], start);
    let lb = link(mesh, &[b], start);
    let lab = link(mesh, &[a, b], start);
    la.intersection(&lb).all(|s| lab.contains(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_edge_of_fan_passes() {
        // hexagon fan around 0
        let m = Mesh::tri_mesh(&[
            [0, 1, 2],
            [0, 2, 3],
            [0, 3, 4],
            [0, 4, 5],
            [0, 5, 6],
            [0, 6, 1],
        ])
        .unwrap();
        assert!(edge_link_condition(&m, 0, 1));
        let l = link(&m, &[0], 0);
        assert!(l.contains(&vec![1, 2]));
        assert!(!l.iter().any(|s| s.contains(&DUMMY_VERTEX)));
    }

    #[test]
    fn two_triangle_strip_rejects_boundary_shortcut() {
        // Both 1 and 3 are in the link of (0, 2) plus the dummy via the
        // boundary: collapsing the interior edge would flatten the strip.
        let m = Mesh::tri_mesh(&[[0, 1, 2], [0, 2, 3]]).unwrap();
        assert!(!edge_link_condition(&m, 0, 2));
        assert!(edge_link_condition(&m, 0, 1));
    }

    #[test]
    fn triangle_loop_of_edges_fails() {
        let m = Mesh::edge_mesh(&[[0, 1], [1, 2], [2, 0]]).unwrap();
        assert!(!edge_link_condition(&m, 0, 1));
        let open = Mesh::edge_mesh(&[[0, 1], [1, 2], [2, 3]]).unwrap();
        assert!(edge_link_condition(&open, 1, 2));
    }
}
