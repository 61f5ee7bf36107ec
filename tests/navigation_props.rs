use proptest::prelude::*;
use simplex_forge::prelude::*;

mod util;
use util::grid;

fn walk(mesh: &Mesh, start: Tuple, steps: &[u8]) -> Tuple {
    let mut t = start;
    for &s in steps {
        let p = PrimitiveType::from_dimension((s % 3) as usize);
        if let Some(next) = mesh.try_switch_tuple(&t, p) {
            t = next;
        }
    }
    t
}

proptest! {
    #[test]
    fn random_walks_stay_valid(n in 1i64..4, cell in 0usize..64, steps in prop::collection::vec(0u8..3, 0..40)) {
        let m = grid(n);
        let faces = m.simplices(PrimitiveType::Face);
        let start = faces[cell % faces.len()];
        let t = walk(&m, start, &steps);
        prop_assert!(m.is_valid(&t));
        prop_assert!(m.check_tuple(&t).is_ok());
    }

    #[test]
    fn every_switch_is_an_involution(n in 1i64..4, cell in 0usize..64, steps in prop::collection::vec(0u8..3, 0..20)) {
        let m = grid(n);
        let faces = m.simplices(PrimitiveType::Face);
        let t = walk(&m, faces[cell % faces.len()], &steps);
        for p in [PrimitiveType::Vertex, PrimitiveType::Edge, PrimitiveType::Face] {
            if let Some(s) = m.try_switch_tuple(&t, p) {
                prop_assert_eq!(m.switch_tuple(&s, p), t);
            }
        }
    }

    #[test]
    fn switch_vertex_swaps_the_edge_ends(n in 1i64..4, cell in 0usize..64, steps in prop::collection::vec(0u8..3, 0..20)) {
        let m = grid(n);
        let faces = m.simplices(PrimitiveType::Face);
        let t = walk(&m, faces[cell % faces.len()], &steps);
        let f = m.flag_vertices(&t);
        let g = m.flag_vertices(&m.switch_vertex(&t));
        prop_assert_eq!(g, vec![f[1], f[0], f[2]]);
        // switching the face keeps vertex and edge
        if let Some(s) = m.try_switch_tuple(&t, PrimitiveType::Face) {
            prop_assert_eq!(m.flag_vertices(&s)[..2].to_vec(), f[..2].to_vec());
            prop_assert_eq!(m.id(&s, PrimitiveType::Edge), m.id(&t, PrimitiveType::Edge));
        }
    }
}

#[test]
fn find_simplex_agrees_with_ids() {
    let m = grid(2);
    for id in m.simplex_ids(PrimitiveType::Edge) {
        let v = m.id_simplex_vertices(IdSimplex::new(PrimitiveType::Edge, id));
        let s = m.find_simplex(&v).unwrap();
        assert_eq!(m.simplex_id(&s), id);
        assert_eq!(m.simplex_vertices(&s), v);
    }
    assert!(m.find_simplex(&[0, 8]).is_none());
}

#[test]
fn boundary_edges_of_a_grid() {
    let n = 3;
    let m = grid(n);
    let boundary = m
        .simplex_ids(PrimitiveType::Edge)
        .into_iter()
        .filter(|&id| m.is_boundary_id(IdSimplex::new(PrimitiveType::Edge, id)))
        .count();
    assert_eq!(boundary as i64, 4 * n);
}
