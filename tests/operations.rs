use std::sync::Arc;

use simplex_forge::attribute::AttributeValues;
use simplex_forge::geometry::{cell_measure, cell_orientation};
use simplex_forge::prelude::*;

mod util;
use util::{counts, grid, grid_positions, new_vertex};

fn quad() -> Mesh {
    Mesh::tri_mesh(&[[0, 1, 2], [0, 2, 3]]).unwrap()
}

#[test]
fn split_accounting_on_an_interior_edge() {
    let m = quad();
    let before = counts(&m);
    let e = m.find_simplex(&[0, 2]).unwrap();
    let record = EdgeSplit::with_defaults().execute(&m, &e.tuple()).unwrap();

    // one vertex, the edge becomes two plus one rib per cell, each cell halves
    assert_eq!(counts(&m), vec![before[0] + 1, before[1] + 3, before[2] + 2]);
    let created_faces = record
        .created
        .iter()
        .filter(|s| s.primitive == PrimitiveType::Face)
        .count();
    let deleted_faces = record
        .deleted
        .iter()
        .filter(|s| s.primitive == PrimitiveType::Face)
        .count();
    assert_eq!((created_faces, deleted_faces), (4, 2));
    assert!(m.validate_invariants().is_ok());
    let v = new_vertex(&record);
    assert_eq!(m.valence(v), 4);
}

#[test]
fn created_and_deleted_never_overlap() {
    let m = grid(2);
    let e = m.find_simplex(&[0, 4]).unwrap();
    let record = EdgeSwap::with_defaults().execute(&m, &e.tuple()).unwrap();
    for s in &record.created {
        assert!(!record.deleted.contains(s));
        assert!(m.is_active(s.primitive, s.id));
    }
    for s in &record.deleted {
        assert!(!m.is_active(s.primitive, s.id));
    }
}

#[test]
fn collapse_below_min_valence_is_rejected() {
    let m = quad();
    let before = counts(&m);
    let settings = CollapseSettings::default().with_invariant(MinIncidentValence::new(3));
    let t = m.find_simplex(&[0, 1]).unwrap().tuple();
    let err = EdgeCollapse::new(settings).execute(&m, &t).unwrap_err();
    assert_eq!(
        err,
        MeshError::InvariantViolation {
            invariant: "min_incident_valence".into()
        }
    );
    assert_eq!(counts(&m), before);
    assert!(m.is_valid(&t));

    // without the valence bound the collapse leaves a single triangle
    EdgeCollapse::with_defaults().execute(&m, &t).unwrap();
    assert_eq!(counts(&m), vec![3, 3, 1]);
}

#[test]
fn midpoint_split_on_a_grid_keeps_the_area() {
    let n = 3;
    let m = grid(n);
    let typed = grid_positions(&m, n);
    let pos = m.attributes().erase(typed);
    let e = m.find_simplex(&[5, 10]).unwrap();
    let record = EdgeSplit::with_defaults().execute(&m, &e.tuple()).unwrap();
    let v = new_vertex(&record);
    assert_eq!(m.accessor(&typed).vector(v), vec![1.5, 1.5]);

    let area: f64 = m
        .simplex_ids(PrimitiveType::Face)
        .into_iter()
        .map(|c| cell_measure(&m, &pos, c).unwrap())
        .sum();
    assert!((area - (n * n) as f64).abs() < 1e-12);
}

/// A fan around 0 whose ring has a notch at vertex 2, so vertex 3 cannot
/// see vertex 1.
fn notched_fan() -> (Mesh, MeshAttributeHandle) {
    let m = Mesh::tri_mesh(&[[0, 1, 2], [0, 2, 3], [0, 3, 4], [0, 4, 5], [0, 5, 1]]).unwrap();
    let pos = m
        .create_attribute::<f64>("position", PrimitiveType::Vertex, &[0.0, 0.0])
        .unwrap();
    let acc = m.accessor(&pos);
    for (v, p) in [
        (1, [1.0, 0.0]),
        (2, [0.1, 0.1]),
        (3, [0.0, 1.0]),
        (4, [-1.0, 0.0]),
        (5, [0.0, -1.0]),
    ] {
        acc.set_vector(v, &p);
    }
    let handle = m.attributes().erase(pos);
    (m, handle)
}

#[test]
fn inverting_collapse_is_rejected() {
    let (m, pos) = notched_fan();
    for c in m.simplex_ids(PrimitiveType::Face) {
        assert_eq!(cell_orientation(&m, &pos, c).unwrap(), 1);
    }
    let t = m.find_simplex(&[0, 3]).unwrap().tuple();
    let settings = CollapseSettings::default().with_invariant(SimplexInversionInvariant::new(pos));
    let err = EdgeCollapse::new(settings).execute(&m, &t).unwrap_err();
    assert_eq!(
        err,
        MeshError::InvariantViolation {
            invariant: "simplex_inversion".into()
        }
    );
    assert_eq!(m.count(PrimitiveType::Face), 5);
    assert!(m.is_active(PrimitiveType::Vertex, 0));

    // unguarded, the same collapse folds triangle (3, 1, 2) over
    EdgeCollapse::with_defaults().execute(&m, &t).unwrap();
    let flipped = m
        .simplex_ids(PrimitiveType::Face)
        .into_iter()
        .filter(|&c| cell_orientation(&m, &pos, c).unwrap() < 0)
        .count();
    assert_eq!(flipped, 1);
}

#[test]
fn length_bounds_gate_splits_and_collapses() {
    let n = 2;
    let m = grid(n);
    let pos = m.attributes().erase(grid_positions(&m, n));
    let short = m.find_simplex(&[0, 1]).unwrap().tuple();

    let split = EdgeSplit::new(SplitSettings::default().with_invariant(MinEdgeLength::new(pos, 1.2)));
    assert!(split.execute(&m, &short).is_err());
    let diagonal = m.find_simplex(&[0, 4]).unwrap().tuple();
    assert!(split.execute(&m, &diagonal).is_ok());

    let collapse = EdgeCollapse::new(CollapseSettings::default().with_invariant(MaxEdgeLength::new(pos, 0.5)));
    let t = m.find_simplex(&[1, 2]).unwrap().tuple();
    assert!(collapse.execute(&m, &t).is_err());
    assert_eq!(m.count(PrimitiveType::Vertex), 10);
}

#[test]
fn swap_then_swap_back() {
    let m = quad();
    let t = m.tuple_with_vertices(0, &[0, 2, 1]).unwrap();
    let r = EdgeSwap::with_defaults().execute(&m, &t).unwrap();
    assert!(m.find_simplex(&[1, 3]).is_some());

    // the return tuple sits on the new diagonal, pointing at 1 then 3
    let back = r.return_tuple.unwrap();
    let flag = m.flag_vertices(&back);
    assert_eq!(flag[..2], [1, 3]);
    EdgeSwap::with_defaults().execute(&m, &back).unwrap();
    assert!(m.find_simplex(&[0, 2]).is_some());
    assert!(m.find_simplex(&[1, 3]).is_none());
    assert_eq!(counts(&m), vec![4, 5, 2]);
    assert!(m.validate_invariants().is_ok());
}

#[test]
fn split_and_collapse_in_a_tet_mesh() {
    let m = Mesh::tet_mesh(&[[0, 1, 2, 3], [1, 2, 3, 4]]).unwrap();
    let e = m.find_simplex(&[2, 3]).unwrap();
    let record = EdgeSplit::with_defaults().execute(&m, &e.tuple()).unwrap();
    let v = new_vertex(&record);
    assert_eq!(m.count(PrimitiveType::Tetrahedron), 4);

    // collapsing the midpoint back restores the original counts
    let t = m.find_simplex(&[v, 2]).unwrap().tuple();
    EdgeCollapse::with_defaults().execute(&m, &t).unwrap();
    assert_eq!(counts(&m), vec![5, 9, 7, 2]);
    assert!(m.validate_invariants().is_ok());
}

#[test]
fn custom_merge_strategy() {
    let m = quad();
    let h = m.create_attribute::<i64>("label", PrimitiveType::Vertex, &[0]).unwrap();
    let acc = m.accessor(&h);
    acc.set_scalar(0, 4);
    acc.set_scalar(2, 6);
    let handle = m.attributes().erase(h);
    let strategy = AttributeStrategy {
        split_vertex: MergeStrategy::Custom(Arc::new(|a: &AttributeValues, b: &AttributeValues| -> Result<AttributeValues, MeshError> {
            Ok(match (a, b) {
                (AttributeValues::Int64(x), AttributeValues::Int64(y)) => {
                    AttributeValues::Int64(vec![x[0].max(y[0]) + 1])
                }
                (x, _) => x.clone(),
            })
        })),
        ..AttributeStrategy::for_type(AttributeType::Int64)
    };
    let settings = SplitSettings::default().with_strategy(handle, strategy);
    let e = m.find_simplex(&[0, 2]).unwrap();
    let record = EdgeSplit::new(settings).execute(&m, &e.tuple()).unwrap();
    assert_eq!(acc.scalar(new_vertex(&record)), 7);
}
