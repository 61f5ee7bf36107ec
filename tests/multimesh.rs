use std::sync::Arc;

use simplex_forge::multimesh::find_divergence;
use simplex_forge::prelude::*;

mod util;
use util::{counts, new_vertex};

/// Quad with its four boundary edges extracted as a closed polyline child.
fn quad_with_boundary() -> (Arc<Mesh>, Arc<Mesh>) {
    let parent = Arc::new(Mesh::tri_mesh(&[[0, 1, 2], [0, 2, 3]]).unwrap());
    let tag = parent
        .create_attribute::<i64>("boundary", PrimitiveType::Edge, &[0])
        .unwrap();
    for id in parent.simplex_ids(PrimitiveType::Edge) {
        if parent.is_boundary_id(IdSimplex::new(PrimitiveType::Edge, id)) {
            parent.accessor(&tag).set_scalar(id, 1);
        }
    }
    let child = extract_child_mesh(&parent, &tag, 1).unwrap();
    (parent, child)
}

#[test]
fn extracted_child_maps_both_ways() {
    let (parent, child) = quad_with_boundary();
    assert_eq!(parent.multi_mesh().child_count(), 1);
    assert_eq!(child.count(PrimitiveType::Edge), 4);
    assert!(MapValidator::new().validate(&parent).is_ok());

    for t in child.simplices(PrimitiveType::Edge) {
        let up = child.map_to_parent(&Simplex::edge(t)).unwrap();
        assert!(parent.is_boundary(&up));
        let down = parent.map_to_child(&child, &up).unwrap();
        assert_eq!(down.len(), 1);
        assert_eq!(child.simplex_id(&down[0]), child.simplex_id(&Simplex::edge(t)));
    }
    // the interior diagonal has no image
    let diagonal = parent.find_simplex(&[0, 2]).unwrap();
    assert!(parent.map_to_child(&child, &diagonal).unwrap().is_empty());
}

#[test]
fn split_and_collapse_follow_into_the_child() {
    let (parent, child) = quad_with_boundary();
    let e = parent.find_simplex(&[0, 1]).unwrap();
    let record = EdgeSplit::with_defaults().execute(&parent, &e.tuple()).unwrap();
    assert_eq!(record.children.len(), 1);
    assert_eq!(child.count(PrimitiveType::Edge), 5);
    assert_eq!(child.count(PrimitiveType::Vertex), 5);
    MapValidator::new().validate(&parent).unwrap();

    let m = new_vertex(&record);
    let t = parent.find_simplex(&[m, 0]).unwrap().tuple();
    let record = EdgeCollapse::with_defaults().execute(&parent, &t).unwrap();
    assert_eq!(record.children.len(), 1);
    assert_eq!(child.count(PrimitiveType::Edge), 4);
    assert_eq!(counts(&parent), vec![4, 5, 2]);
    MapValidator::new().validate(&parent).unwrap();
}

#[test]
fn interior_edits_leave_the_child_alone() {
    let (parent, child) = quad_with_boundary();
    let before = StructuralSnapshot::capture(&parent);
    let e = parent.find_simplex(&[0, 2]).unwrap();
    let record = EdgeSplit::with_defaults().execute(&parent, &e.tuple()).unwrap();
    assert!(record.children.is_empty());
    assert_eq!(child.count(PrimitiveType::Edge), 4);
    MapValidator::new().validate(&parent).unwrap();

    // only the root's own history changed
    let after = StructuralSnapshot::capture(&parent);
    assert_eq!(find_divergence(&before, &after), Some(vec![]));
    assert_eq!(before.children, after.children);
}

#[test]
fn edits_through_a_child_reroute_to_the_root() {
    let (parent, child) = quad_with_boundary();
    let t = child.simplices(PrimitiveType::Edge)[0];
    let record = EdgeSplit::with_defaults().execute(&child, &t).unwrap();
    assert_eq!(record.kind, OperationKind::Split);
    assert_eq!(parent.count(PrimitiveType::Face), 3);
    assert_eq!(child.count(PrimitiveType::Edge), 5);
    MapValidator::new().validate(&parent).unwrap();
}

#[test]
fn rejected_parent_edit_rolls_back_the_child() {
    let (parent, child) = quad_with_boundary();
    let child_hash = child.multi_mesh().own_hash();
    let settings = SplitSettings::default().with_invariant(MinIncidentValence::new(10));
    let e = parent.find_simplex(&[0, 1]).unwrap();
    assert!(EdgeSplit::new(settings).execute(&parent, &e.tuple()).is_err());
    assert_eq!(child.count(PrimitiveType::Edge), 4);
    assert_eq!(child.count(PrimitiveType::Vertex), 4);
    assert_eq!(child.multi_mesh().own_hash(), child_hash);
    MapValidator::new().validate(&parent).unwrap();
}

#[test]
fn collapse_that_would_pinch_the_child_is_rejected() {
    // a strip whose two long sides are the child; collapsing the rung 2-3
    // would glue the two sides together
    let parent = Arc::new(Mesh::tri_mesh(&[[0, 1, 2], [1, 3, 2], [2, 3, 4], [3, 5, 4]]).unwrap());
    let tag = parent
        .create_attribute::<i64>("side", PrimitiveType::Edge, &[0])
        .unwrap();
    for pair in [[0, 2], [2, 4], [1, 3], [3, 5]] {
        let e = parent.find_simplex(&pair).unwrap();
        parent.accessor(&tag).set_scalar(parent.simplex_id(&e), 1);
    }
    let child = extract_child_mesh(&parent, &tag, 1).unwrap();
    let before = counts(&child);

    let rung = parent.find_simplex(&[2, 3]).unwrap();
    let err = EdgeCollapse::with_defaults().execute(&parent, &rung.tuple()).unwrap_err();
    assert_eq!(
        err,
        MeshError::InvariantViolation {
            invariant: "multimesh_link_condition".into()
        }
    );
    assert_eq!(counts(&child), before);
}

#[test]
fn deregistered_children_stop_following() {
    let (parent, child) = quad_with_boundary();
    parent.deregister_child_mesh(&child).unwrap();
    assert_eq!(parent.multi_mesh().child_count(), 0);
    assert!(child.multi_mesh().is_root());
    let e = parent.find_simplex(&[0, 1]).unwrap();
    let record = EdgeSplit::with_defaults().execute(&parent, &e.tuple()).unwrap();
    assert!(record.children.is_empty());
    assert_eq!(child.count(PrimitiveType::Edge), 4);
}
