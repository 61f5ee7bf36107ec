use hashbrown::HashSet;
use proptest::prelude::*;
use simplex_forge::prelude::*;

mod util;
use util::grid;

fn live(mesh: &Mesh) -> HashSet<IdSimplex> {
    (0..=mesh.top_dimension())
        .map(PrimitiveType::from_dimension)
        .flat_map(|p| {
            mesh.simplex_ids(p)
                .into_iter()
                .map(move |id| IdSimplex::new(p, id))
        })
        .collect()
}

fn apply(mesh: &Mesh, kind: u8, t: &Tuple) -> Result<OperationRecord, MeshError> {
    match kind % 3 {
        0 => EdgeSplit::with_defaults().execute(mesh, t),
        1 => EdgeCollapse::with_defaults().execute(mesh, t),
        _ => EdgeSwap::with_defaults().execute(mesh, t),
    }
}

proptest! {
    #[test]
    fn live_sets_follow_the_record(n in 1i64..4, steps in prop::collection::vec((0u8..3, 0usize..512), 1..12)) {
        let m = grid(n);
        for (kind, pick) in steps {
            let edges = m.simplices(PrimitiveType::Edge);
            if edges.is_empty() {
                break;
            }
            let t = edges[pick % edges.len()];
            let before = live(&m);
            let snapshot = m.snapshot();
            match apply(&m, kind, &t) {
                Ok(record) => {
                    let created: HashSet<IdSimplex> = record.created.iter().copied().collect();
                    let deleted: HashSet<IdSimplex> = record.deleted.iter().copied().collect();
                    prop_assert!(created.is_disjoint(&deleted));
                    prop_assert!(deleted.is_subset(&before));
                    let expected: HashSet<IdSimplex> =
                        before.difference(&deleted).copied().chain(created).collect();
                    prop_assert_eq!(live(&m), expected);
                }
                Err(_) => {
                    prop_assert_eq!(live(&m), before);
                    prop_assert_eq!(m.snapshot(), snapshot);
                }
            }
            prop_assert!(m.validate_invariants().is_ok());
        }
    }
}

#[test]
fn rejected_collapses_leave_storage_untouched() {
    let m = Mesh::tri_mesh(&[[0, 1, 2], [0, 2, 3]]).unwrap();
    let snapshot = m.snapshot();
    let op = EdgeCollapse::new(CollapseSettings::default().with_invariant(MinIncidentValence::new(3)));
    let e = m.find_simplex(&[0, 1]).unwrap();
    for _ in 0..100 {
        assert!(op.execute(&m, &e.tuple()).is_err());
    }
    assert_eq!(m.snapshot(), snapshot);
    assert_eq!(m.capacity(PrimitiveType::Edge), 5);
    assert_eq!(m.capacity(PrimitiveType::Face), 2);
}
