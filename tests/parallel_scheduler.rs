#![cfg(feature = "rayon")]

use std::sync::Arc;

use simplex_forge::prelude::*;

mod util;
use util::{counts, grid, grid_positions};

#[test]
fn parallel_splits_reach_every_edge() {
    let m = grid(6);
    let before = counts(&m);
    let stats = Scheduler::default()
        .run_parallel(&m, &EdgeSplit::with_defaults())
        .unwrap();
    assert_eq!(stats.succeeded, before[1]);
    assert_eq!(stats.failed + stats.skipped, 0);
    assert!(m.validate_invariants().is_ok());
    // every edge gained a midpoint
    assert_eq!(counts(&m)[0], before[0] + before[1]);
}

#[test]
fn parallel_collapses_keep_the_mesh_valid() {
    let n = 6;
    let m = grid(n);
    let pos = m.attributes().erase(grid_positions(&m, n));
    let edges = m.count(PrimitiveType::Edge);
    let op = EdgeCollapse::new(
        CollapseSettings::default()
            .with_invariant(SimplexInversionInvariant::new(pos))
            .with_invariant(MinIncidentValence::new(3)),
    );
    let options = SchedulerOptions {
        seed: 11,
        order: ScheduleOrder::Random,
        ..SchedulerOptions::default()
    };
    let stats = Scheduler::new(options).run_parallel(&m, &op).unwrap();
    assert_eq!(stats.attempted(), edges);
    assert!(stats.succeeded > 0);
    assert!(m.validate_invariants().is_ok());
    assert!(m.count(PrimitiveType::Vertex) < (n as usize + 1).pow(2));
}

#[test]
fn hierarchies_fall_back_to_a_sequential_sweep() {
    let parent = Arc::new(grid(2));
    let tag = parent
        .create_attribute::<i64>("boundary", PrimitiveType::Edge, &[0])
        .unwrap();
    for id in parent.simplex_ids(PrimitiveType::Edge) {
        if parent.is_boundary_id(IdSimplex::new(PrimitiveType::Edge, id)) {
            parent.accessor(&tag).set_scalar(id, 1);
        }
    }
    let child = extract_child_mesh(&parent, &tag, 1).unwrap();
    let edges = parent.count(PrimitiveType::Edge);
    let stats = Scheduler::default()
        .run_parallel(&parent, &EdgeSplit::with_defaults())
        .unwrap();
    assert_eq!(stats.succeeded, edges);
    assert_eq!(child.count(PrimitiveType::Edge), 16);
    MapValidator::new().validate(&parent).unwrap();
}

#[test]
fn sequential_sweeps_are_reproducible() {
    let run = |seed| {
        let m = grid(4);
        let options = SchedulerOptions {
            seed,
            order: ScheduleOrder::Random,
            ..SchedulerOptions::default()
        };
        Scheduler::new(options)
            .run(&m, &EdgeCollapse::with_defaults())
            .unwrap();
        (counts(&m), m.multi_mesh().own_hash())
    };
    assert_eq!(run(3), run(3));
}
