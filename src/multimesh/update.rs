//! Carrying a parent edit down to its children.
//!
//! Before the parent rewrites a region, [`capture`] records, per child, the
//! child cells whose images lie in that region and the child-to-parent
//! vertex correspondence of those cells. After the rewrite [`propagate`]
//! replays the edit on each child (splitting or collapsing the child edges
//! that map onto the parent edge), then clears the stale entries and
//! rebuilds them from the vertex correspondence. Everything runs inside the
//! scope the parent edit opened.

use hashbrown::{HashMap, HashSet};

use super::{ChildLink, clear_entry, entry_vertices, read_entry, write_entry};
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::operations::strategy::AttributeStrategies;
use crate::operations::{ChildEdit, collapse, split};
use crate::topology::primitive::PrimitiveType;

/// Edge-level summary of a parent edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EditEvent {
    /// Edge `(a, b)` gained midpoint `m`.
    Split { a: i64, b: i64, m: i64 },
    /// Vertex `removed` was merged into `kept`.
    Collapse { removed: i64, kept: i64 },
}

#[derive(Debug)]
struct ChildCapture {
    child_id: usize,
    link: ChildLink,
    cells: Vec<i64>,
    parent_ids: Vec<i64>,
    /// Child vertex -> parent vertex.
    vmap: HashMap<i64, i64>,
}

#[derive(Debug, Default)]
pub(crate) struct Capture {
    children: Vec<ChildCapture>,
}

/// Record the mapped neighbourhood of the parent cells about to be rewritten.
pub(crate) fn capture(parent: &Mesh, cells: &[i64]) -> Capture {
    let mut out = Capture::default();
    for (child_id, link) in parent.multi_mesh().child_links().into_iter().enumerate() {
        let child = link.mesh.clone();
        let d = child.top_dimension();
        let mut seen = HashSet::new();
        let mut cap = ChildCapture {
            child_id,
            link,
            cells: Vec::new(),
            parent_ids: Vec::new(),
            vmap: HashMap::new(),
        };
        for &c in cells {
            for pid in parent.cell_face_ids(d, c) {
                if !seen.insert(pid) {
                    continue;
                }
                let (ct, pt) = read_entry(parent, &cap.link.map, pid);
                if ct.is_null() || !child.is_active(child.top_simplex_type(), ct.global_cid()) {
                    continue;
                }
                let (cv, pv) = entry_vertices(parent, &child, &ct, &pt);
                cap.vmap.extend(cv.into_iter().zip(pv));
                cap.cells.push(ct.global_cid());
                cap.parent_ids.push(pid);
            }
        }
        if !cap.cells.is_empty() {
            out.children.push(cap);
        }
    }
    out
}

fn inconsistent(msg: String) -> MeshError {
    log::warn!("multi-mesh propagation: {msg}");
    let err = MeshError::StructuralInconsistency(msg);
    crate::debug_invariants!(Err::<(), _>(err.clone()), "multi-mesh propagation");
    err
}

/// Child edges, as `(u, w)` with `u -> a` and `w -> b`, among `cells`.
fn mapped_edges(child: &Mesh, cells: &[i64], vmap: &HashMap<i64, i64>, a: i64, b: i64) -> Vec<(i64, i64)> {
    let mut out = Vec::new();
    for &c in cells {
        let cv = child.cell_vertices(c);
        for (i, &u) in cv.iter().enumerate() {
            for &w in &cv[i + 1..] {
                let pair = match (vmap.get(&u), vmap.get(&w)) {
                    (Some(&pu), Some(&pw)) if pu == a && pw == b => (u, w),
                    (Some(&pu), Some(&pw)) if pu == b && pw == a => (w, u),
                    _ => continue,
                };
                if !out.contains(&pair) {
                    out.push(pair);
                }
            }
        }
    }
    out
}

/// Replay `event` on every captured child and rebuild its map entries.
pub(crate) fn propagate(
    parent: &Mesh,
    capture: Capture,
    event: &EditEvent,
) -> Result<Vec<ChildEdit>, MeshError> {
    let mut edits = Vec::new();
    for cap in capture.children {
        let ChildCapture {
            child_id,
            link,
            cells,
            parent_ids,
            mut vmap,
        } = cap;
        let child = link.mesh.clone();
        let d = child.top_dimension();
        let simplex_type = PrimitiveType::from_dimension(d);
        let strategies = AttributeStrategies::default();
        let mut affected = cells.clone();

        match *event {
            EditEvent::Split { a, b, m } => {
                if d > 0 {
                    for (u, w) in mapped_edges(&child, &cells, &vmap, a, b) {
                        let Some(edge) = child.find_simplex(&[u, w]) else {
                            continue;
                        };
                        let local = split::split_local(&child, &edge.tuple(), &strategies)?;
                        if let Some(mc) = local.new_vertex {
                            vmap.insert(mc, m);
                        }
                        affected.extend(local.region.new_cells.iter().copied());
                        edits.push(ChildEdit {
                            child: child_id,
                            record: local.into_record(crate::operations::OperationKind::Split),
                        });
                    }
                }
            }
            EditEvent::Collapse { removed, kept } => {
                if d > 0 {
                    for (u, w) in mapped_edges(&child, &cells, &vmap, removed, kept) {
                        let Some(edge) = child.find_simplex(&[u, w]) else {
                            continue;
                        };
                        let local = collapse::collapse_local(&child, &edge.tuple(), &strategies)?;
                        affected.extend(local.region.new_cells.iter().copied());
                        edits.push(ChildEdit {
                            child: child_id,
                            record: local.into_record(crate::operations::OperationKind::Collapse),
                        });
                    }
                }
                for v in vmap.values_mut() {
                    if *v == removed {
                        *v = kept;
                    }
                }
            }
        }

        for &pid in &parent_ids {
            if parent.is_active(simplex_type, pid) {
                clear_entry(parent, &link.map, pid);
            }
        }
        let child_map = child
            .multi_mesh()
            .parent_map()
            .ok_or_else(|| inconsistent("child lost its parent map".into()))?;
        let mut rebuilt: HashMap<i64, i64> = HashMap::new();
        let mut done = HashSet::new();
        for c in affected {
            if !done.insert(c) || !child.is_active(child.top_simplex_type(), c) {
                continue;
            }
            let cv = child.cell_vertices(c);
            let pv: Option<Vec<i64>> = cv.iter().map(|v| vmap.get(v).copied()).collect();
            let Some(pv) = pv else {
                return Err(inconsistent(format!("child cell {c} has an unmapped vertex")));
            };
            let Some(image) = parent.find_simplex(&pv) else {
                return Err(inconsistent(format!(
                    "child cell {c} maps onto {pv:?}, which is not a parent simplex"
                )));
            };
            let pid = parent.simplex_id(&image);
            if let Some(other) = rebuilt.insert(pid, c) {
                return Err(inconsistent(format!(
                    "child cells {other} and {c} both map onto parent {simplex_type:?} {pid}"
                )));
            }
            let Some(ct) = child.tuple_with_vertices(c, &cv) else {
                return Err(inconsistent(format!("child cell {c} has no flag over its vertices")));
            };
            write_entry(parent, &link.map, pid, &ct, &image.tuple());
            write_entry(&child, &child_map, c, &ct, &image.tuple());
        }
        log::trace!(
            "child #{child_id}: {} entries rebuilt after {event:?}",
            rebuilt.len()
        );
    }
    Ok(edits)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::multimesh::{MapValidator, extract_child_mesh};

    #[test]
    fn capture_sees_mapped_cells_only() {
        let parent = Arc::new(Mesh::tri_mesh(&[[0, 1, 2], [0, 2, 3]]).unwrap());
        let tag = parent
            .create_attribute::<i64>("boundary", PrimitiveType::Edge, &[0])
            .unwrap();
        let e = parent.find_simplex(&[0, 1]).unwrap();
        parent.accessor(&tag).set_scalar(parent.simplex_id(&e), 1);
        extract_child_mesh(&parent, &tag, 1).unwrap();
        let cap = capture(&parent, &[0]);
        assert_eq!(cap.children.len(), 1);
        assert_eq!(cap.children[0].cells.len(), 1);
        assert!(capture(&parent, &[1]).children.is_empty());
        assert!(MapValidator::new().validate(&parent).is_ok());
    }
}
