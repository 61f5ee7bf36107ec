//! Full consistency check of the maps in a hierarchy.

use std::sync::Arc;

use super::{ChildLink, entry_vertices, read_entry};
use crate::debug_invariants::DebugInvariants;
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::primitive::PrimitiveType;
use crate::topology::simplex::Simplex;

/// Walks a hierarchy and checks, for every parent/child pair:
/// - every live child cell has an entry naming a live parent simplex,
/// - the parent's entry for that simplex points back at the same cell,
/// - the entry's vertex correspondence matches the child cell's vertices,
/// - every non-null parent entry points at a live child cell,
/// - each child round-trips through its parent.
///
/// With `structure` set, every mesh also runs its own
/// [`DebugInvariants::validate_invariants`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MapValidator {
    pub structure: bool,
}

fn broken(msg: String) -> MeshError {
    MeshError::StructuralInconsistency(msg)
}

impl MapValidator {
    pub fn new() -> Self {
        Self { structure: true }
    }

    pub fn validate(&self, root: &Mesh) -> Result<(), MeshError> {
        if self.structure {
            root.validate_invariants()?;
        }
        for link in root.multi_mesh().child_links() {
            self.validate_pair(root, &link)?;
            self.validate(&link.mesh)?;
        }
        Ok(())
    }

    fn validate_pair(&self, parent: &Mesh, link: &ChildLink) -> Result<(), MeshError> {
        let child: &Arc<Mesh> = &link.mesh;
        let d = child.top_dimension();
        let simplex_type = PrimitiveType::from_dimension(d);
        let child_map = child
            .multi_mesh()
            .parent_map()
            .ok_or_else(|| broken("registered child has no parent map".into()))?;

        for c in child.simplex_ids(child.top_simplex_type()) {
            let (ct, pt) = read_entry(child, &child_map, c);
            if ct.is_null() || ct.global_cid() != c {
                return Err(broken(format!("child cell {c} has no valid entry")));
            }
            if !parent.is_active(parent.top_simplex_type(), pt.global_cid()) {
                return Err(broken(format!(
                    "child cell {c} maps into dead parent cell {}",
                    pt.global_cid()
                )));
            }
            let pid = parent.id(&pt, simplex_type);
            let (back, _) = read_entry(parent, &link.map, pid);
            if back.global_cid() != c {
                return Err(broken(format!(
                    "parent {simplex_type:?} {pid} points at child cell {} instead of {c}",
                    back.global_cid()
                )));
            }
            let (cv, pv) = entry_vertices(parent, child, &ct, &pt);
            let mut sorted_child = cv.clone();
            sorted_child.sort_unstable();
            let mut own = child.cell_vertices(c);
            own.sort_unstable();
            if sorted_child != own {
                return Err(broken(format!("entry of child cell {c} names other vertices")));
            }
            let mut image = parent.id_simplex_vertices(crate::topology::IdSimplex::new(simplex_type, pid));
            image.sort_unstable();
            let mut mapped = pv.clone();
            mapped.sort_unstable();
            if image != mapped {
                return Err(broken(format!(
                    "child cell {c} maps onto {mapped:?} but the parent simplex spans {image:?}"
                )));
            }
            let s = Simplex::new(child.top_simplex_type(), child.tuple_from_id(child.top_simplex_type(), c));
            let up = child.map_to_parent(&s)?;
            let down = parent.map_to_child(child, &up)?;
            if !down.iter().any(|x| child.simplex_is_equal(x, &s)) {
                return Err(broken(format!("child cell {c} does not round-trip")));
            }
        }

        for pid in parent.simplex_ids(simplex_type) {
            let (ct, _) = read_entry(parent, &link.map, pid);
            if !ct.is_null() && !child.is_active(child.top_simplex_type(), ct.global_cid()) {
                return Err(broken(format!(
                    "parent {simplex_type:?} {pid} points at dead child cell {}",
                    ct.global_cid()
                )));
            }
        }
        Ok(())
    }
}
