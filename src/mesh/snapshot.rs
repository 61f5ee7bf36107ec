//! Serializable checkpoints of meshes and hierarchies.
//!
//! A snapshot holds the committed attribute store only; writes buffered in
//! open scopes are not part of it. Connectivity lives in the store, so
//! restoring it rebuilds the full mesh, and multi-mesh maps are ordinary
//! attributes that come back with it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Mesh;
use crate::DebugInvariants;
use crate::attribute::AttributeManager;
use crate::attribute::storage::AttributeStore;
use crate::mesh_error::MeshError;
use crate::topology::primitive::MeshKind;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshSnapshot {
    pub kind: MeshKind,
    pub store: AttributeStore,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChildSnapshot {
    /// Name of the parent-side map attribute.
    pub map_name: String,
    pub hierarchy: HierarchySnapshot,
}

/// A mesh, its structural hash and its children, recursively.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HierarchySnapshot {
    pub mesh: MeshSnapshot,
    pub own_hash: u64,
    pub children: Vec<ChildSnapshot>,
}

impl Mesh {
    pub fn snapshot(&self) -> MeshSnapshot {
        MeshSnapshot {
            kind: self.kind,
            store: self.attributes.committed(),
        }
    }

    /// Rebuild a standalone mesh. The restored mesh is validated and gets
    /// fresh attribute handles.
    pub fn restore(snapshot: MeshSnapshot) -> Result<Self, MeshError> {
        let dims = snapshot.store.primitives().len();
        if dims != snapshot.kind.top_dimension() + 1 {
            return Err(MeshError::InvalidTopology(format!(
                "{:?} snapshot holds {dims} primitive dimensions",
                snapshot.kind
            )));
        }
        let mesh = Self::from_parts(snapshot.kind, AttributeManager::from_store(snapshot.store))?;
        mesh.validate_invariants()?;
        log::debug!(
            "restored {:?} mesh with {} top cells",
            mesh.kind,
            mesh.count(mesh.top_simplex_type())
        );
        Ok(mesh)
    }

    /// Snapshot this mesh and everything below it.
    pub fn snapshot_hierarchy(&self) -> HierarchySnapshot {
        let children = self
            .multi_mesh
            .child_links()
            .into_iter()
            .map(|link| ChildSnapshot {
                hierarchy: link.mesh.snapshot_hierarchy(),
                map_name: link.map_name,
            })
            .collect();
        HierarchySnapshot {
            mesh: self.snapshot(),
            own_hash: self.multi_mesh.own_hash(),
            children,
        }
    }

    /// Rebuild a hierarchy; child ids follow the snapshot order.
    pub fn restore_hierarchy(snapshot: HierarchySnapshot) -> Result<Arc<Self>, MeshError> {
        let HierarchySnapshot {
            mesh,
            own_hash,
            children,
        } = snapshot;
        let root = Arc::new(Self::restore(mesh)?);
        root.multi_mesh.set_own_hash(own_hash);
        for child in children {
            let restored = Self::restore_hierarchy(child.hierarchy)?;
            root.attach_child(restored, &child.map_name)?;
        }
        Ok(root)
    }
}
