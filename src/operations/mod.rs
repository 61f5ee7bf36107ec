//! Invariant-gated local operations.
//!
//! Every operation runs through the same state machine:
//!
//! ```text
//! Proposed -> Scoped -> Validated -> Committed
//!                  \__________\_____> RolledBack
//! ```
//!
//! - **Proposed**: the input tuple is checked and the invariants' `before`
//!   predicates run on the input edge.
//! - **Scoped**: a scope is pushed on the mesh and all its descendants; the
//!   topology is rewritten, attributes follow their strategies, and mapped
//!   meshes replay the edit.
//! - **Validated**: the invariants' `after` predicates see the removed cells
//!   (through [`Mesh::parent_scope`]) and the new ones.
//! - **Committed** / **RolledBack**: the scope is committed and every edited
//!   mesh folds the edit into its structural hash, or the scope is dropped
//!   and the mesh is observably unchanged.

pub mod collapse;
pub(crate) mod executor;
pub mod scheduler;
pub mod split;
pub mod strategy;
pub mod swap;

use serde::{Deserialize, Serialize};

use crate::attribute::MeshAttributeHandle;
use crate::invariants::{
    InteriorSimplexInvariant, Invariant, InvariantCollection, MultiMeshLinkConditionInvariant,
};
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::multimesh::hash::edit_digest;
use crate::topology::primitive::PrimitiveType;
use crate::topology::simplex::{IdSimplex, Simplex};
use crate::topology::tuple::Tuple;

pub use collapse::EdgeCollapse;
pub use scheduler::{ScheduleOrder, Scheduler, SchedulerOptions, SchedulerStats};
pub use split::EdgeSplit;
pub use strategy::{AttributeStrategies, AttributeStrategy, MergeFn, MergeStrategy, SplitStrategy};
pub use swap::EdgeSwap;

use executor::RegionEdit;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Split,
    Collapse,
    Swap,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Split => "split",
            OperationKind::Collapse => "collapse",
            OperationKind::Swap => "swap",
        }
    }
}

/// Executor states, reported through `log::trace!`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationState {
    Proposed,
    Scoped,
    Validated,
    Committed,
    RolledBack,
}

/// What a committed operation did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub kind: OperationKind,
    /// A tuple into the new neighbourhood, when one survives.
    pub return_tuple: Option<Tuple>,
    pub created: Vec<IdSimplex>,
    pub deleted: Vec<IdSimplex>,
    /// Edits replayed on mapped children, in order.
    pub children: Vec<ChildEdit>,
}

/// One replayed edit on the child with id `child`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildEdit {
    pub child: usize,
    pub record: OperationRecord,
}

/// Result of a local edit before validation.
#[derive(Debug)]
pub(crate) struct LocalEdit {
    pub region: RegionEdit,
    pub return_tuple: Option<Tuple>,
    pub new_vertex: Option<i64>,
    pub children: Vec<ChildEdit>,
}

impl LocalEdit {
    pub(crate) fn into_record(self, kind: OperationKind) -> OperationRecord {
        OperationRecord {
            kind,
            return_tuple: self.return_tuple,
            created: self.region.created,
            deleted: self.region.deleted,
            children: self.children,
        }
    }
}

/// Invariants and attribute strategies of one operation.
#[derive(Clone, Debug, Default)]
pub struct OperationSettings {
    pub invariants: InvariantCollection,
    pub strategies: AttributeStrategies,
}

impl OperationSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_invariant<I: Invariant + 'static>(mut self, invariant: I) -> Self {
        self.invariants.add(invariant);
        self
    }

    pub fn with_strategy(mut self, handle: MeshAttributeHandle, strategy: AttributeStrategy) -> Self {
        self.strategies.set(handle, strategy);
        self
    }
}

macro_rules! operation_settings {
    ($(#[$meta:meta])* $name:ident, $defaults:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name(pub OperationSettings);

        impl Default for $name {
            fn default() -> Self {
                Self($defaults)
            }
        }

        impl $name {
            pub fn with_invariant<I: Invariant + 'static>(mut self, invariant: I) -> Self {
                self.0.invariants.add(invariant);
                self
            }

            pub fn with_strategy(mut self, handle: MeshAttributeHandle, strategy: AttributeStrategy) -> Self {
                self.0.strategies.set(handle, strategy);
                self
            }

            /// Drop every invariant, the defaults included.
            pub fn without_invariants(mut self) -> Self {
                self.0.invariants = InvariantCollection::default();
                self
            }
        }

        impl From<$name> for OperationSettings {
            fn from(s: $name) -> Self {
                s.0
            }
        }
    };
}

operation_settings!(
    /// Split settings; no invariants by default.
    SplitSettings,
    OperationSettings::new()
);

operation_settings!(
    /// Collapse settings; the multi-mesh link condition by default.
    CollapseSettings,
    OperationSettings::new().with_invariant(MultiMeshLinkConditionInvariant)
);

operation_settings!(
    /// Swap settings; interior edges only by default.
    SwapSettings,
    OperationSettings::new().with_invariant(InteriorSimplexInvariant::new(PrimitiveType::Edge))
);

/// A local edit applied through the executor.
pub trait Operation: Send + Sync {
    fn kind(&self) -> OperationKind;

    fn settings(&self) -> &OperationSettings;

    /// Rewrite the mesh around `t` in the calling thread's current scope,
    /// without checking invariants.
    fn apply(&self, mesh: &Mesh, t: &Tuple) -> Result<OperationRecord, MeshError>;

    /// Run the full executor: check, apply in a fresh scope, validate, then
    /// commit or roll back.
    fn execute(&self, mesh: &Mesh, t: &Tuple) -> Result<OperationRecord, MeshError> {
        run(self, mesh, t)
    }
}

fn transition(kind: OperationKind, from: OperationState, to: OperationState) {
    log::trace!("{}: {from:?} -> {to:?}", kind.as_str());
}

fn fold_hashes(mesh: &Mesh, record: &OperationRecord) -> Result<(), MeshError> {
    mesh.multi_mesh()
        .bump_own_hash(edit_digest(record.kind.as_str(), &record.created, &record.deleted));
    for child in &record.children {
        let child_mesh = mesh.get_child(child.child)?;
        fold_hashes(&child_mesh, &child.record)?;
    }
    Ok(())
}

pub(crate) fn run<O: Operation + ?Sized>(op: &O, mesh: &Mesh, t: &Tuple) -> Result<OperationRecord, MeshError> {
    let kind = op.kind();
    if let Some(root) = mesh.get_root() {
        // edits always start at the root and flow down
        let input = Simplex::edge(*t);
        let at_root = mesh.map_to_root(&input)?;
        if root.map(mesh, &at_root)?.len() != 1 {
            return Err(MeshError::UnsupportedOperation(
                "edge has more than one image in this mesh",
            ));
        }
        log::trace!("{}: rerouted to the root", kind.as_str());
        return run(op, &root, &at_root.tuple());
    }

    mesh.check_tuple(t)?;
    if mesh.top_dimension() == 0 {
        return Err(MeshError::UnsupportedOperation("point meshes have no edges"));
    }
    let settings = op.settings();
    if let Err(e) = settings.invariants.before(mesh, &Simplex::edge(*t)) {
        log::debug!("{} rejected before scoping: {e}", kind.as_str());
        return Err(e);
    }
    transition(kind, OperationState::Proposed, OperationState::Scoped);
    let scope = mesh.create_scope();
    let record = match op.apply(mesh, t) {
        Ok(r) => r,
        Err(e) => {
            scope.rollback();
            transition(kind, OperationState::Scoped, OperationState::RolledBack);
            log::debug!("{} rolled back: {e}", kind.as_str());
            return Err(e);
        }
    };

    let top = mesh.top_simplex_type();
    let before: Vec<Tuple> = mesh.parent_scope(|| {
        record
            .deleted
            .iter()
            .filter(|s| s.primitive == top)
            .map(|s| mesh.tuple_from_id(top, s.id))
            .collect()
    });
    let after: Vec<Tuple> = record
        .created
        .iter()
        .filter(|s| s.primitive == top && mesh.is_active(top, s.id))
        .map(|s| mesh.tuple_from_id(top, s.id))
        .collect();
    if let Err(e) = settings.invariants.after(mesh, &before, &after) {
        scope.rollback();
        transition(kind, OperationState::Scoped, OperationState::RolledBack);
        log::debug!("{} rolled back: {e}", kind.as_str());
        return Err(e);
    }
    transition(kind, OperationState::Scoped, OperationState::Validated);
    scope.commit();
    transition(kind, OperationState::Validated, OperationState::Committed);
    fold_hashes(mesh, &record)?;
    log::debug!(
        "{} committed: {} created, {} deleted, {} child edits",
        kind.as_str(),
        record.created.len(),
        record.deleted.len(),
        record.children.len()
    );
    Ok(record)
}
