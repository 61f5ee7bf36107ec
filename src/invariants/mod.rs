//! Invariants gating local operations.
//!
//! An invariant may inspect the proposed input simplex before anything is
//! touched, and the new neighbourhood afterwards. Both checks are pure
//! predicates over mesh state; a collection reports the first failing one
//! (in insertion order) by name.

pub mod geometric;
pub mod topological;

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::simplex::Simplex;
use crate::topology::tuple::Tuple;

pub use geometric::{MaxEdgeLength, MinEdgeLength, SimplexInversionInvariant};
pub use topological::{
    InteriorSimplexInvariant, MinIncidentValence, MultiMeshLinkConditionInvariant,
    SubstructureTopologyPreservingInvariant,
};

/// A predicate over the neighbourhood of a local edit.
pub trait Invariant: Send + Sync {
    /// Name reported in [`MeshError::InvariantViolation`].
    fn name(&self) -> &str;

    /// Check the input simplex before the edit.
    fn before(&self, _mesh: &Mesh, _simplex: &Simplex) -> bool {
        true
    }

    /// Check the edit's result. `before` are tuples of the removed top cells,
    /// valid inside [`Mesh::parent_scope`]; `after` are tuples of the new ones.
    fn after(&self, _mesh: &Mesh, _before: &[Tuple], _after: &[Tuple]) -> bool {
        true
    }
}

/// Ordered set of invariants; all must hold.
#[derive(Clone, Default)]
pub struct InvariantCollection {
    invariants: Vec<Arc<dyn Invariant>>,
}

impl Debug for InvariantCollection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.invariants.iter().map(|i| i.name()))
            .finish()
    }
}

fn violation(invariant: &dyn Invariant) -> MeshError {
    MeshError::InvariantViolation {
        invariant: invariant.name().to_owned(),
    }
}

impl InvariantCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Arc::new(invariant));
    }

    pub fn add_shared(&mut self, invariant: Arc<dyn Invariant>) {
        self.invariants.push(invariant);
    }

    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.invariants.iter().map(|i| i.name().to_owned()).collect()
    }

    /// True when every invariant accepts every simplex.
    pub fn is_valid(&self, mesh: &Mesh, simplices: &[Simplex]) -> bool {
        self.invariants
            .iter()
            .all(|inv| simplices.iter().all(|s| inv.before(mesh, s)))
    }

    pub fn before(&self, mesh: &Mesh, simplex: &Simplex) -> Result<(), MeshError> {
        match self.invariants.iter().find(|inv| !inv.before(mesh, simplex)) {
            Some(inv) => Err(violation(inv.as_ref())),
            None => Ok(()),
        }
    }

    pub fn after(&self, mesh: &Mesh, before: &[Tuple], after: &[Tuple]) -> Result<(), MeshError> {
        match self
            .invariants
            .iter()
            .find(|inv| !inv.after(mesh, before, after))
        {
            Some(inv) => Err(violation(inv.as_ref())),
            None => Ok(()),
        }
    }
}

type BeforeFn = dyn Fn(&Mesh, &Simplex) -> bool + Send + Sync;
type AfterFn = dyn Fn(&Mesh, &[Tuple], &[Tuple]) -> bool + Send + Sync;

/// Invariant from closures.
pub struct PredicateInvariant {
    name: String,
    before: Option<Box<BeforeFn>>,
    after: Option<Box<AfterFn>>,
}

impl PredicateInvariant {
    pub fn before(
        name: impl Into<String>,
        f: impl Fn(&Mesh, &Simplex) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            before: Some(Box::new(f)),
            after: None,
        }
    }

    pub fn after(
        name: impl Into<String>,
        f: impl Fn(&Mesh, &[Tuple], &[Tuple]) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            before: None,
            after: Some(Box::new(f)),
        }
    }
}

impl Invariant for PredicateInvariant {
    fn name(&self) -> &str {
        &self.name
    }

    fn before(&self, mesh: &Mesh, simplex: &Simplex) -> bool {
        self.before.as_ref().is_none_or(|f| f(mesh, simplex))
    }

    fn after(&self, mesh: &Mesh, before: &[Tuple], after: &[Tuple]) -> bool {
        self.after.as_ref().is_none_or(|f| f(mesh, before, after))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::primitive::PrimitiveType;

    #[test]
    fn first_failure_is_reported_by_name() {
        let m = Mesh::tri_mesh(&[[0, 1, 2]]).unwrap();
        let e = m.find_simplex(&[0, 1]).unwrap();
        let mut c = InvariantCollection::new();
        c.add(PredicateInvariant::before("always", |_, _| true));
        c.add(PredicateInvariant::before("never", |_, _| false));
        c.add(PredicateInvariant::before("also_never", |_, _| false));
        assert_eq!(
            c.before(&m, &e),
            Err(MeshError::InvariantViolation {
                invariant: "never".into()
            })
        );
        assert!(!c.is_valid(&m, &[e]));
        assert!(c.after(&m, &[], &[]).is_ok());
        assert_eq!(c.names(), vec!["always", "never", "also_never"]);
    }

    #[test]
    fn empty_collection_accepts_everything() {
        let m = Mesh::tri_mesh(&[[0, 1, 2]]).unwrap();
        let c = InvariantCollection::default();
        let v = Simplex::new(PrimitiveType::Vertex, m.tuple_from_id(PrimitiveType::Vertex, 0));
        assert!(c.is_valid(&m, &[v]));
        assert!(c.is_empty());
    }
}
