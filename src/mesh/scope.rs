//! RAII scope over a mesh and its descendants.

use std::marker::PhantomData;
use std::sync::Arc;

use super::Mesh;

/// Checkpoint of a mesh hierarchy on the calling thread.
///
/// Dropping the guard rolls every buffered change back; [`ScopeGuard::commit`]
/// folds them into the enclosing scope, or into storage when outermost.
/// Guards are bound to the thread that opened them.
#[must_use = "a scope is rolled back as soon as the guard is dropped"]
pub struct ScopeGuard<'a> {
    mesh: &'a Mesh,
    descendants: Vec<Arc<Mesh>>,
    finished: bool,
    _not_send: PhantomData<*const ()>,
}

impl<'a> ScopeGuard<'a> {
    pub(crate) fn new(mesh: &'a Mesh) -> Self {
        let descendants = mesh.descendants();
        mesh.attributes().push_scope();
        for child in &descendants {
            child.attributes().push_scope();
        }
        log::trace!(
            "scope opened at depth {} over {} meshes",
            mesh.attributes().scope_depth(),
            descendants.len() + 1
        );
        Self {
            mesh,
            descendants,
            finished: false,
            _not_send: PhantomData,
        }
    }

    /// Mesh the scope was opened on.
    pub fn mesh(&self) -> &'a Mesh {
        self.mesh
    }

    /// Keep the changes made inside the scope.
    pub fn commit(mut self) {
        self.finish(true);
    }

    /// Discard the changes made inside the scope.
    pub fn rollback(mut self) {
        self.finish(false);
    }

    fn finish(&mut self, commit: bool) {
        if self.finished {
            return;
        }
        self.finished = true;
        for child in self.descendants.iter().rev() {
            child.attributes().pop_scope(commit);
        }
        self.mesh.attributes().pop_scope(commit);
        log::trace!("scope {}", if commit { "committed" } else { "rolled back" });
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.finish(false);
    }
}
