//! Merkle-style structural hashes over a hierarchy.
//!
//! Every mesh keeps an own hash folded from the digests of its committed
//! edits. The structural hash of a node combines its own hash with its
//! children's structural hashes, so comparing two snapshots top-down finds a
//! diverged mesh by following only mismatching branches.

use std::hash::{BuildHasher, Hash, Hasher};

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use crate::mesh::Mesh;
use crate::topology::simplex::IdSimplex;

/// Fixed seeds keep digests stable across runs and threads.
fn hasher() -> impl Hasher {
    RandomState::with_seeds(
        0x243f_6a88_85a3_08d3,
        0x1319_8a2e_0370_7344,
        0xa409_3822_299f_31d0,
        0x082e_fa98_ec4e_6c89,
    )
    .build_hasher()
}

/// Digest of one committed edit.
pub(crate) fn edit_digest(kind: &str, created: &[IdSimplex], deleted: &[IdSimplex]) -> u64 {
    let mut h = hasher();
    kind.hash(&mut h);
    created.hash(&mut h);
    deleted.hash(&mut h);
    h.finish()
}

/// Structural hash of `mesh` and everything below it.
pub fn structural_hash(mesh: &Mesh) -> u64 {
    let mut h = hasher();
    mesh.multi_mesh().own_hash().hash(&mut h);
    for child in mesh.multi_mesh().children() {
        structural_hash(&child).hash(&mut h);
    }
    h.finish()
}

/// Hash tree of a hierarchy at one point in time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralSnapshot {
    pub own: u64,
    pub rollup: u64,
    pub children: Vec<StructuralSnapshot>,
}

impl StructuralSnapshot {
    pub fn capture(mesh: &Mesh) -> Self {
        let children: Vec<StructuralSnapshot> = mesh
            .multi_mesh()
            .children()
            .iter()
            .map(|c| Self::capture(c))
            .collect();
        let own = mesh.multi_mesh().own_hash();
        let mut h = hasher();
        own.hash(&mut h);
        for c in &children {
            c.rollup.hash(&mut h);
        }
        Self {
            own,
            rollup: h.finish(),
            children,
        }
    }
}

/// Child-id path of the shallowest mesh whose own hash differs, or whose
/// children no longer line up. `None` when both trees agree.
pub fn find_divergence(a: &StructuralSnapshot, b: &StructuralSnapshot) -> Option<Vec<usize>> {
    if a.rollup == b.rollup {
        return None;
    }
    if a.own != b.own || a.children.len() != b.children.len() {
        return Some(Vec::new());
    }
    for (i, (ca, cb)) in a.children.iter().zip(&b.children).enumerate() {
        if let Some(mut path) = find_divergence(ca, cb) {
            path.insert(0, i);
            return Some(path);
        }
    }
    Some(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(own: u64) -> StructuralSnapshot {
        StructuralSnapshot {
            own,
            rollup: own,
            children: Vec::new(),
        }
    }

    #[test]
    fn divergence_follows_mismatching_branch() {
        let a = StructuralSnapshot {
            own: 1,
            rollup: 10,
            children: vec![leaf(2), leaf(3)],
        };
        let mut b = a.clone();
        b.children[1] = leaf(4);
        b.rollup = 11;
        assert_eq!(find_divergence(&a, &b), Some(vec![1]));
        assert_eq!(find_divergence(&a, &a), None);
    }

    #[test]
    fn digests_are_deterministic() {
        let c = [IdSimplex::new(crate::topology::PrimitiveType::Edge, 3)];
        assert_eq!(edit_digest("split", &c, &[]), edit_digest("split", &c, &[]));
        assert_ne!(edit_digest("split", &c, &[]), edit_digest("collapse", &c, &[]));
    }
}
