//! Structural self-checks.
//!
//! Meshes and hierarchies expose a full validation pass through
//! [`DebugInvariants`]. The [`debug_invariants!`](crate::debug_invariants)
//! macro turns a failed check into a loud panic in debug builds (or with the
//! `strict-invariants` / `check-invariants` features) and into a logged error
//! otherwise, so release pipelines keep the `Err` value to act on.

use crate::mesh_error::MeshError;

/// Types that can verify their own structural invariants.
pub trait DebugInvariants {
    /// Validate invariants and return the first violation found.
    fn validate_invariants(&self) -> Result<(), MeshError>;

    /// Panic on violation when invariant checking is enabled.
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "structural check");
    }
}

/// Evaluate a `Result<_, MeshError>`-valued check and abort on `Err` when
/// invariant checking is enabled; otherwise log the failure.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        if let Err(e) = &$expr {
            #[cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
            #[cfg(not(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants")))]
            log::error!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}
