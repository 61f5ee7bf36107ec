//! Typed attribute columns with transactional, per-thread scopes.
//!
//! - [`types`]: the closed scalar set and its tagged forms
//! - [`storage`]: committed columns, grown by id reservation
//! - [`scope`]: per-thread write buffers (checkpoint / commit / rollback)
//! - [`handle`]: typed and type-erased column references
//! - [`manager`]: the per-mesh owner tying the above together
//! - [`accessor`]: tuple-aware read/write views

pub mod accessor;
pub mod handle;
pub mod manager;
pub mod scope;
pub mod storage;
pub mod types;

pub use accessor::Accessor;
pub use handle::{MeshAttributeHandle, TypedAttributeHandle};
pub use manager::AttributeManager;
pub use scope::PerThreadAttributeScopeStacks;
pub use types::{AttributeScalar, AttributeType, AttributeValues, Rational};
