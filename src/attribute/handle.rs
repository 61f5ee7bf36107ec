//! Attribute handles: typed and type-erased references to a column.

use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use super::types::{AttributeScalar, AttributeType};
use crate::mesh_error::MeshError;
use crate::topology::primitive::PrimitiveType;

/// Typed reference to a column. Does not own data and is only meaningful for
/// the mesh that created it.
pub struct TypedAttributeHandle<T> {
    pub(crate) primitive: PrimitiveType,
    pub(crate) index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedAttributeHandle<T> {
    pub(crate) fn new(primitive: PrimitiveType, index: usize) -> Self {
        Self {
            primitive,
            index,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn primitive_type(&self) -> PrimitiveType {
        self.primitive
    }
}

impl<T> Clone for TypedAttributeHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TypedAttributeHandle<T> {}

impl<T> PartialEq for TypedAttributeHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.primitive == other.primitive && self.index == other.index
    }
}

impl<T> Eq for TypedAttributeHandle<T> {}

impl<T> Hash for TypedAttributeHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.primitive.hash(state);
        self.index.hash(state);
    }
}

impl<T> Debug for TypedAttributeHandle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedAttributeHandle")
            .field("primitive", &self.primitive)
            .field("index", &self.index)
            .finish()
    }
}

/// Type-erased handle bound to a specific mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeshAttributeHandle {
    pub(crate) mesh_id: u64,
    pub(crate) primitive: PrimitiveType,
    pub(crate) index: usize,
    pub(crate) held: AttributeType,
}

impl MeshAttributeHandle {
    #[inline]
    pub fn primitive_type(&self) -> PrimitiveType {
        self.primitive
    }

    #[inline]
    pub fn held_type(&self) -> AttributeType {
        self.held
    }

    /// Recover the typed handle, failing when the scalar type differs.
    pub fn typed<T: AttributeScalar>(&self) -> Result<TypedAttributeHandle<T>, MeshError> {
        if self.held != T::TYPE {
            return Err(MeshError::AttributeTypeMismatch {
                name: format!("#{}", self.index),
                actual: self.held.as_str(),
                requested: T::TYPE.as_str(),
            });
        }
        Ok(TypedAttributeHandle::new(self.primitive, self.index))
    }
}
