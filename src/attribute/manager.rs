//! AttributeManager: committed columns plus per-thread scope stacks.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use super::handle::{MeshAttributeHandle, TypedAttributeHandle};
use super::scope::{PerThreadAttributeScopeStacks, Slot};
use super::storage::{Attribute, AttributeColumn, AttributeStore};
use super::types::{AttributeScalar, AttributeType};
use crate::mesh_error::MeshError;
use crate::topology::primitive::PrimitiveType;

static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(1);

/// Owner of every attribute of one mesh.
///
/// Reads and writes are routed through the calling thread's scope stack
/// first; only the outermost commit touches the shared store.
#[derive(Debug)]
pub struct AttributeManager {
    id: u64,
    store: RwLock<AttributeStore>,
    scopes: PerThreadAttributeScopeStacks,
}

impl AttributeManager {
    pub(crate) fn new(top_dimension: usize) -> Self {
        Self::from_store(AttributeStore::new(top_dimension))
    }

    pub(crate) fn from_store(store: AttributeStore) -> Self {
        Self {
            id: NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed),
            store: RwLock::new(store),
            scopes: PerThreadAttributeScopeStacks::default(),
        }
    }

    /// Identity stamped into [`MeshAttributeHandle`]s.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Create (or with `replace`, reset) a column on `primitive`.
    pub fn register_attribute<T: AttributeScalar>(
        &self,
        name: &str,
        primitive: PrimitiveType,
        default: &[T],
        replace: bool,
        internal: bool,
    ) -> Result<TypedAttributeHandle<T>, MeshError> {
        if default.is_empty() {
            return Err(MeshError::ArityMismatch {
                name: name.to_owned(),
                expected: 1,
                found: 0,
            });
        }
        let mut store = self.store.write();
        let cols = store.primitive_mut(primitive);
        let column = T::wrap_column(Attribute::new(
            name,
            default.len(),
            default.to_vec(),
            cols.size(),
            internal,
        ));
        let index = match cols.position(name) {
            Some(index) if replace => {
                cols.replace(index, column);
                index
            }
            Some(_) => return Err(MeshError::DuplicateAttribute(name.to_owned())),
            None => cols.push(column),
        };
        log::trace!("registered attribute `{name}` on {primitive:?} (#{index})");
        Ok(TypedAttributeHandle::new(primitive, index))
    }

    /// Type-erased handle for an existing column.
    pub fn get_attribute_handle(
        &self,
        name: &str,
        primitive: PrimitiveType,
    ) -> Result<MeshAttributeHandle, MeshError> {
        let store = self.store.read();
        let cols = store.primitive(primitive);
        let index = cols
            .position(name)
            .ok_or_else(|| MeshError::AttributeNotFound(name.to_owned()))?;
        Ok(MeshAttributeHandle {
            mesh_id: self.id,
            primitive,
            index,
            held: cols.column(index).attribute_type(),
        })
    }

    /// Type-erased handle from a typed one.
    pub fn erase<T: AttributeScalar>(&self, handle: TypedAttributeHandle<T>) -> MeshAttributeHandle {
        MeshAttributeHandle {
            mesh_id: self.id,
            primitive: handle.primitive,
            index: handle.index,
            held: T::TYPE,
        }
    }

    /// Typed handle from a type-erased one, checking ownership and type.
    pub fn typed<T: AttributeScalar>(
        &self,
        handle: &MeshAttributeHandle,
    ) -> Result<TypedAttributeHandle<T>, MeshError> {
        if handle.mesh_id != self.id {
            return Err(MeshError::ForeignHandle);
        }
        handle.typed::<T>().map_err(|_| MeshError::AttributeTypeMismatch {
            name: self.name(handle),
            actual: handle.held.as_str(),
            requested: T::TYPE.as_str(),
        })
    }

    pub fn name(&self, handle: &MeshAttributeHandle) -> String {
        self.store
            .read()
            .primitive(handle.primitive)
            .column(handle.index)
            .name()
            .to_owned()
    }

    pub fn arity<T>(&self, handle: TypedAttributeHandle<T>) -> usize {
        self.store
            .read()
            .primitive(handle.primitive)
            .column(handle.index)
            .arity()
    }

    /// Handles of every column that is not part of the mesh's own bookkeeping.
    pub fn user_attributes(&self) -> Vec<MeshAttributeHandle> {
        let store = self.store.read();
        let mut out = Vec::new();
        for (dim, cols) in store.primitives().iter().enumerate() {
            for (index, column) in cols.columns().iter().enumerate() {
                if !column.is_internal() {
                    out.push(MeshAttributeHandle {
                        mesh_id: self.id,
                        primitive: PrimitiveType::from_dimension(dim),
                        index,
                        held: column.attribute_type(),
                    });
                }
            }
        }
        out
    }

    /// Number of ids ever reserved for `primitive`.
    pub fn size(&self, primitive: PrimitiveType) -> usize {
        self.store.read().primitive(primitive).size()
    }

    /// Reserve `count` fresh ids on `primitive`, growing every column.
    ///
    /// Inside a scope the ids are handed back when that scope rolls back.
    pub(crate) fn reserve_ids(
        &self,
        primitive: PrimitiveType,
        count: usize,
    ) -> Result<Range<i64>, MeshError> {
        let ids = self.store.write().primitive_mut(primitive).reserve_ids(primitive, count)?;
        self.scopes
            .record_reservation(primitive.dimension(), ids.start as usize..ids.end as usize);
        Ok(ids)
    }

    #[inline]
    fn slot<T>(handle: &TypedAttributeHandle<T>, id: i64) -> Slot {
        Slot {
            primitive: handle.primitive.dimension() as u8,
            attribute: handle.index as u32,
            id,
        }
    }

    /// Run `f` on the value vector visible to the calling thread.
    ///
    /// # Panics
    /// Panics if `id` was never reserved.
    #[inline]
    pub fn read_with<T: AttributeScalar, R, F: FnOnce(&[T]) -> R>(
        &self,
        handle: &TypedAttributeHandle<T>,
        id: i64,
        f: F,
    ) -> R {
        let f = match self.scopes.read::<T, R, F>(&Self::slot(handle, id), f) {
            Ok(r) => return r,
            Err(f) => f,
        };
        let store = self.store.read();
        let column = store.primitive(handle.primitive).column(handle.index);
        match T::column(column) {
            Some(attr) => f(attr.get(id)),
            None => panic!(
                "attribute `{}` holds {} values, not {}",
                column.name(),
                column.attribute_type().as_str(),
                T::TYPE.as_str()
            ),
        }
    }

    #[inline]
    pub fn vector<T: AttributeScalar>(&self, handle: &TypedAttributeHandle<T>, id: i64) -> Vec<T> {
        self.read_with(handle, id, |v| v.to_vec())
    }

    #[inline]
    pub fn component<T: AttributeScalar>(
        &self,
        handle: &TypedAttributeHandle<T>,
        id: i64,
        index: usize,
    ) -> T {
        self.read_with(handle, id, |v| v[index].clone())
    }

    /// Write a full value vector into the calling thread's top scope, or
    /// straight to storage when no scope is open.
    ///
    /// # Panics
    /// Panics on an arity mismatch or while a parent scope is being viewed.
    pub fn write<T: AttributeScalar>(&self, handle: &TypedAttributeHandle<T>, id: i64, values: &[T]) {
        if let Err(err) = self.check_arity(handle, values.len()) {
            panic!("{err}");
        }
        if self.scopes.try_write(Self::slot(handle, id), values) {
            return;
        }
        let mut store = self.store.write();
        let column = store.primitive_mut(handle.primitive).column_mut(handle.index);
        match T::column_mut(column) {
            Some(attr) => attr.set(id, values),
            None => panic!("attribute handle type does not match its column"),
        }
    }

    fn check_arity<T>(&self, handle: &TypedAttributeHandle<T>, found: usize) -> Result<(), MeshError> {
        let store = self.store.read();
        let column = store.primitive(handle.primitive).column(handle.index);
        if column.arity() == found {
            Ok(())
        } else {
            Err(MeshError::ArityMismatch {
                name: column.name().to_owned(),
                expected: column.arity(),
                found,
            })
        }
    }

    pub fn write_component<T: AttributeScalar>(
        &self,
        handle: &TypedAttributeHandle<T>,
        id: i64,
        index: usize,
        value: T,
    ) {
        let mut values = self.vector(handle, id);
        values[index] = value;
        self.write(handle, id, &values);
    }

    /// Value vector as a tagged buffer.
    pub fn values(&self, handle: &MeshAttributeHandle, id: i64) -> super::types::AttributeValues {
        let (primitive, index) = (handle.primitive, handle.index);
        match handle.held {
            AttributeType::Char => i8::wrap(self.vector(&TypedAttributeHandle::new(primitive, index), id)),
            AttributeType::Int64 => i64::wrap(self.vector(&TypedAttributeHandle::new(primitive, index), id)),
            AttributeType::Double => f64::wrap(self.vector(&TypedAttributeHandle::new(primitive, index), id)),
            AttributeType::Rational => super::types::Rational::wrap(
                self.vector(&TypedAttributeHandle::new(primitive, index), id),
            ),
        }
    }

    /// Write a tagged buffer.
    pub fn set_values(
        &self,
        handle: &MeshAttributeHandle,
        id: i64,
        values: &super::types::AttributeValues,
    ) -> Result<(), MeshError> {
        use super::types::AttributeValues as V;
        let (primitive, index) = (handle.primitive, handle.index);
        self.check_arity(&TypedAttributeHandle::<i8>::new(primitive, index), values.len())?;
        match (handle.held, values) {
            (AttributeType::Char, V::Char(v)) => self.write(&TypedAttributeHandle::new(primitive, index), id, v),
            (AttributeType::Int64, V::Int64(v)) => self.write(&TypedAttributeHandle::new(primitive, index), id, v),
            (AttributeType::Double, V::Double(v)) => self.write(&TypedAttributeHandle::new(primitive, index), id, v),
            (AttributeType::Rational, V::Rational(v)) => {
                self.write(&TypedAttributeHandle::new(primitive, index), id, v)
            }
            (held, other) => {
                return Err(MeshError::AttributeTypeMismatch {
                    name: self.name(handle),
                    actual: held.as_str(),
                    requested: other.attribute_type().as_str(),
                });
            }
        }
        Ok(())
    }

    /// Default value vector of a column.
    pub fn default_values(&self, handle: &MeshAttributeHandle) -> super::types::AttributeValues {
        let store = self.store.read();
        match store.primitive(handle.primitive).column(handle.index) {
            AttributeColumn::Char(a) => i8::wrap(a.default_value().to_vec()),
            AttributeColumn::Int64(a) => i64::wrap(a.default_value().to_vec()),
            AttributeColumn::Double(a) => f64::wrap(a.default_value().to_vec()),
            AttributeColumn::Rational(a) => super::types::Rational::wrap(a.default_value().to_vec()),
        }
    }

    pub fn push_scope(&self) {
        self.scopes.push();
    }

    /// Pop the calling thread's top scope.
    pub fn pop_scope(&self, commit: bool) {
        self.scopes.pop(commit, &self.store);
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.depth()
    }

    /// Writes buffered in the calling thread's innermost scope.
    pub fn pending_writes(&self) -> usize {
        self.scopes.top_write_count()
    }

    pub(crate) fn begin_parent_view(&self) -> bool {
        self.scopes.begin_parent_view()
    }

    pub(crate) fn end_parent_view(&self) {
        self.scopes.end_parent_view()
    }

    /// Copy of the committed store.
    pub(crate) fn committed(&self) -> AttributeStore {
        self.store.read().clone()
    }
}
