//! Accessor: a typed view of one attribute, addressed by id or by tuple.

use super::handle::TypedAttributeHandle;
use super::types::AttributeScalar;
use crate::mesh::Mesh;
use crate::topology::tuple::Tuple;

/// Reads and writes go through the calling thread's scope stack of the mesh
/// the accessor was created from.
pub struct Accessor<'a, T: AttributeScalar> {
    mesh: &'a Mesh,
    handle: TypedAttributeHandle<T>,
}

impl<'a, T: AttributeScalar> Accessor<'a, T> {
    pub(crate) fn new(mesh: &'a Mesh, handle: TypedAttributeHandle<T>) -> Self {
        Self { mesh, handle }
    }

    #[inline]
    pub fn handle(&self) -> TypedAttributeHandle<T> {
        self.handle
    }

    pub fn arity(&self) -> usize {
        self.mesh.attributes().arity(self.handle)
    }

    #[inline]
    fn id_of(&self, t: &Tuple) -> i64 {
        self.mesh.id(t, self.handle.primitive_type())
    }

    pub fn vector(&self, id: i64) -> Vec<T> {
        self.mesh.attributes().vector(&self.handle, id)
    }

    /// First component; intended for arity-1 attributes.
    pub fn scalar(&self, id: i64) -> T {
        self.component(id, 0)
    }

    pub fn component(&self, id: i64, index: usize) -> T {
        self.mesh.attributes().component(&self.handle, id, index)
    }

    pub fn set_vector(&self, id: i64, values: &[T]) {
        self.mesh.attributes().write(&self.handle, id, values);
    }

    pub fn set_scalar(&self, id: i64, value: T) {
        self.mesh.attributes().write(&self.handle, id, &[value]);
    }

    pub fn set_component(&self, id: i64, index: usize, value: T) {
        self.mesh
            .attributes()
            .write_component(&self.handle, id, index, value);
    }

    /// Value of the simplex the tuple selects at this attribute's dimension.
    pub fn vector_at(&self, t: &Tuple) -> Vec<T> {
        self.vector(self.id_of(t))
    }

    pub fn scalar_at(&self, t: &Tuple) -> T {
        self.scalar(self.id_of(t))
    }

    pub fn set_vector_at(&self, t: &Tuple, values: &[T]) {
        self.set_vector(self.id_of(t), values)
    }

    pub fn set_scalar_at(&self, t: &Tuple, value: T) {
        self.set_scalar(self.id_of(t), value)
    }
}
