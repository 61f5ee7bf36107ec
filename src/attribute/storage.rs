//! Committed, columnar attribute storage.
//!
//! Every primitive dimension owns a list of columns. A column stores `arity`
//! contiguous values per simplex id; all columns of a dimension share the same
//! id range, grown together by [`PrimitiveColumns::reserve_ids`].

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::types::{AttributeType, Rational};
use crate::mesh_error::MeshError;
use crate::topology::primitive::PrimitiveType;

/// One typed column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attribute<T> {
    name: String,
    arity: usize,
    default: Vec<T>,
    data: Vec<T>,
    internal: bool,
}

impl<T: Clone> Attribute<T> {
    pub(crate) fn new(name: &str, arity: usize, default: Vec<T>, size: usize, internal: bool) -> Self {
        debug_assert_eq!(default.len(), arity);
        let mut data = Vec::with_capacity(size * arity);
        for _ in 0..size {
            data.extend_from_slice(&default);
        }
        Self {
            name: name.to_owned(),
            arity,
            default,
            data,
            internal,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.arity
    }

    #[inline]
    pub fn default_value(&self) -> &[T] {
        &self.default
    }

    #[inline]
    pub fn is_internal(&self) -> bool {
        self.internal
    }

    /// Number of ids stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len().checked_div(self.arity).unwrap_or(0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// # Panics
    /// Panics if `id` is outside the reserved range.
    #[inline]
    pub fn get(&self, id: i64) -> &[T] {
        let start = id as usize * self.arity;
        &self.data[start..start + self.arity]
    }

    #[inline]
    pub(crate) fn set(&mut self, id: i64, values: &[T]) {
        let start = id as usize * self.arity;
        self.data[start..start + self.arity].clone_from_slice(values);
    }

    fn grow_by(&mut self, count: usize) -> Result<(), std::collections::TryReserveError> {
        self.data.try_reserve(count * self.arity)?;
        for _ in 0..count {
            self.data.extend_from_slice(&self.default);
        }
        Ok(())
    }

    fn truncate(&mut self, len: usize) {
        self.data.truncate(len * self.arity);
    }
}

/// Tagged column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttributeColumn {
    Char(Attribute<i8>),
    Int64(Attribute<i64>),
    Double(Attribute<f64>),
    Rational(Attribute<Rational>),
}

macro_rules! each_column {
    ($column:expr, $a:ident => $body:expr) => {
        match $column {
            AttributeColumn::Char($a) => $body,
            AttributeColumn::Int64($a) => $body,
            AttributeColumn::Double($a) => $body,
            AttributeColumn::Rational($a) => $body,
        }
    };
}

impl AttributeColumn {
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            AttributeColumn::Char(_) => AttributeType::Char,
            AttributeColumn::Int64(_) => AttributeType::Int64,
            AttributeColumn::Double(_) => AttributeType::Double,
            AttributeColumn::Rational(_) => AttributeType::Rational,
        }
    }

    pub fn name(&self) -> &str {
        each_column!(self, a => a.name())
    }

    pub fn arity(&self) -> usize {
        each_column!(self, a => a.arity())
    }

    pub fn is_internal(&self) -> bool {
        each_column!(self, a => a.is_internal())
    }

    fn grow_by(&mut self, count: usize) -> Result<(), std::collections::TryReserveError> {
        each_column!(self, a => a.grow_by(count))
    }

    fn truncate(&mut self, len: usize) {
        each_column!(self, a => a.truncate(len))
    }
}

/// All columns of one primitive dimension.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveColumns {
    size: usize,
    columns: Vec<AttributeColumn>,
}

impl PrimitiveColumns {
    /// Number of ids ever reserved (alive or not).
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn columns(&self) -> &[AttributeColumn] {
        &self.columns
    }

    #[inline]
    pub(crate) fn column(&self, index: usize) -> &AttributeColumn {
        &self.columns[index]
    }

    #[inline]
    pub(crate) fn column_mut(&mut self, index: usize) -> &mut AttributeColumn {
        &mut self.columns[index]
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    pub(crate) fn push(&mut self, column: AttributeColumn) -> usize {
        self.columns.push(column);
        self.columns.len() - 1
    }

    pub(crate) fn replace(&mut self, index: usize, column: AttributeColumn) {
        self.columns[index] = column;
    }

    /// Append `count` ids to every column, filled with defaults.
    pub(crate) fn reserve_ids(
        &mut self,
        primitive: PrimitiveType,
        count: usize,
    ) -> Result<Range<i64>, MeshError> {
        for column in &mut self.columns {
            column.grow_by(count).map_err(|_| MeshError::CapacityExceeded {
                primitive,
                requested: count,
            })?;
        }
        let start = self.size as i64;
        self.size += count;
        Ok(start..self.size as i64)
    }

    /// Hand back the ids in `ids` if they are the most recently reserved.
    /// Returns `false`, leaving them allocated and inactive, otherwise.
    pub(crate) fn release_ids(&mut self, ids: Range<usize>) -> bool {
        if ids.end != self.size || ids.start > ids.end {
            return false;
        }
        for column in &mut self.columns {
            column.truncate(ids.start);
        }
        self.size = ids.start;
        true
    }
}

/// Committed storage for every primitive dimension of a mesh.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeStore {
    primitives: Vec<PrimitiveColumns>,
}

impl AttributeStore {
    pub(crate) fn new(top_dimension: usize) -> Self {
        Self {
            primitives: vec![PrimitiveColumns::default(); top_dimension + 1],
        }
    }

    #[inline]
    pub fn primitives(&self) -> &[PrimitiveColumns] {
        &self.primitives
    }

    #[inline]
    pub(crate) fn primitive(&self, primitive: PrimitiveType) -> &PrimitiveColumns {
        &self.primitives[primitive.dimension()]
    }

    #[inline]
    pub(crate) fn primitive_mut(&mut self, primitive: PrimitiveType) -> &mut PrimitiveColumns {
        &mut self.primitives[primitive.dimension()]
    }

    #[inline]
    pub(crate) fn primitive_index_mut(&mut self, dim: usize) -> &mut PrimitiveColumns {
        &mut self.primitives[dim]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_grows_every_column_with_defaults() {
        let mut cols = PrimitiveColumns::default();
        cols.push(AttributeColumn::Double(Attribute::new("p", 2, vec![1.0, 2.0], 0, false)));
        cols.push(AttributeColumn::Char(Attribute::new("f", 1, vec![0], 0, true)));
        let ids = cols.reserve_ids(PrimitiveType::Vertex, 3).unwrap();
        assert_eq!(ids, 0..3);
        let more = cols.reserve_ids(PrimitiveType::Vertex, 2).unwrap();
        assert_eq!(more, 3..5);
        assert_eq!(cols.size(), 5);
        match cols.column(0) {
            AttributeColumn::Double(a) => {
                assert_eq!(a.len(), 5);
                assert_eq!(a.get(4), &[1.0, 2.0]);
            }
            other => panic!("unexpected column {other:?}"),
        }
        assert!(cols.column(1).is_internal());
        assert_eq!(cols.position("f"), Some(1));
    }

    #[test]
    fn only_the_latest_ids_can_be_released() {
        let mut cols = PrimitiveColumns::default();
        cols.push(AttributeColumn::Int64(Attribute::new("k", 1, vec![7], 0, false)));
        cols.reserve_ids(PrimitiveType::Edge, 2).unwrap();
        let before = cols.clone();
        cols.reserve_ids(PrimitiveType::Edge, 3).unwrap();
        cols.reserve_ids(PrimitiveType::Edge, 1).unwrap();
        assert!(!cols.release_ids(2..5));
        assert!(cols.release_ids(5..6));
        assert!(cols.release_ids(2..5));
        assert_eq!(cols, before);
    }
}
