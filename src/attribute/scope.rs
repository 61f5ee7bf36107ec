//! Per-thread transactional scopes over attribute writes.
//!
//! A scope frame buffers writes in per-type arenas keyed by
//! `(primitive, attribute, id)`. Reads walk the frames of the calling thread
//! top-down before falling back to committed storage. Committing an inner
//! frame merges it into its parent; committing the outermost frame applies it
//! to storage under the store's write lock. Rolling back clears the frame and
//! releases the ids it reserved, newest first, as long as no later
//! reservation sits above them. Popped frames keep their allocations for the
//! next push.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

use dashmap::DashMap;
use hashbrown::HashMap;
use parking_lot::RwLock;

use super::storage::AttributeStore;
use super::types::AttributeScalar;

/// Address of one simplex's value vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Slot {
    pub primitive: u8,
    pub attribute: u32,
    pub id: i64,
}

/// Arena of buffered writes for one scalar type.
#[derive(Debug)]
pub struct FrameBuffer<T> {
    index: HashMap<Slot, (usize, usize)>,
    values: Vec<T>,
}

impl<T> Default for FrameBuffer<T> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            values: Vec::new(),
        }
    }
}

impl<T: Clone> FrameBuffer<T> {
    #[inline]
    pub(crate) fn get(&self, slot: &Slot) -> Option<&[T]> {
        self.index
            .get(slot)
            .map(|&(offset, len)| &self.values[offset..offset + len])
    }

    pub(crate) fn put(&mut self, slot: Slot, values: &[T]) {
        if let Some(&(offset, len)) = self.index.get(&slot) {
            debug_assert_eq!(len, values.len());
            self.values[offset..offset + len].clone_from_slice(values);
        } else {
            let offset = self.values.len();
            self.values.extend_from_slice(values);
            self.index.insert(slot, (offset, values.len()));
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (Slot, &[T])> + '_ {
        self.index
            .iter()
            .map(|(slot, &(offset, len))| (*slot, &self.values[offset..offset + len]))
    }

    /// Number of buffered value vectors.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn clear(&mut self) {
        self.index.clear();
        self.values.clear();
    }

    fn merge_into(&self, parent: &mut FrameBuffer<T>) {
        for (slot, values) in self.iter() {
            parent.put(slot, values);
        }
    }
}

/// One scope frame: a buffer per scalar type.
#[derive(Debug, Default)]
pub struct ScopeFrame {
    pub(crate) chars: FrameBuffer<i8>,
    pub(crate) int64s: FrameBuffer<i64>,
    pub(crate) doubles: FrameBuffer<f64>,
    pub(crate) rationals: FrameBuffer<super::types::Rational>,
    /// Ids reserved while this frame was on top, as `(dimension, ids)`.
    reservations: Vec<(usize, Range<usize>)>,
}

impl ScopeFrame {
    /// Number of buffered writes across all types.
    pub fn write_count(&self) -> usize {
        self.chars.len() + self.int64s.len() + self.doubles.len() + self.rationals.len()
    }

    fn clear(&mut self) {
        self.chars.clear();
        self.int64s.clear();
        self.doubles.clear();
        self.rationals.clear();
        self.reservations.clear();
    }

    fn merge_into(&self, parent: &mut ScopeFrame) {
        self.chars.merge_into(&mut parent.chars);
        self.int64s.merge_into(&mut parent.int64s);
        self.doubles.merge_into(&mut parent.doubles);
        self.rationals.merge_into(&mut parent.rationals);
        parent.reservations.extend(self.reservations.iter().cloned());
    }

    fn release_reservations(&self, store: &mut AttributeStore) {
        for (dim, ids) in self.reservations.iter().rev() {
            if !store.primitive_index_mut(*dim).release_ids(ids.clone()) {
                log::debug!(
                    "ids {ids:?} of dimension {dim} stay reserved: newer ids were reserved above them"
                );
            }
        }
    }

    fn apply_to(&self, store: &mut AttributeStore) {
        apply_buffer(&self.chars, store);
        apply_buffer(&self.int64s, store);
        apply_buffer(&self.doubles, store);
        apply_buffer(&self.rationals, store);
    }
}

fn apply_buffer<T: AttributeScalar>(buffer: &FrameBuffer<T>, store: &mut AttributeStore) {
    for (slot, values) in buffer.iter() {
        let column = store
            .primitive_index_mut(slot.primitive as usize)
            .column_mut(slot.attribute as usize);
        match T::column_mut(column) {
            Some(attr) => attr.set(slot.id, values),
            None => debug_assert!(false, "scope buffer type does not match column"),
        }
    }
}

/// The scope stack of a single thread.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<ScopeFrame>,
    depth: usize,
    view_limit: Option<usize>,
}

impl ScopeStack {
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn push(&mut self) {
        if self.depth == self.frames.len() {
            self.frames.push(ScopeFrame::default());
        }
        self.depth += 1;
    }

    fn pop(&mut self, commit: bool, store: &RwLock<AttributeStore>) {
        assert!(self.depth > 0, "pop_scope without a matching push_scope");
        assert!(
            self.view_limit.is_none(),
            "cannot pop a scope while viewing its parent"
        );
        let top = self.depth - 1;
        if commit {
            if top == 0 {
                self.frames[0].apply_to(&mut store.write());
            } else {
                let (below, above) = self.frames.split_at_mut(top);
                above[0].merge_into(&mut below[top - 1]);
            }
        } else if !self.frames[top].reservations.is_empty() {
            self.frames[top].release_reservations(&mut store.write());
        }
        self.frames[top].clear();
        self.depth -= 1;
    }

    #[inline]
    fn visible(&self) -> usize {
        self.view_limit.unwrap_or(self.depth)
    }

    fn read<T: AttributeScalar>(&self, slot: &Slot) -> Option<&[T]> {
        self.frames[..self.visible()]
            .iter()
            .rev()
            .find_map(|frame| T::buffer(frame).get(slot))
    }

    fn write<T: AttributeScalar>(&mut self, slot: Slot, values: &[T]) {
        assert!(
            self.view_limit.is_none(),
            "attribute write while viewing a parent scope"
        );
        let top = self.depth - 1;
        T::buffer_mut(&mut self.frames[top]).put(slot, values);
    }

    fn record_reservation(&mut self, dim: usize, ids: Range<usize>) {
        let top = self.depth - 1;
        self.frames[top].reservations.push((dim, ids));
    }

    /// Writes buffered in the top frame.
    pub fn top_write_count(&self) -> usize {
        self.depth
            .checked_sub(1)
            .map(|top| self.frames[top].write_count())
            .unwrap_or(0)
    }
}

/// Independent scope stacks keyed by thread.
#[derive(Debug, Default)]
pub struct PerThreadAttributeScopeStacks {
    stacks: DashMap<ThreadId, ScopeStack>,
    active: AtomicUsize,
}

impl PerThreadAttributeScopeStacks {
    #[inline]
    fn current() -> ThreadId {
        thread::current().id()
    }

    /// Push a frame on the calling thread's stack.
    pub fn push(&self) {
        self.stacks.entry(Self::current()).or_default().push();
        self.active.fetch_add(1, Ordering::AcqRel);
    }

    /// Pop the calling thread's top frame, committing or discarding it.
    ///
    /// # Panics
    /// Panics when the calling thread has no open scope.
    pub fn pop(&self, commit: bool, store: &RwLock<AttributeStore>) {
        let tid = Self::current();
        match self.stacks.get_mut(&tid) {
            Some(mut stack) => stack.pop(commit, store),
            None => panic!("pop_scope without a matching push_scope"),
        }
        self.active.fetch_sub(1, Ordering::AcqRel);
    }

    /// Scope depth of the calling thread.
    pub fn depth(&self) -> usize {
        if self.active.load(Ordering::Acquire) == 0 {
            return 0;
        }
        self.stacks
            .get(&Self::current())
            .map(|s| s.depth())
            .unwrap_or(0)
    }

    /// Buffered writes in the calling thread's top frame.
    pub fn top_write_count(&self) -> usize {
        self.stacks
            .get(&Self::current())
            .map(|s| s.top_write_count())
            .unwrap_or(0)
    }

    /// Look the slot up in the calling thread's visible frames.
    #[inline]
    pub(crate) fn read<T: AttributeScalar, R, F: FnOnce(&[T]) -> R>(
        &self,
        slot: &Slot,
        f: F,
    ) -> Result<R, F> {
        if self.active.load(Ordering::Acquire) == 0 {
            return Err(f);
        }
        let Some(stack) = self.stacks.get(&Self::current()) else {
            return Err(f);
        };
        match stack.read::<T>(slot) {
            Some(values) => Ok(f(values)),
            None => Err(f),
        }
    }

    /// Buffer the write if the calling thread has an open scope.
    /// Returns `false` when the caller must write to committed storage.
    #[inline]
    pub(crate) fn try_write<T: AttributeScalar>(&self, slot: Slot, values: &[T]) -> bool {
        if self.active.load(Ordering::Acquire) == 0 {
            return false;
        }
        match self.stacks.get_mut(&Self::current()) {
            Some(mut stack) if stack.depth() > 0 => {
                stack.write(slot, values);
                true
            }
            _ => false,
        }
    }

    /// Remember ids reserved under the calling thread's top frame so a
    /// rollback can release them. Returns `false` when no scope is open.
    pub(crate) fn record_reservation(&self, dim: usize, ids: Range<usize>) -> bool {
        if self.active.load(Ordering::Acquire) == 0 {
            return false;
        }
        match self.stacks.get_mut(&Self::current()) {
            Some(mut stack) if stack.depth() > 0 => {
                stack.record_reservation(dim, ids);
                true
            }
            _ => false,
        }
    }

    /// Hide the calling thread's top frame from reads until [`Self::end_parent_view`].
    pub(crate) fn begin_parent_view(&self) -> bool {
        match self.stacks.get_mut(&Self::current()) {
            Some(mut stack) if stack.depth() > 0 && stack.view_limit.is_none() => {
                stack.view_limit = Some(stack.depth() - 1);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn end_parent_view(&self) {
        if let Some(mut stack) = self.stacks.get_mut(&Self::current()) {
            stack.view_limit = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::storage::{Attribute, AttributeColumn};
    use crate::topology::primitive::PrimitiveType;

    fn store_with_column() -> RwLock<AttributeStore> {
        let mut store = AttributeStore::new(0);
        let cols = store.primitive_mut(PrimitiveType::Vertex);
        cols.push(AttributeColumn::Int64(Attribute::new("x", 1, vec![0], 0, false)));
        cols.reserve_ids(PrimitiveType::Vertex, 4).unwrap();
        RwLock::new(store)
    }

    fn slot(id: i64) -> Slot {
        Slot {
            primitive: 0,
            attribute: 0,
            id,
        }
    }

    fn committed(store: &RwLock<AttributeStore>, id: i64) -> i64 {
        match store.read().primitive(PrimitiveType::Vertex).column(0) {
            AttributeColumn::Int64(a) => a.get(id)[0],
            _ => unreachable!(),
        }
    }

    fn visible(stacks: &PerThreadAttributeScopeStacks, store: &RwLock<AttributeStore>, id: i64) -> i64 {
        stacks
            .read::<i64, _, _>(&slot(id), |v| v[0])
            .unwrap_or_else(|_| committed(store, id))
    }

    #[test]
    fn nested_commit_then_outer_rollback_discards_everything() {
        let store = store_with_column();
        let stacks = PerThreadAttributeScopeStacks::default();
        stacks.push();
        assert!(stacks.try_write(slot(1), &[5i64]));
        stacks.push();
        assert!(stacks.try_write(slot(2), &[7i64]));
        stacks.pop(true, &store);
        assert_eq!(visible(&stacks, &store, 2), 7);
        stacks.pop(false, &store);
        assert_eq!(committed(&store, 1), 0);
        assert_eq!(committed(&store, 2), 0);
        assert_eq!(stacks.depth(), 0);
    }

    #[test]
    fn outer_commit_reaches_storage() {
        let store = store_with_column();
        let stacks = PerThreadAttributeScopeStacks::default();
        stacks.push();
        stacks.try_write(slot(3), &[9i64]);
        stacks.try_write(slot(3), &[11i64]);
        assert_eq!(stacks.top_write_count(), 1);
        stacks.pop(true, &store);
        assert_eq!(committed(&store, 3), 11);
        assert!(!stacks.try_write(slot(3), &[1i64]));
    }

    #[test]
    fn parent_view_hides_top_frame() {
        let store = store_with_column();
        let stacks = PerThreadAttributeScopeStacks::default();
        stacks.push();
        stacks.try_write(slot(0), &[1i64]);
        stacks.push();
        stacks.try_write(slot(0), &[2i64]);
        assert!(stacks.begin_parent_view());
        assert_eq!(visible(&stacks, &store, 0), 1);
        stacks.end_parent_view();
        assert_eq!(visible(&stacks, &store, 0), 2);
        stacks.pop(false, &store);
        stacks.pop(false, &store);
    }

    fn reserve(stacks: &PerThreadAttributeScopeStacks, store: &RwLock<AttributeStore>, count: usize) {
        let ids = store
            .write()
            .primitive_mut(PrimitiveType::Vertex)
            .reserve_ids(PrimitiveType::Vertex, count)
            .unwrap();
        stacks.record_reservation(0, ids.start as usize..ids.end as usize);
    }

    #[test]
    fn rollback_releases_reserved_ids() {
        let store = store_with_column();
        let before = store.read().clone();
        let stacks = PerThreadAttributeScopeStacks::default();
        stacks.push();
        reserve(&stacks, &store, 2);
        stacks.push();
        reserve(&stacks, &store, 3);
        stacks.try_write(slot(6), &[1i64]);
        stacks.pop(true, &store);
        assert_eq!(store.read().primitive(PrimitiveType::Vertex).size(), 9);
        stacks.pop(false, &store);
        assert_eq!(*store.read(), before);
    }

    #[test]
    fn committed_reservations_stay() {
        let store = store_with_column();
        let stacks = PerThreadAttributeScopeStacks::default();
        stacks.push();
        reserve(&stacks, &store, 2);
        stacks.pop(true, &store);
        stacks.push();
        stacks.pop(false, &store);
        assert_eq!(store.read().primitive(PrimitiveType::Vertex).size(), 6);
    }

    #[test]
    fn other_threads_do_not_see_buffered_writes() {
        let store = store_with_column();
        let stacks = PerThreadAttributeScopeStacks::default();
        stacks.push();
        stacks.try_write(slot(1), &[4i64]);
        std::thread::scope(|s| {
            s.spawn(|| {
                assert_eq!(visible(&stacks, &store, 1), 0);
                assert_eq!(stacks.depth(), 0);
            });
        });
        stacks.pop(true, &store);
        assert_eq!(committed(&store, 1), 4);
    }
}
