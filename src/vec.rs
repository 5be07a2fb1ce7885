use alloc::alloc::handle_alloc_error;
use core::{
    cmp,
    marker::PhantomData,
    mem,
    ops::{Deref, DerefMut, Index, IndexMut, Range},
    ptr, slice,
};

use slotvec_core::AllocError;
use tracing::instrument;

use crate::{
    raw::RawBlock,
    relocate::{clone_into_uninit, InitGuard, MoveRelocate, Relocate},
};

/// Capacity multiplier applied whenever an append or insert runs out of room.
pub const GROWTH_FACTOR: usize = 2;

/// Capacity of the first block allocated by an append or insert.
pub const MIN_NON_ZERO_CAP: usize = 1;

/// A contiguous growable array over a single [`RawBlock`].
///
/// Slots `[0, len)` hold live values, slots `[len, capacity)` are
/// uninitialized. `R` decides how values travel to a new block when the
/// array grows; see [`MoveRelocate`] and
/// [`CloneRelocate`](crate::CloneRelocate).
///
/// Every operation that may allocate comes in two forms: `try_*` returns an
/// [`AllocError`], the plain form treats allocation failure as fatal.
pub struct SlotVec<T, R = MoveRelocate> {
    block: RawBlock<T>,
    len: usize,
    _relocate: PhantomData<R>,
}

impl<T, R> SlotVec<T, R> {
    pub const fn new() -> Self {
        Self {
            block: RawBlock::new(),
            len: 0,
            _relocate: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.block.capacity()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.block.as_ptr(), self.len) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.block.as_mut_ptr(), self.len) }
    }

    /// # Panics
    ///
    /// Panics if `index >= len`.
    #[inline]
    #[track_caller]
    pub fn at(&self, index: usize) -> &T {
        self.check_index(index);
        unsafe { self.block.slot(index) }
    }

    /// # Panics
    ///
    /// Panics if `index >= len`.
    #[inline]
    #[track_caller]
    pub fn at_mut(&mut self, index: usize) -> &mut T {
        self.check_index(index);
        unsafe { self.block.slot_mut(index) }
    }

    /// Drops the last element.
    ///
    /// # Panics
    ///
    /// Panics if the array is empty.
    #[track_caller]
    pub fn pop_back(&mut self) {
        assert!(self.len != 0, "pop_back on an empty SlotVec");
        self.len -= 1;
        unsafe { ptr::drop_in_place(self.block.slot_ptr(self.len)) };
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(unsafe { self.block.slot_ptr(self.len).read() })
    }

    /// Removes and drops the element at `index`, shifting everything after it
    /// one slot toward the front.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    #[track_caller]
    pub fn erase_at(&mut self, index: usize) {
        drop(self.remove_at(index));
    }

    /// Removes the element at `index` and returns it, shifting everything
    /// after it one slot toward the front.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    #[track_caller]
    pub fn remove_at(&mut self, index: usize) -> T {
        self.check_index(index);
        unsafe {
            let hole = self.block.slot_ptr(index);
            let value = hole.read();
            ptr::copy(hole.add(1), hole, self.len - index - 1);
            self.len -= 1;
            value
        }
    }

    /// Drops every element past the first `len`. Capacity is unchanged.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let tail = ptr::slice_from_raw_parts_mut(self.block.slot_ptr(len), self.len - len);
        // A panicking destructor must not lead to a second drop of the tail.
        self.len = len;
        unsafe { ptr::drop_in_place(tail) };
    }

    pub fn clear(&mut self) {
        self.truncate(0);
    }

    pub fn swap(&mut self, other: &mut SlotVec<T, R>) {
        self.block.swap(&mut other.block);
        mem::swap(&mut self.len, &mut other.len);
    }

    /// Moves the whole array out, leaving an empty array with no storage.
    pub fn take(&mut self) -> SlotVec<T, R> {
        mem::take(self)
    }

    /// Replaces the contents of `self` with those of `other`, leaving `other`
    /// empty with no storage. The previous elements of `self` are dropped.
    pub fn move_assign_from(&mut self, other: &mut SlotVec<T, R>) {
        *self = other.take();
    }

    #[inline]
    #[track_caller]
    fn check_index(&self, index: usize) {
        assert!(
            index < self.len,
            "index {index} out of bounds for SlotVec of length {}",
            self.len
        );
    }
}

impl<T, R> SlotVec<T, R>
where
    R: Relocate<T>,
{
    /// Grows the capacity to at least `capacity`. Never shrinks.
    pub fn try_reserve(&mut self, capacity: usize) -> Result<(), AllocError> {
        if capacity <= self.capacity() {
            return Ok(());
        }
        self.relocate_into(capacity)
    }

    pub fn reserve(&mut self, capacity: usize) {
        self.try_reserve(capacity).unwrap_or_else(|e| handle_error(e));
    }

    /// Appends the value produced by `f`, growing first if the array is full.
    ///
    /// When growing, `f` runs after the new block is allocated and its value is
    /// written straight into that block, so a panic in `f` leaves the array
    /// untouched.
    pub fn try_emplace_back_with<F>(&mut self, f: F) -> Result<&mut T, AllocError>
    where
        F: FnOnce() -> T,
    {
        if self.len == self.capacity() {
            let mut block = RawBlock::<T>::allocate(self.grown_capacity()?)?;
            unsafe {
                let slot = block.slot_ptr(self.len);
                slot.write(f());
                let placed = InitGuard::covering(slot, 1);
                self.relocate_batch(0..self.len, &mut block, 0);
                placed.disarm();
                self.adopt(block, self.len + 1);
            }
        } else {
            unsafe { self.block.slot_ptr(self.len).write(f()) };
            self.len += 1;
        }

        Ok(unsafe { self.block.slot_mut(self.len - 1) })
    }

    pub fn emplace_back_with<F>(&mut self, f: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        match self.try_emplace_back_with(f) {
            Ok(value) => value,
            Err(e) => handle_error(e),
        }
    }

    pub fn try_push(&mut self, value: T) -> Result<&mut T, AllocError> {
        self.try_emplace_back_with(|| value)
    }

    pub fn push(&mut self, value: T) -> &mut T {
        self.emplace_back_with(|| value)
    }

    /// Inserts the value produced by `f` at `index`, keeping the relative
    /// order of every other element.
    ///
    /// If the array is full the value is constructed in the new block first,
    /// then the elements before and after `index` are relocated around it. A
    /// failure at any point releases the new block and leaves the array as it
    /// was. Otherwise `f` runs before anything is shifted.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    #[track_caller]
    pub fn try_emplace_at_with<F>(&mut self, index: usize, f: F) -> Result<&mut T, AllocError>
    where
        F: FnOnce() -> T,
    {
        assert!(
            index <= self.len,
            "insertion index {index} out of bounds for SlotVec of length {}",
            self.len
        );

        if self.len == self.capacity() {
            let mut block = RawBlock::<T>::allocate(self.grown_capacity()?)?;
            unsafe {
                let slot = block.slot_ptr(index);
                slot.write(f());
                let placed = InitGuard::covering(slot, 1);
                self.relocate_batch(0..index, &mut block, 0);
                let before = InitGuard::covering(block.slot_ptr(0), index);
                self.relocate_batch(index..self.len, &mut block, index + 1);
                before.disarm();
                placed.disarm();
                self.adopt(block, self.len + 1);
            }
        } else {
            let value = f();
            unsafe {
                let slot = self.block.slot_ptr(index);
                ptr::copy(slot, slot.add(1), self.len - index);
                slot.write(value);
            }
            self.len += 1;
        }

        Ok(unsafe { self.block.slot_mut(index) })
    }

    #[track_caller]
    pub fn emplace_at_with<F>(&mut self, index: usize, f: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        match self.try_emplace_at_with(index, f) {
            Ok(value) => value,
            Err(e) => handle_error(e),
        }
    }

    #[track_caller]
    pub fn try_insert_at(&mut self, index: usize, value: T) -> Result<&mut T, AllocError> {
        self.try_emplace_at_with(index, || value)
    }

    #[track_caller]
    pub fn insert_at(&mut self, index: usize, value: T) -> &mut T {
        self.emplace_at_with(index, || value)
    }

    /// Resizes to `len` elements, dropping from the back or appending
    /// `T::default()` values. Capacity grows to exactly `len` when needed and
    /// never shrinks.
    pub fn try_resize(&mut self, len: usize) -> Result<(), AllocError>
    where
        T: Default,
    {
        if len <= self.len {
            self.truncate(len);
            return Ok(());
        }

        self.try_reserve(len)?;
        while self.len < len {
            unsafe { self.block.slot_ptr(self.len).write(T::default()) };
            self.len += 1;
        }
        Ok(())
    }

    pub fn resize(&mut self, len: usize)
    where
        T: Default,
    {
        self.try_resize(len).unwrap_or_else(|e| handle_error(e));
    }

    fn grown_capacity(&self) -> Result<usize, AllocError> {
        match self.capacity() {
            0 => Ok(MIN_NON_ZERO_CAP),
            capacity => capacity
                .checked_mul(GROWTH_FACTOR)
                .ok_or(AllocError::CapacityOverflow),
        }
    }

    #[instrument(
        level = "trace",
        skip(self),
        fields(len = self.len, from = self.capacity(), copies = R::COPIES)
    )]
    fn relocate_into(&mut self, capacity: usize) -> Result<(), AllocError> {
        let mut block = RawBlock::allocate(capacity)?;
        unsafe {
            self.relocate_batch(0..self.len, &mut block, 0);
            self.adopt(block, self.len);
        }
        Ok(())
    }

    /// Transfers the live slots in `range` into `block` starting at `dst`.
    ///
    /// # Safety
    ///
    /// The destination slots must be uninitialized. The transferred slots
    /// stay live in the old block until [`adopt`](Self::adopt) retires them.
    unsafe fn relocate_batch(&self, range: Range<usize>, block: &mut RawBlock<T>, dst: usize) {
        let count = range.end - range.start;
        unsafe { R::transfer(self.block.slot_ptr(range.start), block.slot_ptr(dst), count) };
    }

    /// Takes ownership of `block`, which must already hold `len` live
    /// elements, then retires the old slots and releases the old block.
    ///
    /// The array is consistent before any old element is dropped, so a
    /// panicking destructor cannot cause a second drop or leak the new block.
    unsafe fn adopt(&mut self, mut block: RawBlock<T>, len: usize) {
        let retired = mem::replace(&mut self.len, len);
        self.block.swap(&mut block);
        unsafe { R::retire(block.as_mut_ptr(), retired) };
    }
}

impl<T, R> SlotVec<T, R>
where
    T: Default,
{
    /// An array of exactly `len` default values with capacity `len`.
    ///
    /// If `T::default()` panics part way, the values already built are dropped
    /// and the storage released before the panic continues.
    pub fn try_with_len(len: usize) -> Result<Self, AllocError> {
        let mut block = RawBlock::allocate(len)?;
        let mut built = InitGuard::new(block.as_mut_ptr());
        for _ in 0..len {
            unsafe { built.push(T::default()) };
        }

        Ok(Self {
            len: built.disarm(),
            block,
            _relocate: PhantomData,
        })
    }

    pub fn with_len(len: usize) -> Self {
        Self::try_with_len(len).unwrap_or_else(|e| handle_error(e))
    }
}

impl<T, R> SlotVec<T, R>
where
    T: Clone,
{
    /// An independent copy with capacity exactly `self.len()`.
    pub fn try_clone(&self) -> Result<Self, AllocError> {
        let mut block = RawBlock::allocate(self.len)?;
        unsafe { clone_into_uninit(self.block.as_ptr(), block.as_mut_ptr(), self.len) };

        Ok(Self {
            block,
            len: self.len,
            _relocate: PhantomData,
        })
    }

    /// Makes `self` element-wise equal to `other`.
    ///
    /// When `other` does not fit in the current capacity a complete copy is
    /// built before anything in `self` changes. Otherwise existing elements are
    /// overwritten in place with [`Clone::clone_from`], surplus elements are
    /// dropped and missing ones cloned into the free slots; a panic part way
    /// leaves a valid but partially updated array whose length counts every
    /// element constructed so far.
    pub fn try_assign_from(&mut self, other: &SlotVec<T, R>) -> Result<(), AllocError> {
        if other.len > self.capacity() {
            let mut fresh = other.try_clone()?;
            self.swap(&mut fresh);
            return Ok(());
        }

        let overlap = cmp::min(self.len, other.len);
        for (dst, src) in self.as_mut_slice()[..overlap]
            .iter_mut()
            .zip(&other.as_slice()[..overlap])
        {
            dst.clone_from(src);
        }

        if self.len > other.len {
            self.truncate(other.len);
        } else {
            for src in &other.as_slice()[self.len..] {
                unsafe { self.block.slot_ptr(self.len).write(src.clone()) };
                self.len += 1;
            }
        }
        Ok(())
    }
}

impl<T, R> Drop for SlotVec<T, R> {
    fn drop(&mut self) {
        unsafe { ptr::drop_in_place(self.as_mut_slice()) };
    }
}

impl<T, R> Default for SlotVec<T, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, R> Clone for SlotVec<T, R>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        self.try_clone().unwrap_or_else(|e| handle_error(e))
    }

    fn clone_from(&mut self, source: &Self) {
        self.try_assign_from(source).unwrap_or_else(|e| handle_error(e));
    }
}

impl<T, R> Deref for SlotVec<T, R> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, R> DerefMut for SlotVec<T, R> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, R> Index<usize> for SlotVec<T, R> {
    type Output = T;

    #[inline]
    #[track_caller]
    fn index(&self, index: usize) -> &T {
        self.at(index)
    }
}

impl<T, R> IndexMut<usize> for SlotVec<T, R> {
    #[inline]
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut T {
        self.at_mut(index)
    }
}

impl<'a, T, R> IntoIterator for &'a SlotVec<T, R> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<'a, T, R> IntoIterator for &'a mut SlotVec<T, R> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_mut_slice().iter_mut()
    }
}

impl<T, R, S> PartialEq<SlotVec<T, S>> for SlotVec<T, R>
where
    T: PartialEq,
{
    fn eq(&self, other: &SlotVec<T, S>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, R> Eq for SlotVec<T, R> {}

#[cold]
fn handle_error(e: AllocError) -> ! {
    match e {
        AllocError::CapacityOverflow => panic!("capacity overflow"),
        AllocError::OutOfMemory { layout } => handle_alloc_error(layout),
    }
}
