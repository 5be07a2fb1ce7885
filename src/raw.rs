use core::{
    marker::PhantomData,
    mem::{self, MaybeUninit},
    ops::{Deref, DerefMut},
    ptr::NonNull,
    slice,
};

use slotvec_core::{AllocError, NonZeroLayout};
use tracing::trace;

use crate::system::System;

/// An owned, uninitialized region with room for `capacity` values of `T`.
///
/// A block never constructs or drops a `T`. Whoever owns it decides which
/// slots hold live values and must drop them before the block goes away;
/// dropping the block only hands the memory back to the [`System`] allocator.
pub struct RawBlock<T> {
    ptr: NonNull<T>,
    capacity: usize,
    _p: PhantomData<T>,
}

impl<T> RawBlock<T> {
    /// An empty block. Does not allocate.
    pub const fn new() -> Self {
        Self {
            ptr: NonNull::dangling(),
            capacity: 0,
            _p: PhantomData,
        }
    }

    /// Reserves storage for exactly `capacity` slots.
    ///
    /// A zero capacity, or a zero-sized `T`, yields a block that owns no
    /// memory but still reports the requested capacity.
    pub fn allocate(capacity: usize) -> Result<Self, AllocError> {
        let ptr = match NonZeroLayout::array::<T>(capacity)? {
            Some(layout) => {
                let ptr = System.allocate(layout)?;
                trace!(capacity, bytes = layout.size(), "allocated raw block");
                ptr.cast()
            }
            None => NonNull::dangling(),
        };

        Ok(Self {
            ptr,
            capacity,
            _p: PhantomData,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Address of slot `offset`. `offset == capacity` is the one-past-the-end
    /// address.
    ///
    /// # Panics
    ///
    /// Panics if `offset > capacity`.
    #[inline]
    pub fn slot_ptr(&self, offset: usize) -> *mut T {
        assert!(
            offset <= self.capacity,
            "slot offset {offset} is past the end of a block of capacity {}",
            self.capacity
        );
        unsafe { self.ptr.as_ptr().add(offset) }
    }

    /// # Safety
    ///
    /// Slot `index` must hold a live value.
    ///
    /// # Panics
    ///
    /// Panics if `index >= capacity`.
    #[inline]
    pub unsafe fn slot(&self, index: usize) -> &T {
        unsafe { self[index].assume_init_ref() }
    }

    /// # Safety
    ///
    /// Slot `index` must hold a live value.
    ///
    /// # Panics
    ///
    /// Panics if `index >= capacity`.
    #[inline]
    pub unsafe fn slot_mut(&mut self, index: usize) -> &mut T {
        unsafe { self[index].assume_init_mut() }
    }

    #[inline]
    pub fn swap(&mut self, other: &mut RawBlock<T>) {
        mem::swap(&mut self.ptr, &mut other.ptr);
        mem::swap(&mut self.capacity, &mut other.capacity);
    }

    /// Moves the region out, leaving an empty block behind.
    #[inline]
    pub fn take(&mut self) -> RawBlock<T> {
        mem::take(self)
    }
}

impl<T> Default for RawBlock<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deref for RawBlock<T> {
    type Target = [MaybeUninit<T>];

    #[inline]
    fn deref(&self) -> &Self::Target {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr().cast(), self.capacity) }
    }
}

impl<T> DerefMut for RawBlock<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr().cast(), self.capacity) }
    }
}

impl<T> Drop for RawBlock<T> {
    fn drop(&mut self) {
        // The layout was valid when the block was allocated.
        if let Ok(Some(layout)) = NonZeroLayout::array::<T>(self.capacity) {
            unsafe { System.deallocate(self.ptr.cast(), layout) };
            trace!(capacity = self.capacity, "released raw block");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_block_owns_nothing() {
        let block = RawBlock::<u32>::new();
        assert_eq!(block.capacity(), 0);
        assert!(block.is_empty());
        assert_eq!(block.slot_ptr(0), block.as_ptr() as *mut u32);
    }

    #[test]
    fn zero_capacity_allocation_is_empty() {
        let block = RawBlock::<String>::allocate(0).unwrap();
        assert_eq!(block.capacity(), 0);
    }

    #[test]
    fn slots_are_contiguous() {
        let block = RawBlock::<u64>::allocate(4).unwrap();
        assert_eq!(block.len(), 4);
        let base = block.as_ptr() as usize;
        for i in 0..=4 {
            assert_eq!(block.slot_ptr(i) as usize, base + i * 8);
        }
    }

    #[test]
    #[should_panic(expected = "past the end")]
    fn offset_past_end_panics() {
        let block = RawBlock::<u8>::allocate(2).unwrap();
        block.slot_ptr(3);
    }

    #[test]
    fn written_slots_read_back() {
        let mut block = RawBlock::<u32>::allocate(3).unwrap();
        block[1].write(7);
        unsafe {
            *block.slot_mut(1) += 1;
            assert_eq!(*block.slot(1), 8);
        }
    }

    #[test]
    fn take_leaves_an_empty_block() {
        let mut block = RawBlock::<u16>::allocate(8).unwrap();
        let ptr = block.as_ptr();
        let taken = block.take();
        assert_eq!(taken.capacity(), 8);
        assert_eq!(taken.as_ptr(), ptr);
        assert_eq!(block.capacity(), 0);
    }

    #[test]
    fn swap_exchanges_ownership() {
        let mut a = RawBlock::<u8>::allocate(1).unwrap();
        let mut b = RawBlock::<u8>::allocate(5).unwrap();
        let (pa, pb) = (a.as_ptr(), b.as_ptr());
        a.swap(&mut b);
        assert_eq!((a.capacity(), b.capacity()), (5, 1));
        assert_eq!((a.as_ptr(), b.as_ptr()), (pb, pa));
    }

    #[test]
    fn over_aligned_slots() {
        #[repr(align(256))]
        struct Page(#[allow(dead_code)] u8);

        let block = RawBlock::<Page>::allocate(3).unwrap();
        assert_eq!(block.as_ptr() as usize % 256, 0);
    }

    #[test]
    fn impossible_capacity_overflows() {
        assert!(matches!(
            RawBlock::<u64>::allocate(usize::MAX),
            Err(AllocError::CapacityOverflow)
        ));
    }
}
