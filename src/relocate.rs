//! How live elements travel from an old block into a newly allocated one.
//!
//! The strategy is a type parameter of [`SlotVec`](crate::SlotVec), so the
//! choice is made once per element type at compile time.

use core::{mem, ptr};

/// A strategy for relocating live elements between blocks.
///
/// A relocation is one or more [`transfer`](Relocate::transfer) batches into
/// the new block followed by a single [`retire`](Relocate::retire) of the old
/// slots once every batch has succeeded.
///
/// # Safety
///
/// If `transfer` unwinds it must have dropped every value it wrote to `dst`
/// and left `src` untouched. After a successful relocation the new slots
/// must hold the sequence the old slots held, and the old slots must be dead.
pub unsafe trait Relocate<T> {
    /// Whether the old elements survive `transfer` as independent copies.
    const COPIES: bool;

    /// Fills `dst[..count]` from the live values in `src[..count]`.
    ///
    /// # Safety
    ///
    /// `src[..count]` must be live, `dst[..count]` uninitialized, and the two
    /// ranges must not overlap.
    unsafe fn transfer(src: *const T, dst: *mut T, count: usize);

    /// Ends the lifetime of whatever `transfer` left behind in `src[..count]`.
    ///
    /// # Safety
    ///
    /// Must be called exactly once for slots that were transferred.
    unsafe fn retire(src: *mut T, count: usize);
}

/// Relocates by moving each value's bytes. Moving can never panic, so the
/// old slots are simply forgotten afterwards.
#[derive(Debug)]
pub enum MoveRelocate {}

unsafe impl<T> Relocate<T> for MoveRelocate {
    const COPIES: bool = false;

    #[inline]
    unsafe fn transfer(src: *const T, dst: *mut T, count: usize) {
        unsafe { ptr::copy_nonoverlapping(src, dst, count) };
    }

    #[inline]
    unsafe fn retire(_src: *mut T, _count: usize) {}
}

/// Relocates by cloning every value and dropping the originals only once the
/// whole relocation has succeeded.
///
/// A panicking `clone` leaves the source collection exactly as it was.
#[derive(Debug)]
pub enum CloneRelocate {}

unsafe impl<T: Clone> Relocate<T> for CloneRelocate {
    const COPIES: bool = true;

    unsafe fn transfer(src: *const T, dst: *mut T, count: usize) {
        unsafe { clone_into_uninit(src, dst, count) };
    }

    unsafe fn retire(src: *mut T, count: usize) {
        unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(src, count)) };
    }
}

/// Clones `src[..count]` into the uninitialized `dst[..count]`, dropping the
/// clones already made if one of them panics.
pub(crate) unsafe fn clone_into_uninit<T: Clone>(src: *const T, dst: *mut T, count: usize) {
    let mut guard = InitGuard::new(dst);
    for i in 0..count {
        unsafe { guard.push((*src.add(i)).clone()) };
    }
    guard.disarm();
}

/// Tracks a run of freshly written slots and drops them if it is dropped
/// while still armed.
pub(crate) struct InitGuard<T> {
    start: *mut T,
    len: usize,
}

impl<T> InitGuard<T> {
    pub(crate) fn new(start: *mut T) -> Self {
        Self { start, len: 0 }
    }

    /// Guards `len` slots at `start` that are already live.
    pub(crate) fn covering(start: *mut T, len: usize) -> Self {
        Self { start, len }
    }

    /// Writes `value` into the next slot.
    ///
    /// # Safety
    ///
    /// The slot must be uninitialized and inside the same allocation.
    #[inline]
    pub(crate) unsafe fn push(&mut self, value: T) {
        unsafe { self.start.add(self.len).write(value) };
        self.len += 1;
    }

    /// Hands the slots over to their new owner.
    #[inline]
    pub(crate) fn disarm(self) -> usize {
        let len = self.len;
        mem::forget(self);
        len
    }
}

impl<T> Drop for InitGuard<T> {
    fn drop(&mut self) {
        unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.start, self.len)) };
    }
}
