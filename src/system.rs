use core::{mem, ptr::NonNull};

use cfg_if::cfg_if;
use libc::c_void;
use slotvec_core::{AllocError, NonZeroLayout};

/// The system allocator every [`RawBlock`](crate::RawBlock) draws from.
///
/// This is `malloc()` and `free()` on all platforms. Alignments above what
/// `malloc` guarantees go through `posix_memalign` on unix and
/// `_aligned_malloc`/`_aligned_free` on windows.
#[derive(Debug, Default, Clone, Copy)]
pub struct System;

impl System {
    #[inline]
    pub fn allocate(&self, layout: NonZeroLayout) -> Result<NonNull<u8>, AllocError> {
        let ptr = if layout.align() <= max_align() {
            unsafe { libc::malloc(layout.size()) }
        } else {
            unsafe { aligned_alloc(layout) }
        };

        NonNull::new(ptr.cast()).ok_or(AllocError::OutOfMemory {
            layout: layout.get(),
        })
    }

    /// # Safety
    ///
    /// `ptr` must have been returned by [`System::allocate`] with the same
    /// `layout`, and must not be used afterwards.
    #[inline]
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: NonZeroLayout) {
        if layout.align() <= max_align() {
            unsafe { libc::free(ptr.as_ptr().cast()) };
        } else {
            unsafe { aligned_free(ptr.as_ptr().cast()) };
        }
    }
}

cfg_if! {
    if #[cfg(windows)] {
        unsafe fn aligned_alloc(layout: NonZeroLayout) -> *mut c_void {
            unsafe { libc::aligned_malloc(layout.size(), layout.align()) }
        }

        unsafe fn aligned_free(ptr: *mut c_void) {
            unsafe { libc::aligned_free(ptr) }
        }
    } else {
        unsafe fn aligned_alloc(layout: NonZeroLayout) -> *mut c_void {
            let mut ptr = core::ptr::null_mut();
            let rc = unsafe { libc::posix_memalign(&mut ptr, layout.align(), layout.size()) };
            if rc != 0 {
                core::ptr::null_mut()
            } else {
                ptr
            }
        }

        unsafe fn aligned_free(ptr: *mut c_void) {
            unsafe { libc::free(ptr) }
        }
    }
}

const fn max_align() -> usize {
    cfg_if! {
        if #[cfg(windows)] {
            mem::align_of::<f64>()
        } else {
            mem::align_of::<libc::max_align_t>()
        }
    }
}
