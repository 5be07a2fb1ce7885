#![no_std]

#[cfg(feature = "std")]
extern crate std;

use core::{alloc::Layout, fmt, num::NonZeroUsize};

/// The error returned when raw storage for a block of slots cannot be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The requested number of slots does not fit in the address space.
    CapacityOverflow,
    /// The system allocator could not supply memory for `layout`.
    OutOfMemory { layout: Layout },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityOverflow => f.write_str("capacity overflow"),
            Self::OutOfMemory { layout } => write!(
                f,
                "out of memory: failed to allocate {} bytes aligned to {}",
                layout.size(),
                layout.align()
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AllocError {}

/// A [`Layout`] known to describe at least one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonZeroLayout {
    layout: Layout,
}

impl NonZeroLayout {
    pub fn new(layout: Layout) -> Option<Self> {
        if layout.size() == 0 {
            None
        } else {
            Some(Self { layout })
        }
    }

    /// The layout of `n` contiguous slots of `T`.
    ///
    /// Returns `Ok(None)` when the region would be empty, either because `n` is
    /// zero or because `T` is zero-sized.
    pub fn array<T>(n: usize) -> Result<Option<Self>, AllocError> {
        let layout = Layout::array::<T>(n).map_err(|_| AllocError::CapacityOverflow)?;
        Ok(Self::new(layout))
    }

    pub fn nonzero_size(&self) -> NonZeroUsize {
        let size = self.layout.size();
        unsafe { NonZeroUsize::new_unchecked(size) }
    }

    pub fn size(&self) -> usize {
        self.nonzero_size().get()
    }

    pub fn align(&self) -> usize {
        self.get().align()
    }

    pub fn get(&self) -> Layout {
        self.layout
    }
}
