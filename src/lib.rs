//! A contiguous growable array built directly on raw storage.
//!
//! [`RawBlock`] owns an uninitialized region obtained from the [`System`]
//! allocator and knows nothing about the values stored in it. [`SlotVec`]
//! owns one block at a time, tracks which slots are live, and decides when
//! values are constructed, relocated, cloned and dropped. How values move to
//! a larger block is chosen per element type through a [`Relocate`] strategy.
#![cfg_attr(not(any(feature = "std", test)), no_std)]

extern crate alloc;

pub use slotvec_core::*;

pub use crate::{
    raw::RawBlock,
    relocate::{CloneRelocate, MoveRelocate, Relocate},
    system::System,
    vec::{SlotVec, GROWTH_FACTOR, MIN_NON_ZERO_CAP},
};

mod raw;
mod relocate;
mod system;
mod vec;
