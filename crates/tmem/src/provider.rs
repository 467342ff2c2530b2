//! The dynamic-memory capability the arena draws its buffers from.
//!
//! An arena never calls the global allocator directly. It asks a
//! [`MemoryProvider`] for a [`Block`] when it needs a buffer and hands the
//! block back when it is done with it. [`SystemProvider`] is the default and
//! goes through `std::alloc`; other providers can cap memory, count calls or
//! inject failures.

use crate::error::{Error, Result};
use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Alignment of every block: the native pointer width.
pub const WORD_SIZE: usize = std::mem::size_of::<usize>();

/// A zero-initialised, word-aligned region obtained from a provider.
///
/// A block does not free itself. It must be returned to the provider that
/// produced it through [`MemoryProvider::release`].
#[derive(Debug)]
pub struct Block {
    ptr: NonNull<u8>,
    len: usize,
}

impl Block {
    /// Wraps a region produced by a custom provider.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `len` initialised bytes,
    /// aligned to [`WORD_SIZE`], and exclusively owned by the block until it
    /// is released.
    #[must_use]
    pub const unsafe fn from_raw_parts(ptr: NonNull<u8>, len: usize) -> Self {
        Self { ptr, len }
    }

    /// Base address of the region.
    #[must_use]
    pub const fn as_ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Length of the region in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true for a zero-length block.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Views the block as bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the constructor contract guarantees `len` initialised,
        // exclusively owned bytes at `ptr`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Views the block as mutable bytes.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as for `as_slice`; `&mut self` makes the access unique.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

// SAFETY: a block is the sole owner of its region, so moving it to another
// thread moves that ownership with it.
unsafe impl Send for Block {}

/// Source of arena buffers.
///
/// Implementations must report failure through `Err` rather than aborting,
/// so that the arena can leave its current buffer untouched.
pub trait MemoryProvider {
    /// Returns a zero-initialised block of exactly `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailed`] if the memory cannot be supplied.
    fn allocate(&mut self, size: usize) -> Result<Block>;

    /// Takes back a block previously returned by `allocate` on this provider.
    fn release(&mut self, block: Block);
}

/// Provider backed by the global allocator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProvider;

impl SystemProvider {
    fn layout(size: usize) -> Result<Layout> {
        Layout::from_size_align(size.max(1), WORD_SIZE)
            .map_err(|_| Error::AllocationFailed { size })
    }
}

impl MemoryProvider for SystemProvider {
    fn allocate(&mut self, size: usize) -> Result<Block> {
        let layout = Self::layout(size)?;

        // SAFETY: the layout has non-zero size.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or(Error::AllocationFailed { size })?;

        Ok(Block { ptr, len: size })
    }

    fn release(&mut self, block: Block) {
        // `allocate` already validated this layout for the same length.
        let Ok(layout) = Self::layout(block.len) else {
            return;
        };

        // SAFETY: the block was produced by `allocate` with this layout and
        // ownership is surrendered here.
        unsafe {
            alloc::dealloc(block.ptr.as_ptr(), layout);
        }
    }
}
