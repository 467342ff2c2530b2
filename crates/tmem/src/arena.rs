//! Temporary bump arena.
//!
//! An [`Arena`] owns one contiguous buffer and a cursor into it. Allocations
//! are handed out by advancing the cursor by a whole number of words; there is
//! no per-allocation bookkeeping and nothing is freed individually. Memory is
//! reclaimed by moving the cursor back to a [`Location`] observed earlier, or
//! to [`Location::ROOT`] to discard everything.
//!
//! # Handles instead of pointers
//!
//! Allocations are returned as [`Allocation`] and [`TempStr`] handles holding
//! an offset and the arena *generation*. Reading through a handle goes back
//! through the arena, which refuses handles that were rewound past or that
//! belong to a buffer since reset by [`Arena::reserve`],
//! [`Arena::install_external_buffer`] or [`Arena::release`]. Automatic growth
//! copies the used prefix into the new buffer, so growth alone never
//! invalidates a handle.
//!
//! # Capacity policy
//!
//! [`Arena::reserve`] keeps the current buffer when the request lands in the
//! top quarter (by default) of the allocated size, and only reallocates
//! outside that window. A caller that resets the arena every cycle with a
//! slightly different size estimate therefore does not churn the allocator.
//!
//! # Examples
//!
//! ```
//! use tmem::arena::{Arena, Location};
//! use tmem::provider::WORD_SIZE;
//!
//! let mut arena = Arena::new();
//! arena.reserve(100).unwrap();
//!
//! let mark = arena.location();
//! let greeting = arena.alloc_str("hey").unwrap();
//! assert_eq!(arena.str(greeting), Some("hey"));
//! assert_eq!(arena.used_bytes(), WORD_SIZE);
//!
//! arena.restore_location(mark).unwrap();
//! assert_eq!(arena.used_bytes(), 0);
//! assert_eq!(arena.str(greeting), None);
//!
//! arena.restore_location(Location::ROOT).unwrap();
//! ```

use crate::config::{ArenaConfig, GrowthPolicy};
use crate::error::{Error, Result};
use crate::provider::{Block, MemoryProvider, SystemProvider, WORD_SIZE};
use crate::scope::ArenaScope;
use std::ffi::CStr;
use std::fmt;
use std::ptr::NonNull;
use tmem_log::{debug, trace, warn};

/// Rounds `bytes` up to a whole number of words.
///
/// Returns `None` on overflow.
///
/// ```
/// use tmem::arena::align_up;
/// use tmem::provider::WORD_SIZE;
///
/// assert_eq!(align_up(0), Some(0));
/// assert_eq!(align_up(1), Some(WORD_SIZE));
/// assert_eq!(align_up(WORD_SIZE), Some(WORD_SIZE));
/// assert_eq!(align_up(usize::MAX), None);
/// ```
#[must_use]
pub const fn align_up(bytes: usize) -> Option<usize> {
    bytes.checked_next_multiple_of(WORD_SIZE)
}

/// A cursor position, as returned by [`Arena::location`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Location(usize);

impl Location {
    /// The start of the buffer. Restoring to it discards every allocation
    /// but keeps the buffer.
    pub const ROOT: Location = Location(0);

    /// A location at `offset` bytes from the root.
    #[must_use]
    pub const fn new(offset: usize) -> Self {
        Self(offset)
    }

    /// Distance from the root in bytes.
    #[must_use]
    pub const fn offset(self) -> usize {
        self.0
    }
}

/// Handle to a run of bytes handed out by [`Arena::allocate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Allocation {
    offset: usize,
    len: usize,
    generation: u64,
}

impl Allocation {
    /// Offset of the first byte from the root.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Requested length in bytes (before word rounding).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true for a zero-byte allocation.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The cursor position this allocation started at.
    #[must_use]
    pub const fn location(&self) -> Location {
        Location(self.offset)
    }
}

/// Handle to a null-terminated string stored in an arena.
///
/// The terminator is stored right after the text and is not counted in
/// [`TempStr::len`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TempStr {
    offset: usize,
    len: usize,
    generation: u64,
}

impl TempStr {
    pub(crate) const fn new(offset: usize, len: usize, generation: u64) -> Self {
        Self { offset, len, generation }
    }

    /// Offset of the first byte from the root.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Length of the text in bytes, terminator excluded.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true for the empty string.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The cursor position this string started at.
    #[must_use]
    pub const fn location(&self) -> Location {
        Location(self.offset)
    }
}

/// Snapshot of an arena's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStats {
    /// Bytes between the root and the cursor.
    pub used: usize,
    /// Reported capacity (`0` while untracked).
    pub capacity: usize,
    /// Size the reuse decision is based on.
    pub true_capacity: usize,
    /// Furthest cursor position since the buffer was last reset or replaced.
    pub high_water: usize,
    /// Buffers obtained from the provider so far.
    pub reallocations: u64,
    /// Current handle generation.
    pub generation: u64,
}

enum Storage {
    Provided(Block),
    Adopted(Box<[u8]>),
}

impl Storage {
    fn len(&self) -> usize {
        match self {
            Storage::Provided(block) => block.len(),
            Storage::Adopted(buffer) => buffer.len(),
        }
    }

    fn as_slice(&self) -> &[u8] {
        match self {
            Storage::Provided(block) => block.as_slice(),
            Storage::Adopted(buffer) => &buffer[..],
        }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Storage::Provided(block) => block.as_mut_slice(),
            Storage::Adopted(buffer) => &mut buffer[..],
        }
    }

    fn base(&self) -> NonNull<u8> {
        match self {
            Storage::Provided(block) => block.as_ptr(),
            Storage::Adopted(buffer) => NonNull::from(&**buffer).cast(),
        }
    }
}

/// A single-buffer bump arena.
///
/// The arena starts without a buffer. The first [`allocate`](Arena::allocate)
/// (or an explicit [`reserve`](Arena::reserve)) creates one of
/// [`ArenaConfig::default_capacity`] bytes.
///
/// `Arena` is `Send` but not `Sync`: one thread at a time owns it.
pub struct Arena<P: MemoryProvider = SystemProvider> {
    storage: Option<Storage>,
    /// Next free byte, as an offset from the root.
    cursor: usize,
    /// Reported capacity; `0` means untracked.
    capacity: usize,
    /// Capacity the hysteresis window is measured against.
    true_capacity: usize,
    high_water: usize,
    generation: u64,
    reallocations: u64,
    config: ArenaConfig,
    provider: P,
}

impl Arena<SystemProvider> {
    /// Creates an unused arena with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ArenaConfig::new())
    }

    /// Creates an unused arena with `config`.
    #[must_use]
    pub fn with_config(config: ArenaConfig) -> Self {
        Self::with_provider(config, SystemProvider)
    }
}

impl Default for Arena<SystemProvider> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: MemoryProvider> Arena<P> {
    /// Creates an unused arena drawing its buffers from `provider`.
    pub fn with_provider(config: ArenaConfig, provider: P) -> Self {
        Self {
            storage: None,
            cursor: 0,
            capacity: 0,
            true_capacity: 0,
            high_water: 0,
            generation: 0,
            reallocations: 0,
            config,
            provider,
        }
    }

    /// Allocates `size` bytes and advances the cursor by `size` rounded up to
    /// a whole number of words.
    ///
    /// An unused arena first reserves its default capacity. If the cursor
    /// would pass the end of the buffer, the configured [`GrowthPolicy`]
    /// decides between growing and failing.
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfArenaSpace`] under [`GrowthPolicy::Fixed`], or if the
    ///   size overflows the address space.
    /// - [`Error::AllocationFailed`] if lazy initialisation or growth fails.
    ///
    /// The arena is unchanged when an error is returned.
    pub fn allocate(&mut self, size: usize) -> Result<Allocation> {
        if self.storage.is_none() {
            debug!(
                "first use: reserving {} bytes",
                self.config.default_capacity()
            );
            self.reserve(self.config.default_capacity())?;
        }

        let overflow = Error::OutOfArenaSpace {
            requested: size,
            available: self.remaining_bytes(),
        };
        let start = self.cursor;
        let end = align_up(size)
            .and_then(|aligned| start.checked_add(aligned))
            .ok_or(overflow)?;

        if end > self.bound() {
            self.make_room(size, end)?;
        }

        self.cursor = end;
        self.high_water = self.high_water.max(end);

        Ok(Allocation {
            offset: start,
            len: size,
            generation: self.generation,
        })
    }

    /// Allocates `size` bytes and returns them for writing.
    ///
    /// The bytes hold whatever the buffer last contained (zero for a fresh
    /// buffer).
    ///
    /// # Errors
    ///
    /// As for [`allocate`](Arena::allocate).
    pub fn alloc_bytes(&mut self, size: usize) -> Result<&mut [u8]> {
        let allocation = self.allocate(size)?;
        Ok(self.region_mut(allocation.offset, size))
    }

    /// Copies `s` into the arena followed by a NUL byte.
    ///
    /// # Errors
    ///
    /// As for [`allocate`](Arena::allocate).
    pub fn alloc_str(&mut self, s: &str) -> Result<TempStr> {
        let len = s.len();
        let allocation = self.allocate(len + 1)?;

        let region = self.region_mut(allocation.offset, len + 1);
        region[..len].copy_from_slice(s.as_bytes());
        region[len] = 0;

        Ok(TempStr::new(allocation.offset, len, allocation.generation))
    }

    /// Base address of the buffer, or `None` if the arena has no buffer.
    ///
    /// The address changes whenever the buffer is replaced or grown.
    #[must_use]
    pub fn root(&self) -> Option<NonNull<u8>> {
        self.storage.as_ref().map(Storage::base)
    }

    /// Everything between the root and the cursor, as one blob.
    #[must_use]
    pub fn contents(&self) -> &[u8] {
        self.storage
            .as_ref()
            .map_or(&[][..], |storage| &storage.as_slice()[..self.cursor])
    }

    /// The current cursor position.
    #[must_use]
    pub fn location(&self) -> Location {
        Location(self.cursor)
    }

    /// Moves the cursor to `location`.
    ///
    /// Every allocation made after `location` was observed becomes invalid.
    /// [`Location::ROOT`] is always accepted, even on an unused arena.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRestoreLocation`] if `location` lies past the end of
    /// the buffer, is not a whole number of words from the root, or if the
    /// arena has no buffer and `location` is not the root.
    pub fn restore_location(&mut self, location: Location) -> Result<()> {
        if location == Location::ROOT {
            trace!("cursor {} -> root", self.cursor);
            self.cursor = 0;
            return Ok(());
        }

        let bound = self.bound();
        if self.storage.is_none() || location.0 > bound || location.0 % WORD_SIZE != 0 {
            warn!(
                "rejecting restore to {} (buffer ends at {bound})",
                location.0
            );
            return Err(Error::InvalidRestoreLocation {
                offset: location.0,
                bound,
            });
        }

        trace!("cursor {} -> {} (bound {bound})", self.cursor, location.0);
        self.cursor = location.0;
        self.high_water = self.high_water.max(location.0);
        Ok(())
    }

    /// Bytes between the root and the cursor.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.cursor
    }

    /// Reported capacity in bytes; `0` while an adopted buffer is untracked.
    #[must_use]
    pub fn capacity_bytes(&self) -> usize {
        self.capacity
    }

    /// Bytes that can be allocated before the arena has to grow.
    #[must_use]
    pub fn remaining_bytes(&self) -> usize {
        self.bound().saturating_sub(self.cursor)
    }

    /// Returns true once the arena holds a buffer.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.storage.is_some()
    }

    /// Sets the capacity, reusing the current buffer when possible.
    ///
    /// - `0` does nothing.
    /// - With an untracked adopted buffer, `requested` becomes the tracked
    ///   capacity and nothing is reallocated.
    /// - If `hysteresis * true_capacity < requested <= true_capacity`, the
    ///   buffer is kept, the reported capacity becomes `requested` and the
    ///   cursor returns to the root.
    /// - Otherwise a new buffer of `requested` bytes rounded up to a whole
    ///   number of words replaces the old one and the cursor returns to the
    ///   root.
    ///
    /// Every outstanding handle is invalidated unless the call was a no-op
    /// or only started tracking an adopted buffer.
    ///
    /// # Errors
    ///
    /// - [`Error::AllocationFailed`] if a new buffer cannot be obtained. The
    ///   old buffer, cursor and handles stay valid.
    /// - [`Error::ExternalBufferTooSmall`] if an untracked adopted buffer is
    ///   shorter than `requested`.
    pub fn reserve(&mut self, requested: usize) -> Result<()> {
        if requested == 0 {
            debug!("reserve(0): nothing to do");
            return Ok(());
        }

        let reuse = match &self.storage {
            Some(storage) if self.capacity == 0 => {
                if requested > storage.len() {
                    return Err(Error::ExternalBufferTooSmall {
                        requested,
                        len: storage.len(),
                    });
                }
                debug!("tracking adopted buffer as {requested} bytes");
                self.capacity = requested;
                self.true_capacity = requested;
                return Ok(());
            }
            Some(_) => {
                requested <= self.true_capacity
                    && requested as f64
                        > self.true_capacity as f64 * self.config.hysteresis()
            }
            None => false,
        };

        if reuse {
            debug!(
                "reserve({requested}): keeping {} byte buffer",
                self.true_capacity
            );
            self.capacity = requested;
        } else {
            let size = align_up(requested)
                .ok_or(Error::AllocationFailed { size: requested })?;
            debug!("reserve({requested}): allocating {size} byte buffer");

            let block = self.provider.allocate(size)?;
            if let Some(old) = self.storage.replace(Storage::Provided(block)) {
                self.dispose(old);
            }
            self.capacity = size;
            self.true_capacity = size;
            self.reallocations += 1;
        }

        self.reset_cursor();
        Ok(())
    }

    /// Replaces the buffer with `buffer`, which the arena now owns.
    ///
    /// The current buffer is released first. The adopted buffer starts out
    /// untracked and then receives `reserve(capacity)` bookkeeping, so a
    /// `capacity` of zero leaves it untracked (usable up to its full length,
    /// reported as capacity `0`).
    ///
    /// Offsets are aligned relative to the root; the root itself is only as
    /// aligned as `buffer`.
    ///
    /// # Errors
    ///
    /// [`Error::ExternalBufferTooSmall`] if `capacity` exceeds the buffer's
    /// length. Nothing changes in that case.
    pub fn install_external_buffer(
        &mut self,
        buffer: impl Into<Box<[u8]>>,
        capacity: usize,
    ) -> Result<()> {
        let buffer = buffer.into();
        if capacity > buffer.len() {
            return Err(Error::ExternalBufferTooSmall {
                requested: capacity,
                len: buffer.len(),
            });
        }

        debug!(
            "adopting external buffer of {} bytes at {:p}",
            buffer.len(),
            buffer.as_ptr()
        );
        self.release();
        self.storage = Some(Storage::Adopted(buffer));
        self.reserve(capacity)
    }

    /// Frees the buffer and returns to the unused state.
    ///
    /// The next allocation starts from a fresh default-capacity buffer.
    pub fn release(&mut self) {
        if let Some(storage) = self.storage.take() {
            debug!("releasing {} byte buffer", storage.len());
            self.dispose(storage);
        }
        self.capacity = 0;
        self.true_capacity = 0;
        self.reset_cursor();
    }

    /// Reads the bytes behind `allocation`, or `None` if the handle is stale.
    #[must_use]
    pub fn bytes(&self, allocation: Allocation) -> Option<&[u8]> {
        self.span(allocation.offset, allocation.len, allocation.generation)
    }

    /// Mutable access to the bytes behind `allocation`, or `None` if the
    /// handle is stale.
    #[must_use]
    pub fn bytes_mut(&mut self, allocation: Allocation) -> Option<&mut [u8]> {
        if !self.is_live(allocation.offset, allocation.len, allocation.generation) {
            return None;
        }
        let end = allocation.offset + allocation.len;
        self.storage
            .as_mut()?
            .as_mut_slice()
            .get_mut(allocation.offset..end)
    }

    /// Reads a stored string, or `None` if the handle is stale.
    #[must_use]
    pub fn str(&self, s: TempStr) -> Option<&str> {
        let with_nul = self.span(s.offset, s.len + 1, s.generation)?;
        std::str::from_utf8(&with_nul[..s.len]).ok()
    }

    /// Reads a stored string with its terminator.
    ///
    /// Returns `None` for stale handles and for strings containing an
    /// interior NUL.
    #[must_use]
    pub fn c_str(&self, s: TempStr) -> Option<&CStr> {
        let with_nul = self.span(s.offset, s.len + 1, s.generation)?;
        CStr::from_bytes_with_nul(with_nul).ok()
    }

    /// Returns a guard that restores the current location when dropped.
    ///
    /// ```
    /// use tmem::arena::Arena;
    ///
    /// let mut arena = Arena::new();
    /// arena.allocate(8).unwrap();
    /// let before = arena.location();
    /// {
    ///     let mut scratch = arena.scope();
    ///     scratch.allocate(500).unwrap();
    /// }
    /// assert_eq!(arena.location(), before);
    /// ```
    pub fn scope(&mut self) -> ArenaScope<'_, P> {
        ArenaScope::new(self)
    }

    /// Current bookkeeping.
    #[must_use]
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            used: self.cursor,
            capacity: self.capacity,
            true_capacity: self.true_capacity,
            high_water: self.high_water,
            reallocations: self.reallocations,
            generation: self.generation,
        }
    }

    /// The configuration this arena was built with.
    #[must_use]
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// The memory provider.
    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Mutable view of `len` bytes at `offset`. Callers only pass ranges
    /// they just allocated.
    pub(crate) fn region_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        match self.storage.as_mut() {
            Some(storage) => &mut storage.as_mut_slice()[offset..offset + len],
            None => &mut [],
        }
    }

    fn is_live(&self, offset: usize, len: usize, generation: u64) -> bool {
        generation == self.generation
            && offset.checked_add(len).is_some_and(|end| end <= self.cursor)
    }

    fn span(&self, offset: usize, len: usize, generation: u64) -> Option<&[u8]> {
        if !self.is_live(offset, len, generation) {
            return None;
        }
        self.storage.as_ref()?.as_slice().get(offset..offset + len)
    }

    /// Upper limit for the cursor.
    fn bound(&self) -> usize {
        match &self.storage {
            None => 0,
            Some(storage) if self.capacity == 0 => storage.len(),
            Some(_) => self.capacity,
        }
    }

    fn reset_cursor(&mut self) {
        self.cursor = 0;
        self.high_water = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    fn dispose(&mut self, storage: Storage) {
        match storage {
            Storage::Provided(block) => self.provider.release(block),
            Storage::Adopted(buffer) => drop(buffer),
        }
    }

    #[cold]
    fn make_room(&mut self, size: usize, end: usize) -> Result<()> {
        let available = self.remaining_bytes();

        if self.config.growth() == GrowthPolicy::Fixed {
            warn!(
                "allocation of {size} bytes overruns the arena ({available} bytes left)"
            );
            #[cfg(feature = "overflow-backtrace")]
            warn!("overrun at:\n{:?}", backtrace::Backtrace::new());
            return Err(Error::OutOfArenaSpace {
                requested: size,
                available,
            });
        }

        // A shrunken reported capacity can be widened for free.
        if self.capacity != 0 && end <= self.true_capacity {
            trace!(
                "widening capacity {} -> {}",
                self.capacity,
                self.true_capacity
            );
            self.capacity = self.true_capacity;
            return Ok(());
        }

        let minimum = align_up(end).ok_or(Error::OutOfArenaSpace {
            requested: size,
            available,
        })?;
        let current = self.storage.as_ref().map_or(0, Storage::len);
        let doubled = align_up(current.saturating_mul(2)).unwrap_or(minimum);

        if doubled > minimum && self.grow_to(doubled).is_ok() {
            return Ok(());
        }
        self.grow_to(minimum)
    }

    /// Moves the used prefix into a new buffer of `len` bytes.
    fn grow_to(&mut self, len: usize) -> Result<()> {
        debug!(
            "growing arena {} -> {len} bytes ({} in use)",
            self.storage.as_ref().map_or(0, Storage::len),
            self.cursor
        );

        let mut block = self.provider.allocate(len)?;
        if let Some(old) = self.storage.take() {
            let keep = self.cursor.min(old.len());
            block.as_mut_slice()[..keep].copy_from_slice(&old.as_slice()[..keep]);
            self.dispose(old);
        }

        self.storage = Some(Storage::Provided(block));
        self.capacity = len;
        self.true_capacity = len;
        self.reallocations += 1;
        Ok(())
    }
}

impl<P: MemoryProvider> Drop for Arena<P> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<P: MemoryProvider> fmt::Debug for Arena<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("root", &self.root())
            .field("stats", &self.stats())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
