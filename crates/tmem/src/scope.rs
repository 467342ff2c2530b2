//! Scoped scratch space.
//!
//! [`ArenaScope`] remembers the cursor when it is created and puts it back
//! when it goes out of scope, so code can use the arena as scratch space
//! without each caller pairing `location` with `restore_location` by hand.

use crate::arena::{Arena, Location};
use crate::provider::MemoryProvider;
use std::ops::{Deref, DerefMut};
use tmem_log::{trace, warn};

/// Guard returned by [`Arena::scope`].
///
/// Dereferences to the arena. On drop the cursor returns to where it was when
/// the guard was created. If the buffer was reset or replaced inside the
/// scope (by `reserve`, `install_external_buffer` or `release`) a mark past
/// the root no longer means anything and the cursor is left alone. A root
/// mark is always restored, so a scope on an unused arena discards what the
/// lazily created buffer received.
pub struct ArenaScope<'a, P: MemoryProvider> {
    arena: &'a mut Arena<P>,
    mark: Location,
    generation: u64,
    restore: bool,
}

impl<'a, P: MemoryProvider> ArenaScope<'a, P> {
    pub(crate) fn new(arena: &'a mut Arena<P>) -> Self {
        Self {
            mark: arena.location(),
            generation: arena.generation(),
            restore: true,
            arena,
        }
    }

    /// The location that will be restored.
    #[must_use]
    pub fn mark(&self) -> Location {
        self.mark
    }

    /// Ends the scope but keeps everything allocated inside it.
    pub fn keep(mut self) {
        self.restore = false;
    }
}

impl<P: MemoryProvider> Deref for ArenaScope<'_, P> {
    type Target = Arena<P>;

    fn deref(&self) -> &Self::Target {
        &*self.arena
    }
}

impl<P: MemoryProvider> DerefMut for ArenaScope<'_, P> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.arena
    }
}

impl<P: MemoryProvider> Drop for ArenaScope<'_, P> {
    fn drop(&mut self) {
        if !self.restore {
            return;
        }
        if self.mark != Location::ROOT && self.arena.generation() != self.generation {
            trace!("scope ended after buffer reset; cursor left alone");
            return;
        }
        if let Err(err) = self.arena.restore_location(self.mark) {
            warn!("scope could not restore {:?}: {err}", self.mark);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::arena::Arena;

    #[test]
    fn test_scope_restores_location() {
        let mut arena = Arena::new();
        let kept = arena.alloc_str("kept").unwrap();
        let before = arena.location();

        {
            let mut scope = arena.scope();
            assert_eq!(scope.mark(), before);
            scope.allocate(256).unwrap();
            scope.alloc_str("scratch").unwrap();
        }

        assert_eq!(arena.location(), before);
        assert_eq!(arena.str(kept), Some("kept"));
    }

    #[test]
    fn test_nested_scopes() {
        let mut arena = Arena::new();
        arena.reserve(1024).unwrap();
        let outer_mark = arena.location();
        {
            let mut outer = arena.scope();
            outer.allocate(16).unwrap();
            let inner_mark = outer.location();
            {
                let mut inner = outer.scope();
                inner.allocate(64).unwrap();
            }
            assert_eq!(outer.location(), inner_mark);
        }
        assert_eq!(arena.location(), outer_mark);
    }

    #[test]
    fn test_scope_on_unused_arena_restores_root() {
        let mut arena = Arena::new();
        let before = arena.location();
        {
            let mut scope = arena.scope();
            scope.allocate(500).unwrap();
        }
        assert!(arena.is_initialized());
        assert_eq!(arena.location(), before);
        assert_eq!(arena.used_bytes(), 0);
    }

    #[test]
    fn test_root_scope_restores_after_release() {
        let mut arena = Arena::new();
        arena.reserve(64).unwrap();
        {
            let mut scope = arena.scope();
            scope.allocate(32).unwrap();
            scope.release();
            scope.allocate(16).unwrap();
        }
        assert_eq!(arena.used_bytes(), 0);
    }

    #[test]
    fn test_keep_retains_allocations() {
        let mut arena = Arena::new();
        let s = {
            let mut scope = arena.scope();
            let s = scope.alloc_str("stays").unwrap();
            scope.keep();
            s
        };
        assert_eq!(arena.str(s), Some("stays"));
    }

    #[test]
    fn test_scope_skips_restore_after_reset() {
        let mut arena = Arena::new();
        arena.allocate(64).unwrap();
        {
            let mut scope = arena.scope();
            scope.reserve(10_000).unwrap();
            scope.allocate(8).unwrap();
        }
        assert_eq!(arena.used_bytes(), 8);
    }
}
