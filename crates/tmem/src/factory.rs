//! Factory for independently configured arenas.
//!
//! An `ArenaFactory` bundles an [`ArenaConfig`] with a [`FormatConfig`] so
//! that separate subsystems can each create their own arenas and formatters
//! with their own capacity and guess settings. Two factories never share
//! state; each call to [`create_arena`](ArenaFactory::create_arena) returns a
//! fresh, unused arena.
//!
//! # Examples
//!
//! ```
//! use tmem::args;
//! use tmem::config::{ArenaConfig, FormatConfig, Guess};
//! use tmem::factory::ArenaFactory;
//!
//! let factory = ArenaFactory::new(
//!     ArenaConfig::new().with_default_capacity(4096),
//!     FormatConfig::new().with_guess(Guess::adaptive(16)),
//! );
//!
//! let mut arena = factory.create_arena();
//! let mut f = factory.formatter(&mut arena);
//! let s = f.format("%05.1f", &args![2.5]).unwrap();
//! assert_eq!(f.get(s), Some("002.5"));
//! assert_eq!(f.arena().capacity_bytes(), 4096);
//! ```
//!
//! # Thread-local Usage
//!
//! ```
//! use tmem::arena::Arena;
//! use tmem::factory::ArenaFactory;
//! use std::cell::RefCell;
//!
//! thread_local! {
//!     static SCRATCH: RefCell<Arena> = RefCell::new(ArenaFactory::default().create_arena());
//! }
//!
//! let used = SCRATCH.with(|arena| {
//!     let mut arena = arena.borrow_mut();
//!     let mut scope = arena.scope();
//!     scope.alloc_str("per-thread scratch").unwrap();
//!     scope.used_bytes()
//! });
//! assert!(used > 0);
//! ```

use crate::arena::Arena;
use crate::config::{ArenaConfig, FormatConfig};
use crate::format::Formatter;
use crate::provider::MemoryProvider;

/// Creates arenas and formatters sharing one configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ArenaFactory {
    arena: ArenaConfig,
    format: FormatConfig,
}

impl ArenaFactory {
    /// Creates a factory from explicit configurations.
    #[must_use]
    pub const fn new(arena: ArenaConfig, format: FormatConfig) -> Self {
        Self { arena, format }
    }

    /// Creates a factory whose arena settings come from the environment.
    ///
    /// See [`ArenaConfig::from_env`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(ArenaConfig::from_env(), FormatConfig::new())
    }

    /// Creates an unused arena backed by the global allocator.
    #[must_use]
    pub fn create_arena(&self) -> Arena {
        Arena::with_config(self.arena)
    }

    /// Creates an unused arena drawing its buffers from `provider`.
    pub fn create_arena_with<P: MemoryProvider>(&self, provider: P) -> Arena<P> {
        Arena::with_provider(self.arena, provider)
    }

    /// Binds a formatter with this factory's settings to `arena`.
    pub fn formatter<'a, P: MemoryProvider>(&self, arena: &'a mut Arena<P>) -> Formatter<'a, P> {
        Formatter::with_config(arena, self.format)
    }

    /// Arena settings.
    #[must_use]
    pub const fn arena_config(&self) -> &ArenaConfig {
        &self.arena
    }

    /// Formatter settings.
    #[must_use]
    pub const fn format_config(&self) -> &FormatConfig {
        &self.format
    }
}

impl From<ArenaConfig> for ArenaFactory {
    fn from(arena: ArenaConfig) -> Self {
        Self::new(arena, FormatConfig::new())
    }
}
