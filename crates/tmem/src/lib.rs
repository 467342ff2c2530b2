//! `tmem`: temporary bump arena with in-arena printf formatting
//!
//! `tmem` provides scratch memory for short-lived data:
//!
//! - **Bump arena**: one growable buffer, allocations handed out by advancing
//!   a cursor, reclaimed wholesale by moving the cursor back
//! - **Capacity hysteresis**: `reserve` keeps the buffer when the requested
//!   size is close to what is already allocated
//! - **Speculative formatting**: printf-style strings rendered straight into
//!   the arena with a single pass in the common case
//! - **Transient printing**: `print`/`println` format through the arena and
//!   give the space back afterwards
//!
//! # Example
//!
//! ```rust
//! use tmem::{args, Arena, Formatter, Location};
//!
//! let mut arena = Arena::new();
//! let mut f = Formatter::new(&mut arena);
//!
//! let greeting = f.format("%s, %d%%", &args!["loaded", 87]).unwrap();
//! assert_eq!(f.get(greeting), Some("loaded, 87%"));
//!
//! f.arena_mut().restore_location(Location::ROOT).unwrap();
//! assert_eq!(f.arena().used_bytes(), 0);
//! ```
//!
//! # Logging
//!
//! Diagnostics go through `tmem-log` on stderr and are off below the `warn`
//! level. Set `TMEM_LOG=debug` and call [`tmem_log::init_from_env`] to see
//! buffer allocation and growth.

pub mod arena;
pub mod args;
pub mod config;
pub mod error;
pub mod factory;
pub mod format;
pub mod printf;
pub mod provider;
pub mod scope;

// Re-export commonly used types
pub use arena::{Allocation, Arena, ArenaStats, Location, TempStr};
pub use args::{Arg, ArgList};
pub use config::{ArenaConfig, FormatConfig, GrowthPolicy, Guess};
pub use error::{Error, FormatError, Result};
pub use factory::ArenaFactory;
pub use format::{FormatStats, Formatter};
pub use provider::{Block, MemoryProvider, SystemProvider, WORD_SIZE};
pub use scope::ArenaScope;
