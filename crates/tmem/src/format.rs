//! printf-style formatting into an arena.
//!
//! A [`Formatter`] renders into a buffer of guessed length allocated straight
//! from its arena. The bounded renderer reports the real length, and the
//! allocation is then fixed up:
//!
//! - exact guess: nothing to do;
//! - too long: the cursor moves back so that only `len + 1` bytes stay used;
//! - too short: the allocation is extended in place and the text rendered a
//!   second time.
//!
//! The common case therefore costs one pass and no separate measuring step.
//!
//! # Examples
//!
//! ```
//! use tmem::args;
//! use tmem::arena::Arena;
//! use tmem::format::Formatter;
//!
//! let mut arena = Arena::new();
//! let mut f = Formatter::new(&mut arena);
//!
//! let s = f.format("%s has %d entries", &args!["table", 3]).unwrap();
//! assert_eq!(f.get(s), Some("table has 3 entries"));
//! ```

use crate::args::{Arg, ArgList};
use crate::arena::{align_up, Arena, TempStr};
use crate::config::{FormatConfig, GrowthPolicy, Guess};
use crate::error::{Error, Result};
use crate::printf;
use crate::provider::{MemoryProvider, SystemProvider, WORD_SIZE};
use std::cmp::Ordering;
use std::io::{self, Write};
use tmem_log::trace;

/// How the speculative passes have turned out so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatStats {
    /// Formatting calls, including failed ones.
    pub calls: u64,
    /// Calls whose output length matched the guess.
    pub exact: u64,
    /// Calls whose guess was too long.
    pub shrunk: u64,
    /// Calls that needed a second rendering pass.
    pub reformatted: u64,
}

/// Formats strings into a borrowed arena.
pub struct Formatter<'a, P: MemoryProvider = SystemProvider> {
    arena: &'a mut Arena<P>,
    config: FormatConfig,
    /// Running length prediction for [`Guess::Adaptive`].
    prediction: f64,
    stats: FormatStats,
}

impl<'a, P: MemoryProvider> Formatter<'a, P> {
    /// Binds a formatter with the default configuration to `arena`.
    pub fn new(arena: &'a mut Arena<P>) -> Self {
        Self::with_config(arena, FormatConfig::new())
    }

    /// Binds a formatter with `config` to `arena`.
    pub fn with_config(arena: &'a mut Arena<P>, config: FormatConfig) -> Self {
        Self {
            arena,
            prediction: config.guess().initial_len() as f64,
            config,
            stats: FormatStats::default(),
        }
    }

    /// Renders `fmt` with `args` into the arena.
    ///
    /// The result occupies `len + 1` bytes rounded up to a whole number of
    /// words, terminator included.
    ///
    /// # Errors
    ///
    /// Format errors from the renderer and allocation errors from the arena.
    /// The arena location is unchanged after an error.
    pub fn format(&mut self, fmt: &str, args: &[Arg<'_>]) -> Result<TempStr> {
        self.format_va(fmt, &mut ArgList::new(args))
    }

    /// Like [`format`](Formatter::format), but continues an argument list the
    /// caller has already started.
    ///
    /// ```
    /// use tmem::args;
    /// use tmem::args::ArgList;
    /// use tmem::arena::Arena;
    /// use tmem::format::Formatter;
    ///
    /// let mut arena = Arena::new();
    /// let mut f = Formatter::new(&mut arena);
    ///
    /// let values = args!["skipped", 10, 20];
    /// let mut list = ArgList::new(&values);
    /// list.next_arg();
    ///
    /// let s = f.format_va("%d..%d", &mut list).unwrap();
    /// assert_eq!(f.get(s), Some("10..20"));
    /// ```
    ///
    /// # Errors
    ///
    /// As for [`format`](Formatter::format).
    pub fn format_va(&mut self, fmt: &str, args: &mut ArgList<'_>) -> Result<TempStr> {
        let mark = self.arena.location();
        self.stats.calls += 1;

        let result = self.speculate(fmt, args);
        if result.is_err() {
            let _quiet = tmem_log::quiet();
            self.arena.restore_location(mark)?;
        }
        result
    }

    /// Formats to standard output and discards the text from the arena.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// As for [`format`](Formatter::format), plus [`Error::Io`].
    pub fn print(&mut self, fmt: &str, args: &[Arg<'_>]) -> Result<usize> {
        self.print_to(&mut io::stdout().lock(), fmt, args)
    }

    /// [`print`](Formatter::print) followed by a newline.
    ///
    /// # Errors
    ///
    /// As for [`print`](Formatter::print).
    pub fn println(&mut self, fmt: &str, args: &[Arg<'_>]) -> Result<usize> {
        self.println_to(&mut io::stdout().lock(), fmt, args)
    }

    /// Formats to `out` and discards the text from the arena.
    ///
    /// # Errors
    ///
    /// As for [`print`](Formatter::print).
    pub fn print_to<W: Write + ?Sized>(
        &mut self,
        out: &mut W,
        fmt: &str,
        args: &[Arg<'_>],
    ) -> Result<usize> {
        self.emit(out, fmt, args, false)
    }

    /// [`print_to`](Formatter::print_to) followed by a newline.
    ///
    /// ```
    /// use tmem::args;
    /// use tmem::arena::Arena;
    /// use tmem::format::Formatter;
    ///
    /// let mut arena = Arena::new();
    /// let mut f = Formatter::new(&mut arena);
    ///
    /// let mut out = Vec::new();
    /// f.println_to(&mut out, "%d", &args![42]).unwrap();
    /// assert_eq!(out, b"42\n");
    /// assert_eq!(f.arena().used_bytes(), 0);
    /// ```
    ///
    /// # Errors
    ///
    /// As for [`print`](Formatter::print).
    pub fn println_to<W: Write + ?Sized>(
        &mut self,
        out: &mut W,
        fmt: &str,
        args: &[Arg<'_>],
    ) -> Result<usize> {
        self.emit(out, fmt, args, true)
    }

    /// Resolves a formatted string, or `None` if it is no longer valid.
    #[must_use]
    pub fn get(&self, s: TempStr) -> Option<&str> {
        self.arena.str(s)
    }

    /// The arena being formatted into.
    #[must_use]
    pub fn arena(&self) -> &Arena<P> {
        self.arena
    }

    /// Mutable access to the arena, e.g. to restore a location.
    pub fn arena_mut(&mut self) -> &mut Arena<P> {
        self.arena
    }

    /// Length of the speculative buffer the next call will try.
    #[must_use]
    pub fn guess_len(&self) -> usize {
        match self.config.guess() {
            Guess::Fixed(_) => self.config.guess().initial_len(),
            Guess::Adaptive { .. } => (self.prediction.round() as usize).max(1),
        }
    }

    /// Outcome counters.
    #[must_use]
    pub fn stats(&self) -> FormatStats {
        self.stats
    }

    /// The configuration this formatter was built with.
    #[must_use]
    pub fn config(&self) -> &FormatConfig {
        &self.config
    }

    /// Size of the first speculative buffer, terminator included.
    ///
    /// A fixed arena cannot grow to fit a guess the text may not need, so
    /// there the guess is capped to the whole words still free.
    fn first_pass_len(&self) -> usize {
        let wanted = self.guess_len().saturating_add(1);
        if !self.arena.is_initialized()
            || !matches!(self.arena.config().growth(), GrowthPolicy::Fixed)
        {
            return wanted;
        }
        let free = self.arena.remaining_bytes() / WORD_SIZE * WORD_SIZE;
        wanted.min(free).max(1)
    }

    fn speculate(&mut self, fmt: &str, args: &mut ArgList<'_>) -> Result<TempStr> {
        let guess = self.first_pass_len() - 1;
        let first = self.arena.allocate(guess.saturating_add(1))?;
        let offset = first.offset();
        let mut retry = *args;

        let len = printf::render(self.arena.region_mut(offset, guess + 1), fmt, args)?;
        self.observe(len);

        match len.cmp(&guess) {
            Ordering::Equal => {
                self.stats.exact += 1;
            }
            Ordering::Less => {
                trace!("guess {guess} > {len}: shrinking");
                self.stats.shrunk += 1;
                let _quiet = tmem_log::quiet();
                self.arena.restore_location(first.location())?;
                self.arena.allocate(len + 1)?;
            }
            Ordering::Greater => {
                trace!("guess {guess} < {len}: extending and rendering again");
                self.stats.reformatted += 1;
                let spent = align_up(guess + 1);
                let needed = align_up(len.saturating_add(1));
                let (Some(spent), Some(needed)) = (spent, needed) else {
                    return Err(Error::OutOfArenaSpace {
                        requested: len,
                        available: self.arena.remaining_bytes(),
                    });
                };
                self.arena.allocate(needed - spent)?;
                printf::render(self.arena.region_mut(offset, len + 1), fmt, &mut retry)?;
                *args = retry;
            }
        }

        Ok(TempStr::new(offset, len, self.arena.generation()))
    }

    fn observe(&mut self, len: usize) {
        if let Guess::Adaptive { weight, .. } = self.config.guess() {
            let next = weight * len as f64 + (1.0 - weight) * self.prediction;
            self.prediction = next.max(1.0);
        }
    }

    fn emit<W: Write + ?Sized>(
        &mut self,
        out: &mut W,
        fmt: &str,
        args: &[Arg<'_>],
        newline: bool,
    ) -> Result<usize> {
        let mark = self.arena.location();
        let written = self.write_text(out, fmt, args, newline);
        let _quiet = tmem_log::quiet();
        self.arena.restore_location(mark)?;
        written
    }

    fn write_text<W: Write + ?Sized>(
        &mut self,
        out: &mut W,
        fmt: &str,
        args: &[Arg<'_>],
        newline: bool,
    ) -> Result<usize> {
        let text = self.format(fmt, args)?;
        let bytes = self.arena.str(text).map(str::as_bytes).unwrap_or_default();
        out.write_all(bytes)?;
        if newline {
            out.write_all(b"\n")?;
        }
        Ok(bytes.len() + usize::from(newline))
    }
}
