//! Diagnostic logging for the `tmem` arena.
//!
//! The arena reports buffer allocations, growth, overruns and cursor moves
//! through this crate. Everything goes to stderr so that it never interleaves
//! with text the formatter prints to stdout.
//!
//! Diagnostics are off by default (the threshold is [`Level::Warn`]). Turn
//! them on programmatically or through the `TMEM_LOG` environment variable.
//!
//! # Example
//!
//! ```
//! use tmem_log::{debug, trace, warn, Level};
//!
//! tmem_log::set_level(Level::Debug);
//!
//! let capacity = 10_000;
//! debug!("allocated buffer of {} bytes", capacity);
//! trace!("cursor moved to {}", 24);
//! warn!("allocation of {} bytes would overrun the arena", 512);
//! ```

use std::cell::Cell;
use std::fmt::{self, Arguments};
use std::io::Write;
use std::str::FromStr;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

/// Environment variable consulted by [`init_from_env`].
pub const ENV_VAR: &str = "TMEM_LOG";

/// Severity of a diagnostic message.
///
/// Ordered from most severe (`Error`) to most verbose (`Trace`). `Off` sits
/// below everything and disables output entirely when used as the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Nothing is logged.
    Off = 0,
    /// Failures surfaced to the caller.
    Error = 1,
    /// Rejected operations and suspicious usage.
    Warn = 2,
    /// Lifecycle events.
    Info = 3,
    /// Buffer allocation, growth and release.
    Debug = 4,
    /// Cursor movement.
    Trace = 5,
}

impl Level {
    const fn color_code(self) -> &'static str {
        match self {
            Level::Off => "",
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[36m",
            Level::Trace => "\x1b[35m",
        }
    }

    /// Returns the upper-case name of this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Off => "OFF",
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Off,
            1 => Level::Error,
            2 => Level::Warn,
            3 => Level::Info,
            4 => Level::Debug,
            _ => Level::Trace,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a [`Level`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError(String);

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid log level: {:?}", self.0)
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Parses a level name, ignoring case.
    ///
    /// ```
    /// use tmem_log::Level;
    ///
    /// assert_eq!("debug".parse(), Ok(Level::Debug));
    /// assert_eq!("OFF".parse(), Ok(Level::Off));
    /// assert!("loud".parse::<Level>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OFF" | "NONE" => Ok(Level::Off),
            "ERROR" => Ok(Level::Error),
            "WARN" | "WARNING" => Ok(Level::Warn),
            "INFO" => Ok(Level::Info),
            "DEBUG" => Ok(Level::Debug),
            "TRACE" => Ok(Level::Trace),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Process-wide threshold holder.
///
/// Used as a singleton through [`get_logger`]. The threshold is atomic so any
/// thread may change it, but each arena is single-threaded and only its own
/// thread's [`quiet`] guards affect what it emits.
pub struct Logger {
    level: AtomicU8,
}

impl Logger {
    const fn new(level: Level) -> Self {
        Logger {
            level: AtomicU8::new(level as u8),
        }
    }

    /// Sets the threshold. Messages more verbose than `level` are dropped.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::SeqCst);
    }

    /// Returns the current threshold.
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Returns true if a message at `level` would be written right now on
    /// this thread.
    pub fn enabled(&self, level: Level) -> bool {
        level != Level::Off
            && level as u8 <= self.level.load(Ordering::Relaxed)
            && QUIET_DEPTH.with(Cell::get) == 0
    }
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

thread_local! {
    static QUIET_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Returns the global logger, initialising it at [`Level::Warn`].
pub fn get_logger() -> &'static Logger {
    LOGGER.get_or_init(|| Logger::new(Level::Warn))
}

/// Sets the global threshold.
pub fn set_level(level: Level) {
    get_logger().set_level(level);
}

/// Sets the global threshold from a level name.
///
/// ```
/// tmem_log::set_level_from_str("trace").unwrap();
/// assert_eq!(tmem_log::get_logger().level(), tmem_log::Level::Trace);
/// ```
pub fn set_level_from_str(s: &str) -> Result<(), ParseLevelError> {
    set_level(s.parse()?);
    Ok(())
}

/// Reads [`ENV_VAR`] and applies it as the threshold.
///
/// Returns the level that was applied, or `None` if the variable is unset or
/// does not name a level (the threshold is left unchanged in that case).
pub fn init_from_env() -> Option<Level> {
    let raw = std::env::var(ENV_VAR).ok()?;
    let level = raw.parse().ok()?;
    set_level(level);
    Some(level)
}

/// Guard returned by [`quiet`]. Output resumes when every guard on the
/// thread has been dropped.
#[must_use = "diagnostics are only suppressed while the guard is alive"]
pub struct Quiet {
    _not_send: std::marker::PhantomData<*const ()>,
}

/// Suppresses diagnostics on the current thread until the guard drops.
///
/// Guards nest. The formatter holds one while it moves the cursor back and
/// forth so that its internal bookkeeping does not flood the trace output.
///
/// ```
/// use tmem_log::{get_logger, quiet, set_level, Level};
///
/// set_level(Level::Trace);
/// {
///     let _outer = quiet();
///     let _inner = quiet();
///     assert!(!get_logger().enabled(Level::Trace));
/// }
/// assert!(get_logger().enabled(Level::Trace));
/// ```
pub fn quiet() -> Quiet {
    QUIET_DEPTH.with(|depth| depth.set(depth.get() + 1));
    Quiet {
        _not_send: std::marker::PhantomData,
    }
}

impl Drop for Quiet {
    fn drop(&mut self) {
        QUIET_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

#[doc(hidden)]
pub fn __log_with_target(level: Level, target: &str, args: Arguments) {
    static RESET: &str = "\x1b[0m";

    if !get_logger().enabled(level) {
        return;
    }

    let color = level.color_code();
    let mut stderr = std::io::stderr().lock();
    // A failed diagnostic write must never turn into an arena error.
    let _ = writeln!(stderr, "{color}[{level}]{RESET} {target}: {args}");
}

/// Logs at an explicit level, tagging the message with the caller's module.
///
/// ```
/// use tmem_log::{log, Level};
///
/// log!(level: Level::Info, "arena {} ready", "scratch");
/// ```
#[macro_export]
macro_rules! log {
    (level: $level:expr, $($arg:tt)*) => {
        {
            if $crate::get_logger().enabled($level) {
                $crate::__log_with_target(
                    $level,
                    module_path!(),
                    format_args!($($arg)*)
                );
            }
        }
    };
}

/// Logs at [`Level::Error`].
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Error, $($arg)*)
    };
}

/// Logs at [`Level::Warn`].
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Warn, $($arg)*)
    };
}

/// Logs at [`Level::Info`].
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Info, $($arg)*)
    };
}

/// Logs at [`Level::Debug`].
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Debug, $($arg)*)
    };
}

/// Logs at [`Level::Trace`].
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Trace, $($arg)*)
    };
}
