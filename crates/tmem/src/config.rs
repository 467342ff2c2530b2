//! Construction-time parameters for arenas and formatters.
//!
//! All values have defaults matching the classic temporary-memory setup: a
//! 10 000 byte buffer created on first use, a reuse window covering the top
//! quarter of the allocated buffer, and a 25 byte formatting guess.
//!
//! # Examples
//!
//! ```
//! use tmem::config::{ArenaConfig, FormatConfig, GrowthPolicy, Guess};
//!
//! let arena = ArenaConfig::new()
//!     .with_default_capacity(4096)
//!     .with_growth(GrowthPolicy::Fixed);
//! assert_eq!(arena.default_capacity(), 4096);
//!
//! let format = FormatConfig::new().with_guess(Guess::adaptive(32));
//! assert_eq!(format.guess().initial_len(), 32);
//! ```

use tmem_log::warn;

/// Buffer size reserved by the first allocation on an unused arena.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Fraction of the true capacity above which `reserve` keeps the buffer.
pub const DEFAULT_HYSTERESIS: f64 = 0.75;

/// Length of the speculative formatting buffer.
pub const DEFAULT_GUESS_LEN: usize = 25;

/// Learning rate of the adaptive guess.
pub const DEFAULT_GUESS_WEIGHT: f64 = 0.25;

/// What `allocate` does when the cursor would pass the end of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrowthPolicy {
    /// Grow the buffer, keeping its contents and every issued offset.
    #[default]
    Grow,
    /// Refuse with `Error::OutOfArenaSpace`.
    Fixed,
}

impl GrowthPolicy {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "grow" => Some(GrowthPolicy::Grow),
            "fixed" => Some(GrowthPolicy::Fixed),
            _ => None,
        }
    }
}

/// Arena parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArenaConfig {
    default_capacity: usize,
    hysteresis: f64,
    growth: GrowthPolicy,
}

impl ArenaConfig {
    /// Returns the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            default_capacity: DEFAULT_CAPACITY,
            hysteresis: DEFAULT_HYSTERESIS,
            growth: GrowthPolicy::Grow,
        }
    }

    /// Sets the capacity used for lazy initialisation.
    ///
    /// A value of zero is replaced by one word so that lazy initialisation
    /// always produces a buffer.
    #[must_use]
    pub const fn with_default_capacity(mut self, bytes: usize) -> Self {
        self.default_capacity = if bytes == 0 {
            std::mem::size_of::<usize>()
        } else {
            bytes
        };
        self
    }

    /// Sets the reuse threshold, clamped to `[0, 1]`.
    ///
    /// `reserve(n)` keeps the current buffer when
    /// `threshold * true_capacity < n <= true_capacity`.
    #[must_use]
    pub fn with_hysteresis(mut self, threshold: f64) -> Self {
        self.hysteresis = if threshold.is_nan() {
            DEFAULT_HYSTERESIS
        } else {
            threshold.clamp(0.0, 1.0)
        };
        self
    }

    /// Sets the overrun behaviour of `allocate`.
    #[must_use]
    pub const fn with_growth(mut self, growth: GrowthPolicy) -> Self {
        self.growth = growth;
        self
    }

    /// Reads overrides from the environment.
    ///
    /// | Variable | Meaning |
    /// |---|---|
    /// | `TMEM_DEFAULT_CAPACITY` | bytes reserved on first use |
    /// | `TMEM_HYSTERESIS` | reuse threshold |
    /// | `TMEM_GROWTH` | `grow` or `fixed` |
    ///
    /// Unset variables keep their defaults; unparsable ones are logged and
    /// ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::new();

        if let Some(raw) = lookup("TMEM_DEFAULT_CAPACITY") {
            match raw.trim().parse::<usize>() {
                Ok(bytes) => config = config.with_default_capacity(bytes),
                Err(_) => warn!("ignoring TMEM_DEFAULT_CAPACITY={raw:?}"),
            }
        }
        if let Some(raw) = lookup("TMEM_HYSTERESIS") {
            match raw.trim().parse::<f64>() {
                Ok(threshold) => config = config.with_hysteresis(threshold),
                Err(_) => warn!("ignoring TMEM_HYSTERESIS={raw:?}"),
            }
        }
        if let Some(raw) = lookup("TMEM_GROWTH") {
            match GrowthPolicy::parse(&raw) {
                Some(growth) => config = config.with_growth(growth),
                None => warn!("ignoring TMEM_GROWTH={raw:?}"),
            }
        }

        config
    }

    /// Capacity reserved on first use, in bytes.
    #[must_use]
    pub const fn default_capacity(&self) -> usize {
        self.default_capacity
    }

    /// Reuse threshold for `reserve`.
    #[must_use]
    pub const fn hysteresis(&self) -> f64 {
        self.hysteresis
    }

    /// Overrun behaviour.
    #[must_use]
    pub const fn growth(&self) -> GrowthPolicy {
        self.growth
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// How long the speculative buffer is for each formatting call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Guess {
    /// Always the same length. Deterministic arena usage.
    Fixed(usize),
    /// Starts at `initial` and follows an exponential moving average of the
    /// lengths actually produced.
    Adaptive {
        /// Starting prediction.
        initial: usize,
        /// Weight of the newest observation, in `(0, 1]`.
        weight: f64,
    },
}

impl Guess {
    /// An adaptive guess with the default learning rate.
    #[must_use]
    pub const fn adaptive(initial: usize) -> Self {
        Guess::Adaptive {
            initial,
            weight: DEFAULT_GUESS_WEIGHT,
        }
    }

    /// The first length this strategy will try, never below one byte.
    #[must_use]
    pub fn initial_len(&self) -> usize {
        match *self {
            Guess::Fixed(len) | Guess::Adaptive { initial: len, .. } => len.max(1),
        }
    }
}

impl Default for Guess {
    fn default() -> Self {
        Guess::Fixed(DEFAULT_GUESS_LEN)
    }
}

/// Formatter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FormatConfig {
    guess: Guess,
}

impl FormatConfig {
    /// Returns the default configuration (fixed 25 byte guess).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            guess: Guess::Fixed(DEFAULT_GUESS_LEN),
        }
    }

    /// Sets the guess strategy.
    ///
    /// Adaptive weights outside `(0, 1]` are replaced by the default weight.
    #[must_use]
    pub fn with_guess(mut self, guess: Guess) -> Self {
        self.guess = match guess {
            Guess::Adaptive { initial, weight } if !(weight > 0.0 && weight <= 1.0) => {
                Guess::Adaptive {
                    initial,
                    weight: DEFAULT_GUESS_WEIGHT,
                }
            }
            other => other,
        };
        self
    }

    /// The guess strategy.
    #[must_use]
    pub const fn guess(&self) -> Guess {
        self.guess
    }
}
