//! Typed printf arguments.
//!
//! C passes printf arguments through an untyped `va_list`. Here every
//! argument is an [`Arg`] that remembers what kind of value it is, and an
//! [`ArgList`] walks a slice of them in order. `ArgList` is `Copy`: copying it
//! is the equivalent of `va_copy`, which is what lets the formatter render
//! speculatively and then render again from the same starting point.
//!
//! # Examples
//!
//! ```
//! use tmem::args;
//! use tmem::args::{Arg, ArgList};
//!
//! let name = String::from("arena");
//! let values = args![42, -1i8, 2.5, 'x', name.as_str()];
//!
//! let mut list = ArgList::new(&values);
//! assert_eq!(list.next_arg(), Some(Arg::Int { value: 42, bits: 32 }));
//! assert_eq!(list.remaining(), 4);
//! ```

/// One printf argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arg<'a> {
    /// A signed integer and the width of its original type, in bits.
    Int {
        /// The value, sign-extended.
        value: i64,
        /// Width of the source type (8, 16, 32 or 64).
        bits: u32,
    },
    /// An unsigned integer and the width of its original type, in bits.
    Uint {
        /// The value, zero-extended.
        value: u64,
        /// Width of the source type (8, 16, 32 or 64).
        bits: u32,
    },
    /// A floating point number (`f32` is widened, as C does).
    Float(f64),
    /// A character.
    Char(char),
    /// A string.
    Str(&'a str),
    /// An address, rendered by `%p`.
    Ptr(usize),
}

macro_rules! impl_from_signed {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Arg<'_> {
                fn from(value: $ty) -> Self {
                    Arg::Int {
                        value: value as i64,
                        bits: <$ty>::BITS,
                    }
                }
            }
        )*
    };
}

macro_rules! impl_from_unsigned {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Arg<'_> {
                fn from(value: $ty) -> Self {
                    Arg::Uint {
                        value: value as u64,
                        bits: <$ty>::BITS,
                    }
                }
            }
        )*
    };
}

impl_from_signed!(i8, i16, i32, i64, isize);
impl_from_unsigned!(u8, u16, u32, u64, usize);

impl From<f32> for Arg<'_> {
    fn from(value: f32) -> Self {
        Arg::Float(f64::from(value))
    }
}

impl From<f64> for Arg<'_> {
    fn from(value: f64) -> Self {
        Arg::Float(value)
    }
}

impl From<char> for Arg<'_> {
    fn from(value: char) -> Self {
        Arg::Char(value)
    }
}

impl From<bool> for Arg<'_> {
    /// Booleans promote to `int`, as in C.
    fn from(value: bool) -> Self {
        Arg::Int {
            value: i64::from(value),
            bits: 32,
        }
    }
}

impl<'a> From<&'a str> for Arg<'a> {
    fn from(value: &'a str) -> Self {
        Arg::Str(value)
    }
}

impl<'a> From<&'a String> for Arg<'a> {
    fn from(value: &'a String) -> Self {
        Arg::Str(value.as_str())
    }
}

impl<T: ?Sized> From<*const T> for Arg<'_> {
    fn from(value: *const T) -> Self {
        Arg::Ptr(value.cast::<()>().addr())
    }
}

impl<T: ?Sized> From<*mut T> for Arg<'_> {
    fn from(value: *mut T) -> Self {
        Arg::Ptr(value.cast::<()>().addr())
    }
}

/// Cursor over a slice of arguments.
#[derive(Debug, Clone, Copy)]
pub struct ArgList<'a> {
    args: &'a [Arg<'a>],
    next: usize,
}

impl<'a> ArgList<'a> {
    /// Starts a walk at the first argument.
    #[must_use]
    pub const fn new(args: &'a [Arg<'a>]) -> Self {
        Self { args, next: 0 }
    }

    /// Takes the next argument.
    pub fn next_arg(&mut self) -> Option<Arg<'a>> {
        let arg = self.args.get(self.next).copied()?;
        self.next += 1;
        Some(arg)
    }

    /// Index of the argument `next_arg` would return.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.next
    }

    /// Arguments not consumed yet.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.args.len().saturating_sub(self.next)
    }
}

/// Builds an array of [`Arg`] values from ordinary Rust values.
///
/// ```
/// use tmem::args;
///
/// let values = args![1u8, "two", 3.0];
/// assert_eq!(values.len(), 3);
///
/// let none: [tmem::Arg<'_>; 0] = args![];
/// assert!(none.is_empty());
/// ```
#[macro_export]
macro_rules! args {
    () => {
        []
    };
    ($($arg:expr),+ $(,)?) => {
        [$($crate::args::Arg::from($arg)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_widths_are_recorded() {
        assert_eq!(Arg::from(-1i8), Arg::Int { value: -1, bits: 8 });
        assert_eq!(Arg::from(300i16), Arg::Int { value: 300, bits: 16 });
        assert_eq!(Arg::from(u32::MAX), Arg::Uint { value: u64::from(u32::MAX), bits: 32 });
        assert_eq!(Arg::from(7usize), Arg::Uint { value: 7, bits: usize::BITS });
    }

    #[test]
    fn test_floats_chars_and_strings() {
        assert_eq!(Arg::from(1.5f32), Arg::Float(1.5));
        assert_eq!(Arg::from('z'), Arg::Char('z'));
        let owned = String::from("owned");
        assert_eq!(Arg::from(&owned), Arg::Str("owned"));
        assert_eq!(Arg::from(true), Arg::Int { value: 1, bits: 32 });
    }

    #[test]
    fn test_pointers_keep_their_address() {
        let value = 5u64;
        let ptr: *const u64 = &value;
        assert_eq!(Arg::from(ptr), Arg::Ptr(ptr.addr()));
    }

    #[test]
    fn test_arg_list_walk_and_copy() {
        let values = args![1, 2, 3];
        let mut list = ArgList::new(&values);
        assert_eq!(list.next_arg(), Some(Arg::from(1)));

        let mut copy = list;
        assert_eq!(copy.next_arg(), Some(Arg::from(2)));
        assert_eq!(copy.next_arg(), Some(Arg::from(3)));
        assert_eq!(copy.next_arg(), None);
        assert_eq!(copy.position(), 3);

        // The original is unaffected by walking the copy.
        assert_eq!(list.position(), 1);
        assert_eq!(list.remaining(), 2);
    }
}
