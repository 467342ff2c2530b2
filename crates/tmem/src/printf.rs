//! Bounded printf-style rendering.
//!
//! [`render`] follows the `vsnprintf` contract: it writes at most
//! `buf.len() - 1` bytes followed by a NUL (when `buf` is not empty) and
//! returns the length the complete output would have had. The speculative
//! formatter relies on that return value to tell whether its guess was long
//! enough.
//!
//! Supported directives have the C shape `%[flags][width][.precision][length]conversion`:
//!
//! - flags `-`, `+`, space, `#`, `0`
//! - width and precision as digits or `*` (taken from the argument list)
//! - length modifiers `hh`, `h`, `l`, `ll`, `q`, `j`, `z`, `t`, `L`; only
//!   `hh` and `h` change anything (they narrow integers to 8 and 16 bits)
//! - conversions `d i u o x X c s p f F e E g G %`
//!
//! Integers narrower than 32 bits are promoted to 32 bits, as C does, before
//! an unsigned conversion reinterprets a negative value.
//!
//! # Examples
//!
//! ```
//! use tmem::args;
//! use tmem::args::ArgList;
//! use tmem::printf;
//!
//! let values = args!["world", 42];
//! let mut buf = [0u8; 8];
//! let len = printf::render(&mut buf, "hello %s %d", &mut ArgList::new(&values)).unwrap();
//!
//! assert_eq!(len, 14);
//! assert_eq!(&buf, b"hello w\0");
//! ```

use crate::args::{Arg, ArgList};
use crate::error::FormatError;
use std::fmt::Write as _;

type Result<T> = std::result::Result<T, FormatError>;

/// Renders `fmt` into `buf`, consuming arguments from `args`.
///
/// Returns the length of the complete output, excluding the terminator, even
/// if `buf` was too short to hold it.
///
/// # Errors
///
/// Returns a [`FormatError`] for malformed directives and for arguments that
/// are missing or of the wrong kind. The contents of `buf` are unspecified in
/// that case.
pub fn render(buf: &mut [u8], fmt: &str, args: &mut ArgList<'_>) -> Result<usize> {
    let mut out = Bounded { buf, total: 0 };
    write_formatted(&mut out, fmt, args)?;
    Ok(out.finish())
}

/// Length of the output `fmt` would produce with `args`.
///
/// # Errors
///
/// As for [`render`].
pub fn measure(fmt: &str, args: &[Arg<'_>]) -> Result<usize> {
    render(&mut [], fmt, &mut ArgList::new(args))
}

/// Renders `fmt` into a new `String`.
///
/// # Errors
///
/// As for [`render`].
pub fn render_to_string(fmt: &str, args: &[Arg<'_>]) -> Result<String> {
    let mut out = Vec::new();
    write_formatted(&mut out, fmt, &mut ArgList::new(args))?;
    Ok(String::from_utf8(out)
        .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned()))
}

trait Output {
    fn put(&mut self, bytes: &[u8]);
    fn put_repeated(&mut self, byte: u8, count: usize);
}

/// Truncating sink over a caller-provided buffer.
struct Bounded<'b> {
    buf: &'b mut [u8],
    total: usize,
}

impl Bounded<'_> {
    /// Bytes that can still be stored, leaving room for the terminator.
    fn room(&self) -> usize {
        self.buf.len().saturating_sub(1).saturating_sub(self.total)
    }

    fn finish(self) -> usize {
        if let Some(last) = self.buf.len().checked_sub(1) {
            self.buf[self.total.min(last)] = 0;
        }
        self.total
    }
}

impl Output for Bounded<'_> {
    fn put(&mut self, bytes: &[u8]) {
        let n = bytes.len().min(self.room());
        if n > 0 {
            self.buf[self.total..self.total + n].copy_from_slice(&bytes[..n]);
        }
        self.total = self.total.saturating_add(bytes.len());
    }

    fn put_repeated(&mut self, byte: u8, count: usize) {
        let n = count.min(self.room());
        if n > 0 {
            self.buf[self.total..self.total + n].fill(byte);
        }
        self.total = self.total.saturating_add(count);
    }
}

impl Output for Vec<u8> {
    fn put(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }

    fn put_repeated(&mut self, byte: u8, count: usize) {
        self.resize(self.len() + count, byte);
    }
}

#[derive(Debug, Default)]
struct Spec {
    left: bool,
    plus: bool,
    space: bool,
    alt: bool,
    zero: bool,
    width: usize,
    precision: Option<usize>,
    /// Integer width imposed by `hh` or `h`.
    narrow: u32,
}

impl Spec {
    fn sign(&self, negative: bool) -> &'static [u8] {
        if negative {
            b"-"
        } else if self.plus {
            b"+"
        } else if self.space {
            b" "
        } else {
            b""
        }
    }
}

fn write_formatted<O: Output>(out: &mut O, fmt: &str, args: &mut ArgList<'_>) -> Result<()> {
    let bytes = fmt.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        let Some(skip) = bytes[pos..].iter().position(|&b| b == b'%') else {
            out.put(&bytes[pos..]);
            break;
        };
        out.put(&bytes[pos..pos + skip]);
        pos = write_directive(out, fmt, pos + skip, args)?;
    }

    Ok(())
}

/// Renders the directive starting at `start` and returns the offset just
/// past it.
fn write_directive<O: Output>(
    out: &mut O,
    fmt: &str,
    start: usize,
    args: &mut ArgList<'_>,
) -> Result<usize> {
    let bytes = fmt.as_bytes();
    let mut pos = start + 1;
    let mut spec = Spec {
        narrow: 64,
        ..Spec::default()
    };

    while let Some(&b) = bytes.get(pos) {
        match b {
            b'-' => spec.left = true,
            b'+' => spec.plus = true,
            b' ' => spec.space = true,
            b'#' => spec.alt = true,
            b'0' => spec.zero = true,
            _ => break,
        }
        pos += 1;
    }

    if bytes.get(pos) == Some(&b'*') {
        pos += 1;
        let width = star_argument(args)?;
        spec.left |= width < 0;
        spec.width = usize::try_from(width.unsigned_abs()).unwrap_or(usize::MAX);
    } else {
        spec.width = parse_number(bytes, &mut pos);
    }

    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        if bytes.get(pos) == Some(&b'*') {
            pos += 1;
            // A negative precision counts as omitted.
            spec.precision = usize::try_from(star_argument(args)?).ok();
        } else {
            spec.precision = Some(parse_number(bytes, &mut pos));
        }
    }

    let (narrow, skip) = match (bytes.get(pos), bytes.get(pos + 1)) {
        (Some(b'h'), Some(b'h')) => (8, 2),
        (Some(b'h'), _) => (16, 1),
        (Some(b'l'), Some(b'l')) => (64, 2),
        (Some(b'l' | b'q' | b'j' | b'z' | b't' | b'L'), _) => (64, 1),
        _ => (64, 0),
    };
    spec.narrow = narrow;
    pos += skip;

    // Everything consumed so far is ASCII, so `pos` is a char boundary.
    let conversion = fmt[pos..]
        .chars()
        .next()
        .ok_or(FormatError::TrailingPercent { offset: start })?;

    match conversion {
        '%' => out.put(b"%"),
        'd' | 'i' | 'u' | 'o' | 'x' | 'X' => {
            let (index, arg) = next_argument(args)?;
            write_integer(out, &spec, conversion, arg)
                .ok_or(FormatError::ArgumentMismatch { index, conversion })?;
        }
        'f' | 'F' | 'e' | 'E' | 'g' | 'G' => match next_argument(args)? {
            (_, Arg::Float(value)) => write_float(out, &spec, conversion, value),
            (index, _) => return Err(FormatError::ArgumentMismatch { index, conversion }),
        },
        'c' => {
            let (index, arg) = next_argument(args)?;
            let c = char_value(arg, &spec)
                .ok_or(FormatError::ArgumentMismatch { index, conversion })?;
            let mut encoded = [0u8; 4];
            pad(out, &spec, false, b"", 0, c.encode_utf8(&mut encoded).as_bytes());
        }
        's' => match next_argument(args)? {
            (_, Arg::Str(s)) => {
                let s = spec.precision.map_or(s, |max| truncate_str(s, max));
                pad(out, &spec, false, b"", 0, s.as_bytes());
            }
            (index, _) => return Err(FormatError::ArgumentMismatch { index, conversion }),
        },
        'p' => match next_argument(args)? {
            (_, Arg::Ptr(0)) => pad(out, &spec, false, b"", 0, b"(nil)"),
            (_, Arg::Ptr(addr)) => {
                let mut scratch = [0u8; 64];
                let digits = to_digits(addr as u64, 16, false, &mut scratch);
                pad(out, &spec, false, b"0x", 0, digits);
            }
            (index, _) => return Err(FormatError::ArgumentMismatch { index, conversion }),
        },
        'n' | 'a' | 'A' => {
            return Err(FormatError::UnsupportedConversion {
                offset: start,
                conversion,
            });
        }
        _ => {
            return Err(FormatError::UnknownConversion {
                offset: start,
                conversion,
            });
        }
    }

    Ok(pos + conversion.len_utf8())
}

fn parse_number(bytes: &[u8], pos: &mut usize) -> usize {
    let mut value = 0usize;
    while let Some(&b) = bytes.get(*pos).filter(|b| b.is_ascii_digit()) {
        value = value.saturating_mul(10).saturating_add(usize::from(b - b'0'));
        *pos += 1;
    }
    value
}

fn next_argument<'a>(args: &mut ArgList<'a>) -> Result<(usize, Arg<'a>)> {
    let index = args.position();
    args.next_arg()
        .map(|arg| (index, arg))
        .ok_or(FormatError::MissingArgument { index })
}

fn star_argument(args: &mut ArgList<'_>) -> Result<i64> {
    match next_argument(args)? {
        (_, Arg::Int { value, .. }) => Ok(value),
        (_, Arg::Uint { value, .. }) => Ok(i64::try_from(value).unwrap_or(i64::MAX)),
        (index, _) => Err(FormatError::ArgumentMismatch {
            index,
            conversion: '*',
        }),
    }
}

/// Width an integer argument has after promotion and length narrowing.
fn effective_bits(own: u32, narrow: u32) -> u32 {
    own.max(32).min(narrow)
}

fn sign_extend(value: u64, bits: u32) -> i64 {
    if bits >= 64 {
        value as i64
    } else {
        let shift = 64 - bits;
        ((value << shift) as i64) >> shift
    }
}

fn truncate_bits(value: u64, bits: u32) -> u64 {
    if bits >= 64 {
        value
    } else {
        value & ((1u64 << bits) - 1)
    }
}

fn signed_value(arg: Arg<'_>, narrow: u32) -> Option<i64> {
    match arg {
        Arg::Int { value, bits } => Some(sign_extend(value as u64, effective_bits(bits, narrow))),
        Arg::Uint { value, bits } => Some(sign_extend(value, effective_bits(bits, narrow))),
        Arg::Char(c) => Some(sign_extend(u64::from(c), effective_bits(32, narrow))),
        _ => None,
    }
}

fn unsigned_value(arg: Arg<'_>, narrow: u32) -> Option<u64> {
    match arg {
        Arg::Int { value, bits } => Some(truncate_bits(value as u64, effective_bits(bits, narrow))),
        Arg::Uint { value, bits } => Some(truncate_bits(value, effective_bits(bits, narrow))),
        Arg::Char(c) => Some(truncate_bits(u64::from(c), effective_bits(32, narrow))),
        _ => None,
    }
}

fn char_value(arg: Arg<'_>, spec: &Spec) -> Option<char> {
    match arg {
        Arg::Char(c) => Some(c),
        Arg::Int { .. } | Arg::Uint { .. } => {
            let code = unsigned_value(arg, spec.narrow)?;
            char::from_u32(u32::try_from(code).ok()?)
        }
        _ => None,
    }
}

/// Longest prefix of `s` of at most `max` bytes that ends on a char boundary.
fn truncate_str(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn to_digits(mut value: u64, base: u64, upper: bool, scratch: &mut [u8; 64]) -> &[u8] {
    let table: &[u8; 16] = if upper {
        b"0123456789ABCDEF"
    } else {
        b"0123456789abcdef"
    };
    let mut pos = scratch.len();
    loop {
        pos -= 1;
        scratch[pos] = table[(value % base) as usize];
        value /= base;
        if value == 0 {
            break;
        }
    }
    &scratch[pos..]
}

/// Writes `prefix`, `zeros` zero digits and `body`, padded to the field width.
fn pad<O: Output>(
    out: &mut O,
    spec: &Spec,
    zero_pad: bool,
    prefix: &[u8],
    zeros: usize,
    body: &[u8],
) {
    let len = zeros.saturating_add(prefix.len() + body.len());
    let fill = spec.width.saturating_sub(len);

    if spec.left {
        out.put(prefix);
        out.put_repeated(b'0', zeros);
        out.put(body);
        out.put_repeated(b' ', fill);
    } else if zero_pad {
        out.put(prefix);
        out.put_repeated(b'0', zeros.saturating_add(fill));
        out.put(body);
    } else {
        out.put_repeated(b' ', fill);
        out.put(prefix);
        out.put_repeated(b'0', zeros);
        out.put(body);
    }
}

fn write_integer<O: Output>(
    out: &mut O,
    spec: &Spec,
    conversion: char,
    arg: Arg<'_>,
) -> Option<()> {
    let (negative, magnitude) = match conversion {
        'd' | 'i' => {
            let value = signed_value(arg, spec.narrow)?;
            (value < 0, value.unsigned_abs())
        }
        _ => (false, unsigned_value(arg, spec.narrow)?),
    };
    let base = match conversion {
        'o' => 8,
        'x' | 'X' => 16,
        _ => 10,
    };

    let mut scratch = [0u8; 64];
    let digits: &[u8] = if magnitude == 0 && spec.precision == Some(0) {
        &[]
    } else {
        to_digits(magnitude, base, conversion == 'X', &mut scratch)
    };

    let mut zeros = spec
        .precision
        .map_or(0, |precision| precision.saturating_sub(digits.len()));
    if conversion == 'o' && spec.alt && zeros == 0 && digits.first() != Some(&b'0') {
        zeros = 1;
    }

    let prefix: &[u8] = match conversion {
        'd' | 'i' => spec.sign(negative),
        'x' if spec.alt && magnitude != 0 => b"0x",
        'X' if spec.alt && magnitude != 0 => b"0X",
        _ => b"",
    };

    let zero_pad = spec.zero && spec.precision.is_none();
    pad(out, spec, zero_pad, prefix, zeros, digits);
    Some(())
}

fn write_float<O: Output>(out: &mut O, spec: &Spec, conversion: char, value: f64) {
    let magnitude = value.abs();
    let mut body = if magnitude.is_nan() {
        String::from("nan")
    } else if magnitude.is_infinite() {
        String::from("inf")
    } else {
        let precision = spec.precision.unwrap_or(6);
        match conversion.to_ascii_lowercase() {
            'f' => fixed(magnitude, precision, spec.alt),
            'e' => scientific(magnitude, precision, spec.alt),
            _ => general(magnitude, precision, spec.alt),
        }
    };
    if conversion.is_ascii_uppercase() {
        body.make_ascii_uppercase();
    }

    let zero_pad = spec.zero && value.is_finite();
    pad(out, spec, zero_pad, spec.sign(value.is_sign_negative()), 0, body.as_bytes());
}

fn fixed(magnitude: f64, precision: usize, alt: bool) -> String {
    let mut text = format!("{magnitude:.precision$}");
    if alt && precision == 0 {
        text.push('.');
    }
    text
}

/// Splits `magnitude` rounded to `precision` fraction digits in scientific
/// notation into its mantissa and decimal exponent.
fn decompose(magnitude: f64, precision: usize) -> (String, i32) {
    let text = format!("{magnitude:.precision$e}");
    match text.split_once('e') {
        Some((mantissa, exponent)) => (mantissa.to_owned(), exponent.parse().unwrap_or(0)),
        None => (text, 0),
    }
}

fn with_exponent(mut mantissa: String, exponent: i32) -> String {
    let sign = if exponent < 0 { '-' } else { '+' };
    let _ = write!(mantissa, "e{sign}{:02}", exponent.unsigned_abs());
    mantissa
}

fn scientific(magnitude: f64, precision: usize, alt: bool) -> String {
    let (mut mantissa, exponent) = decompose(magnitude, precision);
    if alt && precision == 0 {
        mantissa.push('.');
    }
    with_exponent(mantissa, exponent)
}

fn general(magnitude: f64, precision: usize, alt: bool) -> String {
    let significant = precision.max(1);
    let (mut mantissa, exponent) = decompose(magnitude, significant - 1);
    let exponent_wide = i64::from(exponent);
    let significant_wide = i64::try_from(significant).unwrap_or(i64::MAX);

    if exponent_wide >= -4 && exponent_wide < significant_wide {
        let decimals = usize::try_from(significant_wide - 1 - exponent_wide).unwrap_or(0);
        let mut text = format!("{magnitude:.decimals$}");
        if !alt {
            strip_fraction_zeros(&mut text);
        } else if decimals == 0 {
            text.push('.');
        }
        text
    } else {
        if !alt {
            strip_fraction_zeros(&mut mantissa);
        } else if significant == 1 {
            mantissa.push('.');
        }
        with_exponent(mantissa, exponent)
    }
}

fn strip_fraction_zeros(text: &mut String) {
    if text.contains('.') {
        let kept = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(kept);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    fn fmt(format: &str, values: &[Arg<'_>]) -> String {
        render_to_string(format, values).unwrap()
    }

    #[test]
    fn test_literals_and_percent() {
        assert_eq!(fmt("plain text", &[]), "plain text");
        assert_eq!(fmt("100%% sure", &[]), "100% sure");
        assert_eq!(fmt("", &[]), "");
        assert_eq!(fmt("héllo %s", &args!["wörld"]), "héllo wörld");
    }

    #[test]
    fn test_signed_integers() {
        assert_eq!(fmt("%d", &args![7]), "7");
        assert_eq!(fmt("%i", &args![-7]), "-7");
        assert_eq!(fmt("%5d", &args![42]), "   42");
        assert_eq!(fmt("%-5d|", &args![42]), "42   |");
        assert_eq!(fmt("%05d", &args![-42]), "-0042");
        assert_eq!(fmt("%+d %+d", &args![5, -5]), "+5 -5");
        assert_eq!(fmt("% d", &args![5]), " 5");
        assert_eq!(fmt("%.3d", &args![7]), "007");
        assert_eq!(fmt("%.0d", &args![0]), "");
        assert_eq!(fmt("%08.3d", &args![7]), "     007");
        assert_eq!(fmt("%d", &args![i64::MIN]), "-9223372036854775808");
    }

    #[test]
    fn test_unsigned_conversions() {
        assert_eq!(fmt("%u", &args![-1i32]), "4294967295");
        assert_eq!(fmt("%u", &args![-1i8]), "4294967295");
        assert_eq!(fmt("%x", &args![255]), "ff");
        assert_eq!(fmt("%#X", &args![255]), "0XFF");
        assert_eq!(fmt("%#x", &args![0]), "0");
        assert_eq!(fmt("%o", &args![8]), "10");
        assert_eq!(fmt("%#o", &args![8]), "010");
        assert_eq!(fmt("%#.0o", &args![0]), "0");
        assert_eq!(fmt("%x", &args![-1i64]), "ffffffffffffffff");
        assert_eq!(fmt("%lx", &args![u64::MAX]), "ffffffffffffffff");
        assert_eq!(fmt("%#010x", &args![255]), "0x000000ff");
    }

    #[test]
    fn test_length_modifiers() {
        assert_eq!(fmt("%hhu", &args![300]), "44");
        assert_eq!(fmt("%hhd", &args![-129]), "127");
        assert_eq!(fmt("%hd", &args![65_537]), "1");
        assert_eq!(fmt("%hhd", &args![200u8]), "-56");
        assert_eq!(fmt("%d", &args![200u8]), "200");
        assert_eq!(fmt("%d", &args![u32::MAX]), "-1");
        assert_eq!(
            fmt("%ld %lld %qd %jd %zu %td", &args![1, 2, 3, 4, 5usize, 6isize]),
            "1 2 3 4 5 6"
        );
    }

    #[test]
    fn test_star_width_and_precision() {
        assert_eq!(fmt("%*d", &args![5, 42]), "   42");
        assert_eq!(fmt("%*d|", &args![-4, 7]), "7   |");
        assert_eq!(fmt("%.*f", &args![2, 3.14159]), "3.14");
        assert_eq!(fmt("%.*s", &args![-1, "abc"]), "abc");
        assert_eq!(fmt("%*.*s|", &args![6, 2, "abcdef"]), "    ab|");
    }

    #[test]
    fn test_fixed_floats() {
        assert_eq!(fmt("%f", &args![1.5]), "1.500000");
        assert_eq!(fmt("%.2f", &args![3.14159]), "3.14");
        assert_eq!(fmt("%.0f", &args![2.4]), "2");
        assert_eq!(fmt("%#.0f", &args![2.4]), "2.");
        assert_eq!(fmt("%+.1f", &args![2.0]), "+2.0");
        assert_eq!(fmt("%08.2f", &args![-3.5]), "-0003.50");
        assert_eq!(fmt("%-8.1f|", &args![1.0]), "1.0     |");
        assert_eq!(fmt("%f", &args![-0.0]), "-0.000000");
        assert_eq!(fmt("%Lf", &args![0.25f32]), "0.250000");
    }

    #[test]
    fn test_scientific_floats() {
        assert_eq!(fmt("%e", &args![12345.678]), "1.234568e+04");
        assert_eq!(fmt("%E", &args![0.000123]), "1.230000E-04");
        assert_eq!(fmt("%.0e", &args![5e10]), "5e+10");
        assert_eq!(fmt("%#.0e", &args![5e10]), "5.e+10");
        assert_eq!(fmt("%e", &args![0.0]), "0.000000e+00");
        assert_eq!(fmt("%e", &args![1e100]), "1.000000e+100");
    }

    #[test]
    fn test_general_floats() {
        assert_eq!(fmt("%g", &args![0.0001]), "0.0001");
        assert_eq!(fmt("%g", &args![0.00001]), "1e-05");
        assert_eq!(fmt("%g", &args![1e6]), "1e+06");
        assert_eq!(fmt("%g", &args![123456.0]), "123456");
        assert_eq!(fmt("%g", &args![1234567.0]), "1.23457e+06");
        assert_eq!(fmt("%g", &args![100.0]), "100");
        assert_eq!(fmt("%g", &args![0.5]), "0.5");
        assert_eq!(fmt("%g", &args![0.0]), "0");
        assert_eq!(fmt("%G", &args![1e-10]), "1E-10");
        assert_eq!(fmt("%#g", &args![1.0]), "1.00000");
        assert_eq!(fmt("%.3g", &args![3.14159]), "3.14");
    }

    #[test]
    fn test_non_finite_floats() {
        assert_eq!(fmt("%f", &args![f64::INFINITY]), "inf");
        assert_eq!(fmt("%5.1F", &args![f64::NEG_INFINITY]), " -INF");
        assert_eq!(fmt("%f", &args![f64::NAN]), "nan");
        assert_eq!(fmt("%010f", &args![f64::INFINITY]), "       inf");
        assert_eq!(fmt("%+e", &args![f64::INFINITY]), "+inf");
    }

    #[test]
    fn test_chars_and_strings() {
        assert_eq!(fmt("%c", &args!['x']), "x");
        assert_eq!(fmt("%3c", &args!['y']), "  y");
        assert_eq!(fmt("%-3c|", &args!['y']), "y  |");
        assert_eq!(fmt("%c", &args![65]), "A");
        assert_eq!(fmt("%c", &args!['ß']), "ß");
        assert_eq!(fmt("%s", &args!["hi"]), "hi");
        assert_eq!(fmt("%-6s|", &args!["hi"]), "hi    |");
        assert_eq!(fmt("%.2s", &args!["hello"]), "he");
        assert_eq!(fmt("%.1s", &args!["é"]), "");
        assert_eq!(fmt("%5.1s", &args!["abc"]), "    a");
        assert_eq!(fmt("%s", &args![""]), "");
    }

    #[test]
    fn test_pointers() {
        assert_eq!(fmt("%p", &[Arg::Ptr(0)]), "(nil)");
        assert_eq!(fmt("%p", &[Arg::Ptr(0x1f)]), "0x1f");
        assert_eq!(fmt("%8p", &[Arg::Ptr(0xab)]), "    0xab");
    }

    #[test]
    fn test_malformed_formats() {
        assert_eq!(
            render_to_string("%", &[]),
            Err(FormatError::TrailingPercent { offset: 0 })
        );
        assert_eq!(
            render_to_string("abc%5", &[]),
            Err(FormatError::TrailingPercent { offset: 3 })
        );
        assert_eq!(
            render_to_string("%y", &[]),
            Err(FormatError::UnknownConversion {
                offset: 0,
                conversion: 'y'
            })
        );
        assert_eq!(
            render_to_string("x %é", &[]),
            Err(FormatError::UnknownConversion {
                offset: 2,
                conversion: 'é'
            })
        );
        assert_eq!(
            render_to_string("%n", &args![1]),
            Err(FormatError::UnsupportedConversion {
                offset: 0,
                conversion: 'n'
            })
        );
        assert_eq!(
            render_to_string("%a", &args![1.0]),
            Err(FormatError::UnsupportedConversion {
                offset: 0,
                conversion: 'a'
            })
        );
    }

    #[test]
    fn test_argument_errors() {
        assert_eq!(
            render_to_string("%d %d", &args![1]),
            Err(FormatError::MissingArgument { index: 1 })
        );
        assert_eq!(
            render_to_string("%s", &args![5]),
            Err(FormatError::ArgumentMismatch {
                index: 0,
                conversion: 's'
            })
        );
        assert_eq!(
            render_to_string("%d", &args![1.0]),
            Err(FormatError::ArgumentMismatch {
                index: 0,
                conversion: 'd'
            })
        );
        assert_eq!(
            render_to_string("%f", &args![1]),
            Err(FormatError::ArgumentMismatch {
                index: 0,
                conversion: 'f'
            })
        );
        assert_eq!(
            render_to_string("%*d", &args!["x", 1]),
            Err(FormatError::ArgumentMismatch {
                index: 0,
                conversion: '*'
            })
        );
    }

    #[test]
    fn test_render_truncates_and_reports_full_length() {
        let values = args!["hello", "world"];

        let mut small = [0xFFu8; 5];
        let len = render(&mut small, "%s %s", &mut ArgList::new(&values)).unwrap();
        assert_eq!(len, 11);
        assert_eq!(&small, b"hell\0");

        let mut exact = [0xFFu8; 12];
        let len = render(&mut exact, "%s %s", &mut ArgList::new(&values)).unwrap();
        assert_eq!(len, 11);
        assert_eq!(&exact, b"hello world\0");

        let mut one = [0xFFu8; 1];
        assert_eq!(render(&mut one, "%s", &mut ArgList::new(&values)).unwrap(), 5);
        assert_eq!(one, [0]);
    }

    #[test]
    fn test_render_into_empty_buffer_only_measures() {
        let values = args![12345];
        assert_eq!(render(&mut [], "n=%d", &mut ArgList::new(&values)), Ok(7));
        assert_eq!(measure("n=%d", &values), Ok(7));
    }

    #[test]
    fn test_padding_is_truncated_too() {
        let values = args![1];
        let mut buf = [0xFFu8; 4];
        assert_eq!(render(&mut buf, "%10d", &mut ArgList::new(&values)), Ok(10));
        assert_eq!(&buf, b"   \0");
    }

    #[test]
    fn test_render_advances_argument_list() {
        let values = args![1, "two", 3.0];
        let mut list = ArgList::new(&values);
        let copy = list;

        render(&mut [0u8; 32], "%d %s", &mut list).unwrap();
        assert_eq!(list.position(), 2);
        assert_eq!(copy.position(), 0);
    }
}
