//! Numeric parsing on top of [`Buffer`].
//!
//! Grounded in `rn_buffer_tolong`/`toulong`/`tofloat`/`todouble`: all four
//! follow the same shape in the original — a buffer isn't guaranteed to be
//! NUL-terminated or even writable, so before handing it to `strtol` et al.
//! the code either duplicates a non-owning buffer into an owning scratch
//! copy, or NUL-terminates the owning buffer in place and rolls the extra
//! byte back out of `size` afterward. That dance is preserved here even
//! though Rust's parser doesn't need a C-string terminator, so a buffer
//! with `msize == 0` still can't be parsed without first materializing an
//! owning copy and an owning buffer is left exactly as long as it started.
//!
//! Every parser here also reports how many bytes of the buffer's content
//! it consumed, mirroring `strtol`/`strtod`'s `endptr` out-parameter
//! (`rn_buffer_tolong(buf, &n, base)`'s `size_t *len`): testable property
//! #4 requires `n == len(print(L, B))` for any printed integer `L`.

use crate::buffer::Buffer;
use crate::error::BufferError;

/// Runs `parser` over the buffer's content as UTF-8 text, following the
/// original's NUL-termination dance so the buffer's logical size is
/// unchanged by the time this returns. `parser` returns the parsed value
/// together with how many leading bytes of the text it consumed.
fn with_text<T>(
    buf: &mut Buffer,
    parser: impl FnOnce(&str) -> Option<(T, usize)>,
) -> Result<(T, usize), BufferError> {
    if buf.capacity() == 0 {
        let mut scratch = buf.dup()?;
        scratch.add_null()?;
        let text_len = scratch.len() - 1;
        let text =
            std::str::from_utf8(&scratch.as_slice()[..text_len]).map_err(|_| BufferError::InvalidArgument)?;
        return parser(text).ok_or(BufferError::InvalidArgument);
    }

    buf.add_null()?;
    let text_len = buf.len() - 1;
    let text =
        std::str::from_utf8(&buf.as_slice()[..text_len]).map_err(|_| BufferError::InvalidArgument)?;
    let result = parser(text);
    buf.truncate(text_len);
    result.ok_or(BufferError::InvalidArgument)
}

/// Parses the buffer's content as a signed integer, stopping at the
/// first character that doesn't belong to the number (matching
/// `strtol`'s partial-parse behavior rather than requiring the whole
/// buffer to be numeric). Returns the value and the number of leading
/// bytes consumed by the parse, including any skipped leading
/// whitespace and sign.
///
/// Mirrors `rn_buffer_tolong`.
pub fn to_i64(buf: &mut Buffer, base: u32) -> Result<(i64, usize), BufferError> {
    with_text(buf, |text| parse_partial_signed(text, base))
}

/// Parses the buffer's content as an unsigned integer. Returns the
/// value and the number of leading bytes consumed.
///
/// Mirrors `rn_buffer_toulong`.
pub fn to_u64(buf: &mut Buffer, base: u32) -> Result<(u64, usize), BufferError> {
    with_text(buf, |text| parse_partial_unsigned(text, base))
}

/// Parses the buffer's content as an `f32`. Returns the value and the
/// number of leading bytes consumed.
///
/// Mirrors `rn_buffer_tofloat`.
pub fn to_f32(buf: &mut Buffer) -> Result<(f32, usize), BufferError> {
    with_text(buf, parse_partial_float)
}

/// Parses the buffer's content as an `f64`. Returns the value and the
/// number of leading bytes consumed.
///
/// Mirrors `rn_buffer_todouble`.
pub fn to_f64(buf: &mut Buffer) -> Result<(f64, usize), BufferError> {
    with_text(buf, |text| {
        parse_partial_float(text).map(|(v, len)| (v as f64, len))
    })
}

fn parse_partial_signed(text: &str, base: u32) -> Option<(i64, usize)> {
    let trimmed = text.trim_start();
    let ws_len = text.len() - trimmed.len();
    let (sign, rest, sign_len) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1i64, rest, 1),
        None => match trimmed.strip_prefix('+') {
            Some(rest) => (1i64, rest, 1),
            None => (1i64, trimmed, 0),
        },
    };
    let digits = leading_digits(rest, base);
    if digits.is_empty() {
        return None;
    }
    let value = i64::from_str_radix(digits, base).ok()?.checked_mul(sign)?;
    Some((value, ws_len + sign_len + digits.len()))
}

fn parse_partial_unsigned(text: &str, base: u32) -> Option<(u64, usize)> {
    let trimmed = text.trim_start();
    let ws_len = text.len() - trimmed.len();
    let (rest, sign_len) = match trimmed.strip_prefix('+') {
        Some(rest) => (rest, 1),
        None => (trimmed, 0),
    };
    let digits = leading_digits(rest, base);
    if digits.is_empty() {
        return None;
    }
    let value = u64::from_str_radix(digits, base).ok()?;
    Some((value, ws_len + sign_len + digits.len()))
}

fn leading_digits(text: &str, base: u32) -> &str {
    let end = text
        .find(|c: char| !c.is_digit(base))
        .unwrap_or(text.len());
    &text[..end]
}

fn parse_partial_float(text: &str) -> Option<(f32, usize)> {
    let trimmed = text.trim_start();
    let ws_len = text.len() - trimmed.len();
    let end = trimmed
        .char_indices()
        .find(|&(i, c)| {
            !(c.is_ascii_digit()
                || c == '.'
                || c == '-'
                || c == '+'
                || c == 'e'
                || c == 'E'
                || (i > 0 && (c == 'e' || c == 'E')))
        })
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    let value = trimmed[..end].parse::<f32>().ok()?;
    Some((value, ws_len + end))
}
