//! Numeric literal reader for G-code words.
//!
//! The grammar is deliberately narrower than `str::parse::<f32>`: an optional
//! sign, digits, and an optional fractional part. There is no exponent (in
//! G-code `E` is an axis letter, so `X1E4` is two words), no hexadecimal and
//! no locale handling.

/// Reads one numeric literal from `text` starting at byte offset `pos`.
///
/// Leading spaces and tabs are skipped. Returns the value together with the
/// offset just past the consumed characters. When no digit is found the
/// cursor is returned unchanged and the value is `0.0`; it is up to the
/// caller to decide whether that is an error.
///
/// Digit runs longer than `f32` can represent are still consumed in full,
/// the extra digits only take part in the usual nearest-value rounding.
pub fn parse_float(text: &str, pos: usize) -> (f32, usize) {
    let bytes = text.as_bytes();
    if pos > bytes.len() || !text.is_char_boundary(pos) {
        return (0.0, pos);
    }

    let mut i = pos;
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t') {
        i += 1;
    }
    let start = i;

    if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
        i += 1;
    }

    let int_digits = count_digits(&bytes[i..]);
    i += int_digits;

    let mut frac_digits = 0;
    if i < bytes.len() && bytes[i] == b'.' {
        frac_digits = count_digits(&bytes[i + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            i += 1 + frac_digits;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return (0.0, pos);
    }

    // The consumed slice only holds sign, digits and at most one '.',
    // which `f32::from_str` always accepts.
    let value = text[start..i].parse::<f32>().unwrap_or(0.0);
    (value, i)
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}
