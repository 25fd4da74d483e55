//! Recognition logic for the atomic scanners: `Dot`, `Literal`,
//! `CharacterClass`, `Regex`, `Spacing`, `Integer`, `Float`, and
//! `BoundedString`.

use crate::input::Input;
use crate::scanner::charclass::CharClass;

/// Matches exactly one code point.
pub(super) fn scan_dot(input: &Input<'_>, pos: usize) -> Option<usize> {
    input.char_at(pos).map(|_| pos + 1)
}

/// Matches the literal text `x`, measured and compared in code points.
pub(super) fn scan_literal(input: &Input<'_>, pos: usize, x: &str) -> Option<usize> {
    let len = x.chars().count();
    let end = pos + len;
    if input.slice(pos, end)? == x {
        Some(end)
    } else {
        None
    }
}

/// Matches one code point belonging to `class`.
pub(super) fn scan_character_class(
    input: &Input<'_>,
    pos: usize,
    class: &CharClass,
) -> Option<usize> {
    let c = input.char_at(pos)?;
    if class.contains(c) {
        Some(pos + 1)
    } else {
        None
    }
}

/// Matches `pattern` anchored exactly at `pos`.
///
/// `regex` must already be compiled with an `\A` anchor prefix so that a
/// match can only start at byte offset 0 of whatever slice it's run
/// against (see [`crate::scanner::compile_anchored_regex`]).
pub(super) fn scan_regex(input: &Input<'_>, pos: usize, regex: &regex::Regex) -> Option<usize> {
    let byte_pos = input.byte_pos(pos)?;
    let haystack = &input.source()[byte_pos..];
    let m = regex.find(haystack)?;
    debug_assert_eq!(m.start(), 0, "anchored regex must match at offset 0");
    input.pos_from_byte_offset(byte_pos + m.end())
}

/// Consumes zero or more code points in `ws`; always succeeds.
pub(super) fn scan_spacing(input: &Input<'_>, pos: usize, ws: &[char]) -> usize {
    let mut p = pos;
    while let Some(c) = input.char_at(p) {
        if ws.contains(&c) {
            p += 1;
        } else {
            break;
        }
    }
    p
}

/// Counts a run of ASCII digits starting at `pos`; does not itself
/// signal `NoMatch`, since a count of zero is meaningful to callers.
fn scan_digits(input: &Input<'_>, pos: usize) -> usize {
    let mut n = 0;
    while let Some(c) = input.char_at(pos + n) {
        if c.is_ascii_digit() {
            n += 1;
        } else {
            break;
        }
    }
    n
}

/// Scans an optional `[eE][-+]?\d+` exponent tail; returns the number of
/// code points consumed, or `0` if there is no well-formed exponent
/// (including a dangling `e`/`e+` with no following digits).
fn scan_exponent(input: &Input<'_>, pos: usize) -> usize {
    match input.char_at(pos) {
        Some('e') | Some('E') => {}
        _ => return 0,
    }
    match input.char_at(pos + 1) {
        Some('-') | Some('+') => {
            let n = scan_digits(input, pos + 2);
            if n > 0 { n + 2 } else { 0 }
        }
        _ => {
            let n = scan_digits(input, pos + 1);
            if n > 0 { n + 1 } else { 0 }
        }
    }
}

/// Matches `[-+]? \d+`; requires at least one digit.
pub(super) fn scan_integer(input: &Input<'_>, pos: usize) -> Option<usize> {
    let mut p = pos;
    if matches!(input.char_at(p), Some('-') | Some('+')) {
        p += 1;
    }
    let n = scan_digits(input, p);
    if n == 0 { None } else { Some(p + n) }
}

/// Matches one of the three float shapes described in
/// [`crate::scanner`]'s module documentation. Bare integers never match.
pub(super) fn scan_float(input: &Input<'_>, pos: usize) -> Option<usize> {
    let mut p = pos;
    if matches!(input.char_at(p), Some('-') | Some('+')) {
        p += 1;
    }
    if input.char_at(p) == Some('.') {
        let frac = scan_digits(input, p + 1);
        if frac == 0 {
            return None;
        }
        p += frac + 1;
        p += scan_exponent(input, p);
        Some(p)
    } else {
        let whole = scan_digits(input, p);
        if whole == 0 {
            return None;
        }
        p += whole;
        if input.char_at(p) == Some('.') {
            p += 1;
            p += scan_digits(input, p);
            p += scan_exponent(input, p);
            Some(p)
        } else {
            let exp = scan_exponent(input, p);
            if exp == 0 { None } else { Some(p + exp) }
        }
    }
}

/// Matches `open`, then consumes up to and including the first
/// unescaped `close`. A backslash escapes the following code point.
pub(super) fn scan_bounded_string(
    input: &Input<'_>,
    pos: usize,
    open: &str,
    close: &str,
) -> Option<usize> {
    let mut p = scan_literal(input, pos, open)?;
    let close_len = close.chars().count();
    loop {
        if input.slice(p, p + close_len) == Some(close) {
            return Some(p + close_len);
        }
        match input.char_at(p)? {
            '\\' => p += 2,
            _ => p += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(s: &str) -> Input<'_> {
        Input::new(s)
    }

    #[test]
    fn dot_fails_at_end() {
        let i = input("a");
        assert_eq!(scan_dot(&i, 0), Some(1));
        assert_eq!(scan_dot(&i, 1), None);
    }

    #[test]
    fn literal_matches_exact_text() {
        let i = input("hello world");
        assert_eq!(scan_literal(&i, 0, "hello"), Some(5));
        assert_eq!(scan_literal(&i, 0, "world"), None);
    }

    #[test]
    fn float_shapes() {
        for (s, expected) in [
            ("1.0", Some(3)),
            (".5", Some(2)),
            ("1e5", Some(3)),
            ("-1.0e+5", Some(7)),
            ("1", None),
            ("-", None),
        ] {
            let i = input(s);
            assert_eq!(scan_float(&i, 0), expected, "input {s:?}");
        }
    }

    #[test]
    fn bounded_string_with_escape() {
        let i = input(r#""one\"two""#);
        assert_eq!(scan_bounded_string(&i, 0, "\"", "\""), Some(10));
    }

    #[test]
    fn integer_requires_digit() {
        let i = input("-");
        assert_eq!(scan_integer(&i, 0), None);
        let i = input("-42");
        assert_eq!(scan_integer(&i, 0), Some(3));
    }
}
