//! Lenient integer coercion for spreadsheet quantity cells.
//!
//! Spreadsheet exports carry blanks, formula errors and float renderings
//! (`"12.0"`) in numeric columns. Every such cell still has to land in an
//! integer column, so anything that is not a number becomes `0` and the reason
//! is reported as a [`Fallback`].

use std::borrow::Cow;

/// Formula error markers that spreadsheet tools write into cells.
pub const SPREADSHEET_ERRORS: [&str; 2] = ["#REF!", "#VALUE!"];

/// Why a cell was coerced to `0` instead of parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Column absent or cell empty.
    Missing,
    /// Cell holds only whitespace.
    Blank,
    /// Cell holds a formula error marker (`#REF!`, `#VALUE!`).
    SpreadsheetError,
    /// Cell text is not a number (e.g. `"12,0"`, `"abc"`).
    NotANumber,
    /// Number is NaN, infinite, or does not fit in `i64` once truncated.
    OutOfRange,
}

/// Result of a lenient coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coerced {
    pub value: i64,
    pub fallback: Option<Fallback>,
}

impl Coerced {
    fn parsed(value: i64) -> Self {
        Self { value, fallback: None }
    }

    fn zero(reason: Fallback) -> Self {
        Self {
            value: 0,
            fallback: Some(reason),
        }
    }
}

/// Coerce a raw cell into an integer quantity.
///
/// The cell is parsed as a float and truncated toward zero, so `"12.9"` is 12
/// and `"-3.5"` is -3. Values past 2^53 lose precision in the float step.
pub fn lenient_quantity(raw: Option<&str>) -> Coerced {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return Coerced::zero(Fallback::Missing);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Coerced::zero(Fallback::Blank);
    }
    if SPREADSHEET_ERRORS.contains(&trimmed) {
        return Coerced::zero(Fallback::SpreadsheetError);
    }

    let Some(number) = strip_digit_separators(trimmed) else {
        return Coerced::zero(Fallback::NotANumber);
    };

    match number.parse::<f64>() {
        Ok(f) => match truncate_to_i64(f) {
            Some(v) => Coerced::parsed(v),
            None => Coerced::zero(Fallback::OutOfRange),
        },
        Err(_) => Coerced::zero(Fallback::NotANumber),
    }
}

/// Remove `_` digit-group separators (`"1_000"`).
///
/// A separator must sit between two ASCII digits; text with a misplaced one
/// (`"_1"`, `"1__0"`, `"1_"`) is not a number and yields `None`.
pub(crate) fn strip_digit_separators(raw: &str) -> Option<Cow<'_, str>> {
    if !raw.contains('_') {
        return Some(Cow::Borrowed(raw));
    }
    let bytes = raw.as_bytes();
    let well_placed = bytes.iter().enumerate().all(|(i, &b)| {
        b != b'_'
            || (i > 0
                && bytes[i - 1].is_ascii_digit()
                && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
    });
    well_placed.then(|| Cow::Owned(raw.replace('_', "")))
}

/// Truncate toward zero, rejecting NaN, infinities and values outside `i64`.
pub(crate) fn truncate_to_i64(f: f64) -> Option<i64> {
    // 2^63 is exactly representable; i64::MAX is not.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    if !f.is_finite() {
        return None;
    }
    let t = f.trunc();
    if t < -LIMIT || t >= LIMIT {
        return None;
    }
    Some(t as i64)
}
