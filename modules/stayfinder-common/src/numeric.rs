//! Numeric attribute values.
//!
//! Attribute values are free text. A value counts as a number only when it
//! matches [`NUMERIC_PATTERN`], is at most [`MAX_NUMERIC_LEN`] bytes long and
//! parses to a finite `f64`. Anything else reads as absent, never as an error.
//! The Postgres store applies the same rule in SQL so that pushed-down
//! predicates agree with the in-memory check.

use std::sync::LazyLock;

use regex::Regex;

/// Decimal number with optional sign and a short exponent, surrounded by
/// ASCII blanks.
pub const NUMERIC_PATTERN: &str =
    r"^[ \t\r\n]*[-+]?([0-9]+\.?[0-9]*|\.[0-9]+)([eE][-+]?[0-9]{1,3})?[ \t\r\n]*$";

pub const MAX_NUMERIC_LEN: usize = 64;

static NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NUMERIC_PATTERN).expect("numeric pattern is valid"));

/// Parse an attribute value as a number, `None` when it is not one.
/// Magnitudes beyond `f64` read as absent; values too small for `f64` read
/// as zero.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    if raw.len() > MAX_NUMERIC_LEN || !NUMERIC.is_match(raw) {
        return None;
    }
    raw.trim_matches([' ', '\t', '\r', '\n'])
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_decimals_parse() {
        assert_eq!(parse_numeric("120"), Some(120.0));
        assert_eq!(parse_numeric(" 89.50 "), Some(89.5));
        assert_eq!(parse_numeric("-3."), Some(-3.0));
        assert_eq!(parse_numeric("+.5"), Some(0.5));
        assert_eq!(parse_numeric("1e1"), Some(10.0));
    }

    #[test]
    fn text_reads_as_absent() {
        for raw in ["", " ", "on request", "NaN", "inf", "infinity", "1,5", "0x10", "1e", "."] {
            assert_eq!(parse_numeric(raw), None, "{raw:?}");
        }
    }

    #[test]
    fn out_of_range_magnitudes() {
        assert_eq!(parse_numeric("1e400"), None);
        assert_eq!(parse_numeric("-1e400"), None);
        assert_eq!(parse_numeric("1e-400"), Some(0.0));
        assert_eq!(parse_numeric("1e999"), None);
        assert_eq!(parse_numeric("1e1000"), None);
    }

    #[test]
    fn overlong_values_read_as_absent() {
        let long = format!("1{}", "0".repeat(MAX_NUMERIC_LEN));
        assert_eq!(parse_numeric(&long), None);
        assert_eq!(parse_numeric(&long[..MAX_NUMERIC_LEN]), Some(1e63));
    }
}
