//! Machine-identifier normalisation shared by the parsers and the reconciler.

use std::borrow::Cow;

/// Strip leading zeros from an all-digit identifier (`"0042"` → `"42"`,
/// `"000"` → `"0"`). Identifiers that are not purely ASCII digits come back
/// unchanged.
pub fn zero_stripped(id: &str) -> Cow<'_, str> {
    let id = id.trim();
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Cow::Borrowed(id);
    }
    let stripped = id.trim_start_matches('0');
    if stripped.is_empty() {
        Cow::Borrowed("0")
    } else {
        Cow::Borrowed(stripped)
    }
}

/// Integer value of the leading numeric prefix (`"42abc"` → 42, `" -7"` → -7).
/// `None` when the identifier does not start with a digit after an optional sign.
pub fn leading_integer(id: &str) -> Option<i64> {
    let id = id.trim();
    let (negative, rest) = match id.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, id.strip_prefix('+').unwrap_or(id)),
    };
    let end = rest
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    let value: i64 = rest[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Render a spreadsheet/JSON scalar as an identifier: integral floats lose
/// their fractional part (`100.0` → `"100"`).
pub fn float_to_id(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_stripping() {
        assert_eq!(zero_stripped("0042"), "42");
        assert_eq!(zero_stripped("42"), "42");
        assert_eq!(zero_stripped("000"), "0");
        assert_eq!(zero_stripped(" 007 "), "7");
        assert_eq!(zero_stripped("0A7"), "0A7");
        assert_eq!(zero_stripped(""), "");
    }

    #[test]
    fn leading_integer_prefix() {
        assert_eq!(leading_integer("42abc"), Some(42));
        assert_eq!(leading_integer("0042"), Some(42));
        assert_eq!(leading_integer(" -7"), Some(-7));
        assert_eq!(leading_integer("M-42"), None);
        assert_eq!(leading_integer(""), None);
    }

    #[test]
    fn float_ids() {
        assert_eq!(float_to_id(100.0), "100");
        assert_eq!(float_to_id(12.5), "12.5");
    }
}
