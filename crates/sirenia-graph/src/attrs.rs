//! Typed attribute access.
//!
//! Attributes are kept as strings, in insertion order. Numbers below their minimum are clamped
//! silently; unparsable values warn once per kind and fall back to the default.

use crate::warn::{WarningKind, Warnings};
use indexmap::IndexMap;

pub type Attrs = IndexMap<String, String>;

/// Looks `name` up in `own`, then in the inherited defaults.
pub fn lookup<'a>(own: &'a Attrs, defaults: &'a Attrs, name: &str) -> Option<&'a str> {
    own.get(name)
        .or_else(|| defaults.get(name))
        .map(String::as_str)
}

pub fn parse_double(
    raw: Option<&str>,
    name: &str,
    default: f64,
    min: f64,
    warnings: &mut Warnings,
) -> f64 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return default;
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => v.max(min),
        _ => {
            warnings.warn(
                WarningKind::MalformedAttribute,
                format!("invalid value {raw:?} for attribute {name:?}; using {default}"),
            );
            default
        }
    }
}

pub fn parse_int(
    raw: Option<&str>,
    name: &str,
    default: i32,
    min: i32,
    warnings: &mut Warnings,
) -> i32 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return default;
    };
    match raw.parse::<i64>() {
        Ok(v) => v.clamp(i64::from(min), i64::from(i32::MAX)) as i32,
        Err(_) => {
            warnings.warn(
                WarningKind::MalformedAttribute,
                format!("invalid value {raw:?} for attribute {name:?}; using {default}"),
            );
            default
        }
    }
}

pub fn parse_bool(raw: Option<&str>, name: &str, default: bool, warnings: &mut Warnings) -> bool {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return default;
    };
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" => true,
        "false" | "no" => false,
        other => match other.parse::<i64>() {
            Ok(v) => v != 0,
            Err(_) => {
                warnings.warn(
                    WarningKind::MalformedAttribute,
                    format!("invalid value {raw:?} for boolean attribute {name:?}"),
                );
                default
            }
        },
    }
}

/// Parses `"x,y"` (optionally suffixed with `!`). Returns the point and the pin flag.
pub fn parse_point(raw: &str) -> Option<(f64, f64, bool)> {
    let raw = raw.trim();
    let (body, pinned) = match raw.strip_suffix('!') {
        Some(b) => (b, true),
        None => (raw, false),
    };
    let mut it = body.split(',');
    let x = it.next()?.trim().parse::<f64>().ok()?;
    let y = it.next()?.trim().parse::<f64>().ok()?;
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    // A third coordinate is accepted and ignored.
    if let Some(z) = it.next() {
        z.trim().parse::<f64>().ok()?;
    }
    if it.next().is_some() {
        return None;
    }
    Some((x, y, pinned))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_clamp_and_fall_back() {
        let mut w = Warnings::new();
        assert_eq!(parse_double(Some("0.02"), "ranksep", 0.5, 0.02, &mut w), 0.02);
        assert_eq!(parse_double(Some("0.001"), "ranksep", 0.5, 0.02, &mut w), 0.02);
        assert_eq!(parse_double(Some("wide"), "ranksep", 0.5, 0.02, &mut w), 0.5);
        assert_eq!(parse_double(None, "ranksep", 0.5, 0.02, &mut w), 0.5);
        assert!(w.has(WarningKind::MalformedAttribute));
    }

    #[test]
    fn ints_clamp_to_min() {
        let mut w = Warnings::new();
        assert_eq!(parse_int(Some("-3"), "minlen", 1, 0, &mut w), 0);
        assert_eq!(parse_int(Some(" 7 "), "minlen", 1, 0, &mut w), 7);
        assert!(w.is_empty());
    }

    #[test]
    fn points_with_pin_suffix() {
        assert_eq!(parse_point("1.5,2!"), Some((1.5, 2.0, true)));
        assert_eq!(parse_point("1,2,3"), Some((1.0, 2.0, false)));
        assert_eq!(parse_point("1;2"), None);
    }
}
