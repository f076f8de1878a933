//! Human-readable sizes (`512k`, `0.5g`, `3500G`) expressed in mebibytes.

use std::sync::LazyLock;

use regex::Regex;

static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+(?:\.[0-9]*)?|\.[0-9]+)([kKmMgGtT]?)$").expect("size pattern is valid")
});

const KIB_PER_MIB: f64 = 1024.0;
const MIB_PER_GIB: f64 = 1024.0;
const MIB_PER_TIB: f64 = 1024.0 * 1024.0;

/// Input accepted by [`to_mebibytes`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeValue<'a> {
    /// Already a count of mebibytes.
    Number(f64),
    /// `<number>[kKmMgGtT]?`
    Text(&'a str),
}

impl From<f64> for SizeValue<'_> {
    fn from(value: f64) -> Self {
        SizeValue::Number(value)
    }
}

impl From<u64> for SizeValue<'_> {
    fn from(value: u64) -> Self {
        SizeValue::Number(value as f64)
    }
}

impl<'a> From<&'a str> for SizeValue<'a> {
    fn from(value: &'a str) -> Self {
        SizeValue::Text(value)
    }
}

impl<'a> From<&'a String> for SizeValue<'a> {
    fn from(value: &'a String) -> Self {
        SizeValue::Text(value.as_str())
    }
}

/// Convert a size to mebibytes. Unsuffixed values are already mebibytes.
///
/// Returns `None` for anything that is not a well-formed, non-negative size.
pub fn to_mebibytes<'a>(value: impl Into<SizeValue<'a>>) -> Option<f64> {
    match value.into() {
        SizeValue::Number(n) if n.is_finite() && n >= 0.0 => Some(n),
        SizeValue::Number(_) => None,
        SizeValue::Text(text) => {
            let caps = SIZE_RE.captures(text)?;
            let number: f64 = caps[1].parse().ok()?;
            let factor = match caps[2].to_ascii_lowercase().as_str() {
                "" | "m" => 1.0,
                "k" => 1.0 / KIB_PER_MIB,
                "g" => MIB_PER_GIB,
                "t" => MIB_PER_TIB,
                _ => return None,
            };
            Some(number * factor)
        }
    }
}

/// Render mebibytes with the largest unit that keeps the value integral.
///
/// Fractional mebibyte counts are rounded up to whole mebibytes.
pub fn format_mebibytes(mib: f64) -> String {
    let mib = mib.max(0.0).ceil() as u64;
    if mib == 0 {
        return "0M".to_string();
    }
    let tib = MIB_PER_TIB as u64;
    let gib = MIB_PER_GIB as u64;
    if mib % tib == 0 {
        format!("{}T", mib / tib)
    } else if mib % gib == 0 {
        format!("{}G", mib / gib)
    } else {
        format!("{mib}M")
    }
}
