use super::error::{Result, ScribeError};

pub const KB: u64 = 1024;
pub const MB: u64 = KB * 1024;
pub const GB: u64 = MB * 1024;
pub const TB: u64 = GB * 1024;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

// Longer suffixes first so "B" never shadows "KB".
const SUFFIXES: [(&str, u64); 5] = [("TB", TB), ("GB", GB), ("MB", MB), ("KB", KB), ("B", 1)];

/// Parses strings such as `"1.5gb"`, `"24,5 MB"` or `"512B"` into a byte count.
///
/// Fractional bytes are truncated.
pub fn parse_size(text: &str) -> Result<u64> {
    let invalid = || ScribeError::InvalidSizeFormat(text.to_string());
    let normalized = text.trim().to_ascii_uppercase().replace(',', ".");

    for (suffix, multiplier) in SUFFIXES {
        if let Some(number) = normalized.strip_suffix(suffix) {
            let number = number.trim();
            if !is_plain_decimal(number) {
                return Err(invalid());
            }
            let value: f64 = number.parse().map_err(|_| invalid())?;
            let bytes = value * multiplier as f64;
            // u64::MAX as f64 rounds up to 2^64, which no longer fits.
            if !bytes.is_finite() || bytes >= u64::MAX as f64 {
                return Err(invalid());
            }
            return Ok(bytes as u64);
        }
    }

    Err(invalid())
}

/// Digits with at most one `.` separator; no sign or exponent.
fn is_plain_decimal(number: &str) -> bool {
    number.bytes().any(|b| b.is_ascii_digit())
        && number.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        && number.bytes().filter(|&b| b == b'.').count() <= 1
}

/// Formats a byte count with one decimal digit, e.g. `1536 -> "1.5 KB"`.
pub fn format_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
