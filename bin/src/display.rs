//! Display utilities and argument parsing for the whisperflux CLI.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use whisperflux_lib::to_unix;

/// Parses a timestamp given as unix seconds or a `YYYY-MM-DD` date (midnight UTC).
pub(crate) fn parse_timestamp(s: &str) -> Result<u32> {
    if let Ok(secs) = s.parse::<u32>() {
        return Ok(secs);
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid time '{s}': expected unix seconds or YYYY-MM-DD"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("Invalid time '{s}'"))?
        .and_utc();
    Ok(to_unix(midnight)?)
}

/// Formats a span of seconds using its two largest units, e.g. `1y 5d` or `6h`.
pub(crate) fn format_span(secs: u32) -> String {
    const UNITS: [(&str, u32); 5] = [
        ("y", 365 * 86_400),
        ("d", 86_400),
        ("h", 3_600),
        ("m", 60),
        ("s", 1),
    ];

    if secs == 0 {
        return "0s".to_string();
    }

    let mut rest = secs;
    let mut parts = Vec::with_capacity(2);
    for (suffix, size) in UNITS {
        if rest >= size {
            parts.push(format!("{}{suffix}", rest / size));
            rest %= size;
        } else if !parts.is_empty() {
            break;
        }
        if parts.len() == 2 {
            break;
        }
    }
    parts.join(" ")
}

/// Formats a byte count with a binary unit.
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
