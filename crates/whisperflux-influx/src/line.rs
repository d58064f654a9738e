//! Line-protocol encoding.

use std::fmt::Write as _;

use whisperflux_types::Series;

use crate::Precision;

/// A series encoded as a line-protocol request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSeries {
    /// Newline-terminated lines.
    pub body: String,
    /// Number of lines in the body.
    pub lines: usize,
    /// Points dropped because their value is not finite.
    pub dropped: usize,
}

impl EncodedSeries {
    /// Returns true if there is nothing to write.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines == 0
    }
}

/// Encodes every point of `series` as `<measurement> value=<v> <timestamp>`.
///
/// Line protocol has no representation for NaN or infinities; such points
/// are dropped and counted.
#[must_use]
pub fn encode_series(series: &Series, precision: Precision) -> EncodedSeries {
    let measurement = escape_measurement(&series.name);
    let mut body = String::with_capacity(series.points.len() * (measurement.len() + 32));
    let mut lines = 0;
    let mut dropped = 0;

    for point in &series.points {
        if !point.has_finite_value() {
            dropped += 1;
            continue;
        }
        // writing into a String cannot fail
        let _ = writeln!(
            body,
            "{measurement} value={} {}",
            point.value,
            precision.scale(point.timestamp)
        );
        lines += 1;
    }

    EncodedSeries {
        body,
        lines,
        dropped,
    }
}

/// Escapes commas, spaces and backslashes in a measurement name.
fn escape_measurement(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, ',' | ' ' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
