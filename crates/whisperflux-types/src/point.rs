//! Time-series point representation.

/// A single stored sample.
///
/// Whisper stores each slot as a `u32` timestamp followed by an `f64` value.
/// A slot that was never written has a zero timestamp; such points are
/// "no data" sentinels and must never reach the destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Unix timestamp in seconds.
    pub timestamp: u32,
    /// Sample value.
    pub value: f64,
}

impl Point {
    /// Size in bytes of an encoded point record.
    pub const SIZE: usize = 12;

    /// Creates a new point.
    #[must_use]
    pub const fn new(timestamp: u32, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Returns true if this is the "no data" sentinel (zero timestamp).
    #[must_use]
    pub const fn is_sentinel(&self) -> bool {
        self.timestamp == 0
    }

    /// Returns true if the value can be represented at the destination.
    #[must_use]
    pub const fn has_finite_value(&self) -> bool {
        self.value.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel() {
        assert!(Point::new(0, 1.0).is_sentinel());
        assert!(!Point::new(60, 0.0).is_sentinel());
    }

    #[test]
    fn test_finite_value() {
        assert!(Point::new(60, 1.5).has_finite_value());
        assert!(!Point::new(60, f64::NAN).has_finite_value());
        assert!(!Point::new(60, f64::INFINITY).has_finite_value());
    }
}
