//! Duration strings as reported by the coordinator.
//!
//! Presto renders durations like `"5.20s"`, `"988.83ms"` or `"1.50m"`, and
//! Go-style compound forms such as `"1m30s"` also appear in the wild. The
//! parser accepts both.

use std::time::Duration;

use crate::ValueError;

/// Suffix to nanoseconds multiplier (order matters: longer suffixes first)
const UNITS: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("µs", 1_000.0),
    ("us", 1_000.0),
    ("ms", 1_000_000.0),
    ("s", 1_000_000_000.0),
    ("m", 60_000_000_000.0),
    ("h", 3_600_000_000_000.0),
    ("d", 86_400_000_000_000.0),
];

/// Parse duration strings like "29.99s", "988.82ms", "16.958µs", "1m30s".
///
/// A bare `"0"` is accepted as zero; any other term needs a unit.
pub fn parse_duration(input: &str) -> Result<Duration, ValueError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ValueError::duration(input, "empty string"));
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut rest = s;
    let mut nanos = 0.0_f64;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(ValueError::duration(input, "expected a number"));
        }
        let (number, tail) = rest.split_at(number_len);
        let value: f64 = number
            .parse()
            .map_err(|_| ValueError::duration(input, "invalid number"))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        if unit_len == 0 {
            return Err(ValueError::duration(input, "missing unit"));
        }
        let (unit, tail) = tail.split_at(unit_len);
        let multiplier = UNITS
            .iter()
            .find(|(suffix, _)| *suffix == unit)
            .map(|(_, multiplier)| *multiplier)
            .ok_or_else(|| ValueError::duration(input, "unknown unit"))?;

        nanos += value * multiplier;
        rest = tail;
    }

    if !nanos.is_finite() || nanos > u64::MAX as f64 {
        return Err(ValueError::duration(input, "out of range"));
    }

    Ok(Duration::from_nanos(nanos.round() as u64))
}

/// Format a duration for display
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        "0ns".to_string()
    } else if nanos < 1_000 {
        format!("{}ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2}µs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2}ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}
