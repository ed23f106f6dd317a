//! Interval literal parsing.
//!
//! Recurring tasks declare how often they run with a compact literal: a
//! positive count followed by a unit letter, e.g. `"30M"` or `"1h"`.
//! Units are S(econds), M(inutes), H(ours), D(ays), W(eeks),
//! case-insensitive. Parsing is the single source of truth for the
//! grammar; descriptors store the parsed [`Duration`], never the literal.

use std::time::Duration;

use crate::error::{HostError, Result};

/// Parse an interval literal into a duration.
///
/// # Errors
///
/// Returns [`HostError::MalformedInterval`] when the literal does not match
/// `<positive integer><S|M|H|D|W>`, the count is zero, or the total number
/// of seconds overflows.
pub fn parse_interval(literal: &str) -> Result<Duration> {
    let malformed = || HostError::MalformedInterval {
        literal: literal.to_owned(),
    };

    let mut chars = literal.chars();
    let unit = chars.next_back().ok_or_else(malformed)?;
    let digits = chars.as_str();

    let unit_secs: u64 = match unit.to_ascii_uppercase() {
        'S' => 1,
        'M' => 60,
        'H' => 3_600,
        'D' => 86_400,
        'W' => 604_800,
        _ => return Err(malformed()),
    };

    // Explicit digit check: u64::parse would also accept a leading `+`.
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    let count: u64 = digits.parse().map_err(|_| malformed())?;
    if count == 0 {
        return Err(malformed());
    }

    let secs = count.checked_mul(unit_secs).ok_or_else(malformed)?;
    Ok(Duration::from_secs(secs))
}

/// Human-readable rendering of an interval, e.g. `"every 2 hours"`.
pub fn format_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    if secs >= 604_800 && secs % 604_800 == 0 {
        format!("every {} weeks", secs / 604_800)
    } else if secs >= 86_400 && secs % 86_400 == 0 {
        format!("every {} days", secs / 86_400)
    } else if secs >= 3_600 && secs % 3_600 == 0 {
        format!("every {} hours", secs / 3_600)
    } else if secs >= 60 && secs % 60 == 0 {
        format!("every {} minutes", secs / 60)
    } else {
        format!("every {secs} seconds")
    }
}
