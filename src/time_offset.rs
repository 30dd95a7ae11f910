/**
 * Signed clock offset parsing ("+2h30m", "-45s", "1h15m30s")
 */

use chrono::TimeDelta;
use regex::Regex;
use std::sync::OnceLock;

fn offset_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<sign>[+-])?(?:(?P<hours>\d+)h)?(?:(?P<minutes>\d+)m)?(?:(?P<seconds>\d+)s)?$")
            .expect("offset pattern is valid")
    })
}

/// Parse an offset expression into a signed duration.
///
/// The optional leading sign applies to every unit. Units must appear in
/// `h`, `m`, `s` order and at least one must be present. Returns `None` for
/// anything else, including values too large to represent.
pub fn parse_offset(expr: &str) -> Option<TimeDelta> {
    let caps = offset_pattern().captures(expr.trim())?;

    let unit = |name: &str| -> Option<Option<i64>> {
        match caps.name(name) {
            Some(m) => m.as_str().parse::<i64>().ok().map(Some),
            None => Some(None),
        }
    };

    let hours = unit("hours")?;
    let minutes = unit("minutes")?;
    let seconds = unit("seconds")?;

    if hours.is_none() && minutes.is_none() && seconds.is_none() {
        return None;
    }

    let total = hours
        .unwrap_or(0)
        .checked_mul(3600)?
        .checked_add(minutes.unwrap_or(0).checked_mul(60)?)?
        .checked_add(seconds.unwrap_or(0))?;

    let signed = match caps.name("sign").map(|m| m.as_str()) {
        Some("-") => total.checked_neg()?,
        _ => total,
    };

    TimeDelta::try_seconds(signed)
}
