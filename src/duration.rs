use regex::Regex;
use std::sync::OnceLock;

use crate::error::{AnalyzerError, Result};

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;
const SECONDS_PER_WEEK: u64 = 7 * SECONDS_PER_DAY;

fn duration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)(?:[.,]\d+)?S)?)?$",
        )
        .expect("duration pattern is valid")
    })
}

/// Parse an ISO-8601 duration such as `PT1H2M3S` into whole seconds.
///
/// Any subset of the week/day/hour/minute/second components may be present,
/// `P0D` and `PT0S` parse to zero. Fractional seconds are truncated.
/// A bare `P`, a dangling `T`, or anything outside the grammar is a
/// [`AnalyzerError::MalformedDuration`].
pub fn parse_duration(text: &str) -> Result<u64> {
    let token = text.trim();
    let malformed = || AnalyzerError::MalformedDuration(text.to_string());

    let caps = duration_pattern().captures(token).ok_or_else(malformed)?;

    let has_component = (1..=5).any(|i| caps.get(i).is_some());
    if !has_component || token.ends_with('T') {
        return Err(malformed());
    }

    let units = [
        SECONDS_PER_WEEK,
        SECONDS_PER_DAY,
        SECONDS_PER_HOUR,
        SECONDS_PER_MINUTE,
        1,
    ];

    let mut total: u64 = 0;
    for (i, unit) in units.iter().enumerate() {
        if let Some(m) = caps.get(i + 1) {
            let value: u64 = m.as_str().parse().map_err(|_| malformed())?;
            total = value
                .checked_mul(*unit)
                .and_then(|s| total.checked_add(s))
                .ok_or_else(malformed)?;
        }
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_components() {
        assert_eq!(parse_duration("PT2H").unwrap(), 7200);
        assert_eq!(parse_duration("PT15M").unwrap(), 900);
        assert_eq!(parse_duration("PT42S").unwrap(), 42);
    }

    #[test]
    fn test_all_components() {
        assert_eq!(parse_duration("PT1H2M3S").unwrap(), 3723);
        assert_eq!(parse_duration("P1DT1H").unwrap(), 90000);
        assert_eq!(parse_duration("P1W").unwrap(), 604800);
    }

    #[test]
    fn test_zero_durations() {
        assert_eq!(parse_duration("P0D").unwrap(), 0);
        assert_eq!(parse_duration("PT0S").unwrap(), 0);
    }

    #[test]
    fn test_fractional_seconds_truncate() {
        assert_eq!(parse_duration("PT1M30.75S").unwrap(), 90);
    }

    #[test]
    fn test_malformed_tokens() {
        for token in ["", "P", "PT", "P1DT", "1H2M", "PT1X", "PT-5S", "live"] {
            assert!(
                matches!(parse_duration(token), Err(AnalyzerError::MalformedDuration(_))),
                "expected {:?} to be rejected",
                token
            );
        }
    }
}
