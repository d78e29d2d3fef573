//! Duration value object

use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use crate::domain::error::DurationParseError;

/// Default metering poll interval (100 milliseconds)
pub const DEFAULT_METERING_INTERVAL_MS: u64 = 100;

/// Default playback status poll interval (100 milliseconds)
pub const DEFAULT_STATUS_INTERVAL_MS: u64 = 100;

/// Default delay before re-probing a missing recording (300 milliseconds)
pub const DEFAULT_EXISTENCE_RETRY_MS: u64 = 300;

/// Default maximum age of a cache entry (7 days)
pub const DEFAULT_CACHE_MAX_AGE_MS: u64 = 7 * MS_PER_DAY;

const MS_PER_SECOND: u64 = 1000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// Value object representing a time span.
/// Immutable and validated on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration {
    milliseconds: u64,
}

impl Duration {
    /// Create a Duration from milliseconds
    pub const fn from_millis(ms: u64) -> Self {
        Self { milliseconds: ms }
    }

    /// Create a Duration from seconds
    pub const fn from_secs(secs: u64) -> Self {
        Self {
            milliseconds: secs * MS_PER_SECOND,
        }
    }

    /// Create a Duration from days
    pub const fn from_days(days: u64) -> Self {
        Self {
            milliseconds: days * MS_PER_DAY,
        }
    }

    pub const fn default_metering_interval() -> Self {
        Self::from_millis(DEFAULT_METERING_INTERVAL_MS)
    }

    pub const fn default_status_interval() -> Self {
        Self::from_millis(DEFAULT_STATUS_INTERVAL_MS)
    }

    pub const fn default_existence_retry() -> Self {
        Self::from_millis(DEFAULT_EXISTENCE_RETRY_MS)
    }

    pub const fn default_cache_max_age() -> Self {
        Self::from_millis(DEFAULT_CACHE_MAX_AGE_MS)
    }

    /// Get duration in whole seconds
    pub const fn as_secs(&self) -> u64 {
        self.milliseconds / MS_PER_SECOND
    }

    /// Get duration in milliseconds
    pub const fn as_millis(&self) -> u64 {
        self.milliseconds
    }

    /// Convert to std::time::Duration
    pub const fn as_std(&self) -> StdDuration {
        StdDuration::from_millis(self.milliseconds)
    }

    fn unit_millis(unit: &str) -> Option<u64> {
        match unit {
            "ms" => Some(1),
            "s" => Some(MS_PER_SECOND),
            "m" => Some(MS_PER_MINUTE),
            "h" => Some(MS_PER_HOUR),
            "d" => Some(MS_PER_DAY),
            _ => None,
        }
    }
}

impl FromStr for Duration {
    type Err = DurationParseError;

    /// Parse a duration string into a Duration value object.
    /// Supported formats: "100ms", "30s", "2m30s", "12h", "7d"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim().to_lowercase();
        let err = || DurationParseError {
            input: s.to_string(),
        };

        let mut total_ms: u64 = 0;
        let mut number = String::new();
        let mut unit = String::new();

        let mut commit = |number: &mut String, unit: &mut String| -> Result<(), DurationParseError> {
            let value: u64 = number.parse().map_err(|_| err())?;
            let scale = Duration::unit_millis(unit).ok_or_else(err)?;
            total_ms = value
                .checked_mul(scale)
                .and_then(|v| total_ms.checked_add(v))
                .ok_or_else(err)?;
            number.clear();
            unit.clear();
            Ok(())
        };

        for ch in input.chars() {
            if ch.is_ascii_digit() {
                if !unit.is_empty() {
                    commit(&mut number, &mut unit)?;
                }
                number.push(ch);
            } else if ch.is_ascii_alphabetic() && !number.is_empty() {
                unit.push(ch);
            } else {
                return Err(err());
            }
        }

        if number.is_empty() || unit.is_empty() {
            // Trailing bare number, or nothing at all
            return Err(err());
        }
        commit(&mut number, &mut unit)?;

        if total_ms == 0 {
            return Err(err());
        }

        Ok(Self {
            milliseconds: total_ms,
        })
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.milliseconds == 0 {
            return write!(f, "0ms");
        }

        let mut rest = self.milliseconds;
        for (unit, scale) in [
            ("d", MS_PER_DAY),
            ("h", MS_PER_HOUR),
            ("m", MS_PER_MINUTE),
            ("s", MS_PER_SECOND),
            ("ms", 1),
        ] {
            let count = rest / scale;
            if count > 0 {
                write!(f, "{}{}", count, unit)?;
                rest %= scale;
            }
        }
        Ok(())
    }
}

impl From<Duration> for StdDuration {
    fn from(d: Duration) -> Self {
        d.as_std()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_milliseconds() {
        let d: Duration = "100ms".parse().unwrap();
        assert_eq!(d.as_millis(), 100);
    }

    #[test]
    fn parse_seconds_only() {
        let d: Duration = "30s".parse().unwrap();
        assert_eq!(d.as_secs(), 30);
        assert_eq!(d.as_millis(), 30_000);
    }

    #[test]
    fn parse_minutes_and_seconds() {
        let d: Duration = "2m30s".parse().unwrap();
        assert_eq!(d.as_secs(), 150);
    }

    #[test]
    fn parse_days() {
        let d: Duration = "7d".parse().unwrap();
        assert_eq!(d, Duration::default_cache_max_age());
    }

    #[test]
    fn parse_mixed_units() {
        let d: Duration = "1d12h".parse().unwrap();
        assert_eq!(d.as_millis(), 36 * MS_PER_HOUR);
        let d: Duration = "1s500ms".parse().unwrap();
        assert_eq!(d.as_millis(), 1500);
    }

    #[test]
    fn parse_case_insensitive_with_whitespace() {
        let d: Duration = "  1M30S ".parse().unwrap();
        assert_eq!(d.as_secs(), 90);
    }

    #[test]
    fn parse_invalid_empty() {
        assert!("".parse::<Duration>().is_err());
    }

    #[test]
    fn parse_invalid_zero() {
        assert!("0s".parse::<Duration>().is_err());
        assert!("0m0ms".parse::<Duration>().is_err());
    }

    #[test]
    fn parse_invalid_format() {
        assert!("30".parse::<Duration>().is_err());
        assert!("abc".parse::<Duration>().is_err());
        assert!("30x".parse::<Duration>().is_err());
        assert!("5w".parse::<Duration>().is_err());
        assert!("s30".parse::<Duration>().is_err());
    }

    #[test]
    fn display_picks_components() {
        assert_eq!(Duration::from_millis(100).to_string(), "100ms");
        assert_eq!(Duration::from_secs(150).to_string(), "2m30s");
        assert_eq!(Duration::from_days(7).to_string(), "7d");
        assert_eq!(Duration::from_millis(1500).to_string(), "1s500ms");
    }

    #[test]
    fn display_parses_back() {
        for d in [
            Duration::from_millis(250),
            Duration::from_secs(3600),
            Duration::from_days(2),
        ] {
            assert_eq!(d.to_string().parse::<Duration>().unwrap(), d);
        }
    }

    #[test]
    fn default_values() {
        assert_eq!(Duration::default_metering_interval().as_millis(), 100);
        assert_eq!(Duration::default_status_interval().as_millis(), 100);
        assert_eq!(Duration::default_existence_retry().as_millis(), 300);
        assert_eq!(Duration::default_cache_max_age().as_millis(), 604_800_000);
    }
}
