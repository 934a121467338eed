//! Human-readable duration strings for the services config.
//!
//! Timeouts and health-check intervals are written as strings like `"10s"`,
//! `"500ms"` or `"1m"`. Bare numbers are seconds.

use std::time::Duration;

/// Parse a duration string (`"500ms"`, `"10s"`, `"2m"`, `"30"`).
///
/// Returns `None` for anything that is not a non-negative integer with an
/// optional `ms`/`s`/`m` suffix.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (digits, unit): (&str, fn(u64) -> Duration) = if let Some(n) = s.strip_suffix("ms") {
        (n, Duration::from_millis)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, Duration::from_secs)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, |m| Duration::from_secs(m * 60))
    } else {
        (s, Duration::from_secs)
    };

    digits.trim().parse::<u64>().ok().map(unit)
}

/// Render a duration back into the shortest config-friendly string.
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis % 60_000 == 0 && millis > 0 {
        format!("{}m", millis / 60_000)
    } else if millis % 1_000 == 0 {
        format!("{}s", millis / 1_000)
    } else {
        format!("{}ms", millis)
    }
}

/// Serde adapter for `Duration` fields, used with `#[serde(with = "...")]`.
/// Accepts both the string forms above and unquoted YAML integers (seconds).
pub(crate) mod serde_duration {
    use super::{format_duration, parse_duration};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
            Raw::Text(raw) => parse_duration(&raw)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid duration '{}'", raw))),
        }
    }
}
