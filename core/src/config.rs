//! Small environment-variable configuration helpers shared by every
//! service's `Config::from_env()`.

use std::time::Duration;

/// Read a boolean flag from the environment. Unset or unparseable values
/// default to `false`, matching spec §6's `*_ENABLED` convention.
#[must_use]
pub fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

/// Read a plain string from the environment, falling back to `default`.
#[must_use]
pub fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an optional string from the environment (`None` if unset or empty).
#[must_use]
pub fn env_opt_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Read an integer from the environment, falling back to `default` if
/// unset or unparseable.
#[must_use]
pub fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse a human-readable duration like `"1h"`, `"30s"`, `"90d"`, `"45m"`.
/// A bare integer is interpreted as seconds.
///
/// # Errors
///
/// Returns an error message if `s` has an unrecognized suffix or the
/// numeric portion does not parse.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let (number, unit) = s.split_at(s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len()));
    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration: {s}"))?;

    let seconds = match unit {
        "" | "s" => value,
        "m" => value * 60,
        "h" => value * 3600,
        "d" => value * 86400,
        other => return Err(format!("unrecognized duration unit: {other}")),
    };

    Ok(Duration::from_secs(seconds))
}

/// Read a duration from the environment (see [`parse_duration`]), falling
/// back to `default` if unset or unparseable.
#[must_use]
pub fn env_duration(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| parse_duration(&v).ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[test]
    fn parse_duration_handles_each_unit() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("45m").unwrap(), Duration::from_secs(45 * 60));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("90d").unwrap(), Duration::from_secs(90 * 86400));
        assert_eq!(parse_duration("5").unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn parse_duration_rejects_unknown_unit() {
        assert!(parse_duration("5x").is_err());
    }

    #[test]
    fn env_bool_defaults_when_unset() {
        std::env::remove_var("CORE_TEST_FLAG_UNSET");
        assert!(!env_bool("CORE_TEST_FLAG_UNSET", false));
        assert!(env_bool("CORE_TEST_FLAG_UNSET", true));
    }
}
