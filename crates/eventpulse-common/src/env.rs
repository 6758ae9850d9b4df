use std::time::Duration;

/// Trimmed value of `key`, or `default` when unset or blank.
pub fn string_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default.to_string(),
    }
}

/// Trimmed value of `key`, `None` when unset or blank.
pub fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Comma-separated list value of `key`; blank entries are dropped.
pub fn list(key: &str) -> Vec<String> {
    optional(key)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Duration value of `key` (humantime syntax, e.g. `10s`, `1m`), or
/// `default` when unset or unparseable.
pub fn duration_or(key: &str, default: Duration) -> Duration {
    optional(key)
        .and_then(|v| humantime::parse_duration(&v).ok())
        .unwrap_or(default)
}

/// Positive integer value of `key`, or `default` when unset, unparseable,
/// or non-positive.
pub fn positive_or(key: &str, default: u32) -> u32 {
    optional(key)
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_drops_blank_entries() {
        std::env::set_var("EP_TEST_LIST", " a, ,b,");
        assert_eq!(list("EP_TEST_LIST"), vec!["a".to_string(), "b".to_string()]);
        std::env::remove_var("EP_TEST_LIST");
    }

    #[test]
    fn duration_or_falls_back_on_garbage() {
        std::env::set_var("EP_TEST_DUR", "not-a-duration");
        assert_eq!(
            duration_or("EP_TEST_DUR", Duration::from_secs(10)),
            Duration::from_secs(10)
        );
        std::env::set_var("EP_TEST_DUR", "250ms");
        assert_eq!(
            duration_or("EP_TEST_DUR", Duration::from_secs(10)),
            Duration::from_millis(250)
        );
        std::env::remove_var("EP_TEST_DUR");
    }

    #[test]
    fn positive_or_rejects_zero() {
        std::env::set_var("EP_TEST_POS", "0");
        assert_eq!(positive_or("EP_TEST_POS", 3), 3);
        std::env::set_var("EP_TEST_POS", "5");
        assert_eq!(positive_or("EP_TEST_POS", 3), 5);
        std::env::remove_var("EP_TEST_POS");
    }
}
