use chrono::Utc;
use std::sync::Mutex;

static LAST_NANOS: Mutex<i64> = Mutex::new(0);

/// Nanosecond wall-clock value, strictly increasing within this process.
///
/// Successive calls that land on the same clock reading are bumped by one,
/// so two ids generated back to back never collide. Uniqueness across
/// processes relies on the per-service key spaces (each emitter prefixes
/// its own ids).
pub fn monotonic_nanos() -> i64 {
    let mut last = LAST_NANOS.lock().unwrap();
    let mut now = Utc::now().timestamp_nanos_opt().unwrap_or(*last);
    if now <= *last {
        now = *last + 1;
    }
    *last = now;
    now
}

/// Fresh incident id (`inc-<nanos>`), one per rule decision.
pub fn incident_id() -> String {
    format!("inc-{}", monotonic_nanos())
}

/// Fresh action id (`act-<nanos>`), one per requested action.
pub fn action_id() -> String {
    format!("act-{}", monotonic_nanos())
}

/// Fallback dedup key for messages that arrive without one.
pub fn fallback_dedup_key() -> String {
    monotonic_nanos().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn monotonic_nanos_never_repeats() {
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(monotonic_nanos()), "duplicate nanos value");
        }
    }

    #[test]
    fn ids_carry_their_prefix() {
        assert!(incident_id().starts_with("inc-"));
        assert!(action_id().starts_with("act-"));
    }

    #[test]
    fn ids_are_strictly_increasing() {
        let a = monotonic_nanos();
        let b = monotonic_nanos();
        assert!(b > a);
    }
}
