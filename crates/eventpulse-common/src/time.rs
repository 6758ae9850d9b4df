use chrono::{SecondsFormat, Utc};

/// Current UTC time as an RFC3339 string with second precision.
///
/// This is the wire and storage format for every `*_at` field in the
/// system; nothing converts back to native timestamps internally.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
