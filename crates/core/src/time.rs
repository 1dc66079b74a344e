//! Instant helpers shared by the model and the schedule generators.

use chrono::{DateTime, Duration, SubsecRound, Utc};

/// Render an instant as ISO-8601 UTC with millisecond precision
/// (`2024-05-01T08:00:00.000Z`). Every serialized `when` uses this form, so
/// string order matches chronological order.
pub fn to_iso_millis(instant: &DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// "Now, sub-second part zeroed, plus one minute": the earliest instant a
/// clamped action may be scheduled for.
pub fn next_safe_instant(now: DateTime<Utc>) -> DateTime<Utc> {
    now.trunc_subsecs(0) + Duration::minutes(1)
}

/// Serde adapter for `DateTime<Utc>` fields carried on the wire.
///
/// Serializes with [`to_iso_millis`]; accepts any RFC 3339 timestamp.
pub mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(instant: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::to_iso_millis(instant))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
