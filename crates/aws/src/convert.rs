//! SDK value conversions.

use aws_smithy_types::DateTime as SdkDateTime;
use chrono::{DateTime, Utc};

/// SDK timestamp → chrono. `None` when out of chrono's range.
pub fn to_utc(instant: &SdkDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(instant.secs(), instant.subsec_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn converts_whole_seconds() {
        let sdk = SdkDateTime::from_secs(1_714_550_400);
        let utc = to_utc(&sdk).unwrap();
        assert_eq!(utc, Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());
        assert_eq!(utc.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn keeps_subsecond_precision() {
        let sdk = SdkDateTime::from_fractional_secs(1_714_550_400, 0.25);
        assert_eq!(to_utc(&sdk).unwrap().timestamp_subsec_millis(), 250);
    }
}
