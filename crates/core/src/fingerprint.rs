//! Schedule fingerprints.
//!
//! A fingerprint is a version tag followed by the decimal 53-bit cyrb53 hash
//! of the six schedule-relevant fields of a [`ScheduleConfig`], joined with
//! `|`. It is captured when an action is armed and compared against the live
//! tags when the action fires; any difference means the schedule drifted.
//!
//! The hash consumes UTF-16 code units and uses 32-bit wrapping arithmetic so
//! fingerprints stay identical to the ones carried by already-armed actions.

use crate::model::ScheduleConfig;

/// Version tag prefixed to every fingerprint.
pub const FINGERPRINT_VERSION: &str = "V1";

const FIELD_SEPARATOR: char = '|';

/// cyrb53: a fast, non-cryptographic 53-bit string hash.
pub fn cyrb53(input: &str, seed: u32) -> u64 {
    let mut h1: u32 = 0xdead_beef ^ seed;
    let mut h2: u32 = 0x41c6_ce57 ^ seed;

    for unit in input.encode_utf16() {
        let ch = u32::from(unit);
        h1 = (h1 ^ ch).wrapping_mul(2_654_435_761);
        h2 = (h2 ^ ch).wrapping_mul(1_597_334_677);
    }

    h1 = (h1 ^ (h1 >> 16)).wrapping_mul(2_246_822_507);
    h1 ^= (h2 ^ (h2 >> 13)).wrapping_mul(3_266_489_909);
    h2 = (h2 ^ (h2 >> 16)).wrapping_mul(2_246_822_507);
    h2 ^= (h1 ^ (h1 >> 13)).wrapping_mul(3_266_489_909);

    (u64::from(h2 & 0x001f_ffff) << 32) | u64::from(h1)
}

/// Compute the fingerprint of the schedule-relevant subset of `config`.
pub fn fingerprint(config: &ScheduleConfig) -> String {
    let fields = [
        config.timezone.as_deref(),
        config.start_schedule.as_deref(),
        config.stop_schedule.as_deref(),
        config.reboot_schedule.as_deref(),
        config.max_runtime.as_deref(),
        config.max_lifetime.as_deref(),
    ];

    let mut joined = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            joined.push(FIELD_SEPARATOR);
        }
        joined.push_str(field.unwrap_or(""));
    }

    format!("{}{}", FINGERPRINT_VERSION, cyrb53(&joined, 0))
}
