//! Candidate generation and next-action selection.
//!
//! Two kinds of rule produce candidate actions for a resource: recurring cron
//! schedules (`start-schedule`, `stop-schedule`, `reboot-schedule`) and
//! duration limits (`max-runtime`, `max-lifetime`). [`next_action`] merges
//! them and keeps the earliest.

pub mod cron;
pub mod duration;
mod select;


pub use self::cron::{cron_candidate, parse_schedules, resolve_timezone, LOOKAHEAD_SECS};
pub use self::duration::{duration_candidate, parse_minutes};
pub use self::select::{next_action, Selection};
