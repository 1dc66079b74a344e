//! Duration ("run for N minutes") candidate generation.

use autostate_core::time::next_safe_instant;
use autostate_core::{Action, ActionKind, Resource, State};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

/// Parse a `max-runtime` / `max-lifetime` tag value as whole minutes.
///
/// Zero, negative and non-numeric values yield `None`.
pub fn parse_minutes(raw: &str) -> Option<i64> {
    match raw.trim().parse::<i64>() {
        Ok(minutes) if minutes > 0 => Some(minutes),
        Ok(_) => None,
        Err(e) => {
            warn!(value = raw, error = %e, "duration tag is not a whole number of minutes");
            None
        }
    }
}

/// Candidate action `minutes` after the resource's anchor instant.
///
/// - `Stop` anchors on `start_time` while running, else on `create_time`. It
///   is suppressed when the resource is already stopped, or when the action
///   being evaluated was itself a stop (otherwise the same stop would be
///   armed again immediately).
/// - `Terminate` always anchors on `create_time` and does not apply to
///   resource types without terminate semantics.
///
/// An instant that has already elapsed is clamped to [`next_safe_instant`].
pub fn duration_candidate(
    resource: &Resource,
    kind: ActionKind,
    minutes: &str,
    prior: Option<&Action>,
    now: DateTime<Utc>,
) -> Option<Action> {
    let anchor = match kind {
        ActionKind::Stop => {
            if resource.state == State::Stopped {
                debug!(resource_id = %resource.id, "already stopped, no runtime limit to enforce");
                return None;
            }
            if prior.is_some_and(|p| p.kind == ActionKind::Stop) {
                debug!(resource_id = %resource.id, "prior action was a stop, skipping runtime limit");
                return None;
            }
            if resource.state == State::Running {
                resource.start_time
            } else {
                resource.create_time
            }
        }
        ActionKind::Terminate => {
            if !resource.resource_type.supports_terminate() {
                return None;
            }
            resource.create_time
        }
        ActionKind::Start | ActionKind::Reboot => return None,
    };

    let minutes = parse_minutes(minutes)?;
    let Some(due) = Duration::try_minutes(minutes).and_then(|d| anchor.checked_add_signed(d)) else {
        warn!(resource_id = %resource.id, minutes, "duration tag is out of range");
        return None;
    };
    let when = if due < now { next_safe_instant(now) } else { due };

    Some(Action {
        resource_type: resource.resource_type,
        resource_id: resource.id.clone(),
        fingerprint: resource.fingerprint.clone(),
        when,
        kind,
    })
}
