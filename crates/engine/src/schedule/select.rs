//! [`next_action`]: merge every candidate for a resource and pick the earliest.

use autostate_core::{Action, ActionKind, AutoStateError, Resource};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::cron::cron_candidate;
use super::duration::duration_candidate;

/// Outcome of selecting a resource's next action.
#[derive(Debug, Default)]
pub struct Selection {
    /// The earliest candidate, if any.
    pub action: Option<Action>,
    /// Number of candidates considered.
    pub candidates: usize,
    /// Cron schedules that failed validation, by the action they drive.
    pub rejected: Vec<(ActionKind, AutoStateError)>,
}

impl Selection {
    /// Take the first validation failure, if any schedule was rejected.
    pub fn take_rejection(&mut self) -> Option<AutoStateError> {
        if self.rejected.is_empty() {
            None
        } else {
            Some(self.rejected.remove(0).1)
        }
    }
}

/// Cron-driven candidates in evaluation order: start, stop, reboot.
fn cron_candidates(
    resource: &Resource,
    now: DateTime<Utc>,
    selection: &mut Selection,
) -> Vec<Action> {
    let tags = &resource.tags;
    let mut schedules = vec![
        (ActionKind::Start, tags.start_schedule.as_deref()),
        (ActionKind::Stop, tags.stop_schedule.as_deref()),
    ];
    if resource.resource_type.supports_reboot() {
        schedules.push((ActionKind::Reboot, tags.reboot_schedule.as_deref()));
    }

    let mut actions = Vec::new();
    for (kind, expression) in schedules {
        let Some(expression) = expression else {
            continue;
        };
        match cron_candidate(resource, kind, expression, now) {
            Ok(Some(action)) => actions.push(action),
            Ok(None) => debug!(resource_id = %resource.id, %kind, "schedule has no future occurrence"),
            Err(e) => {
                warn!(
                    resource_type = %resource.resource_type,
                    resource_id = %resource.id,
                    %kind,
                    error = %e,
                    "rejecting invalid schedule"
                );
                selection.rejected.push((kind, e));
            }
        }
    }
    actions
}

/// Duration-driven candidates: stop from max-runtime, terminate from max-lifetime.
fn duration_candidates(resource: &Resource, prior: Option<&Action>, now: DateTime<Utc>) -> Vec<Action> {
    let tags = &resource.tags;
    let limits = [
        (ActionKind::Stop, tags.max_runtime.as_deref()),
        (ActionKind::Terminate, tags.max_lifetime.as_deref()),
    ];
    limits
        .into_iter()
        .filter_map(|(kind, minutes)| duration_candidate(resource, kind, minutes?, prior, now))
        .collect()
}

/// Compute the next action due for `resource`.
///
/// `prior` is the action whose evaluation triggered this call (none for
/// event-driven scheduling). The earliest candidate wins; among exactly
/// simultaneous candidates the first one generated wins. An invalid cron
/// schedule only removes its own candidate and is reported in
/// [`Selection::rejected`].
pub fn next_action(resource: &Resource, prior: Option<&Action>, now: DateTime<Utc>) -> Selection {
    let mut selection = Selection::default();
    let mut candidates = cron_candidates(resource, now, &mut selection);
    candidates.extend(duration_candidates(resource, prior, now));

    debug!(
        "Evaluating {} possible future actions for {} {}",
        candidates.len(),
        resource.resource_type,
        resource.id
    );

    selection.candidates = candidates.len();
    selection.action = candidates.into_iter().min_by_key(|action| action.when);
    selection
}
