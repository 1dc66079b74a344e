//! Execution Gate: decides whether a fired action may run.
//!
//! The gate re-describes the resource, rejects the action when the schedule
//! tags changed since it was armed, re-arms the next action and finally
//! checks the resource is in a state the action applies to.

use std::sync::Arc;

use autostate_core::{Action, ActionKind, ActionResult, AutoStateError, Resource, State};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::rearm::Rearmer;
use crate::schedule::next_action;
use crate::traits::ResourceDescriber;

pub const REASON_GONE: &str = "Instance no longer exists";
pub const REASON_DRIFT: &str = "Tags do not match execution";
pub const REASON_PASSED: &str = "Checks passed";
pub const REASON_NOT_STOPPED: &str = "Instance is not stopped";
pub const REASON_NOT_RUNNING: &str = "Instance is not running";
pub const REASON_TERMINATED: &str = "Instance is already terminated";

pub struct ExecutionGate {
    describer: Arc<dyn ResourceDescriber>,
    rearmer: Rearmer,
}

fn verdict(action: &Action, execute: bool, reason: &str, resource: Option<Resource>) -> ActionResult {
    ActionResult {
        action: action.clone(),
        execute,
        reason: reason.to_string(),
        resource,
    }
}

impl ExecutionGate {
    pub fn new(describer: Arc<dyn ResourceDescriber>, rearmer: Rearmer) -> Self {
        Self { describer, rearmer }
    }

    /// Evaluate a fired `action` against the live resource.
    ///
    /// Describe and scheduling failures propagate. A rejected cron schedule
    /// fails the call after the remaining valid selection has been armed.
    pub async fn evaluate(&self, action: &Action, now: DateTime<Utc>) -> Result<ActionResult, AutoStateError> {
        info!(
            "Processing {} for {} {}",
            action.kind, action.resource_type, action.resource_id
        );

        let described = self
            .describer
            .describe(action.resource_type, &action.resource_id)
            .await?;
        let Some(resource) = described.into_iter().next() else {
            info!(resource_id = %action.resource_id, "resource no longer exists, dropping action");
            return Ok(verdict(action, false, REASON_GONE, None));
        };

        if resource.fingerprint != action.fingerprint {
            info!(
                resource_id = %resource.id,
                armed = %action.fingerprint,
                live = %resource.fingerprint,
                "schedule tags changed since the action was armed"
            );
            return Ok(verdict(action, false, REASON_DRIFT, Some(resource)));
        }

        if action.kind != ActionKind::Terminate {
            let mut selection = next_action(&resource, Some(action), now);
            match &selection.action {
                Some(next) => {
                    self.rearmer.arm(next).await?;
                }
                None => info!(resource_id = %resource.id, "no further action to schedule"),
            }
            if let Some(err) = selection.take_rejection() {
                warn!(resource_id = %resource.id, error = %err, "failing invocation on invalid schedule");
                return Err(err);
            }
        }

        let (execute, reason) = match (action.kind, resource.state) {
            (ActionKind::Start, State::Stopped) => (true, REASON_PASSED),
            (ActionKind::Start, _) => (false, REASON_NOT_STOPPED),
            (ActionKind::Stop | ActionKind::Reboot, State::Running) => (true, REASON_PASSED),
            (ActionKind::Stop | ActionKind::Reboot, _) => (false, REASON_NOT_RUNNING),
            (ActionKind::Terminate, State::Terminated) => (false, REASON_TERMINATED),
            (ActionKind::Terminate, _) => (true, REASON_PASSED),
        };
        info!(
            resource_id = %resource.id,
            state = %resource.state,
            execute,
            "{reason}"
        );
        Ok(verdict(action, execute, reason, Some(resource)))
    }
}
