//! Hands the next action to the scheduling collaborator.

use std::sync::Arc;

use autostate_core::time::to_iso_millis;
use autostate_core::{Action, AutoStateError};
use tracing::info;

use crate::traits::{ActionScheduler, ScheduleOutcome, ScheduleRequest};

#[derive(Clone)]
pub struct Rearmer {
    scheduler: Arc<dyn ActionScheduler>,
    key_limit: usize,
}

impl Rearmer {
    /// `key_limit` is the scheduler's maximum execution-name length.
    pub fn new(scheduler: Arc<dyn ActionScheduler>, key_limit: usize) -> Self {
        Self { scheduler, key_limit }
    }

    pub fn request_for(&self, action: &Action) -> ScheduleRequest {
        ScheduleRequest {
            instant: action.when,
            payload: action.clone(),
            idempotency_key: action.idempotency_key(self.key_limit),
        }
    }

    /// Arm `action`. Re-arming an identical action is a no-op at the
    /// scheduler and reported as [`ScheduleOutcome::Duplicate`].
    pub async fn arm(&self, action: &Action) -> Result<ScheduleOutcome, AutoStateError> {
        let request = self.request_for(action);
        info!(
            "Scheduling {} for {} {} at {}",
            action.kind,
            action.resource_type,
            action.resource_id,
            to_iso_millis(&action.when)
        );
        let outcome = self.scheduler.schedule(&request).await?;
        if outcome == ScheduleOutcome::Duplicate {
            info!(key = %request.idempotency_key, "action already scheduled");
        }
        Ok(outcome)
    }
}
