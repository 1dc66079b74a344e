//! Step Functions as the durable timer.
//!
//! Each armed action becomes one execution of the autostate state machine.
//! The execution name is the action's idempotency key, so arming the same
//! action twice is rejected by Step Functions and reported as a duplicate.

use async_trait::async_trait;
use aws_sdk_sfn::Client;
use tracing::debug;

use autostate_core::AutoStateError;
use autostate_engine::{ActionScheduler, ScheduleOutcome, ScheduleRequest};

pub struct StepFunctionsScheduler {
    client: Client,
    state_machine_arn: String,
}

impl StepFunctionsScheduler {
    pub fn new(client: Client, state_machine_arn: impl Into<String>) -> Self {
        Self {
            client,
            state_machine_arn: state_machine_arn.into(),
        }
    }

    pub fn state_machine_arn(&self) -> &str {
        &self.state_machine_arn
    }
}

#[async_trait]
impl ActionScheduler for StepFunctionsScheduler {
    async fn schedule(&self, request: &ScheduleRequest) -> Result<ScheduleOutcome, AutoStateError> {
        let input = serde_json::to_string(&request.payload)?;
        let result = self
            .client
            .start_execution()
            .state_machine_arn(&self.state_machine_arn)
            .name(&request.idempotency_key)
            .input(input)
            .send()
            .await;

        match result {
            Ok(output) => {
                debug!(execution_arn = output.execution_arn(), "execution started");
                Ok(ScheduleOutcome::Scheduled)
            }
            Err(e) if e.as_service_error().is_some_and(|se| se.is_execution_already_exists()) => {
                Ok(ScheduleOutcome::Duplicate)
            }
            Err(e) => Err(AutoStateError::Schedule(format!(
                "StartExecution {} failed: {e:?}",
                request.idempotency_key
            ))),
        }
    }
}
