//! Invocation dispatch: run the gate for fired actions, the resolver for
//! trigger events.

use std::sync::Arc;

use autostate_core::config::SchedulerConfig;
use autostate_core::{Action, ActionResult, AutoStateError, Resource, ResourceType};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::events::TriggerEvent;
use crate::gate::ExecutionGate;
use crate::input::Input;
use crate::rearm::Rearmer;
use crate::resolver::{EventResolver, ResourceFailure};
use crate::schedule::{next_action, Selection};
use crate::traits::{ActionScheduler, ResourceDescriber};

/// Outcome of one trigger invocation.
#[derive(Debug, Default)]
pub struct TriggerReport {
    /// Actions handed to the scheduler.
    pub armed: Vec<Action>,
    /// Resources with nothing to schedule.
    pub idle: Vec<String>,
    pub failures: Vec<ResourceFailure>,
}

impl TriggerReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Engine {
    describer: Arc<dyn ResourceDescriber>,
    gate: ExecutionGate,
    resolver: EventResolver,
    rearmer: Rearmer,
}

impl Engine {
    pub fn new(
        describer: Arc<dyn ResourceDescriber>,
        scheduler: Arc<dyn ActionScheduler>,
        config: &SchedulerConfig,
    ) -> Self {
        let rearmer = Rearmer::new(scheduler, config.execution_name_limit);
        Self {
            gate: ExecutionGate::new(describer.clone(), rearmer.clone()),
            resolver: EventResolver::new(describer.clone()),
            describer,
            rearmer,
        }
    }

    /// Handle one invocation input. Fired actions produce an [`ActionResult`];
    /// trigger events produce `None`.
    pub async fn handle(&self, input: Input, now: DateTime<Utc>) -> Result<Option<ActionResult>, AutoStateError> {
        match input {
            Input::Action(action) => self.process_action(&action, now).await.map(Some),
            Input::Trigger(event) => {
                let report = self.process_event(&event, now).await;
                info!(
                    event_id = event.id(),
                    armed = report.armed.len(),
                    idle = report.idle.len(),
                    failed = report.failures.len(),
                    "trigger event processed"
                );
                Ok(None)
            }
        }
    }

    pub async fn process_action(&self, action: &Action, now: DateTime<Utc>) -> Result<ActionResult, AutoStateError> {
        self.gate.evaluate(action, now).await
    }

    /// Arm the next action for every resource the event names.
    ///
    /// Failures are contained per resource and collected in the report.
    pub async fn process_event(&self, event: &TriggerEvent, now: DateTime<Utc>) -> TriggerReport {
        info!("Processing {} event {}", event.detail_type(), event.id());
        let resolution = self.resolver.resolve(event).await;
        let mut report = TriggerReport {
            failures: resolution.failures,
            ..Default::default()
        };

        for resource in &resolution.resources {
            info!("Evaluating schedule for {} {}", resource.resource_type, resource.id);
            match self.schedule_resource(resource, now).await {
                Ok(Some(action)) => report.armed.push(action),
                Ok(None) => {
                    info!("No action scheduled for {} {}", resource.resource_type, resource.id);
                    report.idle.push(resource.id.clone());
                }
                Err(error) => {
                    warn!(
                        resource_type = %resource.resource_type,
                        resource_id = %resource.id,
                        error = %error,
                        "failed to schedule resource"
                    );
                    report.failures.push(ResourceFailure {
                        resource: resource.id.clone(),
                        error,
                    });
                }
            }
        }
        report
    }

    async fn schedule_resource(&self, resource: &Resource, now: DateTime<Utc>) -> Result<Option<Action>, AutoStateError> {
        let mut selection = next_action(resource, None, now);
        let armed = match selection.action.take() {
            Some(action) => {
                self.rearmer.arm(&action).await?;
                Some(action)
            }
            None => None,
        };
        match selection.take_rejection() {
            Some(error) => Err(error),
            None => Ok(armed),
        }
    }

    /// Describe a resource and compute its next action without arming it.
    pub async fn plan(
        &self,
        resource_type: ResourceType,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<(Resource, Selection)>, AutoStateError> {
        let resources = self.describer.describe(resource_type, id).await?;
        Ok(resources
            .into_iter()
            .map(|resource| {
                let selection = next_action(&resource, None, now);
                (resource, selection)
            })
            .collect())
    }
}
