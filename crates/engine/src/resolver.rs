//! Event Resolver: turn a trigger event into resource snapshots.

use std::collections::HashSet;
use std::sync::Arc;

use autostate_core::{AutoStateError, Resource};
use tracing::{debug, info, warn};

use crate::arn::ResourceRef;
use crate::events::{EventKind, TriggerEvent};
use crate::traits::ResourceDescriber;

/// A resource that could not be resolved or scheduled.
#[derive(Debug)]
pub struct ResourceFailure {
    /// ARN or id of the resource.
    pub resource: String,
    pub error: AutoStateError,
}

/// Resources described for one event plus the targets that failed.
#[derive(Debug, Default)]
pub struct Resolution {
    pub resources: Vec<Resource>,
    pub failures: Vec<ResourceFailure>,
}

pub struct EventResolver {
    describer: Arc<dyn ResourceDescriber>,
}

impl EventResolver {
    pub fn new(describer: Arc<dyn ResourceDescriber>) -> Self {
        Self { describer }
    }

    /// Describe every managed resource the event targets.
    ///
    /// Termination events resolve to nothing. Each target is described on
    /// its own so one failure never hides the others.
    pub async fn resolve(&self, event: &TriggerEvent) -> Resolution {
        let mut resolution = Resolution::default();
        if event.kind() == EventKind::Termination {
            info!(event_id = event.id(), "termination event, nothing to schedule");
            return resolution;
        }

        let mut seen = HashSet::new();
        for arn in event.targets() {
            let target = match ResourceRef::from_arn(&arn) {
                Ok(Some(target)) => target,
                Ok(None) => {
                    debug!(arn = %arn, "skipping unmanaged resource");
                    continue;
                }
                Err(error) => {
                    warn!(arn = %arn, error = %error, "cannot identify event target");
                    resolution.failures.push(ResourceFailure { resource: arn, error });
                    continue;
                }
            };
            if !seen.insert(target.clone()) {
                continue;
            }

            match self.describer.describe(target.resource_type, &target.id).await {
                Ok(resources) if resources.is_empty() => {
                    info!(resource_type = %target.resource_type, resource_id = %target.id, "resource not found");
                }
                Ok(resources) => resolution.resources.extend(resources),
                Err(error) => {
                    warn!(
                        resource_type = %target.resource_type,
                        resource_id = %target.id,
                        error = %error,
                        "failed to describe event target"
                    );
                    resolution.failures.push(ResourceFailure {
                        resource: target.id,
                        error,
                    });
                }
            }
        }

        debug!(
            event_id = event.id(),
            detail_type = event.detail_type(),
            resolved = resolution.resources.len(),
            failed = resolution.failures.len(),
            "event resolved"
        );
        resolution
    }
}
