//! Collaborator traits: resource description and action scheduling.

use async_trait::async_trait;
use autostate_core::{Action, AutoStateError, Resource, ResourceType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Looks up live resources and returns canonical snapshots.
///
/// Implementations normalize tags, compute the fingerprint, map provider
/// status to [`autostate_core::State`] and fill the time anchors. A resource
/// that does not exist yields an empty vec, never an error.
#[async_trait]
pub trait ResourceDescriber: Send + Sync {
    /// Describe one resource by id. For ECS services the id is the service ARN.
    async fn describe(
        &self,
        resource_type: ResourceType,
        id: &str,
    ) -> Result<Vec<Resource>, AutoStateError>;
}

/// A request to deliver `payload` back to the engine at `instant`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub instant: DateTime<Utc>,
    pub payload: Action,
    pub idempotency_key: String,
}

/// What the scheduler did with a [`ScheduleRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleOutcome {
    Scheduled,
    /// An execution with the same idempotency key already exists.
    Duplicate,
}

/// Durable timer that fires an action at an absolute instant.
#[async_trait]
pub trait ActionScheduler: Send + Sync {
    async fn schedule(&self, request: &ScheduleRequest) -> Result<ScheduleOutcome, AutoStateError>;
}
