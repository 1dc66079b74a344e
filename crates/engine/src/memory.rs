//! In-memory collaborators for tests and dry runs.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use autostate_core::{AutoStateError, Resource, ResourceType};

use crate::traits::{ActionScheduler, ResourceDescriber, ScheduleOutcome, ScheduleRequest};

/// Serves resource snapshots from a map.
#[derive(Default)]
pub struct MemoryDescriber {
    resources: Mutex<HashMap<(ResourceType, String), Resource>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryDescriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resources(resources: impl IntoIterator<Item = Resource>) -> Self {
        let describer = Self::new();
        for resource in resources {
            describer.insert(resource);
        }
        describer
    }

    /// Add or replace a resource.
    pub fn insert(&self, resource: Resource) {
        if let Ok(mut map) = self.resources.lock() {
            map.insert((resource.resource_type, resource.id.clone()), resource);
        }
    }

    pub fn remove(&self, resource_type: ResourceType, id: &str) {
        if let Ok(mut map) = self.resources.lock() {
            map.remove(&(resource_type, id.to_string()));
        }
    }

    /// Make every describe of `id` fail.
    pub fn fail_on(&self, id: impl Into<String>) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(id.into());
        }
    }
}

#[async_trait]
impl ResourceDescriber for MemoryDescriber {
    async fn describe(&self, resource_type: ResourceType, id: &str) -> Result<Vec<Resource>, AutoStateError> {
        let failing = self
            .failing
            .lock()
            .map_err(|_| AutoStateError::Describe("describer lock poisoned".to_string()))?;
        if failing.contains(id) {
            return Err(AutoStateError::Describe(format!("simulated failure describing {id}")));
        }
        drop(failing);

        let map = self
            .resources
            .lock()
            .map_err(|_| AutoStateError::Describe("describer lock poisoned".to_string()))?;
        Ok(map
            .get(&(resource_type, id.to_string()))
            .cloned()
            .into_iter()
            .collect())
    }
}

/// Records schedule requests and deduplicates them by idempotency key.
#[derive(Default)]
pub struct RecordingScheduler {
    requests: Mutex<Vec<ScheduleRequest>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every accepted (non-duplicate) request, in arrival order.
    pub fn requests(&self) -> Vec<ScheduleRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ActionScheduler for RecordingScheduler {
    async fn schedule(&self, request: &ScheduleRequest) -> Result<ScheduleOutcome, AutoStateError> {
        let mut requests = self
            .requests
            .lock()
            .map_err(|_| AutoStateError::Schedule("scheduler lock poisoned".to_string()))?;
        if requests
            .iter()
            .any(|r| r.idempotency_key == request.idempotency_key)
        {
            return Ok(ScheduleOutcome::Duplicate);
        }
        requests.push(request.clone());
        Ok(ScheduleOutcome::Scheduled)
    }
}
