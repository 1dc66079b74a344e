//! Canonical resource, schedule and action records.
//!
//! Field names on the wire are camelCase and match the JSON contract the
//! external state machine reads (`$.resource.tags.desiredCount`,
//! `$.Execution.Input.when`, ...).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AutoStateError;
use crate::fingerprint::{cyrb53, fingerprint};
use crate::time::iso_millis;

// ── Enumerations ──────────────────────────────────────────────

/// Kinds of resource whose lifecycle is managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    Ec2Instance,
    RdsInstance,
    RdsCluster,
    EcsService,
}

impl ResourceType {
    pub const ALL: [ResourceType; 4] = [
        ResourceType::Ec2Instance,
        ResourceType::RdsInstance,
        ResourceType::RdsCluster,
        ResourceType::EcsService,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Ec2Instance => "ec2-instance",
            ResourceType::RdsInstance => "rds-instance",
            ResourceType::RdsCluster => "rds-cluster",
            ResourceType::EcsService => "ecs-service",
        }
    }

    /// ECS services have no reboot or terminate semantics.
    pub fn supports_reboot(&self) -> bool {
        !matches!(self, ResourceType::EcsService)
    }

    pub fn supports_terminate(&self) -> bool {
        !matches!(self, ResourceType::EcsService)
    }

    pub fn is_database(&self) -> bool {
        matches!(self, ResourceType::RdsInstance | ResourceType::RdsCluster)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = AutoStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AutoStateError::InvalidInput(format!("unknown resource type: {s}")))
    }
}

/// Lifecycle action applied to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Start,
    Stop,
    Reboot,
    Terminate,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Start => "start",
            ActionKind::Stop => "stop",
            ActionKind::Reboot => "reboot",
            ActionKind::Terminate => "terminate",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical resource state. `Other` covers every transitional or unmapped
/// provider status and never satisfies a state precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    Stopped,
    Running,
    Terminated,
    Other,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Stopped => "stopped",
            State::Running => "running",
            State::Terminated => "terminated",
            State::Other => "other",
        };
        f.write_str(s)
    }
}

// ── Schedule configuration ────────────────────────────────────

/// Schedule configuration normalized from a resource's tags.
///
/// `max_runtime` / `max_lifetime` keep the raw tag text: the fingerprint is
/// computed over it, and it is only parsed into minutes when a duration
/// candidate is generated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_schedule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_schedule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reboot_schedule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_runtime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lifetime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_snapshot_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_final_snapshot: Option<bool>,
}

// ── Resource snapshot ─────────────────────────────────────────

/// Member instance of an RDS cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMember {
    pub id: String,
}

/// A point-in-time snapshot of a managed resource.
///
/// Built fresh from the description API on every evaluation; never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub id: String,
    pub tags: ScheduleConfig,
    #[serde(rename = "tagsHash")]
    pub fingerprint: String,
    #[serde(with = "iso_millis")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    pub create_time: DateTime<Utc>,
    pub state: State,
    /// ECS cluster name (ECS services only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    /// ECS service name (ECS services only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    /// Cluster member instances (RDS clusters only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_ids: Option<Vec<ClusterMember>>,
}

impl Resource {
    /// Build a snapshot, deriving the fingerprint from `tags`.
    pub fn new(
        resource_type: ResourceType,
        id: impl Into<String>,
        tags: ScheduleConfig,
        state: State,
        start_time: DateTime<Utc>,
        create_time: DateTime<Utc>,
    ) -> Self {
        let fingerprint = fingerprint(&tags);
        Self {
            resource_type,
            id: id.into(),
            tags,
            fingerprint,
            start_time,
            create_time,
            state,
            cluster: None,
            service_name: None,
            instance_ids: None,
        }
    }

    /// Attach the ECS cluster and service names.
    pub fn with_ecs_service(mut self, cluster: impl Into<String>, service_name: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self.service_name = Some(service_name.into());
        self
    }

    /// Attach the RDS cluster member identifiers.
    pub fn with_cluster_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instance_ids = Some(
            members
                .into_iter()
                .map(|id| ClusterMember { id: id.into() })
                .collect(),
        );
        self
    }
}

// ── Actions ───────────────────────────────────────────────────

/// A lifecycle action due at an absolute instant.
///
/// This is the payload handed to the external timer and delivered back to
/// the engine when the timer fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub resource_type: ResourceType,
    pub resource_id: String,
    /// Fingerprint of the schedule that produced this action.
    #[serde(rename = "tagHash")]
    pub fingerprint: String,
    #[serde(with = "iso_millis")]
    pub when: DateTime<Utc>,
    #[serde(rename = "action")]
    pub kind: ActionKind,
}

impl Action {
    /// Deterministic identifier used by the scheduler to deduplicate re-arm
    /// requests: `<type>-<id or hash>-<kind>-<yyyy-MM-dd-HH-mm>-<fingerprint>`,
    /// cut to `max_len` characters.
    ///
    /// Resource ids containing characters outside `[A-Za-z0-9_-]` (ECS ARNs)
    /// are replaced by their cyrb53 hash.
    pub fn idempotency_key(&self, max_len: usize) -> String {
        let id_is_plain = self
            .resource_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        let id = if id_is_plain {
            self.resource_id.clone()
        } else {
            cyrb53(&self.resource_id, 0).to_string()
        };

        let mut key = format!(
            "{}-{}-{}-{}-{}",
            self.resource_type,
            id,
            self.kind,
            self.when.format("%Y-%m-%d-%H-%M"),
            self.fingerprint
        );
        if key.len() > max_len {
            // Only ASCII reaches this point, so byte and char boundaries agree.
            key.truncate(max_len);
        }
        key
    }
}

/// The Execution Gate's verdict on a fired action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    #[serde(flatten)]
    pub action: Action,
    pub execute: bool,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,
}
