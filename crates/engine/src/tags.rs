//! Tag normalization: raw provider tags → [`ScheduleConfig`].

use autostate_core::config::DEFAULT_TAG_PREFIX;
use autostate_core::{ResourceType, ScheduleConfig};
use tracing::{debug, warn};

/// Final snapshot name used for databases when none is tagged.
pub const DEFAULT_FINAL_SNAPSHOT_IDENTIFIER: &str = "autostatefinal";

/// Tag names (after the prefix) the normalizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKey {
    Timezone,
    StartSchedule,
    StopSchedule,
    RebootSchedule,
    MaxRuntime,
    MaxLifetime,
    DesiredCount,
    SkipFinalSnapshot,
    FinalSnapshotIdentifier,
}

impl TagKey {
    fn parse(name: &str) -> Option<Self> {
        let key = match name {
            "timezone" => TagKey::Timezone,
            "start-schedule" => TagKey::StartSchedule,
            "stop-schedule" => TagKey::StopSchedule,
            "reboot-schedule" => TagKey::RebootSchedule,
            "max-runtime" => TagKey::MaxRuntime,
            "max-lifetime" => TagKey::MaxLifetime,
            "desired-count" => TagKey::DesiredCount,
            "skip-final-snapshot" => TagKey::SkipFinalSnapshot,
            "final-snapshot-identifier" => TagKey::FinalSnapshotIdentifier,
            _ => return None,
        };
        Some(key)
    }

    fn allowed_for(self, resource_type: ResourceType) -> bool {
        match self {
            TagKey::DesiredCount => resource_type == ResourceType::EcsService,
            TagKey::SkipFinalSnapshot | TagKey::FinalSnapshotIdentifier => {
                resource_type.is_database()
            }
            _ => true,
        }
    }
}

/// Converts a resource's tags into its schedule configuration.
#[derive(Debug, Clone)]
pub struct TagNormalizer {
    prefix: String,
}

impl Default for TagNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_TAG_PREFIX)
    }
}

impl TagNormalizer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Normalize `tags` for a resource of `resource_type`.
    ///
    /// Keys outside the type's allow-list are dropped, values are trimmed and
    /// empty values count as absent. When a key repeats, the last value wins.
    /// Never fails: malformed values surface later as invalid schedules.
    pub fn normalize<I, K, V>(&self, resource_type: ResourceType, tags: I) -> ScheduleConfig
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = ScheduleConfig::default();
        let mut desired_count = None;
        let mut skip_final_snapshot = None;
        let mut final_snapshot_identifier = None;

        for (key, value) in tags {
            let Some(name) = key.as_ref().strip_prefix(self.prefix.as_str()) else {
                continue;
            };
            let Some(tag) = TagKey::parse(name).filter(|t| t.allowed_for(resource_type)) else {
                debug!(key = key.as_ref(), %resource_type, "ignoring unrecognized tag");
                continue;
            };
            let value = value.as_ref().trim();
            let value = (!value.is_empty()).then(|| value.to_string());

            match tag {
                TagKey::Timezone => config.timezone = value,
                TagKey::StartSchedule => config.start_schedule = value,
                TagKey::StopSchedule => config.stop_schedule = value,
                TagKey::RebootSchedule => config.reboot_schedule = value,
                TagKey::MaxRuntime => config.max_runtime = value,
                TagKey::MaxLifetime => config.max_lifetime = value,
                TagKey::DesiredCount => desired_count = value,
                TagKey::SkipFinalSnapshot => skip_final_snapshot = value,
                TagKey::FinalSnapshotIdentifier => final_snapshot_identifier = value,
            }
        }

        match resource_type {
            ResourceType::EcsService => {
                config.desired_count = Some(resolve_desired_count(desired_count.as_deref()));
            }
            ResourceType::RdsInstance | ResourceType::RdsCluster => {
                let skip = skip_final_snapshot.as_deref() == Some("true");
                config.skip_final_snapshot = Some(skip);
                config.final_snapshot_identifier = Some(if skip {
                    String::new()
                } else {
                    final_snapshot_identifier
                        .unwrap_or_else(|| DEFAULT_FINAL_SNAPSHOT_IDENTIFIER.to_string())
                });
            }
            ResourceType::Ec2Instance => {}
        }

        config
    }
}

/// Desired count always resolves to at least one task.
fn resolve_desired_count(raw: Option<&str>) -> u32 {
    match raw.map(str::parse::<u32>) {
        None => 1,
        Some(Ok(n)) if n >= 1 => n,
        Some(Ok(_)) => 1,
        Some(Err(e)) => {
            warn!(value = raw.unwrap_or_default(), error = %e, "invalid desired-count tag, using 1");
            1
        }
    }
}
