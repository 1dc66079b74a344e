//! EC2 instance description.

use aws_sdk_ec2::error::ProvideErrorMetadata;
use aws_sdk_ec2::types::Instance;
use aws_sdk_ec2::Client;
use chrono::{DateTime, Utc};
use tracing::debug;

use autostate_core::{AutoStateError, Resource, ResourceType};
use autostate_engine::{canonical_state, ProviderStatus, TagNormalizer};

use crate::convert::to_utc;

const NOT_FOUND_CODES: &[&str] = &["InvalidInstanceID.NotFound", "InvalidInstanceID.Malformed"];

fn is_not_found(code: Option<&str>) -> bool {
    code.is_some_and(|c| NOT_FOUND_CODES.contains(&c))
}

/// Earliest EBS attach time, falling back to launch time.
fn create_time(instance: &Instance, launch: DateTime<Utc>) -> DateTime<Utc> {
    instance
        .block_device_mappings()
        .iter()
        .filter_map(|m| m.ebs().and_then(|ebs| ebs.attach_time()).and_then(to_utc))
        .min()
        .unwrap_or(launch)
}

/// Build a snapshot from a described instance.
pub fn instance_resource(instance: &Instance, normalizer: &TagNormalizer, now: DateTime<Utc>) -> Option<Resource> {
    let id = instance.instance_id()?;
    let tags = normalizer.normalize(
        ResourceType::Ec2Instance,
        instance
            .tags()
            .iter()
            .filter_map(|t| Some((t.key()?, t.value().unwrap_or_default()))),
    );
    let state_name = instance
        .state()
        .and_then(|s| s.name())
        .map(|n| n.as_str())
        .unwrap_or_default();
    let launch = instance.launch_time().and_then(to_utc).unwrap_or(now);

    Some(Resource::new(
        ResourceType::Ec2Instance,
        id,
        tags,
        canonical_state(ProviderStatus::Ec2 { state_name }),
        launch,
        create_time(instance, launch),
    ))
}

pub async fn describe_instance(
    client: &Client,
    normalizer: &TagNormalizer,
    instance_id: &str,
) -> Result<Vec<Resource>, AutoStateError> {
    let output = match client.describe_instances().instance_ids(instance_id).send().await {
        Ok(output) => output,
        Err(e) if is_not_found(e.as_service_error().and_then(|se| se.code())) => {
            debug!(instance_id, "EC2 instance not found");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(AutoStateError::Describe(format!(
                "DescribeInstances {instance_id} failed: {e:?}"
            )))
        }
    };

    let now = Utc::now();
    Ok(output
        .reservations()
        .iter()
        .flat_map(|r| r.instances())
        .filter_map(|i| instance_resource(i, normalizer, now))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use autostate_core::State;
    use aws_sdk_ec2::primitives::DateTime as SdkDateTime;
    use aws_sdk_ec2::types::{
        EbsInstanceBlockDevice, InstanceBlockDeviceMapping, InstanceState, InstanceStateName, Tag,
    };
    use chrono::TimeZone;

    fn tag(key: &str, value: &str) -> Tag {
        Tag::builder().key(key).value(value).build()
    }

    fn ebs(attached: i64) -> InstanceBlockDeviceMapping {
        InstanceBlockDeviceMapping::builder()
            .ebs(
                EbsInstanceBlockDevice::builder()
                    .attach_time(SdkDateTime::from_secs(attached))
                    .build(),
            )
            .build()
    }

    #[test]
    fn snapshot_from_instance() {
        let instance = Instance::builder()
            .instance_id("i-0abc")
            .state(InstanceState::builder().name(InstanceStateName::Stopping).build())
            .launch_time(SdkDateTime::from_secs(1_714_550_400))
            .block_device_mappings(ebs(1_714_550_460))
            .block_device_mappings(ebs(1_700_000_000))
            .tags(tag("autostate:stop-schedule", " 0 18 * * * "))
            .tags(tag("autostate:desired-count", "3"))
            .tags(tag("Name", "web"))
            .build();

        let resource = instance_resource(&instance, &TagNormalizer::default(), Utc::now()).unwrap();
        assert_eq!(resource.id, "i-0abc");
        assert_eq!(resource.state, State::Stopped);
        assert_eq!(resource.tags.stop_schedule.as_deref(), Some("0 18 * * *"));
        assert_eq!(resource.tags.desired_count, None);
        assert_eq!(resource.start_time, Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());
        assert_eq!(resource.create_time.timestamp(), 1_700_000_000);
    }

    #[test]
    fn create_time_falls_back_to_launch() {
        let instance = Instance::builder()
            .instance_id("i-0abc")
            .launch_time(SdkDateTime::from_secs(1_714_550_400))
            .build();
        let resource = instance_resource(&instance, &TagNormalizer::default(), Utc::now()).unwrap();
        assert_eq!(resource.create_time, resource.start_time);
        assert_eq!(resource.state, State::Other);
    }

    #[test]
    fn instance_without_id_is_skipped() {
        assert!(instance_resource(&Instance::builder().build(), &TagNormalizer::default(), Utc::now()).is_none());
    }
}
