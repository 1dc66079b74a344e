//! ECS service description.

use aws_sdk_ecs::error::ProvideErrorMetadata;
use aws_sdk_ecs::types::{Service, ServiceField};
use aws_sdk_ecs::Client;
use chrono::{DateTime, Utc};
use tracing::debug;

use autostate_core::{AutoStateError, Resource, ResourceType};
use autostate_engine::arn::EcsServicePath;
use autostate_engine::{canonical_state, ProviderStatus, TagNormalizer};

use crate::convert::to_utc;

const NOT_FOUND_CODES: &[&str] = &["ClusterNotFoundException", "ServiceNotFoundException"];

/// Latest deployment update, the moment the service last (re)started.
fn last_deployed(service: &Service) -> Option<DateTime<Utc>> {
    service
        .deployments()
        .iter()
        .filter_map(|d| d.updated_at().and_then(to_utc))
        .max()
}

pub fn service_resource(service: &Service, normalizer: &TagNormalizer, now: DateTime<Utc>) -> Option<Resource> {
    let arn = service.service_arn()?;
    let path = EcsServicePath::parse(arn).ok()?;
    let tags = normalizer.normalize(
        ResourceType::EcsService,
        service
            .tags()
            .iter()
            .filter_map(|t| Some((t.key()?, t.value().unwrap_or_default()))),
    );
    let state = canonical_state(ProviderStatus::Ecs {
        status: service.status().unwrap_or_default(),
        desired_count: i64::from(service.desired_count()),
    });
    Some(
        Resource::new(
            ResourceType::EcsService,
            arn,
            tags,
            state,
            last_deployed(service).unwrap_or(now),
            service.created_at().and_then(to_utc).unwrap_or(now),
        )
        .with_ecs_service(path.cluster, path.service_name),
    )
}

/// Describe the service named by `service_arn`, tags included.
pub async fn describe_service(
    client: &Client,
    normalizer: &TagNormalizer,
    service_arn: &str,
) -> Result<Vec<Resource>, AutoStateError> {
    let path = EcsServicePath::parse(service_arn)?;
    let result = client
        .describe_services()
        .cluster(&path.cluster)
        .services(&path.service_name)
        .include(ServiceField::Tags)
        .send()
        .await;
    let output = match result {
        Ok(output) => output,
        Err(e) if e.as_service_error().and_then(|se| se.code()).is_some_and(|c| NOT_FOUND_CODES.contains(&c)) => {
            debug!(service_arn, "ECS cluster or service not found");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(AutoStateError::Describe(format!(
                "DescribeServices {service_arn} failed: {e:?}"
            )))
        }
    };

    for failure in output.failures() {
        debug!(
            arn = failure.arn().unwrap_or_default(),
            reason = failure.reason().unwrap_or_default(),
            "DescribeServices reported a failure"
        );
    }

    let now = Utc::now();
    Ok(output
        .services()
        .iter()
        .filter_map(|s| service_resource(s, normalizer, now))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use autostate_core::State;
    use aws_sdk_ecs::primitives::DateTime as SdkDateTime;
    use aws_sdk_ecs::types::{Deployment, Tag};

    const ARN: &str = "arn:aws:ecs:us-east-1:123456789012:service/prod/web";

    fn deployment(secs: i64) -> Deployment {
        Deployment::builder().updated_at(SdkDateTime::from_secs(secs)).build()
    }

    #[test]
    fn snapshot_from_service() {
        let service = Service::builder()
            .service_arn(ARN)
            .status("ACTIVE")
            .desired_count(0)
            .created_at(SdkDateTime::from_secs(1_700_000_000))
            .deployments(deployment(1_714_500_000))
            .deployments(deployment(1_714_550_400))
            .tags(Tag::builder().key("autostate:start-schedule").value("0 7 * * 1-5").build())
            .tags(Tag::builder().key("autostate:desired-count").value("3").build())
            .tags(Tag::builder().key("autostate:skip-final-snapshot").value("true").build())
            .build();

        let resource = service_resource(&service, &TagNormalizer::default(), Utc::now()).unwrap();
        assert_eq!(resource.id, ARN);
        assert_eq!(resource.state, State::Stopped);
        assert_eq!(resource.cluster.as_deref(), Some("prod"));
        assert_eq!(resource.service_name.as_deref(), Some("web"));
        assert_eq!(resource.tags.desired_count, Some(3));
        assert_eq!(resource.tags.skip_final_snapshot, None);
        assert_eq!(resource.start_time.timestamp(), 1_714_550_400);
        assert_eq!(resource.create_time.timestamp(), 1_700_000_000);
    }

    #[test]
    fn inactive_service_is_terminated() {
        let service = Service::builder()
            .service_arn(ARN)
            .status("INACTIVE")
            .desired_count(2)
            .build();
        let now = Utc::now();
        let resource = service_resource(&service, &TagNormalizer::default(), now).unwrap();
        assert_eq!(resource.state, State::Terminated);
        assert_eq!(resource.start_time, now);
        assert_eq!(resource.tags.desired_count, Some(1));
    }
}
