//! RDS instance and cluster description.

use std::fmt::Debug;

use aws_sdk_rds::error::ProvideErrorMetadata;
use aws_sdk_rds::operation::describe_events::DescribeEventsOutput;
use aws_sdk_rds::types::{DbCluster, DbInstance, Event, SourceType, Tag};
use aws_sdk_rds::Client;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use autostate_core::{AutoStateError, Resource, ResourceType};
use autostate_engine::{canonical_state, ProviderStatus, TagNormalizer};

use crate::convert::to_utc;

/// RDS keeps events for 14 days.
const EVENT_WINDOW_MINUTES: i32 = 14 * 24 * 60;

const INSTANCE_NOT_FOUND: &[&str] = &["DBInstanceNotFound", "DBInstanceNotFoundFault"];
const CLUSTER_NOT_FOUND: &[&str] = &["DBClusterNotFoundFault", "DBClusterNotFound"];

const STARTED_MESSAGES: &[&str] = &["DB instance started", "DB cluster started"];

fn tag_pairs(tags: &[Tag]) -> impl Iterator<Item = (&str, &str)> {
    tags.iter()
        .filter_map(|t| Some((t.key()?, t.value().unwrap_or_default())))
}

/// Most recent start notification, or the start of the event window.
pub fn latest_start(events: &[Event], now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = now - Duration::minutes(i64::from(EVENT_WINDOW_MINUTES));
    events
        .iter()
        .filter(|e| e.message().is_some_and(|m| STARTED_MESSAGES.contains(&m)))
        .filter_map(|e| e.date().and_then(to_utc))
        .fold(floor, |latest, date| latest.max(date))
}

pub fn instance_resource(
    instance: &DbInstance,
    normalizer: &TagNormalizer,
    start_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<Resource> {
    let id = instance.db_instance_identifier()?;
    let tags = normalizer.normalize(ResourceType::RdsInstance, tag_pairs(instance.tag_list()));
    let status = instance.db_instance_status().unwrap_or_default();
    Some(Resource::new(
        ResourceType::RdsInstance,
        id,
        tags,
        canonical_state(ProviderStatus::Rds { status }),
        start_time,
        instance.instance_create_time().and_then(to_utc).unwrap_or(now),
    ))
}

pub fn cluster_resource(
    cluster: &DbCluster,
    normalizer: &TagNormalizer,
    start_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<Resource> {
    let id = cluster.db_cluster_identifier()?;
    let tags = normalizer.normalize(ResourceType::RdsCluster, tag_pairs(cluster.tag_list()));
    let status = cluster.status().unwrap_or_default();
    let members = cluster
        .db_cluster_members()
        .iter()
        .filter_map(|m| m.db_instance_identifier());
    Some(
        Resource::new(
            ResourceType::RdsCluster,
            id,
            tags,
            canonical_state(ProviderStatus::Rds { status }),
            start_time,
            cluster.cluster_create_time().and_then(to_utc).unwrap_or(now),
        )
        .with_cluster_members(members),
    )
}

/// Start time from a DescribeEvents result. A failed lookup fails the
/// describe; only an empty window falls back to the window floor.
fn start_from_events<E: Debug>(
    id: &str,
    result: Result<DescribeEventsOutput, E>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, AutoStateError> {
    match result {
        Ok(output) => Ok(latest_start(output.events(), now)),
        Err(e) => Err(AutoStateError::Describe(format!("DescribeEvents {id} failed: {e:?}"))),
    }
}

async fn start_time(
    client: &Client,
    source_type: SourceType,
    id: &str,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, AutoStateError> {
    let result = client
        .describe_events()
        .source_type(source_type)
        .source_identifier(id)
        .event_categories("notification")
        .duration(EVENT_WINDOW_MINUTES)
        .send()
        .await;
    start_from_events(id, result, now)
}

pub async fn describe_instance(
    client: &Client,
    normalizer: &TagNormalizer,
    id: &str,
) -> Result<Vec<Resource>, AutoStateError> {
    let output = match client.describe_db_instances().db_instance_identifier(id).send().await {
        Ok(output) => output,
        Err(e) if e.as_service_error().and_then(|se| se.code()).is_some_and(|c| INSTANCE_NOT_FOUND.contains(&c)) => {
            debug!(id, "RDS instance not found");
            return Ok(Vec::new());
        }
        Err(e) => return Err(AutoStateError::Describe(format!("DescribeDBInstances {id} failed: {e:?}"))),
    };

    let now = Utc::now();
    let mut resources = Vec::new();
    for instance in output.db_instances() {
        let started = start_time(client, SourceType::DbInstance, id, now).await?;
        resources.extend(instance_resource(instance, normalizer, started, now));
    }
    Ok(resources)
}

pub async fn describe_cluster(
    client: &Client,
    normalizer: &TagNormalizer,
    id: &str,
) -> Result<Vec<Resource>, AutoStateError> {
    let output = match client.describe_db_clusters().db_cluster_identifier(id).send().await {
        Ok(output) => output,
        Err(e) if e.as_service_error().and_then(|se| se.code()).is_some_and(|c| CLUSTER_NOT_FOUND.contains(&c)) => {
            debug!(id, "RDS cluster not found");
            return Ok(Vec::new());
        }
        Err(e) => return Err(AutoStateError::Describe(format!("DescribeDBClusters {id} failed: {e:?}"))),
    };

    let now = Utc::now();
    let mut resources = Vec::new();
    for cluster in output.db_clusters() {
        let started = start_time(client, SourceType::DbCluster, id, now).await?;
        resources.extend(cluster_resource(cluster, normalizer, started, now));
    }
    Ok(resources)
}
