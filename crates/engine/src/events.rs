//! Trigger events delivered through the state machine input.
//!
//! Every trigger is an EventBridge envelope; `detail-type` selects the case.

use serde::Deserialize;
use serde_json::Value;

use crate::arn::ecs_service_arn;

/// EventBridge envelope shared by every trigger case.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub resources: Vec<String>,
    pub detail: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagChangeDetail {
    #[serde(default)]
    pub service: Option<String>,
    #[serde(rename = "resource-type", default)]
    pub resource_type: Option<String>,
    #[serde(rename = "changed-tag-keys", default)]
    pub changed_tag_keys: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ec2StateDetail {
    #[serde(rename = "instance-id", default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RdsEventDetail {
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub source_arn: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudTrailDetail {
    #[serde(default)]
    pub event_name: String,
    #[serde(default)]
    pub request_parameters: Option<Value>,
    #[serde(default)]
    pub response_elements: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcsDeploymentDetail {
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub service_arn: Option<String>,
}

/// A trigger event, keyed by its EventBridge `detail-type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "detail-type")]
pub enum TriggerEvent {
    #[serde(rename = "Tag Change on Resource")]
    TagChange(Envelope<TagChangeDetail>),
    #[serde(rename = "EC2 Instance State-change Notification")]
    Ec2StateChange(Envelope<Ec2StateDetail>),
    #[serde(rename = "RDS DB Instance Event", alias = "RDS DB Cluster Event")]
    RdsEvent(Envelope<RdsEventDetail>),
    #[serde(rename = "AWS API Call via CloudTrail")]
    EcsApiCall(Envelope<CloudTrailDetail>),
    #[serde(rename = "ECS Service Action", alias = "ECS Deployment State Change")]
    EcsDeployment(Envelope<EcsDeploymentDetail>),
}

/// Whether an event asks for re-evaluation or reports a resource going away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    StateChange,
    Termination,
}

impl TriggerEvent {
    pub fn id(&self) -> &str {
        match self {
            TriggerEvent::TagChange(e) => &e.id,
            TriggerEvent::Ec2StateChange(e) => &e.id,
            TriggerEvent::RdsEvent(e) => &e.id,
            TriggerEvent::EcsApiCall(e) => &e.id,
            TriggerEvent::EcsDeployment(e) => &e.id,
        }
    }

    pub fn detail_type(&self) -> &'static str {
        match self {
            TriggerEvent::TagChange(_) => "Tag Change on Resource",
            TriggerEvent::Ec2StateChange(_) => "EC2 Instance State-change Notification",
            TriggerEvent::RdsEvent(_) => "RDS DB Event",
            TriggerEvent::EcsApiCall(_) => "AWS API Call via CloudTrail",
            TriggerEvent::EcsDeployment(_) => "ECS Service Action",
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            TriggerEvent::Ec2StateChange(e)
                if matches!(e.detail.state.as_str(), "terminated" | "shutting-down") =>
            {
                EventKind::Termination
            }
            TriggerEvent::EcsApiCall(e) if e.detail.event_name == "DeleteService" => {
                EventKind::Termination
            }
            _ => EventKind::StateChange,
        }
    }

    /// ARNs of the resources this event concerns, in event order.
    pub fn targets(&self) -> Vec<String> {
        match self {
            TriggerEvent::TagChange(e) => e.resources.clone(),
            TriggerEvent::Ec2StateChange(e) => {
                if !e.resources.is_empty() {
                    return e.resources.clone();
                }
                e.detail
                    .instance_id
                    .iter()
                    .map(|id| format!("arn:aws:ec2:{}:{}:instance/{}", e.region, e.account, id))
                    .collect()
            }
            TriggerEvent::RdsEvent(e) => {
                if !e.resources.is_empty() {
                    return e.resources.clone();
                }
                e.detail.source_arn.iter().cloned().collect()
            }
            TriggerEvent::EcsApiCall(e) => {
                if e.source != "aws.ecs" {
                    return Vec::new();
                }
                ecs_api_call_target(e).map_or_else(|| e.resources.clone(), |arn| vec![arn])
            }
            TriggerEvent::EcsDeployment(e) => {
                if !e.resources.is_empty() {
                    return e.resources.clone();
                }
                e.detail.service_arn.iter().cloned().collect()
            }
        }
    }
}

/// Service ARN from the CloudTrail response, else built from the request.
fn ecs_api_call_target(event: &Envelope<CloudTrailDetail>) -> Option<String> {
    let detail = &event.detail;
    let from_response = detail
        .response_elements
        .as_ref()
        .and_then(|r| r.pointer("/service/serviceArn"))
        .and_then(Value::as_str);
    if let Some(arn) = from_response {
        return Some(arn.to_string());
    }

    let params = detail.request_parameters.as_ref()?;
    let service = params.get("service").and_then(Value::as_str)?;
    let cluster = params.get("cluster").and_then(Value::as_str);
    Some(ecs_service_arn(&event.region, &event.account, cluster, service))
}
