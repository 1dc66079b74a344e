//! ARN parsing for trigger event targets.

use autostate_core::{AutoStateError, ResourceType};

/// The six colon-separated parts of an ARN. The resource part may itself
/// contain colons (`db:mydb`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arn<'a> {
    pub partition: &'a str,
    pub service: &'a str,
    pub region: &'a str,
    pub account: &'a str,
    pub resource: &'a str,
}

impl<'a> Arn<'a> {
    pub fn parse(arn: &'a str) -> Result<Self, AutoStateError> {
        let mut parts = arn.splitn(6, ':');
        let prefix = parts.next();
        let (Some("arn"), Some(partition), Some(service), Some(region), Some(account), Some(resource)) = (
            prefix,
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(AutoStateError::InvalidInput(format!("Malformed ARN: {arn}")));
        };
        if service.is_empty() || resource.is_empty() {
            return Err(AutoStateError::InvalidInput(format!("Malformed ARN: {arn}")));
        }
        Ok(Self {
            partition,
            service,
            region,
            account,
            resource,
        })
    }
}

/// A resource the engine manages, identified from an event target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub resource_type: ResourceType,
    pub id: String,
}

impl ResourceRef {
    pub fn new(resource_type: ResourceType, id: impl Into<String>) -> Self {
        Self {
            resource_type,
            id: id.into(),
        }
    }

    /// Identify the managed resource an ARN points at.
    ///
    /// `Ok(None)` for well-formed ARNs of kinds the engine does not manage
    /// (volumes, snapshots, tasks, other services).
    pub fn from_arn(arn: &str) -> Result<Option<Self>, AutoStateError> {
        let parsed = Arn::parse(arn)?;
        let resource = parsed.resource;
        let found = match parsed.service {
            "ec2" => resource
                .strip_prefix("instance/")
                .map(|id| (ResourceType::Ec2Instance, id.to_string())),
            "rds" => {
                if let Some(id) = resource.strip_prefix("db:") {
                    Some((ResourceType::RdsInstance, id.to_string()))
                } else {
                    resource
                        .strip_prefix("cluster:")
                        .map(|id| (ResourceType::RdsCluster, id.to_string()))
                }
            }
            "ecs" if resource.starts_with("service/") => {
                // Validates the path; the id stays the full ARN.
                EcsServicePath::parse(arn)?;
                Some((ResourceType::EcsService, arn.to_string()))
            }
            _ => None,
        };

        match found {
            Some((_, id)) if id.is_empty() => {
                Err(AutoStateError::InvalidInput(format!("ARN has an empty resource id: {arn}")))
            }
            Some((resource_type, id)) => Ok(Some(Self::new(resource_type, id))),
            None => Ok(None),
        }
    }
}

/// Cluster and service names carried in an ECS service ARN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcsServicePath {
    pub cluster: String,
    pub service_name: String,
}

impl EcsServicePath {
    /// Cluster used by legacy `service/<name>` ARNs.
    pub const DEFAULT_CLUSTER: &'static str = "default";

    /// Parse `...:service/<cluster>/<name>` or the legacy `...:service/<name>`.
    pub fn parse(arn: &str) -> Result<Self, AutoStateError> {
        let parsed = Arn::parse(arn)?;
        let path = parsed
            .resource
            .strip_prefix("service/")
            .ok_or_else(|| AutoStateError::InvalidInput(format!("Not an ECS service ARN: {arn}")))?;

        let segments: Vec<&str> = path.split('/').collect();
        match segments.as_slice() {
            [name] if !name.is_empty() => Ok(Self {
                cluster: Self::DEFAULT_CLUSTER.to_string(),
                service_name: name.to_string(),
            }),
            [cluster, name] if !cluster.is_empty() && !name.is_empty() => Ok(Self {
                cluster: cluster.to_string(),
                service_name: name.to_string(),
            }),
            _ => Err(AutoStateError::InvalidInput(format!("Malformed ECS service ARN: {arn}"))),
        }
    }
}

/// Build an ECS service ARN from CloudTrail request parameters.
///
/// `cluster` and `service` may each be a bare name or a full ARN; a full
/// service ARN is returned unchanged.
pub fn ecs_service_arn(region: &str, account: &str, cluster: Option<&str>, service: &str) -> String {
    if service.starts_with("arn:") {
        return service.to_string();
    }
    let cluster = cluster
        .map(|c| match c.rsplit_once("cluster/") {
            Some((_, name)) if c.starts_with("arn:") => name,
            _ => c,
        })
        .filter(|c| !c.is_empty())
        .unwrap_or(EcsServicePath::DEFAULT_CLUSTER);
    format!("arn:aws:ecs:{region}:{account}:service/{cluster}/{service}")
}
