//! [`ResourceDescriber`] over the EC2, RDS and ECS APIs.

use async_trait::async_trait;

use autostate_core::{AutoStateError, Resource, ResourceType};
use autostate_engine::{ResourceDescriber, TagNormalizer};

use crate::client::AwsClients;
use crate::{ec2, ecs, rds};

pub struct AwsDescriber {
    clients: AwsClients,
    normalizer: TagNormalizer,
}

impl AwsDescriber {
    pub fn new(clients: AwsClients, normalizer: TagNormalizer) -> Self {
        Self { clients, normalizer }
    }
}

#[async_trait]
impl ResourceDescriber for AwsDescriber {
    async fn describe(&self, resource_type: ResourceType, id: &str) -> Result<Vec<Resource>, AutoStateError> {
        match resource_type {
            ResourceType::Ec2Instance => ec2::describe_instance(&self.clients.ec2, &self.normalizer, id).await,
            ResourceType::RdsInstance => rds::describe_instance(&self.clients.rds, &self.normalizer, id).await,
            ResourceType::RdsCluster => rds::describe_cluster(&self.clients.rds, &self.normalizer, id).await,
            ResourceType::EcsService => ecs::describe_service(&self.clients.ecs, &self.normalizer, id).await,
        }
    }
}
