//! AWS adapters for the autostate engine: resource description over EC2,
//! RDS and ECS, and Step Functions as the durable timer.

pub mod client;
pub mod convert;
pub mod describer;
pub mod ec2;
pub mod ecs;
pub mod rds;
pub mod sfn;

pub use client::{load_sdk_config, AwsClients};
pub use describer::AwsDescriber;
pub use sfn::StepFunctionsScheduler;
