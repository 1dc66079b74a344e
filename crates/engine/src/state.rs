//! Provider status → canonical [`State`].

use autostate_core::State;

/// The status fields each provider reports for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus<'a> {
    /// EC2 instance state name (`running`, `stopping`, ...).
    Ec2 { state_name: &'a str },
    /// RDS instance or cluster status (`available`, `stopped`, ...).
    Rds { status: &'a str },
    /// ECS service status together with its current desired count.
    Ecs { status: &'a str, desired_count: i64 },
}

/// Map the latest provider status to a canonical state. Pure: nothing is
/// inferred beyond the snapshot given.
pub fn canonical_state(status: ProviderStatus<'_>) -> State {
    match status {
        ProviderStatus::Ec2 { state_name } => match state_name {
            "running" => State::Running,
            "stopped" | "stopping" => State::Stopped,
            "terminated" => State::Terminated,
            _ => State::Other,
        },
        ProviderStatus::Rds { status } => match status {
            "available" => State::Running,
            "stopped" | "stopping" => State::Stopped,
            _ => State::Other,
        },
        ProviderStatus::Ecs { status, desired_count } => match status {
            "ACTIVE" if desired_count == 0 => State::Stopped,
            "ACTIVE" if desired_count > 0 => State::Running,
            "INACTIVE" => State::Terminated,
            _ => State::Other,
        },
    }
}
