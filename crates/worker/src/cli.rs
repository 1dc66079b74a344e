use std::path::PathBuf;

use autostate_core::ResourceType;
use clap::{Parser, Subcommand};

/// Tag-driven lifecycle scheduler for EC2, RDS and ECS.
///
/// Invoked by the autostate state machine once per event or fired action.
#[derive(Parser, Debug)]
#[command(name = "autostate", version, about)]
pub struct Cli {
    /// Config profile (`{PROFILE}_{KEY}` env vars take precedence).
    #[arg(long, env = "AUTOSTATE_PROFILE", global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one state machine invocation and print its output JSON.
    Handle {
        /// Invocation payload file (stdin when omitted).
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Describe a resource and show its next action without arming it.
    Plan {
        #[arg(long)]
        resource_type: ResourceType,

        /// Instance or cluster identifier; the service ARN for ECS.
        #[arg(long)]
        id: String,
    },

    /// Normalize tags offline and print the schedule and its fingerprint.
    Fingerprint {
        #[arg(long)]
        resource_type: ResourceType,

        /// Tag as `key=value`; repeatable.
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<(String, String)>,
    },
}

fn parse_tag(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))
}
