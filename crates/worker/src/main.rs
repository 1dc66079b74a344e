//! autostate: state machine worker for tag-driven lifecycle scheduling.
//!
//! `handle` runs one invocation: a trigger event re-arms the resources it
//! names, a fired action goes through the execution gate.

mod cli;

use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use serde_json::json;
use tracing::info;

use autostate_aws::{AwsClients, AwsDescriber, StepFunctionsScheduler};
use autostate_core::config::{load_dotenv, Config};
use autostate_core::{fingerprint, ResourceType};
use autostate_engine::memory::RecordingScheduler;
use autostate_engine::{Engine, Invocation, TagNormalizer};

use crate::cli::{Cli, Command};

async fn handle(config: &Config, input: Option<std::path::PathBuf>) -> Result<()> {
    let raw = match &input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading invocation from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading invocation from stdin")?;
            buf
        }
    };
    let invocation = Invocation::from_json(&raw).context("parsing invocation")?;

    let state_machine_arn = invocation
        .state_machine_arn
        .clone()
        .or_else(|| config.scheduler.state_machine_arn.clone())
        .context("no state machine: the invocation carries none and AUTOSTATE_STATE_MACHINE_ARN is unset")?;

    let clients = AwsClients::from_config(&config.aws).await;
    let describer = Arc::new(AwsDescriber::new(
        clients.clone(),
        TagNormalizer::new(config.scheduler.tag_prefix.clone()),
    ));
    let scheduler = Arc::new(StepFunctionsScheduler::new(clients.sfn, state_machine_arn));
    let engine = Engine::new(describer, scheduler, &config.scheduler);

    let output = engine.handle(invocation.input, Utc::now()).await?;
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

async fn plan(config: &Config, resource_type: ResourceType, id: &str) -> Result<()> {
    let clients = AwsClients::from_config(&config.aws).await;
    let describer = Arc::new(AwsDescriber::new(
        clients,
        TagNormalizer::new(config.scheduler.tag_prefix.clone()),
    ));
    // Nothing is armed: plan only reads the selection.
    let engine = Engine::new(describer, Arc::new(RecordingScheduler::new()), &config.scheduler);

    let plans = engine.plan(resource_type, id, Utc::now()).await?;
    if plans.is_empty() {
        info!(%resource_type, id, "resource not found");
    }
    for (resource, selection) in plans {
        let rejected: Vec<_> = selection
            .rejected
            .iter()
            .map(|(kind, err)| json!({"action": kind, "error": err.to_string()}))
            .collect();
        let report = json!({
            "resource": resource,
            "next": selection.action,
            "candidates": selection.candidates,
            "rejected": rejected,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn fingerprint_tags(config: &Config, resource_type: ResourceType, tags: &[(String, String)]) -> Result<()> {
    let normalizer = TagNormalizer::new(config.scheduler.tag_prefix.clone());
    let schedule = normalizer.normalize(resource_type, tags.iter().map(|(k, v)| (k, v)));
    let report = json!({
        "tags": schedule,
        "fingerprint": fingerprint(&schedule),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    load_dotenv();
    let cli = Cli::parse();

    let config = match cli.profile.as_deref() {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };
    config.log_summary();

    match cli.command {
        Command::Handle { input } => handle(&config, input).await,
        Command::Plan { resource_type, id } => plan(&config, resource_type, &id).await,
        Command::Fingerprint { resource_type, tags } => fingerprint_tags(&config, resource_type, &tags),
    }
}
