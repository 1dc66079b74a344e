//! End-to-end tests of the engine against in-memory collaborators.

use std::sync::Arc;

use autostate_core::config::SchedulerConfig;
use autostate_core::{Action, ActionKind, AutoStateError, Resource, ResourceType, State};
use autostate_engine::memory::{MemoryDescriber, RecordingScheduler};
use autostate_engine::{Engine, Input, Invocation, TagNormalizer, TriggerEvent};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

const ECS_ARN: &str = "arn:aws:ecs:us-east-1:123456789012:service/prod/web";

/// Wednesday 2024-05-01 18:00:05 UTC.
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 5).unwrap()
}

fn resource(resource_type: ResourceType, id: &str, state: State, tags: &[(&str, &str)]) -> Resource {
    let tags = TagNormalizer::default().normalize(resource_type, tags.iter().copied());
    Resource::new(
        resource_type,
        id,
        tags,
        state,
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
    )
}

fn office_hours(state: State) -> Resource {
    resource(
        ResourceType::Ec2Instance,
        "i-0abc",
        state,
        &[
            ("autostate:start-schedule", "0 8 * * 1-5"),
            ("autostate:stop-schedule", "0 18 * * 1-5"),
            ("Name", "web-1"),
        ],
    )
}

fn fired(resource: &Resource, kind: ActionKind) -> Action {
    Action {
        resource_type: resource.resource_type,
        resource_id: resource.id.clone(),
        fingerprint: resource.fingerprint.clone(),
        when: Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap(),
        kind,
    }
}

struct Harness {
    describer: Arc<MemoryDescriber>,
    scheduler: Arc<RecordingScheduler>,
    engine: Engine,
}

fn harness(resources: Vec<Resource>) -> Harness {
    let describer = Arc::new(MemoryDescriber::with_resources(resources));
    let scheduler = Arc::new(RecordingScheduler::new());
    let engine = Engine::new(describer.clone(), scheduler.clone(), &SchedulerConfig::default());
    Harness {
        describer,
        scheduler,
        engine,
    }
}

fn event(value: serde_json::Value) -> TriggerEvent {
    serde_json::from_value(value).unwrap()
}

// -- Execution gate ----------------------------------------------------------

#[tokio::test]
async fn fired_stop_passes_and_rearms_next_start() {
    let instance = office_hours(State::Running);
    let h = harness(vec![instance.clone()]);

    let result = h
        .engine
        .process_action(&fired(&instance, ActionKind::Stop), now())
        .await
        .unwrap();
    assert!(result.execute);
    assert_eq!(result.reason, "Checks passed");
    assert_eq!(result.resource.as_ref().unwrap().id, "i-0abc");

    let requests = h.scheduler.requests();
    assert_eq!(requests.len(), 1);
    let next = &requests[0].payload;
    assert_eq!(next.kind, ActionKind::Start);
    assert_eq!(next.when, Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap());
    assert_eq!(requests[0].instant, next.when);
    assert!(requests[0]
        .idempotency_key
        .starts_with("ec2-instance-i-0abc-start-2024-05-02-08-00-V1"));
}

#[tokio::test]
async fn missing_resource_is_not_executed_or_rearmed() {
    let instance = office_hours(State::Running);
    let h = harness(vec![]);

    let result = h
        .engine
        .process_action(&fired(&instance, ActionKind::Stop), now())
        .await
        .unwrap();
    assert!(!result.execute);
    assert_eq!(result.reason, "Instance no longer exists");
    assert!(result.resource.is_none());
    assert!(h.scheduler.requests().is_empty());
}

#[tokio::test]
async fn tag_drift_cancels_without_rearming() {
    let instance = office_hours(State::Running);
    let h = harness(vec![instance.clone()]);
    let stale = fired(&instance, ActionKind::Stop);

    h.describer.insert(resource(
        ResourceType::Ec2Instance,
        "i-0abc",
        State::Running,
        &[("autostate:stop-schedule", "30 19 * * *")],
    ));

    let result = h.engine.process_action(&stale, now()).await.unwrap();
    assert!(!result.execute);
    assert_eq!(result.reason, "Tags do not match execution");
    assert!(result.resource.is_some());
    assert!(h.scheduler.requests().is_empty());
}

#[tokio::test]
async fn non_schedule_tag_change_is_not_drift() {
    let instance = office_hours(State::Running);
    let h = harness(vec![]);
    let action = fired(&instance, ActionKind::Stop);

    h.describer.insert(resource(
        ResourceType::Ec2Instance,
        "i-0abc",
        State::Running,
        &[
            ("autostate:start-schedule", "0 8 * * 1-5"),
            ("autostate:stop-schedule", "0 18 * * 1-5"),
            ("Name", "renamed"),
            ("owner", "ops"),
        ],
    ));

    let result = h.engine.process_action(&action, now()).await.unwrap();
    assert!(result.execute);
}

#[tokio::test]
async fn unmet_preconditions_still_rearm() {
    let instance = office_hours(State::Stopped);
    let h = harness(vec![instance.clone()]);

    let result = h
        .engine
        .process_action(&fired(&instance, ActionKind::Stop), now())
        .await
        .unwrap();
    assert!(!result.execute);
    assert_eq!(result.reason, "Instance is not running");
    assert_eq!(h.scheduler.requests().len(), 1);

    let result = h
        .engine
        .process_action(&fired(&instance, ActionKind::Reboot), now())
        .await
        .unwrap();
    assert_eq!(result.reason, "Instance is not running");

    let running = office_hours(State::Running);
    h.describer.insert(running.clone());
    let result = h
        .engine
        .process_action(&fired(&running, ActionKind::Start), now())
        .await
        .unwrap();
    assert!(!result.execute);
    assert_eq!(result.reason, "Instance is not stopped");
}

#[tokio::test]
async fn terminate_is_never_rearmed() {
    let instance = resource(
        ResourceType::Ec2Instance,
        "i-0abc",
        State::Running,
        &[("autostate:max-lifetime", "60"), ("autostate:stop-schedule", "0 20 * * *")],
    );
    let h = harness(vec![instance.clone()]);

    let result = h
        .engine
        .process_action(&fired(&instance, ActionKind::Terminate), now())
        .await
        .unwrap();
    assert!(result.execute);
    assert!(h.scheduler.requests().is_empty());

    let gone = resource(
        ResourceType::Ec2Instance,
        "i-0abc",
        State::Terminated,
        &[("autostate:max-lifetime", "60"), ("autostate:stop-schedule", "0 20 * * *")],
    );
    h.describer.insert(gone);
    let result = h
        .engine
        .process_action(&fired(&instance, ActionKind::Terminate), now())
        .await
        .unwrap();
    assert!(!result.execute);
    assert_eq!(result.reason, "Instance is already terminated");
}

#[tokio::test]
async fn repeated_firing_rearms_once() {
    let instance = office_hours(State::Running);
    let h = harness(vec![instance.clone()]);
    let action = fired(&instance, ActionKind::Stop);

    let first = h.engine.process_action(&action, now()).await.unwrap();
    let second = h.engine.process_action(&action, now()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(h.scheduler.requests().len(), 1);
}

#[tokio::test]
async fn invalid_schedule_fails_after_arming_valid_selection() {
    let instance = resource(
        ResourceType::Ec2Instance,
        "i-0abc",
        State::Running,
        &[("autostate:start-schedule", "* 8 * * *"), ("autostate:max-runtime", "720")],
    );
    let h = harness(vec![instance.clone()]);

    let err = h
        .engine
        .process_action(&fired(&instance, ActionKind::Start), now())
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let requests = h.scheduler.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].payload.kind, ActionKind::Stop);
    assert_eq!(requests[0].payload.when, Utc.with_ymd_and_hms(2024, 5, 1, 20, 0, 0).unwrap());
}

#[tokio::test]
async fn describe_failure_propagates_from_gate() {
    let instance = office_hours(State::Running);
    let h = harness(vec![instance.clone()]);
    h.describer.fail_on("i-0abc");

    let err = h
        .engine
        .process_action(&fired(&instance, ActionKind::Stop), now())
        .await
        .unwrap_err();
    assert!(matches!(err, AutoStateError::Describe(_)));
}

#[tokio::test]
async fn elapsed_runtime_is_armed_one_minute_out() {
    let instance = resource(
        ResourceType::RdsInstance,
        "orders",
        State::Running,
        &[("autostate:max-runtime", "30"), ("autostate:start-schedule", "0 7 * * *")],
    );
    let h = harness(vec![instance.clone()]);

    let result = h
        .engine
        .process_action(&fired(&instance, ActionKind::Start), now())
        .await
        .unwrap();
    assert_eq!(result.reason, "Instance is not stopped");

    let requests = h.scheduler.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].payload.kind, ActionKind::Stop);
    assert_eq!(requests[0].payload.when, Utc.with_ymd_and_hms(2024, 5, 1, 18, 1, 5).unwrap());
}

// -- Trigger events ----------------------------------------------------------

#[tokio::test]
async fn tag_change_arms_next_action() {
    let instance = office_hours(State::Running);
    let h = harness(vec![instance]);

    let report = h
        .engine
        .process_event(
            &event(json!({
                "id": "evt-1",
                "detail-type": "Tag Change on Resource",
                "source": "aws.tag",
                "resources": ["arn:aws:ec2:us-east-1:123456789012:instance/i-0abc"],
                "detail": {"service": "ec2", "changed-tag-keys": ["autostate:stop-schedule"]}
            })),
            now(),
        )
        .await;
    assert!(report.is_clean());
    assert_eq!(report.armed.len(), 1);
    assert_eq!(report.armed[0].kind, ActionKind::Start);
    assert_eq!(h.scheduler.requests().len(), 1);
}

#[tokio::test]
async fn trigger_batch_contains_failures_per_resource() {
    let good = office_hours(State::Running);
    let broken = resource(
        ResourceType::RdsCluster,
        "aurora-1",
        State::Running,
        &[("autostate:stop-schedule", "- 18 * * *")],
    );
    let h = harness(vec![good, broken]);
    h.describer.insert(resource(ResourceType::RdsInstance, "orders", State::Running, &[]));
    h.describer.fail_on("flaky");

    let report = h
        .engine
        .process_event(
            &event(json!({
                "detail-type": "Tag Change on Resource",
                "source": "aws.tag",
                "resources": [
                    "arn:aws:rds:us-east-1:123456789012:db:flaky",
                    "arn:aws:ec2:us-east-1:123456789012:instance/i-0abc",
                    "not-an-arn",
                    "arn:aws:ec2:us-east-1:123456789012:instance/i-0abc",
                    "arn:aws:ec2:us-east-1:123456789012:volume/vol-1",
                    "arn:aws:rds:us-east-1:123456789012:cluster:aurora-1",
                    "arn:aws:rds:us-east-1:123456789012:db:orders",
                    "arn:aws:ec2:us-east-1:123456789012:instance/i-gone"
                ],
                "detail": {"service": "ec2"}
            })),
            now(),
        )
        .await;

    assert_eq!(report.armed.len(), 1);
    assert_eq!(report.armed[0].resource_id, "i-0abc");
    assert_eq!(report.idle, vec!["orders".to_string()]);

    let failed: Vec<&str> = report.failures.iter().map(|f| f.resource.as_str()).collect();
    assert_eq!(failed, vec!["flaky", "not-an-arn", "aurora-1"]);
    assert!(matches!(report.failures[0].error, AutoStateError::Describe(_)));
    assert!(matches!(report.failures[1].error, AutoStateError::InvalidInput(_)));
    assert!(report.failures[2].error.is_validation());

    assert_eq!(h.scheduler.requests().len(), 1);
}

#[tokio::test]
async fn termination_events_schedule_nothing() {
    let instance = office_hours(State::Running);
    let h = harness(vec![instance]);

    let report = h
        .engine
        .process_event(
            &event(json!({
                "detail-type": "EC2 Instance State-change Notification",
                "source": "aws.ec2",
                "resources": ["arn:aws:ec2:us-east-1:123456789012:instance/i-0abc"],
                "detail": {"instance-id": "i-0abc", "state": "terminated"}
            })),
            now(),
        )
        .await;
    assert!(report.armed.is_empty());
    assert!(report.failures.is_empty());
    assert!(h.scheduler.requests().is_empty());
}

#[tokio::test]
async fn ecs_update_service_arms_with_hashed_key() {
    let service = resource(
        ResourceType::EcsService,
        ECS_ARN,
        State::Stopped,
        &[("autostate:start-schedule", "0 7 * * *"), ("autostate:reboot-schedule", "0 19 * * *")],
    )
    .with_ecs_service("prod", "web");
    let h = harness(vec![service]);

    let report = h
        .engine
        .process_event(
            &event(json!({
                "detail-type": "AWS API Call via CloudTrail",
                "source": "aws.ecs",
                "account": "123456789012",
                "region": "us-east-1",
                "detail": {
                    "eventName": "UpdateService",
                    "requestParameters": {"cluster": "prod", "service": "web", "desiredCount": 0}
                }
            })),
            now(),
        )
        .await;
    assert!(report.is_clean());
    assert_eq!(report.armed.len(), 1);
    assert_eq!(report.armed[0].kind, ActionKind::Start);

    let requests = h.scheduler.requests();
    assert!(requests[0]
        .idempotency_key
        .starts_with("ecs-service-6644324407469896-start-2024-05-02-07-00-"));
}

// -- Dispatch ----------------------------------------------------------------

#[tokio::test]
async fn handle_dispatches_on_input_shape() {
    let instance = office_hours(State::Running);
    let h = harness(vec![instance.clone()]);

    let trigger = Invocation::from_value(json!({
        "StateMachine": {"Id": "arn:aws:states:us-east-1:123456789012:stateMachine:autostate"},
        "Execution": {"Input": {
            "detail-type": "Tag Change on Resource",
            "resources": ["arn:aws:ec2:us-east-1:123456789012:instance/i-0abc"],
            "detail": {"service": "ec2"}
        }}
    }))
    .unwrap();
    let output = h.engine.handle(trigger.input, now()).await.unwrap();
    assert!(output.is_none());

    let action = serde_json::to_value(fired(&instance, ActionKind::Stop)).unwrap();
    let input = Input::from_value(action).unwrap();
    let output = h.engine.handle(input, now()).await.unwrap().unwrap();
    let json = serde_json::to_value(&output).unwrap();
    assert_eq!(json["execute"], true);
    assert_eq!(json["reason"], "Checks passed");
    assert_eq!(json["action"], "stop");
    assert_eq!(json["resourceId"], "i-0abc");
    assert_eq!(json["resource"]["type"], "ec2-instance");
}

#[tokio::test]
async fn plan_does_not_arm() {
    let instance = office_hours(State::Running);
    let h = harness(vec![instance]);

    let plans = h.engine.plan(ResourceType::Ec2Instance, "i-0abc", now()).await.unwrap();
    assert_eq!(plans.len(), 1);
    let (resource, selection) = &plans[0];
    assert_eq!(resource.id, "i-0abc");
    assert_eq!(selection.action.as_ref().unwrap().kind, ActionKind::Start);
    assert!(h.scheduler.requests().is_empty());

    h.describer.remove(ResourceType::Ec2Instance, "i-0abc");
    assert!(h.engine.plan(ResourceType::Ec2Instance, "i-0abc", now()).await.unwrap().is_empty());
}
