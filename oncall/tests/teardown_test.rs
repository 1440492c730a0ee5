//! Delete workflow against the in-memory API.

mod common;

use common::{contact_arn, session, FakeIncidentApi};
use oncall::model::ChannelType;
use oncall::{run_delete, ApiError, ItemStatus};

fn aliases(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn seed_alice(api: &FakeIncidentApi) {
    api.seed_contact("alice", "Alice Nguyen");
    api.seed_channel("alice", "Alice Nguyen - EMAIL", ChannelType::Email, "alice@example.com");
    api.seed_channel("alice", "Alice Nguyen - SMS", ChannelType::Sms, "+15550100");
}

#[tokio::test]
async fn test_delete_removes_contact_and_channels() {
    let api = FakeIncidentApi::new();
    seed_alice(&api);

    let report = run_delete(&session(&api, false), &aliases(&["alice"]), true).await;

    assert!(report.all_succeeded());
    assert!(api.contact("alice").is_none());
    assert!(api.channels_of("alice").is_empty());
    assert_eq!(api.count("DeleteContactChannel"), 2);
    assert_eq!(api.count("DeleteContact"), 1);
    assert_eq!(
        report.contacts[0].detail.as_deref(),
        Some("deleted with 2 channel(s)")
    );
}

#[tokio::test]
async fn test_nonexistent_alias_is_not_found() {
    let api = FakeIncidentApi::new();

    let report = run_delete(&session(&api, false), &aliases(&["ghost"]), true).await;

    assert_eq!(report.contacts[0].status, ItemStatus::NotFound);
    assert!(!report.all_succeeded());
    assert!(api.mutating_calls().is_empty());
    assert_eq!(api.count("ListResponsePlans"), 0);
}

#[tokio::test]
async fn test_contact_detached_from_response_plans() {
    let api = FakeIncidentApi::new();
    seed_alice(&api);
    api.seed_contact("bob", "Bob Tran");
    api.seed_response_plan("critical", &["alice", "bob"]);
    api.seed_response_plan("database", &["bob"]);

    let report = run_delete(&session(&api, false), &aliases(&["alice"]), true).await;

    assert!(report.all_succeeded());
    assert_eq!(api.plan_engagements("critical"), vec![contact_arn("bob")]);
    assert_eq!(api.plan_engagements("database"), vec![contact_arn("bob")]);
    assert_eq!(api.count("UpdateResponsePlan"), 1);
    assert!(report.contacts[0]
        .detail
        .as_deref()
        .unwrap()
        .contains("detached from 1 response plan(s)"));
}

#[tokio::test]
async fn test_keep_response_plans_skips_detach() {
    let api = FakeIncidentApi::new();
    seed_alice(&api);
    api.seed_response_plan("critical", &["alice"]);

    let report = run_delete(&session(&api, false), &aliases(&["alice"]), false).await;

    assert!(report.all_succeeded());
    assert_eq!(api.count("ListResponsePlans"), 0);
    assert_eq!(api.plan_engagements("critical"), vec![contact_arn("alice")]);
}

#[tokio::test]
async fn test_detach_and_channel_errors_are_not_fatal() {
    let api = FakeIncidentApi::new();
    seed_alice(&api);
    api.seed_response_plan("critical", &["alice"]);
    api.fail_always(
        "UpdateResponsePlan",
        "critical",
        ApiError::remote("UpdateResponsePlan", "access denied"),
    );
    api.fail_always(
        "DeleteContactChannel",
        "alice",
        ApiError::remote("DeleteContactChannel", "throttled"),
    );

    let report = run_delete(&session(&api, false), &aliases(&["alice"]), true).await;

    let outcome = &report.contacts[0];
    assert_eq!(outcome.status, ItemStatus::Succeeded);
    assert!(outcome
        .detail
        .as_deref()
        .unwrap()
        .contains("2 channel deletion(s) failed"));
    assert!(api.contact("alice").is_none());
}

#[tokio::test]
async fn test_partial_failure_attempts_every_alias() {
    let api = FakeIncidentApi::new();
    api.seed_contact("first", "First");
    api.seed_contact("second", "Second");
    api.seed_contact("third", "Third");
    api.fail_always(
        "DeleteContact",
        "second",
        ApiError::remote("DeleteContact", "boom"),
    );

    let report = run_delete(
        &session(&api, false),
        &aliases(&["first", "second", "third"]),
        false,
    )
    .await;

    let statuses: Vec<_> = report.contacts.iter().map(|c| c.status).collect();
    assert_eq!(
        statuses,
        vec![ItemStatus::Succeeded, ItemStatus::Failed, ItemStatus::Succeeded]
    );
    assert!(!report.all_succeeded());
    assert!(api.contact("first").is_none());
    assert!(api.contact("second").is_some());
    assert!(api.contact("third").is_none());
    assert!(report.render().contains("✗ second: DeleteContact failed: boom"));
}

#[tokio::test]
async fn test_unreadable_plan_is_skipped() {
    let api = FakeIncidentApi::new();
    seed_alice(&api);
    api.seed_response_plan("broken", &["alice"]);
    api.seed_response_plan("critical", &["alice"]);
    api.fail_always(
        "GetResponsePlan",
        "broken",
        ApiError::remote("GetResponsePlan", "internal error"),
    );

    let report = run_delete(&session(&api, false), &aliases(&["alice"]), true).await;

    assert!(report.all_succeeded());
    assert!(api.plan_engagements("critical").is_empty());
    assert_eq!(api.plan_engagements("broken"), vec![contact_arn("alice")]);
}

#[tokio::test]
async fn test_resources_vanishing_before_delete_count_as_deleted() {
    let api = FakeIncidentApi::new();
    seed_alice(&api);
    api.fail_always(
        "DeleteContactChannel",
        "alice",
        ApiError::not_found("DeleteContactChannel", "channel is gone"),
    );
    api.fail_always(
        "DeleteContact",
        &contact_arn("alice"),
        ApiError::not_found("DeleteContact", "contact is gone"),
    );

    let report = run_delete(&session(&api, false), &aliases(&["alice"]), true).await;

    let outcome = &report.contacts[0];
    assert_eq!(outcome.status, ItemStatus::Succeeded);
    assert_eq!(outcome.detail.as_deref(), Some("deleted with 2 channel(s)"));
    // not retried
    assert_eq!(api.count("DeleteContactChannel"), 2);
    assert_eq!(api.count("DeleteContact"), 1);
}
