//! In-memory `IncidentApi` used by the workflow tests.
//!
//! Keeps contacts, channels and response plans in maps keyed by ARN, records
//! every call, and can be told to fail specific operations.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use oncall::arn::{build_arn, ResourceKind, DEFAULT_PARTITION};
use oncall::model::{
    ChannelRecord, ChannelType, ContactRecord, NewChannel, ResponsePlanRecord, ResponsePlanSummary,
};
use oncall::plan::Stage;
use oncall::{ApiError, ApiResult, IncidentApi, Session, Settings};

pub const ACCOUNT: &str = "123456789012";
pub const REGION: &str = "us-east-1";

/// Operations that change remote state.
pub const MUTATING_OPS: &[&str] = &[
    "CreateContact",
    "UpdateContact",
    "DeleteContact",
    "CreateContactChannel",
    "DeleteContactChannel",
    "UpdateResponsePlan",
];

#[derive(Debug, Clone)]
pub struct FakeContact {
    pub alias: String,
    pub display_name: String,
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone)]
pub struct FakeChannel {
    pub contact_arn: String,
    pub name: String,
    pub channel_type: ChannelType,
    pub address: String,
}

/// Injected failure: `operation` calls whose target contains `target` fail
/// with `error`, `remaining` times (`None` = always).
struct Failure {
    operation: String,
    target: String,
    remaining: Option<u32>,
    error: ApiError,
}

#[derive(Default)]
struct State {
    contacts: BTreeMap<String, FakeContact>,
    channels: BTreeMap<String, FakeChannel>,
    plans: BTreeMap<String, ResponsePlanRecord>,
    failures: Vec<Failure>,
    calls: Vec<(String, String)>,
    next_channel: u32,
}

#[derive(Default)]
pub struct FakeIncidentApi {
    state: Mutex<State>,
}

pub fn contact_arn(alias: &str) -> String {
    build_arn(DEFAULT_PARTITION, REGION, ACCOUNT, ResourceKind::Contact, alias)
}

pub fn plan_arn(name: &str) -> String {
    build_arn(DEFAULT_PARTITION, REGION, ACCOUNT, ResourceKind::ResponsePlan, name)
}

/// Settings for a fast test run: no retry delay, two attempts.
pub fn test_settings(dry_run: bool) -> Settings {
    Settings {
        dry_run,
        retry_attempts: 2,
        retry_delay_secs: 0,
        ..Settings::default()
    }
}

/// Route workflow logs through the test harness; `RUST_LOG` still applies.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oncall=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

pub fn session(api: &Arc<FakeIncidentApi>, dry_run: bool) -> Session {
    init_tracing();
    Session::new(api.clone(), &test_settings(dry_run))
}

impl FakeIncidentApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_contact(&self, alias: &str, display_name: &str) -> String {
        let arn = contact_arn(alias);
        self.state.lock().unwrap().contacts.insert(
            arn.clone(),
            FakeContact {
                alias: alias.to_string(),
                display_name: display_name.to_string(),
                stages: Vec::new(),
            },
        );
        arn
    }

    pub fn seed_channel(&self, alias: &str, name: &str, channel_type: ChannelType, address: &str) -> String {
        let mut state = self.state.lock().unwrap();
        insert_channel(
            &mut state,
            &contact_arn(alias),
            &NewChannel {
                name: name.to_string(),
                channel_type,
                address: address.to_string(),
            },
        )
    }

    pub fn seed_response_plan(&self, name: &str, engaged_aliases: &[&str]) -> String {
        let arn = plan_arn(name);
        self.state.lock().unwrap().plans.insert(
            arn.clone(),
            ResponsePlanRecord {
                arn: arn.clone(),
                name: name.to_string(),
                engagements: engaged_aliases.iter().map(|a| contact_arn(a)).collect(),
            },
        );
        arn
    }

    /// Fail the next `times` matching calls.
    pub fn fail_times(&self, operation: &str, target: &str, times: u32, error: ApiError) {
        self.push_failure(operation, target, Some(times), error);
    }

    /// Fail every matching call.
    pub fn fail_always(&self, operation: &str, target: &str, error: ApiError) {
        self.push_failure(operation, target, None, error);
    }

    fn push_failure(&self, operation: &str, target: &str, remaining: Option<u32>, error: ApiError) {
        self.state.lock().unwrap().failures.push(Failure {
            operation: operation.to_string(),
            target: target.to_string(),
            remaining,
            error,
        });
    }

    pub fn contact(&self, alias: &str) -> Option<FakeContact> {
        self.state.lock().unwrap().contacts.get(&contact_arn(alias)).cloned()
    }

    pub fn channels_of(&self, alias: &str) -> Vec<FakeChannel> {
        let arn = contact_arn(alias);
        self.state
            .lock()
            .unwrap()
            .channels
            .values()
            .filter(|c| c.contact_arn == arn)
            .cloned()
            .collect()
    }

    pub fn plan_engagements(&self, name: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .plans
            .get(&plan_arn(name))
            .map(|p| p.engagements.clone())
            .unwrap_or_default()
    }

    /// Every call as `(operation, target)`, in order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls().iter().filter(|(op, _)| op == operation).count()
    }

    pub fn mutating_calls(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter(|(op, _)| MUTATING_OPS.contains(&op.as_str()))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Record the call and return the injected failure, if any.
    fn enter(&self, operation: &str, target: &str) -> ApiResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((operation.to_string(), target.to_string()));
        for failure in state.failures.iter_mut() {
            if failure.operation != operation || !target.contains(&failure.target) {
                continue;
            }
            match failure.remaining.as_mut() {
                None => return Err(failure.error.clone()),
                Some(0) => continue,
                Some(n) => {
                    *n -= 1;
                    return Err(failure.error.clone());
                }
            }
        }
        Ok(())
    }
}

fn insert_channel(state: &mut State, contact_arn: &str, channel: &NewChannel) -> String {
    state.next_channel += 1;
    let alias = contact_arn.rsplit('/').next().unwrap_or_default();
    let arn = format!(
        "arn:aws:ssm-contacts:{REGION}:{ACCOUNT}:contact-channel/{alias}/{:04}",
        state.next_channel
    );
    state.channels.insert(
        arn.clone(),
        FakeChannel {
            contact_arn: contact_arn.to_string(),
            name: channel.name.clone(),
            channel_type: channel.channel_type,
            address: channel.address.clone(),
        },
    );
    arn
}

fn not_found(operation: &str, target: &str) -> ApiError {
    ApiError::not_found(operation, format!("{target} does not exist"))
}

#[async_trait]
impl IncidentApi for FakeIncidentApi {
    fn region(&self) -> Option<String> {
        Some(REGION.to_string())
    }

    async fn caller_account(&self) -> ApiResult<String> {
        self.enter("GetCallerIdentity", "")?;
        Ok(ACCOUNT.to_string())
    }

    async fn get_contact(&self, contact_arn: &str) -> ApiResult<ContactRecord> {
        self.enter("GetContact", contact_arn)?;
        let state = self.state.lock().unwrap();
        state
            .contacts
            .get(contact_arn)
            .map(|c| ContactRecord {
                arn: contact_arn.to_string(),
                display_name: Some(c.display_name.clone()),
            })
            .ok_or_else(|| not_found("GetContact", contact_arn))
    }

    async fn create_contact(&self, alias: &str, display_name: &str) -> ApiResult<String> {
        self.enter("CreateContact", alias)?;
        let arn = contact_arn(alias);
        let mut state = self.state.lock().unwrap();
        if state.contacts.contains_key(&arn) {
            return Err(ApiError::conflict("CreateContact", format!("{alias} already exists")));
        }
        state.contacts.insert(
            arn.clone(),
            FakeContact {
                alias: alias.to_string(),
                display_name: display_name.to_string(),
                stages: Vec::new(),
            },
        );
        Ok(arn)
    }

    async fn update_contact_plan(&self, contact_arn: &str, stages: &[Stage]) -> ApiResult<()> {
        self.enter("UpdateContact", contact_arn)?;
        let mut state = self.state.lock().unwrap();
        let contact = state
            .contacts
            .get_mut(contact_arn)
            .ok_or_else(|| not_found("UpdateContact", contact_arn))?;
        contact.stages = stages.to_vec();
        Ok(())
    }

    async fn delete_contact(&self, contact_arn: &str) -> ApiResult<()> {
        self.enter("DeleteContact", contact_arn)?;
        let mut state = self.state.lock().unwrap();
        state
            .contacts
            .remove(contact_arn)
            .ok_or_else(|| not_found("DeleteContact", contact_arn))?;
        state.channels.retain(|_, c| c.contact_arn != contact_arn);
        Ok(())
    }

    async fn list_contact_channels(&self, contact_arn: &str) -> ApiResult<Vec<ChannelRecord>> {
        self.enter("ListContactChannels", contact_arn)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .channels
            .iter()
            .filter(|(_, c)| c.contact_arn == contact_arn)
            .map(|(arn, c)| ChannelRecord {
                arn: arn.clone(),
                name: c.name.clone(),
                channel_type: Some(c.channel_type),
            })
            .collect())
    }

    async fn create_contact_channel(&self, contact_arn: &str, channel: &NewChannel) -> ApiResult<String> {
        self.enter("CreateContactChannel", contact_arn)?;
        let mut state = self.state.lock().unwrap();
        if !state.contacts.contains_key(contact_arn) {
            return Err(not_found("CreateContactChannel", contact_arn));
        }
        let duplicate = state
            .channels
            .values()
            .any(|c| c.contact_arn == contact_arn && c.name == channel.name);
        if duplicate {
            return Err(ApiError::conflict(
                "CreateContactChannel",
                format!("{} already exists", channel.name),
            ));
        }
        Ok(insert_channel(&mut state, contact_arn, channel))
    }

    async fn delete_contact_channel(&self, channel_arn: &str) -> ApiResult<()> {
        self.enter("DeleteContactChannel", channel_arn)?;
        let mut state = self.state.lock().unwrap();
        state
            .channels
            .remove(channel_arn)
            .map(|_| ())
            .ok_or_else(|| not_found("DeleteContactChannel", channel_arn))
    }

    async fn list_response_plans(&self) -> ApiResult<Vec<ResponsePlanSummary>> {
        self.enter("ListResponsePlans", "")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .plans
            .values()
            .map(|p| ResponsePlanSummary {
                arn: p.arn.clone(),
                name: p.name.clone(),
            })
            .collect())
    }

    async fn get_response_plan(&self, plan_arn: &str) -> ApiResult<ResponsePlanRecord> {
        self.enter("GetResponsePlan", plan_arn)?;
        let state = self.state.lock().unwrap();
        state
            .plans
            .get(plan_arn)
            .cloned()
            .ok_or_else(|| not_found("GetResponsePlan", plan_arn))
    }

    async fn update_response_plan_engagements(&self, plan_arn: &str, engagements: &[String]) -> ApiResult<()> {
        self.enter("UpdateResponsePlan", plan_arn)?;
        let mut state = self.state.lock().unwrap();
        let plan = state
            .plans
            .get_mut(plan_arn)
            .ok_or_else(|| not_found("UpdateResponsePlan", plan_arn))?;
        plan.engagements = engagements.to_vec();
        Ok(())
    }
}
