//! Create/update flow: contacts, their channels and engagement plans, then
//! the response plans that engage them.
//!
//! # Flow
//!
//! ```text
//! for each contact (alias order)
//!   get contact ── not found ──▶ create contact (empty plan)
//!   list channels (existing contacts only)
//!   for each configured channel
//!     reuse by name / type ── else ──▶ create channel ── conflict ──▶ re-list, reuse
//!   build engagement plan ──▶ update contact plan (warning on failure)
//! for each response plan
//!   resolve aliases → contact ARNs ──▶ get plan ──▶ replace engagements if changed
//! ```
//!
//! A failing contact or plan is recorded in the [`RunReport`] and the loop
//! moves on. Nothing is rolled back.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, error, info, warn};

use crate::config::AdminConfig;
use crate::error::ApiResult;
use crate::model::{ChannelRecord, ChannelType, ContactSpec, NewChannel, ResponsePlanSpec};
use crate::plan::{build_engagement_plan, EngagementPlan, ResolvedChannel};
use crate::report::{ItemOutcome, RunKind, RunReport};
use crate::retry::retry;
use crate::session::Session;

/// Result of provisioning one contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedContact {
    pub alias: String,
    pub arn: String,
    /// The contact did not exist before this run.
    pub created: bool,
    /// Channels created, or in dry-run mode, that would be created.
    pub channels_created: usize,
    pub channels_reused: usize,
    /// Configured channels left out of the plan because no remote channel
    /// could be resolved.
    pub channels_dropped: usize,
    pub plan: EngagementPlan,
    /// The plan was sent and accepted.
    pub plan_applied: bool,
}

impl ProvisionedContact {
    /// One-line description for the run summary.
    pub fn summary(&self) -> String {
        let mut parts = vec![format!(
            "{} channel(s) ({} new, {} reused), {} stage(s)",
            self.channels_created + self.channels_reused,
            self.channels_created,
            self.channels_reused,
            self.plan.len()
        )];
        if self.created {
            parts.push("new contact".to_string());
        }
        if self.channels_dropped > 0 {
            parts.push(format!("{} channel(s) unresolved", self.channels_dropped));
        }
        if self.plan.is_empty() {
            parts.push("no engagement plan".to_string());
        } else if !self.plan_applied {
            parts.push("plan not applied".to_string());
        }
        parts.join("; ")
    }
}

/// Engagement plan a contact would get, with channel names standing in for
/// remote references. No remote calls.
pub fn preview_plan(spec: &ContactSpec, retry_interval_minutes: u32) -> EngagementPlan {
    let resolved: Vec<ResolvedChannel> = spec
        .channels
        .iter()
        .zip(spec.channel_names())
        .map(|(channel, name)| ResolvedChannel::new(name, channel.channel_type, channel.engagement_minutes))
        .collect();
    build_engagement_plan(&resolved, retry_interval_minutes)
}

/// Create or update one contact, its channels and its engagement plan.
///
/// Errors are contact-level failures: the lookup failed for a reason other
/// than absence, or a channel could not be created. A rejected plan update
/// is only a warning.
pub async fn provision_contact(session: &Session, alias: &str, spec: &ContactSpec) -> ApiResult<ProvisionedContact> {
    let api = session.api();
    let policy = session.retry_policy();
    let dry_run = session.is_dry_run();

    let mut arn = session.contact_arn(alias).await?;
    let mut exists = match api.get_contact(&arn).await {
        Ok(_) => true,
        Err(err) if err.is_not_found() => false,
        Err(err) => return Err(err),
    };

    if exists {
        info!(alias, "Contact already exists");
    } else if dry_run {
        info!(alias, name = %spec.name, "[dry run] Would create contact");
    } else {
        let display_name = spec.name.as_str();
        match retry(policy, "CreateContact", move || api.create_contact(alias, display_name)).await {
            Ok(new_arn) => {
                arn = new_arn;
                info!(alias, arn = %arn, "Created contact");
            }
            Err(err) if err.is_conflict() => {
                info!(alias, "Contact appeared since lookup, continuing with it");
                exists = true;
            }
            Err(err) => return Err(err),
        }
    }
    let created = !exists;

    let mut existing = if exists {
        list_channels_or_empty(session, &arn, alias).await
    } else {
        Vec::new()
    };

    let mut claimed: HashSet<String> = HashSet::new();
    let mut resolved = Vec::with_capacity(spec.channels.len());
    let mut channels_created = 0;
    let mut channels_reused = 0;
    let mut channels_dropped = 0;

    let wanted: Vec<(String, ChannelType)> = spec
        .channel_names()
        .into_iter()
        .zip(spec.channels.iter().map(|c| c.channel_type))
        .collect();
    let matches = match_existing(&existing, &wanted, &mut claimed);

    for ((channel, (name, _)), found) in spec.channels.iter().zip(wanted).zip(matches) {
        if let Some(found) = found {
            debug!(alias, channel = %name, arn = %found, "Using existing channel");
            resolved.push(ResolvedChannel::new(found, channel.channel_type, channel.engagement_minutes));
            channels_reused += 1;
            continue;
        }

        if dry_run {
            info!(
                alias,
                channel = %name,
                address = %channel.address,
                "[dry run] Would create {} channel",
                channel.channel_type
            );
            resolved.push(ResolvedChannel::new(
                format!("(pending) {name}"),
                channel.channel_type,
                channel.engagement_minutes,
            ));
            channels_created += 1;
            continue;
        }

        let request = NewChannel {
            name: name.clone(),
            channel_type: channel.channel_type,
            address: channel.address.clone(),
        };
        let contact_arn = arn.as_str();
        let request_ref = &request;
        match retry(policy, "CreateContactChannel", move || {
            api.create_contact_channel(contact_arn, request_ref)
        })
        .await
        {
            Ok(channel_arn) => {
                info!(alias, channel = %name, "Created {} channel", channel.channel_type);
                claimed.insert(channel_arn.clone());
                resolved.push(ResolvedChannel::new(
                    channel_arn,
                    channel.channel_type,
                    channel.engagement_minutes,
                ));
                channels_created += 1;
            }
            Err(err) if err.is_conflict() => {
                info!(alias, channel = %name, "{} channel already exists", channel.channel_type);
                existing = list_channels_or_empty(session, &arn, alias).await;
                match find_existing(&existing, &name, channel.channel_type, &claimed) {
                    Some(found) => {
                        claimed.insert(found.clone());
                        resolved.push(ResolvedChannel::new(
                            found,
                            channel.channel_type,
                            channel.engagement_minutes,
                        ));
                        channels_reused += 1;
                    }
                    None => {
                        warn!(alias, channel = %name, "Existing channel could not be located, leaving it out of the plan");
                        channels_dropped += 1;
                    }
                }
            }
            Err(err) => {
                error!(alias, channel = %name, error = %err, "Error creating {} channel", channel.channel_type);
                return Err(err);
            }
        }
    }

    let plan = build_engagement_plan(&resolved, session.target_retry_interval_minutes());
    let mut provisioned = ProvisionedContact {
        alias: alias.to_string(),
        arn,
        created,
        channels_created,
        channels_reused,
        channels_dropped,
        plan,
        plan_applied: false,
    };

    if provisioned.plan.is_empty() {
        warn!(alias, "No channels available, contact left without an engagement plan");
        return Ok(provisioned);
    }

    log_plan(alias, &provisioned.plan);

    if dry_run {
        info!(
            alias,
            stages = provisioned.plan.len(),
            "[dry run] Would update engagement plan"
        );
        return Ok(provisioned);
    }

    let contact_arn = provisioned.arn.as_str();
    let stages = provisioned.plan.stages.as_slice();
    let updated = retry(policy, "UpdateContact", move || api.update_contact_plan(contact_arn, stages)).await;
    match updated {
        Ok(()) => {
            info!(
                alias,
                stages = provisioned.plan.len(),
                "Updated engagement plan"
            );
            provisioned.plan_applied = true;
        }
        Err(err) => {
            warn!(alias, error = %err, "Could not update engagement plan; contact and channels were kept");
        }
    }

    Ok(provisioned)
}

/// Point `plan_name` at the contacts listed in `spec`.
///
/// `contact_arns` holds the contacts provisioned in this run; aliases
/// missing from it are skipped with a warning.
pub async fn attach_response_plan(
    session: &Session,
    plan_name: &str,
    spec: &ResponsePlanSpec,
    contact_arns: &BTreeMap<String, String>,
) -> ApiResult<ItemOutcome> {
    let mut engagements: Vec<String> = Vec::with_capacity(spec.contacts.len());
    for alias in &spec.contacts {
        match contact_arns.get(alias) {
            Some(arn) if !engagements.contains(arn) => engagements.push(arn.clone()),
            Some(_) => {}
            None => warn!(plan = plan_name, alias = %alias, "Contact was not provisioned, skipping"),
        }
    }

    if engagements.is_empty() {
        warn!(plan = plan_name, "No provisioned contacts to engage");
        return Ok(ItemOutcome::failed(plan_name, "no provisioned contacts to engage"));
    }

    let plan_arn = session.response_plan_arn(plan_name).await?;
    let api = session.api();
    let current = match api.get_response_plan(&plan_arn).await {
        Ok(plan) => plan,
        Err(err) if err.is_not_found() => {
            error!(plan = plan_name, "Response plan not found");
            return Ok(ItemOutcome::not_found(plan_name));
        }
        Err(err) => return Err(err),
    };
    debug!(plan = plan_name, current = current.engagements.len(), "Found response plan");

    if current.engagements == engagements {
        info!(plan = plan_name, "Response plan already engages the configured contacts");
        return Ok(ItemOutcome::succeeded(
            plan_name,
            format!("{} contact(s), already up to date", engagements.len()),
        ));
    }

    if session.is_dry_run() {
        let added = engagements
            .iter()
            .filter(|arn| !current.engagements.contains(arn))
            .count();
        let removed = current
            .engagements
            .iter()
            .filter(|arn| !engagements.contains(arn))
            .count();
        info!(
            plan = plan_name,
            contacts = engagements.len(),
            added,
            removed,
            "[dry run] Would update response plan"
        );
        return Ok(ItemOutcome::succeeded(
            plan_name,
            format!("would engage {} contact(s)", engagements.len()),
        ));
    }

    let arn = plan_arn.as_str();
    let desired = engagements.as_slice();
    retry(session.retry_policy(), "UpdateResponsePlan", move || {
        api.update_response_plan_engagements(arn, desired)
    })
    .await?;
    info!(plan = plan_name, contacts = engagements.len(), "Updated response plan");

    Ok(ItemOutcome::succeeded(
        plan_name,
        format!("engages {} contact(s)", engagements.len()),
    ))
}

/// Provision every configured contact, then update every configured
/// response plan. Never fails as a whole; see the report.
pub async fn run_provision(session: &Session, config: &AdminConfig) -> RunReport {
    let mut report = RunReport::new(RunKind::Provision, session.is_dry_run(), session.region());
    if session.is_dry_run() {
        warn!("Running in dry-run mode, no changes will be made");
    }

    info!(count = config.contacts.len(), "[1/2] Processing contact definitions");
    let mut contact_arns = BTreeMap::new();
    for (alias, spec) in &config.contacts {
        match provision_contact(session, alias, spec).await {
            Ok(done) => {
                report.contacts.push(ItemOutcome::succeeded(alias, done.summary()));
                contact_arns.insert(alias.clone(), done.arn);
            }
            Err(err) => {
                error!(alias = %alias, error = %err, "Failed to process contact");
                report.contacts.push(ItemOutcome::failed(alias, err.to_string()));
            }
        }
    }

    info!(count = config.response_plans.len(), "[2/2] Processing response plan updates");
    for (name, spec) in &config.response_plans {
        match attach_response_plan(session, name, spec, &contact_arns).await {
            Ok(outcome) => report.response_plans.push(outcome),
            Err(err) => {
                error!(plan = %name, error = %err, "Failed to update response plan");
                report.response_plans.push(ItemOutcome::failed(name, err.to_string()));
            }
        }
    }

    report.account = session.cached_account_id().map(str::to_string);
    report.finish();
    report
}

/// List a contact's channels; a failure is logged and treated as none.
async fn list_channels_or_empty(session: &Session, contact_arn: &str, alias: &str) -> Vec<ChannelRecord> {
    match session.api().list_contact_channels(contact_arn).await {
        Ok(channels) => channels,
        Err(err) => {
            warn!(alias, error = %err, "Could not list contact channels");
            Vec::new()
        }
    }
}

/// Pair every configured `(name, type)` with an existing channel.
///
/// Exact names are claimed for the whole list before any configured channel
/// falls back to matching by type, so a channel named for a later entry is
/// never taken by an earlier one.
fn match_existing(
    existing: &[ChannelRecord],
    wanted: &[(String, ChannelType)],
    claimed: &mut HashSet<String>,
) -> Vec<Option<String>> {
    let mut matches = Vec::with_capacity(wanted.len());
    for (name, _) in wanted {
        let found = existing
            .iter()
            .find(|c| c.name == *name && !claimed.contains(&c.arn))
            .map(|c| c.arn.clone());
        if let Some(arn) = &found {
            claimed.insert(arn.clone());
        }
        matches.push(found);
    }

    for (slot, (name, channel_type)) in matches.iter_mut().zip(wanted) {
        if slot.is_none() {
            *slot = find_existing(existing, name, *channel_type, claimed);
            if let Some(arn) = slot.as_ref() {
                claimed.insert(arn.clone());
            }
        }
    }
    matches
}

/// Existing channel for a configured one: same name first, then the only
/// unclaimed channel of the same type.
fn find_existing(
    existing: &[ChannelRecord],
    name: &str,
    channel_type: ChannelType,
    claimed: &HashSet<String>,
) -> Option<String> {
    let unclaimed: Vec<&ChannelRecord> = existing
        .iter()
        .filter(|c| !claimed.contains(&c.arn))
        .collect();
    if let Some(found) = unclaimed.iter().find(|c| c.name == name) {
        return Some(found.arn.clone());
    }
    let mut same_type = unclaimed.iter().filter(|c| c.channel_type == Some(channel_type));
    match (same_type.next(), same_type.next()) {
        (Some(only), None) => Some(only.arn.clone()),
        _ => None,
    }
}

fn log_plan(alias: &str, plan: &EngagementPlan) {
    for (idx, (stage, start)) in plan.stages.iter().zip(plan.engagement_offsets()).enumerate() {
        let channels: Vec<&str> = stage.targets.iter().map(|t| t.channel_type.as_str()).collect();
        debug!(
            alias,
            stage = idx + 1,
            engage_at = start,
            wait_minutes = stage.duration_minutes,
            channels = %channels.join(", "),
            "Engagement stage"
        );
    }
}
