//! Deletion flow.
//!
//! Per alias: look the contact up, detach it from any response plan that
//! engages it, delete its channels, then delete the contact itself. Only
//! the final contact deletion decides the item's outcome; earlier steps
//! log and continue.

use std::future::Future;
use std::io::{self, BufRead, Write};

use tracing::{debug, error, info, warn};

use crate::error::ApiResult;
use crate::model::ResponsePlanRecord;
use crate::report::{ItemOutcome, RunKind, RunReport};
use crate::retry::retry;
use crate::session::Session;

/// Word the operator must type to confirm a live deletion.
pub const CONFIRMATION_WORD: &str = "DELETE";

/// Response plans whose engagements include `contact_arn`.
///
/// Listing failures yield an empty result; a plan that cannot be fetched is
/// skipped.
pub async fn response_plans_engaging(session: &Session, contact_arn: &str) -> Vec<ResponsePlanRecord> {
    let api = session.api();
    let summaries = match api.list_response_plans().await {
        Ok(summaries) => summaries,
        Err(err) => {
            warn!(error = %err, "Could not list response plans");
            return Vec::new();
        }
    };
    debug!(count = summaries.len(), "Scanning response plans");

    let mut engaging = Vec::new();
    for summary in summaries {
        match api.get_response_plan(&summary.arn).await {
            Ok(plan) if plan.engagements.iter().any(|arn| arn == contact_arn) => engaging.push(plan),
            Ok(_) => {}
            Err(err) => warn!(plan = %summary.name, error = %err, "Could not read response plan"),
        }
    }
    engaging
}

/// Drop `contact_arn` from one response plan's engagements. Returns false
/// when the plan did not engage the contact.
pub async fn detach_from_response_plan(
    session: &Session,
    plan: &ResponsePlanRecord,
    contact_arn: &str,
) -> ApiResult<bool> {
    let remaining: Vec<String> = plan
        .engagements
        .iter()
        .filter(|arn| arn.as_str() != contact_arn)
        .cloned()
        .collect();
    if remaining.len() == plan.engagements.len() {
        warn!(plan = %plan.name, "Contact is not engaged by response plan");
        return Ok(false);
    }

    if session.is_dry_run() {
        info!(plan = %plan.name, remaining = remaining.len(), "[dry run] Would remove contact from response plan");
        return Ok(true);
    }

    let api = session.api();
    let plan_arn = plan.arn.as_str();
    let engagements = remaining.as_slice();
    retry(session.retry_policy(), "UpdateResponsePlan", move || {
        api.update_response_plan_engagements(plan_arn, engagements)
    })
    .await?;
    info!(plan = %plan.name, "Removed contact from response plan");
    Ok(true)
}

/// Delete one contact and everything hanging off it.
pub async fn delete_contact(session: &Session, alias: &str, detach_from_plans: bool) -> ItemOutcome {
    match try_delete_contact(session, alias, detach_from_plans).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(alias, error = %err, "Failed to delete contact");
            ItemOutcome::failed(alias, err.to_string())
        }
    }
}

async fn try_delete_contact(session: &Session, alias: &str, detach_from_plans: bool) -> ApiResult<ItemOutcome> {
    let api = session.api();
    let policy = session.retry_policy();
    let dry_run = session.is_dry_run();

    let arn = session.contact_arn(alias).await?;
    match api.get_contact(&arn).await {
        Ok(contact) => debug!(alias, name = ?contact.display_name, "Found contact"),
        Err(err) if err.is_not_found() => {
            warn!(alias, "Contact not found");
            return Ok(ItemOutcome::not_found(alias));
        }
        Err(err) => return Err(err),
    }

    let channels = match api.list_contact_channels(&arn).await {
        Ok(channels) => channels,
        Err(err) => {
            warn!(alias, error = %err, "Could not list contact channels");
            Vec::new()
        }
    };
    debug!(alias, count = channels.len(), "Found contact channels");

    let mut detached = 0;
    if detach_from_plans {
        for plan in response_plans_engaging(session, &arn).await {
            match detach_from_response_plan(session, &plan, &arn).await {
                Ok(true) => detached += 1,
                Ok(false) => {}
                Err(err) => error!(alias, plan = %plan.name, error = %err, "Could not remove contact from response plan"),
            }
        }
    }

    let mut channel_failures = 0;
    for channel in &channels {
        if dry_run {
            info!(alias, channel = %channel.name, "[dry run] Would delete contact channel");
            continue;
        }
        let channel_arn = channel.arn.as_str();
        match retry(policy, "DeleteContactChannel", move || {
            already_gone_ok(api.delete_contact_channel(channel_arn))
        })
        .await
        {
            Ok(()) => debug!(alias, channel = %channel.name, "Deleted contact channel"),
            Err(err) => {
                error!(alias, channel = %channel.name, error = %err, "Could not delete contact channel");
                channel_failures += 1;
            }
        }
    }

    let mut detail = if dry_run {
        info!(alias, "[dry run] Would delete contact");
        format!("would delete with {} channel(s)", channels.len())
    } else {
        let contact_arn = arn.as_str();
        retry(policy, "DeleteContact", move || already_gone_ok(api.delete_contact(contact_arn))).await?;
        info!(alias, "Deleted contact");
        format!("deleted with {} channel(s)", channels.len())
    };
    if detached > 0 {
        detail.push_str(&format!(", detached from {detached} response plan(s)"));
    }
    if channel_failures > 0 {
        detail.push_str(&format!(", {channel_failures} channel deletion(s) failed"));
    }

    Ok(ItemOutcome::succeeded(alias, detail))
}

/// A delete whose target no longer exists has nothing left to do.
async fn already_gone_ok(delete: impl Future<Output = ApiResult<()>>) -> ApiResult<()> {
    match delete.await {
        Err(err) if err.is_not_found() => {
            debug!(error = %err, "Already deleted");
            Ok(())
        }
        other => other,
    }
}

/// Delete every alias in order. Never fails as a whole; see the report.
pub async fn run_delete(session: &Session, aliases: &[String], detach_from_plans: bool) -> RunReport {
    let mut report = RunReport::new(RunKind::Delete, session.is_dry_run(), session.region());
    if session.is_dry_run() {
        warn!("Running in dry-run mode, no changes will be made");
    }

    info!(count = aliases.len(), "Deleting contacts");
    for (idx, alias) in aliases.iter().enumerate() {
        info!(alias = %alias, "[{}/{}] Processing contact", idx + 1, aliases.len());
        report.contacts.push(delete_contact(session, alias, detach_from_plans).await);
    }

    report.account = session.cached_account_id().map(str::to_string);
    report.finish();
    report
}

/// Show the deletion list and ask for [`CONFIRMATION_WORD`].
///
/// In dry-run mode only a notice is written and the answer is `true`.
pub fn confirm_deletion<R: BufRead, W: Write>(
    aliases: &[String],
    dry_run: bool,
    mut input: R,
    mut output: W,
) -> io::Result<bool> {
    let banner = "!".repeat(60);
    writeln!(output, "\n{banner}")?;
    writeln!(output, "WARNING: You are about to delete the following contacts:")?;
    writeln!(output, "{banner}")?;
    for alias in aliases {
        writeln!(output, "  • {alias}")?;
    }
    writeln!(output, "\nTotal contacts to delete: {}", aliases.len())?;

    if dry_run {
        writeln!(output, "\n[DRY RUN] No deletions will be performed.")?;
        return Ok(true);
    }

    writeln!(output, "\nThis action cannot be undone!")?;
    write!(output, "Type '{CONFIRMATION_WORD}' to confirm deletion: ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim() == CONFIRMATION_WORD)
}
