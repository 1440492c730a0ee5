//! Per-item outcomes and the end-of-run summary.

use chrono::{DateTime, Utc};
use serde::Serialize;

const RULE_WIDTH: usize = 60;

/// What happened to one work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Succeeded,
    /// The item did not exist remotely; reported, never raised.
    NotFound,
    Failed,
}

impl ItemStatus {
    fn marker(self) -> &'static str {
        match self {
            Self::Succeeded => "✓",
            Self::NotFound => "!",
            Self::Failed => "✗",
        }
    }
}

/// Outcome of one contact or response plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    pub name: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ItemOutcome {
    pub fn succeeded(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ItemStatus::Succeeded,
            detail: Some(detail.into()),
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ItemStatus::NotFound,
            detail: Some("not found".to_string()),
        }
    }

    pub fn failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ItemStatus::Failed,
            detail: Some(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ItemStatus::Succeeded
    }
}

/// Which workflow produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Provision,
    Delete,
}

/// Counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub succeeded: usize,
    pub not_found: usize,
    pub failed: usize,
}

impl Tally {
    fn of(items: &[ItemOutcome]) -> Self {
        items.iter().fold(Self::default(), |mut tally, item| {
            match item.status {
                ItemStatus::Succeeded => tally.succeeded += 1,
                ItemStatus::NotFound => tally.not_found += 1,
                ItemStatus::Failed => tally.failed += 1,
            }
            tally
        })
    }
}

/// Aggregated result of one run, in work-list order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub kind: RunKind,
    pub dry_run: bool,
    pub region: String,
    pub account: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub contacts: Vec<ItemOutcome>,
    pub response_plans: Vec<ItemOutcome>,
}

impl RunReport {
    pub fn new(kind: RunKind, dry_run: bool, region: impl Into<String>) -> Self {
        Self {
            kind,
            dry_run,
            region: region.into(),
            account: None,
            started_at: Utc::now(),
            finished_at: None,
            contacts: Vec::new(),
            response_plans: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// True only when every item succeeded; drives the process exit status.
    pub fn all_succeeded(&self) -> bool {
        self.contacts
            .iter()
            .chain(&self.response_plans)
            .all(ItemOutcome::is_success)
    }

    pub fn contact_tally(&self) -> Tally {
        Tally::of(&self.contacts)
    }

    pub fn response_plan_tally(&self) -> Tally {
        Tally::of(&self.response_plans)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable summary block.
    pub fn render(&self) -> String {
        let rule = "=".repeat(RULE_WIDTH);
        let mut out = String::new();
        let title = match (self.kind, self.dry_run) {
            (_, true) => "DRY RUN SUMMARY",
            (RunKind::Provision, false) => "EXECUTION SUMMARY",
            (RunKind::Delete, false) => "DELETION SUMMARY",
        };
        let done_label = match (self.kind, self.dry_run) {
            (RunKind::Provision, true) => "Would provision",
            (RunKind::Provision, false) => "Provisioned",
            (RunKind::Delete, true) => "Would delete",
            (RunKind::Delete, false) => "Deleted",
        };

        out.push_str(&format!("\n{rule}\n{title}\n{rule}\n"));

        let tally = self.contact_tally();
        out.push_str(&format!("Contacts processed: {}\n", self.contacts.len()));
        out.push_str(&format!("  • {done_label}: {}\n", tally.succeeded));
        out.push_str(&format!("  • Not found: {}\n", tally.not_found));
        out.push_str(&format!("  • Failed: {}\n", tally.failed));
        push_items(&mut out, &self.contacts);

        if self.kind == RunKind::Provision {
            let tally = self.response_plan_tally();
            out.push_str(&format!(
                "\nResponse plans processed: {}\n",
                self.response_plans.len()
            ));
            out.push_str(&format!("  • Updated: {}\n", tally.succeeded));
            out.push_str(&format!("  • Not found: {}\n", tally.not_found));
            out.push_str(&format!("  • Failed: {}\n", tally.failed));
            push_items(&mut out, &self.response_plans);
        }

        out.push_str("\nConfiguration:\n");
        out.push_str(&format!(
            "  • Mode: {}\n",
            if self.dry_run { "DRY RUN" } else { "LIVE" }
        ));
        out.push_str(&format!("  • Region: {}\n", self.region));
        out.push_str(&format!(
            "  • Account: {}\n",
            self.account.as_deref().unwrap_or("unknown")
        ));
        if let Some(finished) = self.finished_at {
            let elapsed = finished - self.started_at;
            out.push_str(&format!(
                "  • Duration: {:.1}s\n",
                elapsed.num_milliseconds() as f64 / 1000.0
            ));
        }

        if self.dry_run && tally.succeeded > 0 {
            out.push_str("\nTo apply these changes:\n");
            out.push_str("  1. Set settings.dry_run = false (or pass --live)\n");
            out.push_str("  2. Run the command again\n");
        }

        out.push_str(&rule);
        out.push('\n');
        out
    }
}

fn push_items(out: &mut String, items: &[ItemOutcome]) {
    for item in items {
        match &item.detail {
            Some(detail) => out.push_str(&format!(
                "    {} {}: {detail}\n",
                item.status.marker(),
                item.name
            )),
            None => out.push_str(&format!("    {} {}\n", item.status.marker(), item.name)),
        }
    }
}
