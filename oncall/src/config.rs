//! Configuration: contacts, response plans, deletion list and run toggles.
//!
//! Loaded from a TOML file, then overridden from `ONCALL_*` environment
//! variables; the CLI applies its flags last.
//!
//! ```toml
//! [settings]
//! dry_run = true
//! retry_attempts = 3
//!
//! [contacts.jdoe]
//! name = "John Doe"
//! channels = [
//!   { type = "EMAIL", address = "john.doe@example.com", engagement_minutes = 0 },
//!   { type = "SMS", address = "+15550100", engagement_minutes = 5 },
//! ]
//!
//! [response_plans."critical-response"]
//! contacts = ["jdoe"]
//!
//! [deletion]
//! contacts = ["olduser"]
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{ChannelType, ContactSpec, ResponsePlanSpec};
use crate::plan::{oversized_gaps, DEFAULT_TARGET_RETRY_INTERVAL_MINUTES, MAX_STAGE_MINUTES};
use crate::retry::RetryPolicy;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "oncall.toml";

/// Run toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Log intended mutations instead of performing them.
    pub dry_run: bool,
    /// Ask the operator to type `DELETE` before a live deletion.
    pub require_confirmation: bool,
    /// Detach contacts from response plans before deleting them.
    pub remove_from_response_plans: bool,
    pub retry_attempts: u32,
    pub retry_delay_secs: u64,
    /// Retry interval stamped on every engagement plan target.
    pub channel_retry_interval_minutes: u32,
    /// Overrides the SDK's region resolution when set.
    pub region: Option<String>,
    pub partition: Option<String>,
    /// Debug-level progress output.
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dry_run: false,
            require_confirmation: false,
            remove_from_response_plans: true,
            retry_attempts: 3,
            retry_delay_secs: 2,
            channel_retry_interval_minutes: DEFAULT_TARGET_RETRY_INTERVAL_MINUTES,
            region: None,
            partition: None,
            verbose: true,
        }
    }
}

impl Settings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, Duration::from_secs(self.retry_delay_secs))
    }
}

/// Contacts scheduled for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeletionSpec {
    pub contacts: Vec<String>,
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdminConfig {
    pub settings: Settings,
    /// Alias → desired contact.
    pub contacts: BTreeMap<String, ContactSpec>,
    /// Response plan name → contacts to engage.
    pub response_plans: BTreeMap<String, ResponsePlanSpec>,
    pub deletion: DeletionSpec,
}

impl AdminConfig {
    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `ONCALL_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` to read variables.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let settings = &mut self.settings;

        if let Some(value) = lookup("ONCALL_DRY_RUN") {
            settings.dry_run = parse_flag("ONCALL_DRY_RUN", &value)?;
        }
        if let Some(value) = lookup("ONCALL_REQUIRE_CONFIRMATION") {
            settings.require_confirmation = parse_flag("ONCALL_REQUIRE_CONFIRMATION", &value)?;
        }
        if let Some(value) = lookup("ONCALL_VERBOSE") {
            settings.verbose = parse_flag("ONCALL_VERBOSE", &value)?;
        }
        if let Some(value) = lookup("ONCALL_REGION") {
            if !value.trim().is_empty() {
                settings.region = Some(value.trim().to_string());
            }
        }
        if let Some(value) = lookup("ONCALL_RETRY_ATTEMPTS") {
            settings.retry_attempts = parse_number("ONCALL_RETRY_ATTEMPTS", &value)?;
        }
        if let Some(value) = lookup("ONCALL_RETRY_DELAY_SECS") {
            settings.retry_delay_secs = parse_number("ONCALL_RETRY_DELAY_SECS", &value)?;
        }
        Ok(())
    }

    /// Check everything the provision flow relies on.
    pub fn validate_provisioning(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();
        self.check_settings(&mut problems);
        self.check_contacts(&mut problems);
        self.check_response_plans(&mut problems);
        into_result(problems)
    }

    /// Check the whole file, deletion list included.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();
        self.check_settings(&mut problems);
        self.check_contacts(&mut problems);
        self.check_response_plans(&mut problems);
        check_aliases(&self.deletion.contacts, &mut problems);
        into_result(problems)
    }

    fn check_settings(&self, problems: &mut Vec<String>) {
        if self.settings.retry_attempts == 0 {
            problems.push("settings.retry_attempts must be at least 1".to_string());
        }
        if self.settings.channel_retry_interval_minutes == 0 {
            problems.push("settings.channel_retry_interval_minutes must be at least 1".to_string());
        }
    }

    fn check_contacts(&self, problems: &mut Vec<String>) {
        for (alias, contact) in &self.contacts {
            if let Some(reason) = alias_problem(alias) {
                problems.push(format!("contact alias {alias:?} {reason}"));
            }
            if contact.name.trim().is_empty() {
                problems.push(format!("contact {alias} is missing a name"));
            }
            if contact.channels.is_empty() {
                problems.push(format!("contact {alias} has no channels"));
            }

            let mut seen = HashSet::new();
            for channel in &contact.channels {
                let address = channel.address.trim();
                if address.is_empty() {
                    problems.push(format!(
                        "contact {alias} has a {} channel without an address",
                        channel.channel_type
                    ));
                    continue;
                }
                if let Some(reason) = address_problem(channel.channel_type, address) {
                    problems.push(format!(
                        "contact {alias} {} address {address:?} {reason}",
                        channel.channel_type
                    ));
                }
                if !seen.insert((channel.channel_type, address)) {
                    problems.push(format!(
                        "contact {alias} lists {} {address} more than once",
                        channel.channel_type
                    ));
                }
            }

            for (from, to) in oversized_gaps(&contact.engagement_minutes()) {
                problems.push(format!(
                    "contact {alias} waits {} minutes between engagements at {from} and {to} (at most {MAX_STAGE_MINUTES})",
                    to - from
                ));
            }
        }
    }

    fn check_response_plans(&self, problems: &mut Vec<String>) {
        for (name, plan) in &self.response_plans {
            if name.trim().is_empty() {
                problems.push("response plan with an empty name".to_string());
                continue;
            }
            if plan.contacts.is_empty() {
                problems.push(format!("response plan {name} has no contacts to engage"));
            }
            let mut seen = HashSet::new();
            for alias in &plan.contacts {
                if !self.contacts.contains_key(alias) {
                    problems.push(format!(
                        "response plan {name} references undefined contact {alias}"
                    ));
                }
                if !seen.insert(alias.as_str()) {
                    problems.push(format!("response plan {name} lists contact {alias} twice"));
                }
            }
        }
    }
}

/// Check an explicit deletion work list.
pub fn validate_deletion_list(aliases: &[String]) -> Result<(), ConfigError> {
    let mut problems = Vec::new();
    if aliases.is_empty() {
        problems.push("no contacts specified for deletion".to_string());
    }
    check_aliases(aliases, &mut problems);
    into_result(problems)
}

fn check_aliases(aliases: &[String], problems: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for alias in aliases {
        if let Some(reason) = alias_problem(alias) {
            problems.push(format!("deletion alias {alias:?} {reason}"));
        }
        if !seen.insert(alias.as_str()) {
            problems.push(format!("deletion alias {alias} listed twice"));
        }
    }
}

fn into_result(problems: Vec<String>) -> Result<(), ConfigError> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(problems))
    }
}

fn alias_problem(alias: &str) -> Option<&'static str> {
    if alias.is_empty() {
        return Some("is empty");
    }
    if alias.len() > 255 {
        return Some("is longer than 255 characters");
    }
    let valid = alias
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if valid {
        None
    } else {
        Some("may only contain lowercase letters, digits, '_' and '-'")
    }
}

fn address_problem(channel_type: ChannelType, address: &str) -> Option<&'static str> {
    if channel_type.is_phone() {
        let Some(digits) = address.strip_prefix('+') else {
            return Some("must be '+' followed by up to 15 digits");
        };
        if digits.is_empty() || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Some("must be '+' followed by up to 15 digits");
        }
        None
    } else if address.contains('@') {
        None
    } else {
        Some("is not an email address")
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        key: key.to_string(),
        value: value.to_string(),
    })
}
