//! On-call contact administration for AWS Systems Manager Incident Manager.
//!
//! This library provides:
//! - Declarative contacts with email, SMS and voice channels
//! - Escalation (engagement) plan construction from per-channel delays
//! - Response plan wiring to the provisioned contacts
//! - Bulk deletion, detaching contacts from response plans first
//!
//! # Workflows
//!
//! Both workflows walk an ordered work list, record one [`ItemOutcome`] per
//! item and keep going when an item fails. Mutating calls go through
//! [`retry::retry`]; dry-run mode still performs read-only lookups.
//!
//! ```text
//! AdminConfig ──▶ Session(IncidentApi) ──▶ run_provision / run_delete ──▶ RunReport
//! ```
//!
//! # Usage
//!
//! ```bash
//! # Preview against the live account
//! oncall-admin --dry-run provision
//!
//! # Apply
//! oncall-admin --live provision
//!
//! # Delete the aliases listed under [deletion]
//! oncall-admin --live delete
//! ```

pub mod api;
pub mod arn;
pub mod aws;
pub mod config;
pub mod error;
pub mod model;
pub mod plan;
pub mod provision;
pub mod report;
pub mod retry;
pub mod session;
pub mod teardown;

pub use api::IncidentApi;
pub use config::{AdminConfig, Settings};
pub use error::{ApiError, ApiResult, ConfigError, ErrorClass};
pub use model::{ChannelSpec, ChannelType, ContactSpec, ResponsePlanSpec};
pub use plan::{build_engagement_plan, EngagementPlan, Stage};
pub use provision::run_provision;
pub use report::{ItemOutcome, ItemStatus, RunKind, RunReport};
pub use retry::RetryPolicy;
pub use session::Session;
pub use teardown::{confirm_deletion, run_delete};
