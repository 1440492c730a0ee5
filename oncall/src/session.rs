//! Per-run context shared by the workflows.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::debug;

use crate::api::IncidentApi;
use crate::arn::{build_arn, ResourceKind, DEFAULT_PARTITION};
use crate::config::Settings;
use crate::error::ApiResult;
use crate::retry::RetryPolicy;

/// Region used when neither configuration nor the SDK provide one.
pub const FALLBACK_REGION: &str = "us-east-1";

/// Remote API handle plus the run-wide toggles.
///
/// The caller account is fetched once and memoized.
pub struct Session {
    api: Arc<dyn IncidentApi>,
    region: String,
    partition: String,
    dry_run: bool,
    retry: RetryPolicy,
    target_retry_interval_minutes: u32,
    account: OnceCell<String>,
}

impl Session {
    pub fn new(api: Arc<dyn IncidentApi>, settings: &Settings) -> Self {
        let region = settings
            .region
            .clone()
            .or_else(|| api.region())
            .unwrap_or_else(|| FALLBACK_REGION.to_string());
        Self {
            api,
            region,
            partition: settings
                .partition
                .clone()
                .unwrap_or_else(|| DEFAULT_PARTITION.to_string()),
            dry_run: settings.dry_run,
            retry: settings.retry_policy(),
            target_retry_interval_minutes: settings.channel_retry_interval_minutes,
            account: OnceCell::new(),
        }
    }

    pub fn api(&self) -> &dyn IncidentApi {
        self.api.as_ref()
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn target_retry_interval_minutes(&self) -> u32 {
        self.target_retry_interval_minutes
    }

    /// Caller account identifier, fetched on first use.
    pub async fn account_id(&self) -> ApiResult<&str> {
        let account = self
            .account
            .get_or_try_init(|| async {
                let account = self.api.caller_account().await?;
                debug!(account = %account, "Resolved caller account");
                Ok::<_, crate::error::ApiError>(account)
            })
            .await?;
        Ok(account.as_str())
    }

    /// Account identifier if it has already been resolved.
    pub fn cached_account_id(&self) -> Option<&str> {
        self.account.get().map(String::as_str)
    }

    pub async fn contact_arn(&self, alias: &str) -> ApiResult<String> {
        let account = self.account_id().await?;
        Ok(build_arn(
            &self.partition,
            &self.region,
            account,
            ResourceKind::Contact,
            alias,
        ))
    }

    pub async fn response_plan_arn(&self, name: &str) -> ApiResult<String> {
        let account = self.account_id().await?;
        Ok(build_arn(
            &self.partition,
            &self.region,
            account,
            ResourceKind::ResponsePlan,
            name,
        ))
    }
}
