//! Remote API surface consumed by the workflows.
//!
//! [`crate::aws::AwsIncidentApi`] is the production implementation; tests
//! supply in-memory fakes. Implementations report a missing resource as
//! [`ApiError::NotFound`](crate::error::ApiError::NotFound) and a duplicate
//! create as [`ApiError::Conflict`](crate::error::ApiError::Conflict).

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::model::{ChannelRecord, ContactRecord, NewChannel, ResponsePlanRecord, ResponsePlanSummary};
use crate::plan::Stage;

#[async_trait]
pub trait IncidentApi: Send + Sync {
    /// Region the client is bound to, if known.
    fn region(&self) -> Option<String>;

    /// Account identifier of the calling credentials.
    async fn caller_account(&self) -> ApiResult<String>;

    async fn get_contact(&self, contact_arn: &str) -> ApiResult<ContactRecord>;

    /// Create a personal contact with an empty plan; returns its ARN.
    async fn create_contact(&self, alias: &str, display_name: &str) -> ApiResult<String>;

    /// Replace the contact's engagement plan.
    async fn update_contact_plan(&self, contact_arn: &str, stages: &[Stage]) -> ApiResult<()>;

    async fn delete_contact(&self, contact_arn: &str) -> ApiResult<()>;

    /// All channels of a contact, across every page.
    async fn list_contact_channels(&self, contact_arn: &str) -> ApiResult<Vec<ChannelRecord>>;

    /// Create a channel on a contact; returns the channel ARN.
    async fn create_contact_channel(&self, contact_arn: &str, channel: &NewChannel) -> ApiResult<String>;

    async fn delete_contact_channel(&self, channel_arn: &str) -> ApiResult<()>;

    /// Every response plan in the account, across every page.
    async fn list_response_plans(&self) -> ApiResult<Vec<ResponsePlanSummary>>;

    async fn get_response_plan(&self, plan_arn: &str) -> ApiResult<ResponsePlanRecord>;

    /// Replace the plan's engagement list with `engagements` (contact ARNs).
    async fn update_response_plan_engagements(&self, plan_arn: &str, engagements: &[String]) -> ApiResult<()>;
}
