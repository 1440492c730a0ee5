//! AWS implementation of [`IncidentApi`] over the official SDK clients.
//!
//! SDK failures are mapped by service error code: `ResourceNotFoundException`
//! becomes [`ApiError::NotFound`], `ConflictException` becomes
//! [`ApiError::Conflict`] and everything else [`ApiError::Remote`].

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ssmcontacts::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ssmcontacts::types::{
    ChannelTargetInfo, ChannelType as SdkChannelType, ContactChannelAddress, ContactType, Plan,
    Stage as SdkStage, Target,
};
use tracing::debug;

use crate::api::IncidentApi;
use crate::error::{ApiError, ApiResult};
use crate::model::{ChannelRecord, ContactRecord, NewChannel, ResponsePlanRecord, ResponsePlanSummary};
use crate::plan::Stage;

const NOT_FOUND_CODE: &str = "ResourceNotFoundException";
const CONFLICT_CODE: &str = "ConflictException";

/// Clients for `ssm-contacts`, `ssm-incidents` and `sts` sharing one SDK config.
pub struct AwsIncidentApi {
    contacts: aws_sdk_ssmcontacts::Client,
    incidents: aws_sdk_ssmincidents::Client,
    sts: aws_sdk_sts::Client,
    region: Option<String>,
}

impl AwsIncidentApi {
    /// Load credentials and region from the default provider chain.
    ///
    /// `region` overrides the chain's region when given.
    pub async fn connect(region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let shared = loader.load().await;
        let region = shared.region().map(|r| r.to_string());
        debug!(region = ?region, "AWS clients configured");

        Self {
            contacts: aws_sdk_ssmcontacts::Client::new(&shared),
            incidents: aws_sdk_ssmincidents::Client::new(&shared),
            sts: aws_sdk_sts::Client::new(&shared),
            region,
        }
    }
}

/// Map an SDK error onto the workflow taxonomy.
fn classify<E, R>(operation: &str, err: SdkError<E, R>) -> ApiError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().map(str::to_string);
    let message = DisplayErrorContext(&err).to_string();
    match code.as_deref() {
        Some(NOT_FOUND_CODE) => ApiError::not_found(operation, message),
        Some(CONFLICT_CODE) => ApiError::conflict(operation, message),
        _ => ApiError::Remote {
            operation: operation.to_string(),
            code,
            message,
        },
    }
}

fn to_sdk_stages(stages: &[Stage]) -> ApiResult<Vec<SdkStage>> {
    stages
        .iter()
        .map(|stage| {
            let targets = stage
                .targets
                .iter()
                .map(|target| {
                    let info = ChannelTargetInfo::builder()
                        .contact_channel_id(target.channel_ref.as_str())
                        .retry_interval_in_minutes(target.retry_interval_minutes as i32)
                        .build()
                        .map_err(|e| ApiError::invalid_request("UpdateContact", e.to_string()))?;
                    Ok(Target::builder().channel_target_info(info).build())
                })
                .collect::<ApiResult<Vec<Target>>>()?;

            SdkStage::builder()
                .duration_in_minutes(stage.duration_minutes as i32)
                .set_targets(Some(targets))
                .build()
                .map_err(|e| ApiError::invalid_request("UpdateContact", e.to_string()))
        })
        .collect()
}

#[async_trait]
impl IncidentApi for AwsIncidentApi {
    fn region(&self) -> Option<String> {
        self.region.clone()
    }

    async fn caller_account(&self) -> ApiResult<String> {
        let out = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| classify("GetCallerIdentity", e))?;
        out.account()
            .map(str::to_string)
            .ok_or_else(|| ApiError::remote("GetCallerIdentity", "response carried no account"))
    }

    async fn get_contact(&self, contact_arn: &str) -> ApiResult<ContactRecord> {
        let out = self
            .contacts
            .get_contact()
            .contact_id(contact_arn)
            .send()
            .await
            .map_err(|e| classify("GetContact", e))?;
        Ok(ContactRecord {
            arn: contact_arn.to_string(),
            display_name: out.display_name().map(str::to_string),
        })
    }

    async fn create_contact(&self, alias: &str, display_name: &str) -> ApiResult<String> {
        let out = self
            .contacts
            .create_contact()
            .alias(alias)
            .display_name(display_name)
            .r#type(ContactType::Personal)
            .plan(Plan::builder().set_stages(Some(Vec::new())).build())
            .send()
            .await
            .map_err(|e| classify("CreateContact", e))?;
        Ok(out.contact_arn().to_string())
    }

    async fn update_contact_plan(&self, contact_arn: &str, stages: &[Stage]) -> ApiResult<()> {
        let stages = to_sdk_stages(stages)?;
        self.contacts
            .update_contact()
            .contact_id(contact_arn)
            .plan(Plan::builder().set_stages(Some(stages)).build())
            .send()
            .await
            .map_err(|e| classify("UpdateContact", e))?;
        Ok(())
    }

    async fn delete_contact(&self, contact_arn: &str) -> ApiResult<()> {
        self.contacts
            .delete_contact()
            .contact_id(contact_arn)
            .send()
            .await
            .map_err(|e| classify("DeleteContact", e))?;
        Ok(())
    }

    async fn list_contact_channels(&self, contact_arn: &str) -> ApiResult<Vec<ChannelRecord>> {
        let mut records = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let out = self
                .contacts
                .list_contact_channels()
                .contact_id(contact_arn)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| classify("ListContactChannels", e))?;

            records.extend(out.contact_channels().iter().map(|channel| ChannelRecord {
                arn: channel.contact_channel_arn().to_string(),
                name: channel.name().to_string(),
                channel_type: channel.r#type().and_then(|t| t.as_str().parse().ok()),
            }));

            match out.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }
        Ok(records)
    }

    async fn create_contact_channel(&self, contact_arn: &str, channel: &NewChannel) -> ApiResult<String> {
        let out = self
            .contacts
            .create_contact_channel()
            .contact_id(contact_arn)
            .name(channel.name.as_str())
            .r#type(SdkChannelType::from(channel.channel_type.as_str()))
            .delivery_address(
                ContactChannelAddress::builder()
                    .simple_address(channel.address.as_str())
                    .build(),
            )
            .send()
            .await
            .map_err(|e| classify("CreateContactChannel", e))?;
        Ok(out.contact_channel_arn().to_string())
    }

    async fn delete_contact_channel(&self, channel_arn: &str) -> ApiResult<()> {
        self.contacts
            .delete_contact_channel()
            .contact_channel_id(channel_arn)
            .send()
            .await
            .map_err(|e| classify("DeleteContactChannel", e))?;
        Ok(())
    }

    async fn list_response_plans(&self) -> ApiResult<Vec<ResponsePlanSummary>> {
        let mut summaries = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let out = self
                .incidents
                .list_response_plans()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| classify("ListResponsePlans", e))?;

            summaries.extend(out.response_plan_summaries().iter().map(|summary| ResponsePlanSummary {
                arn: summary.arn().to_string(),
                name: summary.name().to_string(),
            }));

            match out.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }
        Ok(summaries)
    }

    async fn get_response_plan(&self, plan_arn: &str) -> ApiResult<ResponsePlanRecord> {
        let out = self
            .incidents
            .get_response_plan()
            .arn(plan_arn)
            .send()
            .await
            .map_err(|e| classify("GetResponsePlan", e))?;
        Ok(ResponsePlanRecord {
            arn: plan_arn.to_string(),
            name: out.name().to_string(),
            engagements: out.engagements().to_vec(),
        })
    }

    async fn update_response_plan_engagements(&self, plan_arn: &str, engagements: &[String]) -> ApiResult<()> {
        self.incidents
            .update_response_plan()
            .arn(plan_arn)
            .set_engagements(Some(engagements.to_vec()))
            .send()
            .await
            .map_err(|e| classify("UpdateResponsePlan", e))?;
        Ok(())
    }
}
