//! Resource identifier construction.
//!
//! Every ARN the workflows send to the remote API comes from [`build_arn`],
//! so the format lives in one place.

use std::fmt;

/// Partition used when none is configured.
pub const DEFAULT_PARTITION: &str = "aws";

/// Kinds of resources addressed by ARN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// `ssm-contacts` contact; regional.
    Contact,
    /// `ssm-incidents` response plan; global, so the region segment is empty.
    ResponsePlan,
}

impl ResourceKind {
    pub fn service(self) -> &'static str {
        match self {
            Self::Contact => "ssm-contacts",
            Self::ResponsePlan => "ssm-incidents",
        }
    }

    pub fn resource_type(self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::ResponsePlan => "response-plan",
        }
    }

    pub fn is_regional(self) -> bool {
        matches!(self, Self::Contact)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource_type())
    }
}

/// Build the ARN of `name` of the given kind.
///
/// `region` is ignored for global resource kinds.
pub fn build_arn(
    partition: &str,
    region: &str,
    account: &str,
    kind: ResourceKind,
    name: &str,
) -> String {
    let region = if kind.is_regional() { region } else { "" };
    format!(
        "arn:{partition}:{}:{region}:{account}:{}/{name}",
        kind.service(),
        kind.resource_type()
    )
}
