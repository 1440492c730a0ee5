//! Contact, channel and response plan types.
//!
//! The `*Spec` types are the desired state read from configuration. The
//! `*Record` types are what the remote API reports back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Delivery mechanism of a contact channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelType {
    Email,
    Sms,
    Voice,
}

impl ChannelType {
    /// Wire name used by the remote API.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::Sms => "SMS",
            Self::Voice => "VOICE",
        }
    }

    /// Whether the delivery address is a phone number.
    pub fn is_phone(self) -> bool {
        matches!(self, Self::Sms | Self::Voice)
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EMAIL" => Ok(Self::Email),
            "SMS" => Ok(Self::Sms),
            "VOICE" => Ok(Self::Voice),
            other => Err(format!("unknown channel type: {other}")),
        }
    }
}

/// One configured notification channel of a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    pub address: String,
    /// Minutes after incident start at which this channel is engaged.
    #[serde(default, alias = "engagement_time_minutes")]
    pub engagement_minutes: u32,
}

impl ChannelSpec {
    pub fn new(channel_type: ChannelType, address: impl Into<String>, engagement_minutes: u32) -> Self {
        Self {
            channel_type,
            address: address.into(),
            engagement_minutes,
        }
    }
}

/// Desired state of one on-call contact. The alias is the map key in
/// configuration and is passed alongside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSpec {
    /// Display name.
    pub name: String,
    #[serde(default)]
    pub channels: Vec<ChannelSpec>,
}

impl ContactSpec {
    pub fn new(name: impl Into<String>, channels: Vec<ChannelSpec>) -> Self {
        Self {
            name: name.into(),
            channels,
        }
    }

    /// Remote channel names, index-aligned with `channels`.
    ///
    /// The first channel of a type is `"{name} - {TYPE}"`; later channels of
    /// the same type get a numeric suffix starting at 2.
    pub fn channel_names(&self) -> Vec<String> {
        let mut seen: Vec<(ChannelType, u32)> = Vec::new();
        self.channels
            .iter()
            .map(|channel| {
                let count = match seen.iter_mut().find(|(t, _)| *t == channel.channel_type) {
                    Some((_, n)) => {
                        *n += 1;
                        *n
                    }
                    None => {
                        seen.push((channel.channel_type, 1));
                        1
                    }
                };
                if count == 1 {
                    format!("{} - {}", self.name, channel.channel_type)
                } else {
                    format!("{} - {} {}", self.name, channel.channel_type, count)
                }
            })
            .collect()
    }

    /// Configured engagement delays, in channel order.
    pub fn engagement_minutes(&self) -> Vec<u32> {
        self.channels.iter().map(|c| c.engagement_minutes).collect()
    }
}

/// Response plan update: which contacts it should engage, in order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponsePlanSpec {
    #[serde(default, alias = "contacts_to_engage")]
    pub contacts: Vec<String>,
}

/// A contact as reported by the remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRecord {
    pub arn: String,
    pub display_name: Option<String>,
}

/// A contact channel as reported by the remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    pub arn: String,
    pub name: String,
    /// `None` when the API omits the type or reports one we do not model.
    pub channel_type: Option<ChannelType>,
}

/// Parameters for creating a contact channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChannel {
    pub name: String,
    pub channel_type: ChannelType,
    pub address: String,
}

/// Entry from the paginated response plan listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePlanSummary {
    pub arn: String,
    pub name: String,
}

/// A response plan with its current engagements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePlanRecord {
    pub arn: String,
    pub name: String,
    /// Contact ARNs engaged when an incident opens.
    pub engagements: Vec<String>,
}
