//! Engagement plan builder.
//!
//! Turns per-channel engagement delays into the remote API's stage model.
//! A stage engages its targets when it starts and then waits
//! `duration_minutes` before the next stage begins, so a stage's absolute
//! start time is the sum of the durations before it.
//!
//! ```text
//! delays: EMAIL@0  SMS@0  VOICE@10  EMAIL@15
//!
//!   T=0            T=10          T=15
//!   ├─ stage 1 ────┼─ stage 2 ───┼─ stage 3 ─┤
//!   │ EMAIL, SMS   │ VOICE       │ EMAIL     │
//!   │ wait 10      │ wait 5      │ wait 1    │  ← last wait forced to the minimum
//! ```
//!
//! When the earliest delay is above zero an empty leading stage covers the
//! gap, so nothing is engaged before the first configured delay.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::ChannelType;

/// Duration given to the last stage; the remote API rejects zero.
pub const MIN_FINAL_STAGE_MINUTES: u32 = 1;

/// Largest stage duration the remote API accepts.
pub const MAX_STAGE_MINUTES: u32 = 30;

/// Minutes between retries of a target that has not acknowledged.
pub const DEFAULT_TARGET_RETRY_INTERVAL_MINUTES: u32 = 2;

/// A channel that has a remote reference and a configured delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChannel {
    /// Remote channel ARN (or a placeholder in dry-run previews).
    pub channel_ref: String,
    pub channel_type: ChannelType,
    pub engagement_minutes: u32,
}

impl ResolvedChannel {
    pub fn new(channel_ref: impl Into<String>, channel_type: ChannelType, engagement_minutes: u32) -> Self {
        Self {
            channel_ref: channel_ref.into(),
            channel_type,
            engagement_minutes,
        }
    }
}

/// One channel engaged by a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageTarget {
    pub channel_ref: String,
    pub channel_type: ChannelType,
    pub retry_interval_minutes: u32,
}

/// Engage `targets`, then wait `duration_minutes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stage {
    pub duration_minutes: u32,
    pub targets: Vec<StageTarget>,
}

impl Stage {
    pub fn channel_types(&self) -> Vec<ChannelType> {
        self.targets.iter().map(|t| t.channel_type).collect()
    }
}

/// Ordered stages for one contact.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EngagementPlan {
    pub stages: Vec<Stage>,
}

impl EngagementPlan {
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Absolute start time in minutes of each stage.
    pub fn engagement_offsets(&self) -> Vec<u32> {
        let mut elapsed = 0;
        self.stages
            .iter()
            .map(|stage| {
                let start = elapsed;
                elapsed += stage.duration_minutes;
                start
            })
            .collect()
    }

    /// Total number of channel targets across all stages.
    pub fn target_count(&self) -> usize {
        self.stages.iter().map(|s| s.targets.len()).sum()
    }
}

/// Build the staged engagement plan for `channels`.
///
/// Channels sharing a delay land in the same stage, in input order. An empty
/// input produces an empty plan.
pub fn build_engagement_plan(channels: &[ResolvedChannel], retry_interval_minutes: u32) -> EngagementPlan {
    let mut groups: BTreeMap<u32, Vec<&ResolvedChannel>> = BTreeMap::new();
    for channel in channels {
        groups.entry(channel.engagement_minutes).or_default().push(channel);
    }

    let delays: Vec<u32> = groups.keys().copied().collect();
    let mut stages = Vec::with_capacity(delays.len() + 1);

    if let Some(&first) = delays.first() {
        if first > 0 {
            stages.push(Stage {
                duration_minutes: first,
                targets: Vec::new(),
            });
        }
    }

    for (idx, delay) in delays.iter().enumerate() {
        let duration_minutes = match delays.get(idx + 1) {
            Some(next) => next - delay,
            None => MIN_FINAL_STAGE_MINUTES,
        };
        let targets = groups[delay]
            .iter()
            .map(|channel| StageTarget {
                channel_ref: channel.channel_ref.clone(),
                channel_type: channel.channel_type,
                retry_interval_minutes,
            })
            .collect();
        stages.push(Stage {
            duration_minutes,
            targets,
        });
    }

    EngagementPlan { stages }
}

/// Stage durations implied by `delays` that exceed [`MAX_STAGE_MINUTES`].
///
/// Returns `(from, to)` delay pairs whose gap is too long; `from` is 0 for
/// the leading wait.
pub fn oversized_gaps(delays: &[u32]) -> Vec<(u32, u32)> {
    let mut distinct: Vec<u32> = delays.to_vec();
    distinct.sort_unstable();
    distinct.dedup();

    let mut previous = 0;
    let mut gaps = Vec::new();
    for delay in distinct {
        if delay - previous > MAX_STAGE_MINUTES {
            gaps.push((previous, delay));
        }
        previous = delay;
    }
    gaps
}
