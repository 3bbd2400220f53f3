use crate::stimulus::{Presentation, StimulusId};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Why a reward was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    /// Lick inside the response window on the rewarded stimulus.
    Earned,
    /// Scheduled auto-reward counted against the block quota.
    AutoQuota,
    /// Auto-reward forced by a run of consecutive misses.
    AutoRescue,
}

impl RewardKind {
    pub fn is_auto(&self) -> bool {
        !matches!(self, RewardKind::Earned)
    }
}

/// Recorded result per trial. Immutable once appended to the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub index: usize,
    pub block: usize,
    pub stimulus: StimulusId,
    pub repeat: bool,
    pub presentation: Presentation,
    pub start_frame: u64,
    pub end_frame: u64,
    /// Pre-stimulus frames actually used, including quiescent extensions.
    pub pre_stim_frames: u32,
    pub stim_onset_frame: u64,
    pub response: bool,
    pub response_frame: Option<u64>,
    pub auto_reward_scheduled: Option<RewardKind>,
    pub reward: Option<RewardKind>,
    pub quiescent_violations: Vec<u64>,
    /// First lick inside the response window of a catch trial.
    pub catch_lick_frame: Option<u64>,
}

impl TrialRecord {
    pub fn rewarded(&self) -> bool {
        self.reward.is_some()
    }

    pub fn is_catch(&self) -> bool {
        self.stimulus.is_catch()
    }

    pub fn reaction_frames(&self) -> Option<u64> {
        self.response_frame.map(|f| f - self.stim_onset_frame)
    }
}

/// One contiguous run of trials sharing a stimulus set and rewarded target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub index: usize,
    pub stimuli: Vec<StimulusId>,
    pub rewarded: StimulusId,
    /// `None` when the block never ends on its own.
    pub target_trials: Option<usize>,
    pub trials: Range<usize>,
}

impl BlockRecord {
    pub fn trial_count(&self) -> usize {
        self.trials.len()
    }
}
