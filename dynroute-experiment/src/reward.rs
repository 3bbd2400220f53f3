use crate::block::ActiveBlock;
use crate::config::TaskConfig;
use crate::ports::RewardActuator;
use dynroute_core::{RewardKind, StimulusId};
use tracing::debug;

/// Auto-reward scheduling and the consecutive-miss counter.
///
/// Quota and rescue are tracked independently: a rescue auto-reward never
/// touches the block's quota count.
#[derive(Debug, Clone)]
pub struct RewardArbiter {
    quota: usize,
    miss_threshold: Option<usize>,
    open_time_s: f64,
    miss_count: usize,
}

impl RewardArbiter {
    pub fn new(config: &TaskConfig) -> Self {
        Self {
            quota: config.new_block_auto_rewards,
            miss_threshold: config.auto_reward_miss_trials,
            open_time_s: config.reward_open_time,
            miss_count: 0,
        }
    }

    pub fn miss_count(&self) -> usize {
        self.miss_count
    }

    /// Decides at trial start whether `stimulus` gets an unconditional reward.
    pub fn schedule(&self, block: &mut ActiveBlock, stimulus: StimulusId) -> Option<RewardKind> {
        if stimulus != block.rewarded {
            return None;
        }
        if block.quota_auto_rewards < self.quota {
            block.quota_auto_rewards += 1;
            Some(RewardKind::AutoQuota)
        } else if self.miss_threshold.is_some_and(|t| self.miss_count >= t) {
            Some(RewardKind::AutoRescue)
        } else {
            None
        }
    }

    pub fn deliver<A: RewardActuator>(&self, actuator: &mut A, kind: RewardKind, session_frame: u64) {
        debug!(?kind, session_frame, open_time_s = self.open_time_s, "reward");
        actuator.deliver(self.open_time_s);
    }

    /// End-of-trial bookkeeping. A delivered reward clears the miss run;
    /// an unanswered reward-eligible trial extends it.
    pub fn settle(&mut self, reward_eligible: bool, responded: bool, rewarded: bool) {
        if reward_eligible && !responded {
            self.miss_count += 1;
        }
        if rewarded {
            self.miss_count = 0;
        }
    }
}
