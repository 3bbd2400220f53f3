use crate::config::TaskConfig;
use dynroute_core::{BlockRecord, StimulusId};
use rand::Rng;
use tracing::info;

/// Live state of the block trials are currently drawn from.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveBlock {
    pub index: usize,
    pub stimuli: Vec<StimulusId>,
    pub rewarded: StimulusId,
    pub target: Option<usize>,
    /// Trials completed in this block, catch and repeat trials included.
    pub trial_count: usize,
    /// Auto-rewards granted through the quota branch.
    pub quota_auto_rewards: usize,
}

impl ActiveBlock {
    pub fn is_complete(&self) -> bool {
        self.target.is_some_and(|t| self.trial_count >= t)
    }
}

/// Decides block membership and when a block ends.
#[derive(Debug, Clone)]
pub struct BlockSequencer {
    templates: Vec<Vec<StimulusId>>,
    trials_per_block: Option<(usize, usize)>,
    active: Option<ActiveBlock>,
}

impl BlockSequencer {
    pub fn new(config: &TaskConfig) -> Self {
        Self {
            templates: config.block_stim.clone(),
            trials_per_block: config.trials_per_block,
            active: None,
        }
    }

    pub fn active(&self) -> Option<&ActiveBlock> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut ActiveBlock> {
        self.active.as_mut()
    }

    /// A new block must begin before the next trial is generated.
    pub fn is_due(&self) -> bool {
        self.active.as_ref().is_none_or(ActiveBlock::is_complete)
    }

    /// Opens the next block if due and returns its log record, whose trial
    /// range starts at `first_trial` and is extended by the controller.
    pub fn advance_if_due<R: Rng>(&mut self, rng: &mut R, first_trial: usize) -> Option<BlockRecord> {
        if !self.is_due() {
            return None;
        }
        let index = self.active.as_ref().map_or(0, |b| b.index + 1);
        let stimuli = self.templates[index % self.templates.len()].clone();
        let rewarded = stimuli[0];
        let target = self
            .trials_per_block
            .map(|(min, max)| rng.random_range(min..=max));

        info!(
            block = index,
            rewarded = %rewarded,
            target = ?target,
            first_trial,
            "starting block"
        );

        let record = BlockRecord {
            index,
            stimuli: stimuli.clone(),
            rewarded,
            target_trials: target,
            trials: first_trial..first_trial,
        };
        self.active = Some(ActiveBlock {
            index,
            stimuli,
            rewarded,
            target,
            trial_count: 0,
            quota_auto_rewards: 0,
        });
        Some(record)
    }

    /// Counts a finished trial against the active block.
    pub fn complete_trial(&mut self) {
        let block = self
            .active
            .as_mut()
            .expect("trial completed before any block was opened");
        block.trial_count += 1;
        if let Some(target) = block.target {
            assert!(
                block.trial_count <= target,
                "block {} ran {} trials past its target of {target}",
                block.index,
                block.trial_count
            );
        }
    }

    pub fn is_complete(&self) -> bool {
        self.active.as_ref().is_some_and(ActiveBlock::is_complete)
    }
}
