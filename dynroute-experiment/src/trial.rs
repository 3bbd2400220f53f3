use dynroute_core::{BlockRecord, Presentation, RewardKind, StimulusId, TrialPhase, TrialRecord};
use serde::{Deserialize, Serialize};

/// The trial being built. Exactly one exists while a trial runs; it becomes
/// an immutable `TrialRecord` at trial end.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenTrial {
    pub index: usize,
    pub block: usize,
    pub stimulus: StimulusId,
    pub repeat: bool,
    pub presentation: Presentation,
    /// Whether `stimulus` is the block's rewarded target.
    pub rewarded_target: bool,
    pub start_frame: u64,
    pub pre_stim_frames: u32,
    pub stim_onset_frame: Option<u64>,
    pub response_frame: Option<u64>,
    pub catch_lick_frame: Option<u64>,
    pub auto_reward: Option<RewardKind>,
    pub reward: Option<RewardKind>,
    pub violations: Vec<u64>,
    pub phase: TrialPhase,
}

impl OpenTrial {
    pub fn advance(&mut self, next: TrialPhase) {
        assert!(
            self.phase.can_advance_to(next),
            "trial {}: illegal transition {:?} -> {:?}",
            self.index,
            self.phase,
            next
        );
        self.phase = next;
    }

    pub fn record_reward(&mut self, kind: RewardKind) {
        assert!(
            self.reward.is_none(),
            "trial {}: {:?} reward after {:?}",
            self.index,
            kind,
            self.reward
        );
        assert!(
            self.rewarded_target,
            "trial {}: reward on non-target {}",
            self.index, self.stimulus
        );
        self.reward = Some(kind);
    }

    pub fn finalize(mut self, end_frame: u64) -> TrialRecord {
        self.advance(TrialPhase::Finalized);
        let stim_onset_frame = self
            .stim_onset_frame
            .unwrap_or_else(|| unreachable!("trial {} finalized before onset", self.index));
        TrialRecord {
            index: self.index,
            block: self.block,
            stimulus: self.stimulus,
            repeat: self.repeat,
            presentation: self.presentation,
            start_frame: self.start_frame,
            end_frame,
            pre_stim_frames: self.pre_stim_frames,
            stim_onset_frame,
            response: self.response_frame.is_some(),
            response_frame: self.response_frame,
            auto_reward_scheduled: self.auto_reward,
            reward: self.reward,
            quiescent_violations: self.violations,
            catch_lick_frame: self.catch_lick_frame,
        }
    }
}

/// Append-only record of a session: trials indexed by trial number, blocks
/// referencing half-open trial ranges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    pub trials: Vec<TrialRecord>,
    pub blocks: Vec<BlockRecord>,
    /// Session frames of every quiescent-period lick.
    pub quiescent_violations: Vec<u64>,
    /// Session frames presented before the session ended.
    pub frames: u64,
}

impl SessionLog {
    pub fn block_of(&self, trial: &TrialRecord) -> &BlockRecord {
        &self.blocks[trial.block]
    }

    pub fn trials_in(&self, block: &BlockRecord) -> &[TrialRecord] {
        &self.trials[block.trials.clone()]
    }

    pub(crate) fn open_block(&mut self, record: BlockRecord) {
        debug_assert_eq!(record.index, self.blocks.len());
        self.blocks.push(record);
    }

    pub(crate) fn append(&mut self, record: TrialRecord) {
        debug_assert_eq!(record.index, self.trials.len());
        let block = self
            .blocks
            .last_mut()
            .expect("trial appended before its block");
        block.trials.end = record.index + 1;
        self.quiescent_violations
            .extend_from_slice(&record.quiescent_violations);
        self.trials.push(record);
    }
}
