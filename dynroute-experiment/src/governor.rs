use crate::config::TaskConfig;
use crate::generator::random_exponential;
use crate::trial::OpenTrial;
use rand::Rng;
use tracing::debug;

/// Frame arithmetic for one trial, relative to its pre-stimulus window `P`.
///
/// ```text
/// 0 .. P-q-1    free licking
/// P-q .. P-1    quiescent: a lick extends P
/// P             onset
/// P+auto        scheduled auto-reward
/// P+w0 .. P+w1  response window (half-open)
/// P+w1+post     trial end
/// ```
#[derive(Debug, Clone)]
pub struct TimingGovernor {
    quiescent_frames: u32,
    pre_stim_fixed: u32,
    pre_stim_mean: f64,
    pre_stim_max: u32,
    auto_reward_onset: u32,
    window: (u32, u32),
    post_response: u32,
}

impl TimingGovernor {
    pub fn new(config: &TaskConfig) -> Self {
        Self {
            quiescent_frames: config.quiescent_frames,
            pre_stim_fixed: config.pre_stim_frames_fixed,
            pre_stim_mean: config.pre_stim_frames_variable_mean,
            pre_stim_max: config.pre_stim_frames_max,
            auto_reward_onset: config.auto_reward_onset_frame,
            window: config.response_window,
            post_response: config.post_response_window_frames,
        }
    }

    /// The last `quiescent_frames` frames before onset.
    pub fn in_quiescent_period(&self, pre_stim: u32, trial_frame: u32) -> bool {
        trial_frame < pre_stim && trial_frame.saturating_add(self.quiescent_frames) >= pre_stim
    }

    /// Records a quiescent violation and pushes onset back by a fresh draw,
    /// never beyond the configured maximum. Returns whether `P` grew.
    pub fn extend<R: Rng>(&self, rng: &mut R, trial: &mut OpenTrial, session_frame: u64) -> bool {
        trial.violations.push(session_frame);
        let draw = random_exponential(rng, self.pre_stim_fixed, self.pre_stim_mean, self.pre_stim_max);
        let before = trial.pre_stim_frames;
        trial.pre_stim_frames = before.saturating_add(draw).min(self.pre_stim_max).max(before);
        debug!(
            trial = trial.index,
            session_frame,
            from = before,
            to = trial.pre_stim_frames,
            "quiescent violation"
        );
        trial.pre_stim_frames > before
    }

    pub fn is_onset(&self, pre_stim: u32, trial_frame: u32) -> bool {
        trial_frame == pre_stim
    }

    pub fn is_auto_reward_frame(&self, pre_stim: u32, trial_frame: u32) -> bool {
        trial_frame == pre_stim.saturating_add(self.auto_reward_onset)
    }

    pub fn in_response_window(&self, pre_stim: u32, trial_frame: u32) -> bool {
        (pre_stim.saturating_add(self.window.0)..pre_stim.saturating_add(self.window.1))
            .contains(&trial_frame)
    }

    pub fn is_window_close(&self, pre_stim: u32, trial_frame: u32) -> bool {
        trial_frame == pre_stim.saturating_add(self.window.1)
    }

    pub fn is_trial_end(&self, pre_stim: u32, trial_frame: u32) -> bool {
        trial_frame == pre_stim.saturating_add(self.window.1).saturating_add(self.post_response)
    }
}
