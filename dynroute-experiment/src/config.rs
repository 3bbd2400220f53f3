use dynroute_core::StimulusId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse task config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("block_stim must list at least one block")]
    NoBlocks,
    #[error("block {block} must list one or two stimuli, found {len}")]
    BlockSize { block: usize, len: usize },
    #[error("block {block} lists `catch`; catch trials come from prob_catch")]
    CatchInBlock { block: usize },
    #[error("trials_per_block range [{min}, {max}] is empty or zero")]
    TrialsPerBlock { min: usize, max: usize },
    #[error("prob_catch must lie in [0, 1], got {0}")]
    ProbCatch(f64),
    #[error("response_window [{0}, {1}] must open before it closes")]
    ResponseWindow(u32, u32),
    #[error("pre_stim_frames_fixed {fixed} exceeds pre_stim_frames_max {max}")]
    PreStimRange { fixed: u32, max: u32 },
    #[error("pre_stim_frames_variable_mean must be finite and non-negative, got {0}")]
    PreStimMean(f64),
    #[error("candidate list `{0}` is empty")]
    NoCandidates(&'static str),
    #[error("no grating orientation configured for {0}")]
    MissingOrientation(StimulusId),
    #[error("no tone frequency configured for {0}")]
    MissingToneFreq(StimulusId),
    #[error("max_trials must be at least 1")]
    MaxTrials,
    #[error("auto_reward_onset_frame {onset} falls after trial end ({tail} frames after onset)")]
    AutoRewardAfterTrialEnd { onset: u32, tail: u32 },
    #[error("pre_stim_frames_max plus the trial tail overflows the frame counter")]
    FrameOverflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundType {
    Tone,
}

/// Every tunable of the task, supplied before the frame loop starts.
///
/// Frame counts are display frames; durations in seconds are for the
/// sound collaborator and reward valve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaskConfig {
    /// Session ends after this many display frames (checked at trial end).
    pub max_frames: u64,
    pub max_trials: Option<usize>,

    /// One stimulus list per block; the first element is rewarded.
    pub block_stim: Vec<Vec<StimulusId>>,
    /// Inclusive `[min, max]` trials per block, or a single unbounded block.
    pub trials_per_block: Option<(usize, usize)>,
    pub new_block_auto_rewards: usize,
    /// Frames after onset at which a scheduled auto-reward fires.
    pub auto_reward_onset_frame: u32,
    /// Consecutive misses after which the next target trial is auto-rewarded.
    pub auto_reward_miss_trials: Option<usize>,

    pub prob_catch: f64,

    pub pre_stim_frames_fixed: u32,
    pub pre_stim_frames_variable_mean: f64,
    pub pre_stim_frames_max: u32,
    pub quiescent_frames: u32,
    /// Half-open `[open, close)` frames relative to onset.
    pub response_window: (u32, u32),
    pub post_response_window_frames: u32,

    pub incorrect_trial_repeats: usize,
    /// Seconds of noise after a lick on a non-rewarded stimulus; 0 disables.
    pub incorrect_noise_dur: f64,

    pub reward_open_time: f64,

    pub vis_stim_frames: Vec<u32>,
    pub vis_stim_contrast: Vec<f32>,
    pub grating_size: f32,
    pub grating_ori: BTreeMap<StimulusId, f32>,

    pub sound_type: Option<SoundType>,
    pub sound_dur: Vec<f64>,
    pub tone_freq: BTreeMap<StimulusId, f64>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            max_frames: 60 * 3600,
            max_trials: None,
            block_stim: vec![vec![StimulusId::Visual(1)]],
            trials_per_block: None,
            new_block_auto_rewards: 5,
            auto_reward_onset_frame: 9,
            auto_reward_miss_trials: Some(5),
            prob_catch: 0.15,
            pre_stim_frames_fixed: 90,
            pre_stim_frames_variable_mean: 60.0,
            pre_stim_frames_max: 360,
            quiescent_frames: 90,
            response_window: (9, 54),
            post_response_window_frames: 180,
            incorrect_trial_repeats: 0,
            incorrect_noise_dur: 0.0,
            reward_open_time: 0.05,
            vis_stim_frames: vec![6],
            vis_stim_contrast: vec![1.0],
            grating_size: 50.0,
            grating_ori: BTreeMap::from([
                (StimulusId::Visual(1), 0.0),
                (StimulusId::Visual(2), 90.0),
            ]),
            sound_type: None,
            sound_dur: vec![0.1],
            tone_freq: BTreeMap::from([
                (StimulusId::Auditory(1), 8000.0),
                (StimulusId::Auditory(2), 4000.0),
            ]),
        }
    }
}

impl TaskConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: TaskConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Rejects bundles the controller cannot run. Called by
    /// `SessionController::new`, so an invalid config never reaches frame 0.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_stim.is_empty() {
            return Err(ConfigError::NoBlocks);
        }
        for (block, stim) in self.block_stim.iter().enumerate() {
            if stim.is_empty() || stim.len() > 2 {
                return Err(ConfigError::BlockSize {
                    block,
                    len: stim.len(),
                });
            }
            if stim.iter().any(StimulusId::is_catch) {
                return Err(ConfigError::CatchInBlock { block });
            }
        }
        if let Some((min, max)) = self.trials_per_block {
            if min == 0 || min > max {
                return Err(ConfigError::TrialsPerBlock { min, max });
            }
        }
        if !(0.0..=1.0).contains(&self.prob_catch) {
            return Err(ConfigError::ProbCatch(self.prob_catch));
        }
        let (open, close) = self.response_window;
        if open >= close {
            return Err(ConfigError::ResponseWindow(open, close));
        }
        if self.pre_stim_frames_fixed > self.pre_stim_frames_max {
            return Err(ConfigError::PreStimRange {
                fixed: self.pre_stim_frames_fixed,
                max: self.pre_stim_frames_max,
            });
        }
        let tail = self
            .trial_tail_frames()
            .filter(|tail| self.pre_stim_frames_max.checked_add(*tail).is_some())
            .ok_or(ConfigError::FrameOverflow)?;
        if self.auto_reward_onset_frame > tail {
            return Err(ConfigError::AutoRewardAfterTrialEnd {
                onset: self.auto_reward_onset_frame,
                tail,
            });
        }
        let mean = self.pre_stim_frames_variable_mean;
        if !mean.is_finite() || mean < 0.0 {
            return Err(ConfigError::PreStimMean(mean));
        }
        if self.max_trials == Some(0) {
            return Err(ConfigError::MaxTrials);
        }

        let templated = || self.block_stim.iter().flatten();
        if templated().any(StimulusId::is_visual) {
            if self.vis_stim_frames.is_empty() {
                return Err(ConfigError::NoCandidates("vis_stim_frames"));
            }
            if self.vis_stim_contrast.is_empty() {
                return Err(ConfigError::NoCandidates("vis_stim_contrast"));
            }
            if let Some(id) = templated()
                .filter(|id| id.is_visual())
                .find(|id| !self.grating_ori.contains_key(*id))
            {
                return Err(ConfigError::MissingOrientation(*id));
            }
        }
        if templated().any(StimulusId::is_auditory) {
            if self.sound_dur.is_empty() {
                return Err(ConfigError::NoCandidates("sound_dur"));
            }
            if self.sound_type == Some(SoundType::Tone) {
                if let Some(id) = templated()
                    .filter(|id| id.is_auditory())
                    .find(|id| !self.tone_freq.contains_key(*id))
                {
                    return Err(ConfigError::MissingToneFreq(*id));
                }
            }
        }
        Ok(())
    }

    /// Trial frame, relative to onset, at which the trial ends. `None` on
    /// overflow.
    pub fn trial_tail_frames(&self) -> Option<u32> {
        self.response_window
            .1
            .checked_add(self.post_response_window_frames)
    }
}
