use crate::block::BlockSequencer;
use crate::config::{SoundType, TaskConfig};
use dynroute_core::{AuditoryParams, BlockRecord, Presentation, StimulusId, TrialRecord, VisualParams};
use rand::Rng;

/// What the generator decided at `trial_frame == 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialPlan {
    pub stimulus: StimulusId,
    pub repeat: bool,
    pub presentation: Presentation,
    pub pre_stim_frames: u32,
    /// Set when this trial opened a new block.
    pub new_block: Option<BlockRecord>,
}

/// `fixed` plus an exponential jitter of mean `mean`, capped at `max` and
/// truncated to whole frames. Means of one frame or less add no jitter.
pub fn random_exponential<R: Rng>(rng: &mut R, fixed: u32, mean: f64, max: u32) -> u32 {
    let jitter = if mean > 1.0 {
        let u: f64 = rng.random();
        -mean * (1.0 - u).ln()
    } else {
        mean
    };
    let total = (f64::from(fixed) + jitter).min(f64::from(max));
    total as u32
}

pub fn draw_pre_stim_frames<R: Rng>(rng: &mut R, config: &TaskConfig) -> u32 {
    random_exponential(
        rng,
        config.pre_stim_frames_fixed,
        config.pre_stim_frames_variable_mean,
        config.pre_stim_frames_max,
    )
}

fn pick<T: Copy, R: Rng>(rng: &mut R, candidates: &[T]) -> T {
    candidates[rng.random_range(0..candidates.len())]
}

/// Draws the per-trial presentation parameters for `stimulus`.
pub fn draw_presentation<R: Rng>(rng: &mut R, config: &TaskConfig, stimulus: StimulusId) -> Presentation {
    match stimulus {
        StimulusId::Visual(_) => Presentation::Visual(VisualParams {
            stimulus,
            frames: pick(rng, &config.vis_stim_frames),
            contrast: pick(rng, &config.vis_stim_contrast),
            orientation: config.grating_ori.get(&stimulus).copied().unwrap_or_default(),
            size: config.grating_size,
        }),
        StimulusId::Auditory(_) => Presentation::Auditory(AuditoryParams {
            stimulus,
            duration_s: pick(rng, &config.sound_dur),
            tone_freq_hz: match config.sound_type {
                Some(SoundType::Tone) => config.tone_freq.get(&stimulus).copied(),
                None => None,
            },
        }),
        StimulusId::Catch => Presentation::Nothing,
    }
}

/// Decides stimulus identity and presentation for the trial about to start.
///
/// `previous` is the last finalized trial; when its successor was flagged as
/// a forced repeat, its stimulus and parameters are reused without a draw.
pub fn plan_trial<R: Rng>(
    rng: &mut R,
    config: &TaskConfig,
    sequencer: &mut BlockSequencer,
    previous: Option<&TrialRecord>,
    repeat_pending: bool,
    trial_index: usize,
) -> TrialPlan {
    let pre_stim_frames = draw_pre_stim_frames(rng, config);

    if repeat_pending {
        if let Some(prev) = previous {
            return TrialPlan {
                stimulus: prev.stimulus,
                repeat: true,
                presentation: prev.presentation.clone(),
                pre_stim_frames,
                new_block: None,
            };
        }
    }

    let new_block = sequencer.advance_if_due(rng, trial_index);

    let stimulus = if trial_index > 0 && rng.random_bool(config.prob_catch) {
        StimulusId::Catch
    } else {
        let block = sequencer
            .active()
            .expect("sequencer opens a block before the first draw");
        pick(rng, &block.stimuli)
    };

    TrialPlan {
        stimulus,
        repeat: false,
        presentation: draw_presentation(rng, config, stimulus),
        pre_stim_frames,
        new_block,
    }
}
