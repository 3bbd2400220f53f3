use dynroute_core::{AuditoryParams, VisualParams};
use std::collections::BTreeSet;

/// Inputs sampled once per frame, before any phase is evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub lick: bool,
}

impl FrameInput {
    pub fn lick() -> Self {
        Self { lick: true }
    }

    pub fn idle() -> Self {
        Self { lick: false }
    }
}

/// Lick sensor (and any other per-frame digital input).
pub trait HardwareInput {
    fn sample(&mut self, session_frame: u64) -> FrameInput;
}

/// Reward solenoid.
pub trait RewardActuator {
    /// Fire-and-forget; `open_time_s` is the valve open duration.
    fn deliver(&mut self, open_time_s: f64);
}

/// Renderer and sound collaborators, triggered at the exact onset frame.
pub trait StimulusPresenter {
    fn present_visual(&mut self, params: &VisualParams);
    fn present_auditory(&mut self, params: &AuditoryParams);
    /// Error-feedback noise after a lick on a non-rewarded stimulus.
    fn present_noise(&mut self, duration_s: f64);
}

impl<F> HardwareInput for F
where
    F: FnMut(u64) -> FrameInput,
{
    fn sample(&mut self, session_frame: u64) -> FrameInput {
        self(session_frame)
    }
}

/// Licks on a fixed set of session frames.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLicks {
    frames: BTreeSet<u64>,
}

impl ScriptedLicks {
    pub fn new(frames: impl IntoIterator<Item = u64>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

impl HardwareInput for ScriptedLicks {
    fn sample(&mut self, session_frame: u64) -> FrameInput {
        FrameInput {
            lick: self.frames.contains(&session_frame),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingReward {
    pub deliveries: Vec<f64>,
}

impl RewardActuator for RecordingReward {
    fn deliver(&mut self, open_time_s: f64) {
        self.deliveries.push(open_time_s);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PresenterCall {
    Visual(VisualParams),
    Auditory(AuditoryParams),
    Noise(f64),
}

#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    pub calls: Vec<PresenterCall>,
}

impl StimulusPresenter for RecordingPresenter {
    fn present_visual(&mut self, params: &VisualParams) {
        self.calls.push(PresenterCall::Visual(params.clone()));
    }

    fn present_auditory(&mut self, params: &AuditoryParams) {
        self.calls.push(PresenterCall::Auditory(params.clone()));
    }

    fn present_noise(&mut self, duration_s: f64) {
        self.calls.push(PresenterCall::Noise(duration_s));
    }
}
