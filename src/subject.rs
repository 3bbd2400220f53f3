use dynroute_core::{AuditoryParams, StimulusId, VisualParams};
use dynroute_experiment::{FrameInput, HardwareInput, RewardActuator, StimulusPresenter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::trace;

/// Behavioural parameters of the simulated animal.
#[derive(Debug, Clone)]
pub struct SubjectProfile {
    /// Spontaneous lick probability per frame.
    pub lick_rate: f64,
    /// Probability of answering a presented stimulus.
    pub hit_rate: f64,
    /// Frames from onset to the answering lick.
    pub reaction_frames: u64,
}

impl Default for SubjectProfile {
    fn default() -> Self {
        Self {
            lick_rate: 0.005,
            hit_rate: 0.7,
            reaction_frames: 20,
        }
    }
}

#[derive(Debug)]
struct SubjectState {
    profile: SubjectProfile,
    rng: StdRng,
    frame: u64,
    pending_response: Option<u64>,
    presented: Vec<StimulusId>,
    rewards: u32,
    water_s: f64,
    noise_bursts: u32,
}

/// A simulated animal on a virtual rig. Clone the handle into each port.
#[derive(Debug, Clone)]
pub struct Subject {
    state: Rc<RefCell<SubjectState>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectReport {
    pub presented: usize,
    pub rewards: u32,
    pub water_s: f64,
    pub noise_bursts: u32,
}

impl Subject {
    pub fn new(profile: SubjectProfile, seed: u64) -> Self {
        Self {
            state: Rc::new(RefCell::new(SubjectState {
                profile,
                rng: StdRng::seed_from_u64(seed),
                frame: 0,
                pending_response: None,
                presented: Vec::new(),
                rewards: 0,
                water_s: 0.0,
                noise_bursts: 0,
            })),
        }
    }

    pub fn lickometer(&self) -> Lickometer {
        Lickometer(self.clone())
    }

    pub fn valve(&self) -> Valve {
        Valve(self.clone())
    }

    pub fn stage(&self) -> Stage {
        Stage(self.clone())
    }

    pub fn report(&self) -> SubjectReport {
        let state = self.state.borrow();
        SubjectReport {
            presented: state.presented.len(),
            rewards: state.rewards,
            water_s: state.water_s,
            noise_bursts: state.noise_bursts,
        }
    }

    fn notice(&self, stimulus: StimulusId) {
        let mut state = self.state.borrow_mut();
        let hit_rate = state.profile.hit_rate;
        if state.rng.random_bool(hit_rate) {
            let at = state.frame + state.profile.reaction_frames;
            state.pending_response = Some(at);
        }
        state.presented.push(stimulus);
    }
}

/// Lick sensor port backed by the subject.
pub struct Lickometer(Subject);

impl HardwareInput for Lickometer {
    fn sample(&mut self, session_frame: u64) -> FrameInput {
        let mut state = self.0.state.borrow_mut();
        state.frame = session_frame;
        let answering = state.pending_response == Some(session_frame);
        if answering {
            state.pending_response = None;
        }
        let lick_rate = state.profile.lick_rate;
        let spontaneous = state.rng.random_bool(lick_rate);
        if answering || spontaneous {
            trace!(session_frame, answering, "lick");
        }
        FrameInput {
            lick: answering || spontaneous,
        }
    }
}

/// Reward solenoid port backed by the subject.
pub struct Valve(Subject);

impl RewardActuator for Valve {
    fn deliver(&mut self, open_time_s: f64) {
        let mut state = self.0.state.borrow_mut();
        state.rewards += 1;
        state.water_s += open_time_s;
    }
}

/// Renderer and speaker port backed by the subject.
pub struct Stage(Subject);

impl StimulusPresenter for Stage {
    fn present_visual(&mut self, params: &VisualParams) {
        self.0.notice(params.stimulus);
    }

    fn present_auditory(&mut self, params: &AuditoryParams) {
        self.0.notice(params.stimulus);
    }

    fn present_noise(&mut self, _duration_s: f64) {
        self.0.state.borrow_mut().noise_bursts += 1;
    }
}
