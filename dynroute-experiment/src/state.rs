use crate::block::BlockSequencer;
use crate::config::{ConfigError, TaskConfig};
use crate::generator::plan_trial;
use crate::governor::TimingGovernor;
use crate::ports::{FrameInput, HardwareInput, RewardActuator, StimulusPresenter};
use crate::repeat::{RepeatPolicy, is_incorrect};
use crate::reward::RewardArbiter;
use crate::trial::{OpenTrial, SessionLog};
use dynroute_core::{Presentation, RewardKind, TrialPhase};
use dynroute_timing::FrameClock;
use rand::Rng;
use tracing::{debug, info};

/// Frame-driven trial/block controller.
///
/// Each `tick` samples the input port once, evaluates the trial phases in a
/// fixed order (trial start, quiescent check, onset, auto-reward, response
/// window, window close, trial end) and then presents the frame.
pub struct SessionController<R, C, I, A, S>
where
    R: Rng,
    C: FrameClock,
    I: HardwareInput,
    A: RewardActuator,
    S: StimulusPresenter,
{
    pub rng: R,
    pub clock: C,
    pub input: I,
    pub reward: A,
    pub presenter: S,
    config: TaskConfig,
    sequencer: BlockSequencer,
    arbiter: RewardArbiter,
    repeats: RepeatPolicy,
    governor: TimingGovernor,
    log: SessionLog,
    current: Option<OpenTrial>,
    trial_frame: u32,
    session_frame: u64,
    repeat_pending: bool,
    stop_requested: bool,
    running: bool,
}

impl<R, C, I, A, S> SessionController<R, C, I, A, S>
where
    R: Rng,
    C: FrameClock,
    I: HardwareInput,
    A: RewardActuator,
    S: StimulusPresenter,
{
    pub fn new(
        config: TaskConfig,
        rng: R,
        clock: C,
        input: I,
        reward: A,
        presenter: S,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            sequencer: BlockSequencer::new(&config),
            arbiter: RewardArbiter::new(&config),
            repeats: RepeatPolicy::new(config.incorrect_trial_repeats),
            governor: TimingGovernor::new(&config),
            rng,
            clock,
            input,
            reward,
            presenter,
            config,
            log: SessionLog::default(),
            current: None,
            trial_frame: 0,
            session_frame: 0,
            repeat_pending: false,
            stop_requested: false,
            running: true,
        })
    }

    /// Runs frames until the session ends.
    pub fn run(&mut self) -> &SessionLog {
        while self.tick() {}
        &self.log
    }

    /// One display frame with input sampled from the hardware port.
    /// Returns whether the session continues.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }
        let input = self.input.sample(self.session_frame);
        self.step(input)
    }

    /// One display frame with an explicit input sample.
    pub fn step(&mut self, input: FrameInput) -> bool {
        if !self.running {
            return false;
        }
        let mut trial = match self.current.take() {
            Some(trial) => trial,
            None => self.start_trial(),
        };
        let frame = self.trial_frame;

        if input.lick && self.governor.in_quiescent_period(trial.pre_stim_frames, frame) {
            self.governor
                .extend(&mut self.rng, &mut trial, self.session_frame);
        }

        let pre_stim = trial.pre_stim_frames;

        if self.governor.is_onset(pre_stim, frame) {
            self.present(&mut trial);
        }

        if self.governor.is_auto_reward_frame(pre_stim, frame) && trial.response_frame.is_none() {
            if let Some(kind) = trial.auto_reward {
                self.arbiter
                    .deliver(&mut self.reward, kind, self.session_frame);
                trial.record_reward(kind);
            }
        }

        if input.lick
            && trial.phase.accepts_response()
            && self.governor.in_response_window(pre_stim, frame)
        {
            self.respond(&mut trial);
        }

        if self.governor.is_window_close(pre_stim, frame) && trial.phase.accepts_response() {
            trial.advance(TrialPhase::TimedOut);
        }

        if self.governor.is_trial_end(pre_stim, frame) {
            self.end_trial(trial);
            self.trial_frame = 0;
        } else {
            self.current = Some(trial);
            self.trial_frame += 1;
        }

        self.session_frame += 1;
        self.log.frames = self.session_frame;
        self.clock.present();
        self.running
    }

    /// Ends the session at the next trial boundary.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    fn start_trial(&mut self) -> OpenTrial {
        let index = self.log.trials.len();
        let plan = plan_trial(
            &mut self.rng,
            &self.config,
            &mut self.sequencer,
            self.log.trials.last(),
            self.repeat_pending,
            index,
        );
        if let Some(block) = plan.new_block {
            self.log.open_block(block);
        }
        let block = self
            .sequencer
            .active_mut()
            .expect("a block is open once a trial is planned");
        let rewarded_target = plan.stimulus == block.rewarded;
        let auto_reward = self.arbiter.schedule(block, plan.stimulus);

        debug!(
            trial = index,
            block = block.index,
            stimulus = %plan.stimulus,
            repeat = plan.repeat,
            pre_stim = plan.pre_stim_frames,
            auto_reward = ?auto_reward,
            "trial start"
        );

        OpenTrial {
            index,
            block: block.index,
            stimulus: plan.stimulus,
            repeat: plan.repeat,
            presentation: plan.presentation,
            rewarded_target,
            start_frame: self.session_frame,
            pre_stim_frames: plan.pre_stim_frames,
            stim_onset_frame: None,
            response_frame: None,
            catch_lick_frame: None,
            auto_reward,
            reward: None,
            violations: Vec::new(),
            phase: TrialPhase::Pending,
        }
    }

    fn present(&mut self, trial: &mut OpenTrial) {
        trial.stim_onset_frame = Some(self.session_frame);
        trial.advance(TrialPhase::StimulusShown);
        match &trial.presentation {
            Presentation::Visual(params) if params.frames > 0 => {
                self.presenter.present_visual(params);
            }
            Presentation::Auditory(params) if params.duration_s > 0.0 => {
                self.presenter.present_auditory(params);
            }
            _ => {}
        }
        debug!(
            trial = trial.index,
            stimulus = %trial.stimulus,
            session_frame = self.session_frame,
            "stimulus onset"
        );
    }

    fn respond(&mut self, trial: &mut OpenTrial) {
        if trial.stimulus.is_catch() {
            // Baseline lick probe only; catch trials carry no response.
            trial.catch_lick_frame.get_or_insert(self.session_frame);
            return;
        }
        trial.response_frame = Some(self.session_frame);
        trial.advance(TrialPhase::Responded);
        if trial.rewarded_target {
            if trial.reward.is_none() {
                self.arbiter
                    .deliver(&mut self.reward, RewardKind::Earned, self.session_frame);
                trial.record_reward(RewardKind::Earned);
            }
        } else if self.config.incorrect_noise_dur > 0.0 {
            self.presenter.present_noise(self.config.incorrect_noise_dur);
        }
    }

    fn end_trial(&mut self, trial: OpenTrial) {
        let rewarded_target = trial.rewarded_target;
        let responded = trial.response_frame.is_some();
        self.arbiter
            .settle(rewarded_target, responded, trial.reward.is_some());

        let record = trial.finalize(self.session_frame);
        if record.is_catch() {
            assert!(!record.rewarded() && !record.response, "catch trial {} scored", record.index);
        }

        self.sequencer.complete_trial();
        let incorrect = is_incorrect(&record);
        self.repeat_pending = self
            .repeats
            .evaluate(incorrect, self.sequencer.is_complete());

        info!(
            trial = record.index,
            block = record.block,
            stimulus = %record.stimulus,
            response = record.response,
            reward = ?record.reward,
            misses = self.arbiter.miss_count(),
            repeat_next = self.repeat_pending,
            "trial end"
        );

        self.log.append(record);

        let trials_done = self
            .config
            .max_trials
            .is_some_and(|max| self.log.trials.len() >= max);
        let frames_done = self.session_frame + 1 >= self.config.max_frames;
        if trials_done || frames_done || self.stop_requested {
            info!(
                trials = self.log.trials.len(),
                frames = self.session_frame + 1,
                "session complete"
            );
            self.running = false;
        }
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn into_log(self) -> SessionLog {
        self.log
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn session_frame(&self) -> u64 {
        self.session_frame
    }

    /// Frame within the open trial; 0 means the next step starts a trial.
    pub fn trial_frame(&self) -> u32 {
        self.trial_frame
    }

    pub fn open_trial(&self) -> Option<&OpenTrial> {
        self.current.as_ref()
    }

    pub fn miss_count(&self) -> usize {
        self.arbiter.miss_count()
    }

    pub fn repeat_count(&self) -> usize {
        self.repeats.count()
    }

    pub fn repeat_pending(&self) -> bool {
        self.repeat_pending
    }
}
