use dynroute_core::{RewardKind, StimulusId, TrialRecord};
use dynroute_experiment::{
    FrameInput, PresenterCall, RecordingPresenter, RecordingReward, ScriptedLicks,
    SessionController, SessionLog, TaskConfig,
};
use dynroute_timing::{FrameClock, SimulatedClock};
use rand::SeedableRng;
use rand::rngs::StdRng;

type Controller =
    SessionController<StdRng, SimulatedClock, ScriptedLicks, RecordingReward, RecordingPresenter>;

const VIS1: StimulusId = StimulusId::Visual(1);
const VIS2: StimulusId = StimulusId::Visual(2);
const SOUND1: StimulusId = StimulusId::Auditory(1);

/// Short deterministic trials: P = 10, window [2, 8), 2 post frames.
fn fast_config() -> TaskConfig {
    TaskConfig {
        max_trials: Some(20),
        prob_catch: 0.0,
        pre_stim_frames_fixed: 10,
        pre_stim_frames_variable_mean: 0.0,
        pre_stim_frames_max: 40,
        quiescent_frames: 5,
        response_window: (2, 8),
        auto_reward_onset_frame: 2,
        post_response_window_frames: 2,
        ..Default::default()
    }
}

fn controller(config: TaskConfig, seed: u64) -> Controller {
    SessionController::new(
        config,
        StdRng::seed_from_u64(seed),
        SimulatedClock::new(),
        ScriptedLicks::none(),
        RecordingReward::default(),
        RecordingPresenter::default(),
    )
    .unwrap()
}

/// Drives the session with `lick(open_trial_index, trial_frame_relative_to_onset)`.
/// Trial frames before onset are negative.
fn run_with<F>(ctl: &mut Controller, mut lick: F) -> SessionLog
where
    F: FnMut(&Controller, usize, i64) -> bool,
{
    while ctl.is_running() {
        let input = match ctl.open_trial() {
            Some(trial) => {
                let rel = i64::from(ctl.trial_frame()) - i64::from(trial.pre_stim_frames);
                FrameInput {
                    lick: lick(ctl, trial.index, rel),
                }
            }
            None => FrameInput::idle(),
        };
        ctl.step(input);
    }
    ctl.log().clone()
}

fn rewarded_indices(log: &SessionLog) -> Vec<usize> {
    log.trials
        .iter()
        .filter(|t| t.rewarded())
        .map(|t| t.index)
        .collect()
}

#[test]
fn scenario_a_quota_then_rescue() {
    let config = TaskConfig {
        block_stim: vec![vec![VIS1]],
        new_block_auto_rewards: 5,
        auto_reward_miss_trials: Some(5),
        ..fast_config()
    };
    let mut ctl = controller(config, 1);
    let log = run_with(&mut ctl, |_, _, _| false);

    assert_eq!(log.trials.len(), 20);
    assert!(log.trials.iter().all(|t| t.stimulus == VIS1 && !t.response));
    for t in &log.trials[..5] {
        assert_eq!(t.reward, Some(RewardKind::AutoQuota));
    }
    assert_eq!(log.trials[5].auto_reward_scheduled, None);
    assert_eq!(rewarded_indices(&log), vec![0, 1, 2, 3, 4, 10, 16]);
    assert_eq!(log.trials[10].reward, Some(RewardKind::AutoRescue));
    assert_eq!(log.trials[16].reward, Some(RewardKind::AutoRescue));
    assert_eq!(ctl.reward.deliveries.len(), 7);
}

#[test]
fn scenario_a_earned_reward_after_quota() {
    let config = TaskConfig {
        block_stim: vec![vec![VIS1]],
        new_block_auto_rewards: 5,
        auto_reward_miss_trials: Some(5),
        max_trials: Some(8),
        // Window opens after the auto-reward frame so responses never pre-empt it.
        response_window: (4, 8),
        ..fast_config()
    };
    let mut ctl = controller(config, 2);
    let log = run_with(&mut ctl, |_, _, rel| rel == 5);

    for t in &log.trials[..5] {
        assert_eq!(t.reward, Some(RewardKind::AutoQuota));
        assert!(t.response);
    }
    for t in &log.trials[5..] {
        assert_eq!(t.reward, Some(RewardKind::Earned));
        assert_eq!(t.reaction_frames(), Some(5));
    }
    assert_eq!(ctl.reward.deliveries.len(), 8);
    assert_eq!(ctl.miss_count(), 0);
}

#[test]
fn response_before_auto_reward_frame_earns_it_instead() {
    let config = TaskConfig {
        block_stim: vec![vec![VIS1]],
        new_block_auto_rewards: 5,
        max_trials: Some(1),
        auto_reward_onset_frame: 4,
        ..fast_config()
    };
    let mut ctl = controller(config, 3);
    let log = run_with(&mut ctl, |_, _, rel| rel == 2);

    let t = &log.trials[0];
    assert_eq!(t.auto_reward_scheduled, Some(RewardKind::AutoQuota));
    assert_eq!(t.reward, Some(RewardKind::Earned));
    assert_eq!(ctl.reward.deliveries.len(), 1);
}

#[test]
fn lick_on_auto_reward_frame_does_not_double_reward() {
    let config = TaskConfig {
        block_stim: vec![vec![VIS1]],
        max_trials: Some(1),
        ..fast_config()
    };
    let mut ctl = controller(config, 4);
    // auto_reward_onset_frame == response_window.0 == 2
    let log = run_with(&mut ctl, |_, _, rel| rel == 2);

    let t = &log.trials[0];
    assert!(t.response);
    assert_eq!(t.reward, Some(RewardKind::AutoQuota));
    assert_eq!(ctl.reward.deliveries.len(), 1);
}

#[test]
fn scenario_b_block_switch_at_eleventh_trial() {
    let config = TaskConfig {
        block_stim: vec![vec![VIS1], vec![SOUND1, VIS1]],
        trials_per_block: Some((10, 10)),
        max_trials: Some(25),
        ..fast_config()
    };
    let mut ctl = controller(config, 5);
    let log = run_with(&mut ctl, |_, _, _| false);

    assert!(log.trials[..10].iter().all(|t| t.block == 0));
    assert_eq!(log.trials[10].block, 1);
    assert_eq!(log.blocks[0].rewarded, VIS1);
    assert_eq!(log.blocks[1].rewarded, SOUND1);
    assert_eq!(log.blocks[0].trials, 0..10);
    assert_eq!(log.blocks[1].trials, 10..20);
    // Templates wrap around.
    assert_eq!(log.blocks[2].rewarded, VIS1);
    assert_eq!(log.blocks[2].trials, 20..25);
    assert!(
        log.trials_in(&log.blocks[1])
            .iter()
            .all(|t| t.stimulus == SOUND1 || t.stimulus == VIS1)
    );
    for t in &log.trials {
        if t.rewarded() {
            assert_eq!(t.stimulus, log.block_of(t).rewarded);
        }
    }
}

#[test]
fn scenario_c_quiescent_lick_delays_onset() {
    let config = TaskConfig {
        block_stim: vec![vec![VIS1]],
        max_trials: Some(2),
        pre_stim_frames_fixed: 90,
        pre_stim_frames_max: 360,
        quiescent_frames: 90,
        ..fast_config()
    };
    let mut ctl = controller(config, 6);
    // Trial 0: one lick 5 frames before the 90-frame boundary.
    let log = run_with(&mut ctl, |ctl, trial, _| trial == 0 && ctl.trial_frame() == 85);

    let first = &log.trials[0];
    assert_eq!(first.pre_stim_frames, 180);
    assert_eq!(first.quiescent_violations, vec![first.start_frame + 85]);
    assert_eq!(first.stim_onset_frame, first.start_frame + 180);

    let second = &log.trials[1];
    assert_eq!(second.pre_stim_frames, 90);
    assert!(second.quiescent_violations.is_empty());
    assert_eq!(log.quiescent_violations, first.quiescent_violations);
}

#[test]
fn scenario_c_lick_outside_quiescent_window_is_ignored() {
    let config = TaskConfig {
        block_stim: vec![vec![VIS1]],
        max_trials: Some(1),
        pre_stim_frames_fixed: 120,
        pre_stim_frames_max: 360,
        quiescent_frames: 90,
        ..fast_config()
    };
    let mut ctl = controller(config, 7);
    let log = run_with(&mut ctl, |_, _, rel| rel == -91 || rel == -100);

    assert_eq!(log.trials[0].pre_stim_frames, 120);
    assert!(log.quiescent_violations.is_empty());
}

#[test]
fn scenario_c_lick_opening_quiescent_window_extends() {
    let config = TaskConfig {
        block_stim: vec![vec![VIS1]],
        max_trials: Some(1),
        pre_stim_frames_fixed: 120,
        pre_stim_frames_max: 360,
        quiescent_frames: 90,
        ..fast_config()
    };
    let mut ctl = controller(config, 7);
    // Trial frame 30 is exactly 90 frames before the initial onset.
    let log = run_with(&mut ctl, |ctl, _, _| ctl.trial_frame() == 30);

    let t = &log.trials[0];
    assert_eq!(t.quiescent_violations, vec![t.start_frame + 30]);
    assert_eq!(t.pre_stim_frames, 240);
    assert_eq!(t.stim_onset_frame, t.start_frame + 240);
}

#[test]
fn scenario_c_capped_window_still_presents() {
    let config = TaskConfig {
        block_stim: vec![vec![VIS1]],
        max_trials: Some(1),
        pre_stim_frames_fixed: 30,
        pre_stim_frames_max: 60,
        quiescent_frames: 20,
        ..fast_config()
    };
    let mut ctl = controller(config, 8);
    // Lick on every pre-stimulus frame.
    let log = run_with(&mut ctl, |_, _, rel| rel < 0);

    let t = &log.trials[0];
    assert_eq!(t.pre_stim_frames, 60);
    assert_eq!(t.stim_onset_frame, t.start_frame + 60);
    assert!(!t.quiescent_violations.is_empty());
    assert!(t.quiescent_violations.iter().all(|&f| f < t.stim_onset_frame));
}

#[test]
fn scenario_d_incorrect_trials_repeat_up_to_limit() {
    let config = TaskConfig {
        block_stim: vec![vec![VIS1]],
        new_block_auto_rewards: 0,
        auto_reward_miss_trials: None,
        incorrect_trial_repeats: 2,
        max_trials: Some(7),
        ..fast_config()
    };
    let mut ctl = controller(config, 9);
    // Only trial 2 is answered.
    let log = run_with(&mut ctl, |_, trial, rel| trial == 2 && rel == 3);

    let repeats: Vec<bool> = log.trials.iter().map(|t| t.repeat).collect();
    assert_eq!(repeats, vec![false, true, true, false, true, true, false]);
    assert_eq!(log.trials[2].reward, Some(RewardKind::Earned));
    // Trial 5 was incorrect but the run limit was reached.
    assert!(!log.trials[5].rewarded());
}

#[test]
fn scenario_d_unrewarded_non_target_repeats() {
    for licks_vis2 in [true, false] {
        let config = TaskConfig {
            block_stim: vec![vec![VIS1, VIS2]],
            new_block_auto_rewards: 0,
            auto_reward_miss_trials: None,
            incorrect_trial_repeats: 1,
            incorrect_noise_dur: 0.5,
            max_trials: Some(60),
            ..fast_config()
        };
        let mut ctl = controller(config, 10);
        // Always licks vis1; licks vis2 only when `licks_vis2` is set.
        let log = run_with(&mut ctl, |ctl, _, rel| {
            rel == 3
                && ctl
                    .open_trial()
                    .is_some_and(|t| t.stimulus == VIS1 || (licks_vis2 && t.stimulus == VIS2))
        });

        let vis2: Vec<&TrialRecord> = log.trials.iter().filter(|t| t.stimulus == VIS2).collect();
        assert!(!vis2.is_empty());
        assert!(vis2.iter().all(|t| t.response == licks_vis2 && !t.rewarded()));
        for pair in log.trials.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.stimulus == VIS2 && !a.repeat {
                assert!(b.repeat, "trial {} should repeat vis2", b.index);
                assert_eq!(b.stimulus, VIS2);
                assert_eq!(b.presentation, a.presentation);
            }
            if a.stimulus == VIS1 {
                assert!(!b.repeat);
            }
        }
        let noise = ctl
            .presenter
            .calls
            .iter()
            .filter(|c| matches!(c, PresenterCall::Noise(d) if *d == 0.5))
            .count();
        assert_eq!(noise, if licks_vis2 { vis2.len() } else { 0 });
    }
}

#[test]
fn catch_trials_record_licks_without_response() {
    let config = TaskConfig {
        block_stim: vec![vec![VIS1]],
        prob_catch: 0.5,
        max_trials: Some(40),
        ..fast_config()
    };
    let mut ctl = controller(config, 11);
    let log = run_with(&mut ctl, |_, _, rel| rel == 3);

    let catches: Vec<&TrialRecord> = log.trials.iter().filter(|t| t.is_catch()).collect();
    assert!(!catches.is_empty());
    assert!(!log.trials[0].is_catch());
    for t in catches {
        assert!(!t.response && !t.rewarded());
        assert_eq!(t.catch_lick_frame, Some(t.stim_onset_frame + 3));
    }
    let visual = ctl
        .presenter
        .calls
        .iter()
        .filter(|c| matches!(c, PresenterCall::Visual(_)))
        .count();
    assert_eq!(visual, log.trials.iter().filter(|t| !t.is_catch()).count());
}

#[test]
fn frame_limit_ends_session_at_trial_boundary() {
    let config = TaskConfig {
        block_stim: vec![vec![VIS1]],
        max_trials: None,
        max_frames: 50,
        ..fast_config()
    };
    let mut ctl = controller(config, 12);
    let log = run_with(&mut ctl, |_, _, _| false);

    // 21 frames per trial: the third trial crosses frame 50 and still completes.
    assert_eq!(log.trials.len(), 3);
    assert_eq!(log.frames, 63);
    assert_eq!(log.trials[2].end_frame, 62);
    assert!(!ctl.step(FrameInput::lick()));
    assert_eq!(ctl.clock.frame_count(), 63);
}

#[test]
fn stop_request_waits_for_trial_end() {
    let mut ctl = controller(
        TaskConfig {
            max_trials: None,
            ..fast_config()
        },
        13,
    );
    for _ in 0..5 {
        ctl.step(FrameInput::idle());
    }
    ctl.request_stop();
    assert!(ctl.is_running());
    while ctl.step(FrameInput::idle()) {}
    assert_eq!(ctl.log().trials.len(), 1);
    assert_eq!(ctl.session_frame(), 21);
}
