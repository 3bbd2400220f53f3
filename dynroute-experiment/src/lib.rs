pub mod block;
pub mod config;
pub mod generator;
pub mod governor;
pub mod ports;
pub mod repeat;
pub mod reward;
pub mod state;
pub mod trial;

pub use block::{ActiveBlock, BlockSequencer};
pub use config::{ConfigError, SoundType, TaskConfig};
pub use ports::{
    FrameInput, HardwareInput, PresenterCall, RecordingPresenter, RecordingReward, RewardActuator,
    ScriptedLicks, StimulusPresenter,
};
pub use state::SessionController;
pub use trial::{OpenTrial, SessionLog};
