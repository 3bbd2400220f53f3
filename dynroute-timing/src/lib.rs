pub mod timer;

pub use timer::{CalibrationStats, FrameClock, PacedClock, SimulatedClock};
