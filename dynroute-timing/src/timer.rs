use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// The "present this frame" boundary the controller yields to once per tick.
pub trait FrameClock {
    /// Blocks (or not) until the frame is on screen.
    fn present(&mut self);
    /// Frames presented so far.
    fn frame_count(&self) -> u64;
    fn calibration_stats(&self) -> CalibrationStats;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationStats {
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_fps: f64,
    pub late_frames: u64,
}

impl CalibrationStats {
    fn from_samples(samples: &VecDeque<Duration>, late_frames: u64) -> Self {
        let times: Vec<f64> = samples.iter().map(|d| d.as_nanos() as f64).collect();
        if times.is_empty() {
            return CalibrationStats {
                late_frames,
                ..Default::default()
            };
        }
        let n = times.len() as f64;
        let avg = times.iter().sum::<f64>() / n;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / n;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        CalibrationStats {
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
            effective_fps: if avg > 0.0 { 1e9 / avg } else { 0.0 },
            late_frames,
        }
    }
}

/// Counts frames without waiting; for tests and offline simulation.
#[derive(Debug, Clone, Default)]
pub struct SimulatedClock {
    frames: u64,
}

impl SimulatedClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameClock for SimulatedClock {
    fn present(&mut self) {
        self.frames += 1;
    }

    fn frame_count(&self) -> u64 {
        self.frames
    }

    fn calibration_stats(&self) -> CalibrationStats {
        CalibrationStats::default()
    }
}

/// Paces frames to a fixed refresh period using a high-precision sleep.
#[derive(Debug, Clone)]
pub struct PacedClock {
    period: Duration,
    next_deadline: Instant,
    last_present: Instant,
    frames: u64,
    late_frames: u64,
    frame_times: VecDeque<Duration>,
    max_samples: usize,
}

impl PacedClock {
    pub fn new(refresh_hz: f64) -> Self {
        let period = Duration::from_secs_f64(1.0 / refresh_hz);
        let now = Instant::now();
        Self {
            period,
            next_deadline: now + period,
            last_present: now,
            frames: 0,
            late_frames: 0,
            frame_times: VecDeque::with_capacity(1000),
            max_samples: 1000,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    fn record_frame(&mut self, d: Duration) {
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(d);
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        // SAFETY: `req` is a valid timespec and the remainder pointer may be null.
        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }
}

impl FrameClock for PacedClock {
    fn present(&mut self) {
        let now = Instant::now();
        if now < self.next_deadline {
            self.high_precision_sleep(self.next_deadline - now);
            self.next_deadline += self.period;
        } else {
            // Missed the deadline; re-anchor instead of bursting to catch up.
            self.late_frames += 1;
            tracing::debug!(frame = self.frames, "late frame");
            self.next_deadline = now + self.period;
        }
        let presented = Instant::now();
        let elapsed = presented - self.last_present;
        self.record_frame(elapsed);
        self.last_present = presented;
        self.frames += 1;
    }

    fn frame_count(&self) -> u64 {
        self.frames
    }

    fn calibration_stats(&self) -> CalibrationStats {
        CalibrationStats::from_samples(&self.frame_times, self.late_frames)
    }
}
