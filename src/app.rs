use crate::subject::{Subject, SubjectProfile};
use anyhow::{Context, Result, bail};
use dynroute_experiment::{SessionController, SessionLog, TaskConfig};
use dynroute_timing::{FrameClock, PacedClock, SimulatedClock};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{info, warn};

const USAGE: &str = "usage: dynamic-routing [CONFIG.json] [--seed N] [--out LOG.json] \
[--realtime HZ] [--lick-rate P] [--hit-rate P] [--reaction-frames N]";

/// Command-line options for a headless session.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub config: Option<PathBuf>,
    pub seed: u64,
    pub out: Option<PathBuf>,
    pub realtime_hz: Option<f64>,
    pub subject: SubjectProfile,
}

impl Options {
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut opts = Options::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = |name: &str| {
                args.next()
                    .with_context(|| format!("{name} needs a value\n{USAGE}"))
            };
            match arg.as_str() {
                "--seed" => opts.seed = value("--seed")?.parse().context("--seed")?,
                "--out" => opts.out = Some(value("--out")?.into()),
                "--realtime" => {
                    opts.realtime_hz = Some(value("--realtime")?.parse().context("--realtime")?)
                }
                "--lick-rate" => {
                    opts.subject.lick_rate = value("--lick-rate")?.parse().context("--lick-rate")?
                }
                "--hit-rate" => {
                    opts.subject.hit_rate = value("--hit-rate")?.parse().context("--hit-rate")?
                }
                "--reaction-frames" => {
                    opts.subject.reaction_frames = value("--reaction-frames")?
                        .parse()
                        .context("--reaction-frames")?
                }
                "-h" | "--help" => bail!("{USAGE}"),
                flag if flag.starts_with("--") => bail!("unknown option {flag}\n{USAGE}"),
                path if opts.config.is_none() => opts.config = Some(path.into()),
                extra => bail!("unexpected argument {extra}\n{USAGE}"),
            }
        }
        for (name, p) in [
            ("--lick-rate", opts.subject.lick_rate),
            ("--hit-rate", opts.subject.hit_rate),
        ] {
            if !(0.0..=1.0).contains(&p) {
                bail!("{name} must lie in [0, 1], got {p}");
            }
        }
        Ok(opts)
    }
}

pub struct App {
    options: Options,
    config: TaskConfig,
}

impl App {
    pub fn new(options: Options) -> Result<Self> {
        let config = match &options.config {
            Some(path) => TaskConfig::load(path)
                .with_context(|| format!("loading task config {}", path.display()))?,
            None => {
                warn!("no config given, running the default task");
                TaskConfig::default()
            }
        };
        Ok(Self { options, config })
    }

    pub fn run(self) -> Result<SessionLog> {
        info!(
            platform = std::env::consts::OS,
            seed = self.options.seed,
            blocks = self.config.block_stim.len(),
            "starting session"
        );

        let log = match self.options.realtime_hz {
            Some(hz) => {
                let (log, clock) = self.run_with_clock(PacedClock::new(hz))?;
                let stats = clock.calibration_stats();
                info!(
                    avg_ms = stats.average_frame_time_ns / 1e6,
                    jitter_ms = stats.jitter_ns / 1e6,
                    fps = stats.effective_fps,
                    late = stats.late_frames,
                    "frame timing"
                );
                log
            }
            None => self.run_with_clock(SimulatedClock::new())?.0,
        };

        if let Some(path) = &self.options.out {
            let file = File::create(path)
                .with_context(|| format!("creating trial log {}", path.display()))?;
            serde_json::to_writer_pretty(BufWriter::new(file), &log)
                .with_context(|| format!("writing trial log {}", path.display()))?;
            info!(path = %path.display(), "trial log written");
        }
        Ok(log)
    }

    fn run_with_clock<C: FrameClock>(&self, clock: C) -> Result<(SessionLog, C)> {
        let subject = Subject::new(self.options.subject.clone(), self.options.seed.wrapping_add(1));
        let mut controller = SessionController::new(
            self.config.clone(),
            StdRng::seed_from_u64(self.options.seed),
            clock,
            subject.lickometer(),
            subject.valve(),
            subject.stage(),
        )
        .context("invalid task config")?;

        controller.run();

        let report = subject.report();
        let log = controller.log();
        summarize(log);
        info!(
            presented = report.presented,
            rewards = report.rewards,
            water_s = report.water_s,
            noise_bursts = report.noise_bursts,
            "subject"
        );
        let log = log.clone();
        Ok((log, controller.clock))
    }
}

/// Per-block hit and false-alarm rates, the way the downstream analysis reads the log.
pub fn summarize(log: &SessionLog) {
    for block in &log.blocks {
        let trials = log.trials_in(block);
        let rate = |pred: &dyn Fn(&&dynroute_core::TrialRecord) -> bool| {
            let selected: Vec<_> = trials.iter().filter(pred).collect();
            let hits = selected.iter().filter(|t| t.response).count();
            (hits, selected.len())
        };
        let (hits, targets) = rate(&|t| t.stimulus == block.rewarded);
        let (fas, nontargets) = rate(&|t| !t.is_catch() && t.stimulus != block.rewarded);
        let catch_licks = trials
            .iter()
            .filter(|t| t.catch_lick_frame.is_some())
            .count();
        let catches = trials.iter().filter(|t| t.is_catch()).count();
        info!(
            block = block.index,
            rewarded = %block.rewarded,
            trials = trials.len(),
            hits = %format!("{hits}/{targets}"),
            false_alarms = %format!("{fas}/{nontargets}"),
            catch_licks = %format!("{catch_licks}/{catches}"),
            "block summary"
        );
    }
    info!(
        trials = log.trials.len(),
        rewarded = log.trials.iter().filter(|t| t.rewarded()).count(),
        violations = log.quiescent_violations.len(),
        frames = log.frames,
        "session summary"
    );
}
