use std::{
    collections::BTreeMap,
    fmt,
    time::{Duration, Instant},
};

use tracing::info;

/// Construction phases that can be timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    NoopActions,
    CreateGraph,
    ActionLevel,
    LiteralLevel,
    ActionMutex,
    LiteralMutex,
    LevelSum,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::NoopActions => "noop_actions",
            Phase::CreateGraph => "create_graph",
            Phase::ActionLevel => "add_action_level",
            Phase::LiteralLevel => "add_literal_level",
            Phase::ActionMutex => "update_a_mutex",
            Phase::LiteralMutex => "update_s_mutex",
            Phase::LevelSum => "h_levelsum",
        };
        write!(f, "{}", name)
    }
}

/// Receives the elapsed time of every timed phase.
pub trait Recorder {
    fn record(&mut self, phase: Phase, elapsed: Duration);
}

/// Drops all measurements.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecorder;

impl Recorder for NoopRecorder {
    fn record(&mut self, _phase: Phase, _elapsed: Duration) {}
}

/// Accumulates total time and call count per phase.
#[derive(Debug, Clone, Default)]
pub struct TimingRecorder {
    totals: BTreeMap<Phase, (Duration, usize)>,
}

impl TimingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self, phase: Phase) -> Duration {
        self.totals.get(&phase).map_or(Duration::ZERO, |(d, _)| *d)
    }

    pub fn count(&self, phase: Phase) -> usize {
        self.totals.get(&phase).map_or(0, |(_, n)| *n)
    }

    /// Sum over all phases. Nested phases (levels inside `CreateGraph`) are counted twice.
    pub fn grand_total(&self) -> Duration {
        self.totals.values().map(|(d, _)| *d).sum()
    }

    pub fn fraction(&self, phase: Phase) -> f64 {
        let total = self.grand_total().as_secs_f64();
        if total > 0.0 {
            self.total(phase).as_secs_f64() / total
        } else {
            0.0
        }
    }

    pub fn report(&self) {
        for (phase, (elapsed, calls)) in &self.totals {
            info!(%phase, calls, ?elapsed, time_frac = self.fraction(*phase), "phase timing");
        }
    }
}

impl Recorder for TimingRecorder {
    fn record(&mut self, phase: Phase, elapsed: Duration) {
        let entry = self.totals.entry(phase).or_insert((Duration::ZERO, 0));
        entry.0 += elapsed;
        entry.1 += 1;
    }
}

/// Runs `f` and reports its duration under `phase`.
pub fn timed<T>(recorder: &mut dyn Recorder, phase: Phase, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    recorder.record(phase, start.elapsed());
    result
}
