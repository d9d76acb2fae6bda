/// Milliseconds per second; shader time is in seconds, the clock in ms.
pub const MS_IN_SECOND: f64 = 1000.0;

/// Snapshot handed to the renderer for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInfo {
    /// Zero-based index of this tick.
    pub index: u64,
    /// Simulation time in milliseconds.
    pub time_ms: f64,
}

impl TickInfo {
    #[inline]
    #[must_use]
    pub fn time_seconds(&self) -> f64 {
        self.time_ms / MS_IN_SECOND
    }
}

/// Simulation time bookkeeping.
///
/// Time is derived from the tick count (`initial + ticks × step`) rather than
/// accumulated, so long runs do not drift.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationClock {
    initial_ms: f64,
    step_ms: f64,
    ticks: u64,
}

impl SimulationClock {
    #[must_use]
    pub fn new(initial_ms: f64, step_ms: f64) -> Self {
        Self {
            initial_ms,
            step_ms: step_ms.max(0.0),
            ticks: 0,
        }
    }

    /// Advances by one step and returns the tick to render.
    pub fn advance(&mut self) -> TickInfo {
        let index = self.ticks;
        self.ticks += 1;
        TickInfo {
            index,
            time_ms: self.time_ms(),
        }
    }

    /// Current simulation time in milliseconds.
    #[must_use]
    pub fn time_ms(&self) -> f64 {
        self.initial_ms + self.ticks as f64 * self.step_ms
    }

    /// Time elapsed since the initial time.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.time_ms() - self.initial_ms
    }

    #[inline]
    #[must_use]
    pub fn initial_ms(&self) -> f64 {
        self.initial_ms
    }

    #[inline]
    #[must_use]
    pub fn step_ms(&self) -> f64 {
        self.step_ms
    }

    /// Number of ticks rendered so far.
    #[inline]
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
