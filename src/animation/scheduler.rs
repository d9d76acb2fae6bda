use std::time::{Duration, Instant};

/// Default refresh interval when pacing to the display (60 Hz).
pub const REFRESH_INTERVAL: Duration = Duration::from_nanos(16_666_667);

/// How ticks are spaced in wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPolicy {
    /// Wait a fixed interval after each tick.
    FixedDelay(Duration),
    /// Aim for a steady cadence; when a tick overruns, the next deadline is
    /// re-anchored to now instead of firing a burst of catch-up ticks.
    RefreshPaced(Duration),
    /// Do not wait at all (offline rendering).
    Unthrottled,
}

impl TickPolicy {
    /// `delay_ms > 0` selects a fixed delay, anything else paces to the refresh rate.
    #[must_use]
    pub fn from_delay_ms(delay_ms: f64) -> Self {
        if delay_ms > 0.0 {
            Self::FixedDelay(Duration::from_micros((delay_ms * 1000.0).round() as u64))
        } else {
            Self::RefreshPaced(REFRESH_INTERVAL)
        }
    }

    /// Simulation step implied by the policy, in milliseconds.
    #[must_use]
    pub fn default_step_ms(&self) -> f64 {
        match self {
            Self::FixedDelay(delay) => delay.as_micros() as f64 / 1000.0,
            Self::RefreshPaced(_) | Self::Unthrottled => 1000.0 / 60.0,
        }
    }
}

/// Suspends the animation loop between ticks.
pub trait TickScheduler {
    fn wait(&mut self, policy: &TickPolicy);
}

/// Blocks the current thread between ticks.
#[derive(Debug, Default)]
pub struct ThreadScheduler {
    next_deadline: Option<Instant>,
}

impl ThreadScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the next deadline for a refresh-paced loop.
    ///
    /// A deadline already in the past is re-anchored to `now`.
    #[must_use]
    pub fn next_deadline(previous: Option<Instant>, interval: Duration, now: Instant) -> Instant {
        let target = previous.map_or(now + interval, |prev| prev + interval);
        if target < now { now } else { target }
    }
}

impl TickScheduler for ThreadScheduler {
    fn wait(&mut self, policy: &TickPolicy) {
        match *policy {
            TickPolicy::FixedDelay(delay) => {
                std::thread::sleep(delay);
            }
            TickPolicy::RefreshPaced(interval) => {
                let now = Instant::now();
                let deadline = Self::next_deadline(self.next_deadline, interval, now);
                if deadline > now {
                    std::thread::sleep(deadline - now);
                }
                self.next_deadline = Some(deadline);
            }
            TickPolicy::Unthrottled => {}
        }
    }
}

/// Never waits; counts how often it was asked to.
#[derive(Debug, Default)]
pub struct ImmediateScheduler {
    pub waits: usize,
}

impl TickScheduler for ImmediateScheduler {
    fn wait(&mut self, _policy: &TickPolicy) {
        self.waits += 1;
    }
}
