//! Animator state machine
//!
//! ```text
//!          start()            stop condition met
//!   Idle ──────────► Running ───────────────────► Finished
//!                       │  │
//!                       │  └── tick error ──────► Aborted
//!                       └──── cancel token ─────► Cancelled
//! ```
//!
//! Each running step advances the clock, hands the tick to a
//! [`TickHandler`], evaluates the stop condition and then either waits on the
//! [`TickScheduler`] or finishes and notifies the handler. Cancellation is
//! only observed at the top of a step, so a tick is never interrupted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::clock::{SimulationClock, TickInfo};
use super::scheduler::{TickPolicy, TickScheduler};
use crate::errors::{HorizonError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimatorState {
    Idle,
    Running,
    Finished,
    /// Stopped by a [`CancelToken`].
    Cancelled,
    /// Stopped because a tick (or the completion hook) failed.
    Aborted,
}

impl AnimatorState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled | Self::Aborted)
    }
}

/// Shared flag for stopping a run from outside the loop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Fraction of a step by which elapsed time may fall short of the duration
/// and still count as reaching it. Absorbs rounding in `ticks × step`.
const STEP_TOLERANCE: f64 = 1e-9;

/// When a run ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopCondition {
    /// Simulated span in ms; `0` means unbounded.
    pub duration_ms: f64,
    /// `false` renders exactly one tick.
    pub animate: bool,
    pub max_ticks: Option<u64>,
}

impl StopCondition {
    #[must_use]
    pub fn is_met(&self, clock: &SimulationClock) -> bool {
        !self.animate
            || (self.duration_ms > 0.0
                && clock.elapsed_ms() >= self.duration_ms - clock.step_ms() * STEP_TOLERANCE)
            || self.max_ticks.is_some_and(|max| clock.ticks() >= max)
    }
}

/// Receives the ticks produced by an [`Animator`].
pub trait TickHandler {
    fn on_tick(&mut self, tick: TickInfo) -> Result<()>;

    /// Called once when the run reaches [`AnimatorState::Finished`].
    fn on_finished(&mut self, _clock: &SimulationClock) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub state: AnimatorState,
    pub ticks: u64,
    pub final_time_ms: f64,
}

pub struct Animator<S> {
    state: AnimatorState,
    clock: SimulationClock,
    policy: TickPolicy,
    stop: StopCondition,
    scheduler: S,
    cancel: CancelToken,
}

impl<S: TickScheduler> Animator<S> {
    #[must_use]
    pub fn new(clock: SimulationClock, policy: TickPolicy, stop: StopCondition, scheduler: S) -> Self {
        Self {
            state: AnimatorState::Idle,
            clock,
            policy,
            stop,
            scheduler,
            cancel: CancelToken::new(),
        }
    }

    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> AnimatorState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    #[inline]
    #[must_use]
    pub fn policy(&self) -> &TickPolicy {
        &self.policy
    }

    #[inline]
    #[must_use]
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn start(&mut self) -> Result<()> {
        if self.state != AnimatorState::Idle {
            return Err(HorizonError::config(format!(
                "animator cannot start from state {:?}",
                self.state
            )));
        }
        log::debug!("Animator started with {:?}", self.policy);
        self.state = AnimatorState::Running;
        Ok(())
    }

    /// Runs one tick. A no-op outside [`AnimatorState::Running`].
    pub fn step<H: TickHandler + ?Sized>(&mut self, handler: &mut H) -> Result<AnimatorState> {
        if self.state != AnimatorState::Running {
            return Ok(self.state);
        }

        if self.cancel.is_cancelled() {
            log::info!("Run cancelled after {} tick(s)", self.clock.ticks());
            self.state = AnimatorState::Cancelled;
            return Ok(self.state);
        }

        let tick = self.clock.advance();
        if let Err(e) = handler.on_tick(tick) {
            log::error!("Tick {} failed: {e}", tick.index);
            self.state = AnimatorState::Aborted;
            return Err(e);
        }

        if self.stop.is_met(&self.clock) {
            self.state = AnimatorState::Finished;
            log::info!("Finished. Time elapsed: {} ms", self.clock.time_ms());
            if let Err(e) = handler.on_finished(&self.clock) {
                self.state = AnimatorState::Aborted;
                return Err(e);
            }
            return Ok(self.state);
        }

        self.scheduler.wait(&self.policy);
        Ok(self.state)
    }

    /// Starts (if idle) and steps until a terminal state.
    pub fn run<H: TickHandler + ?Sized>(&mut self, handler: &mut H) -> Result<RunSummary> {
        if self.state == AnimatorState::Idle {
            self.start()?;
        }
        while self.step(handler)? == AnimatorState::Running {}

        Ok(RunSummary {
            state: self.state,
            ticks: self.clock.ticks(),
            final_time_ms: self.clock.time_ms(),
        })
    }
}
