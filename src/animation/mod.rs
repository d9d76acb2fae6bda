//! Simulation timing
//!
//! - [`SimulationClock`]: simulation time, step size and tick counter
//! - [`TickPolicy`] / [`TickScheduler`]: how long to wait between ticks
//! - [`Animator`]: the `Idle → Running → Finished` state machine driving ticks
//! - [`CameraAnimation`]: keyframed camera interpolation over simulation time

pub mod animator;
pub mod camera;
pub mod clock;
pub mod scheduler;

pub use animator::{Animator, AnimatorState, CancelToken, RunSummary, StopCondition, TickHandler};
pub use camera::{CameraAnimation, CameraKeyframes, CameraState};
pub use clock::{MS_IN_SECOND, SimulationClock, TickInfo};
pub use scheduler::{ImmediateScheduler, ThreadScheduler, TickPolicy, TickScheduler};
