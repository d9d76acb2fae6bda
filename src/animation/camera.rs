use glam::Vec3;
use serde::Deserialize;

/// Camera pose pushed into `uCameraPosition` / `uCameraRotation`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct CameraState {
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
}

impl CameraState {
    #[must_use]
    pub fn new(position: Vec3, rotation: Vec3) -> Self {
        Self { position, rotation }
    }

    /// Component-wise linear interpolation. `t` is not clamped.
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            position: self.position.lerp(other.position, t),
            rotation: self.rotation.lerp(other.rotation, t),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CameraKeyframes {
    pub start: CameraState,
    pub end: CameraState,
}

/// Linear camera motion from `start` to `end` over the simulation duration.
///
/// Progress is `(time - initial) / duration` and is deliberately left
/// unclamped: times outside the window extrapolate along the same line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraAnimation {
    keyframes: CameraKeyframes,
    initial_ms: f64,
    duration_ms: f64,
}

impl CameraAnimation {
    /// Returns `None` for a non-positive duration, which has no progress.
    #[must_use]
    pub fn new(keyframes: CameraKeyframes, initial_ms: f64, duration_ms: f64) -> Option<Self> {
        (duration_ms > 0.0).then_some(Self {
            keyframes,
            initial_ms,
            duration_ms,
        })
    }

    #[must_use]
    pub fn progress(&self, time_ms: f64) -> f64 {
        (time_ms - self.initial_ms) / self.duration_ms
    }

    #[must_use]
    pub fn sample(&self, time_ms: f64) -> CameraState {
        let t = self.progress(time_ms) as f32;
        self.keyframes.start.lerp(&self.keyframes.end, t)
    }

    #[inline]
    #[must_use]
    pub fn keyframes(&self) -> &CameraKeyframes {
        &self.keyframes
    }
}
