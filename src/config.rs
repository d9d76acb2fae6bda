//! Pipeline configuration
//!
//! [`HorizonConfig`] is an immutable value read once at startup, either from
//! JSON (camelCase keys) or built in code from [`HorizonConfig::default`]
//! with the `with_*` helpers.
//!
//! ```rust,ignore
//! let config = HorizonConfig::from_json_file("configs/disk.json")?
//!     .with_capture(true);
//! ```

use std::path::Path;

use glam::Vec3;
use serde::Deserialize;

use crate::animation::{CameraAnimation, CameraKeyframes, CameraState, StopCondition, TickPolicy};
use crate::assets::dataset::{DEFAULT_FIELD_KEY, DEFAULT_TIME_KEY};
use crate::assets::io::status_of;
use crate::capture::ImageEncoding;
use crate::errors::{HorizonError, Result};
use crate::renderer::graph::PassDeclaration;
use crate::renderer::settings::RenderSettings;
use crate::resources::{UniformDeclaration, builtin};

/// Name of the stock radiative-transfer pass.
pub const BLACK_HOLE_PASS_NAME: &str = "rayMarchRadiativeTransfer";
/// Fragment source of the stock pass, shipped under `assets/`.
pub const BLACK_HOLE_SHADER_PATH: &str = "/shaders/rayMarchRadiativeTransfer.wgsl";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HorizonConfig {
    /// Per-pass and per-frame timing logs
    pub debug: bool,
    pub passes: Vec<PassDeclaration>,
    pub scene: SceneConfig,
    pub rendering: RenderingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SceneConfig {
    /// Simulation start time, ms
    pub initial_time: f64,
    /// Simulated span, ms; `0` leaves an animated run unbounded
    pub duration: f64,
    pub max_steps: i32,
    pub speed_scale: f32,
    pub min_step_size: f32,
    pub max_step_size: f32,
    pub max_distance: f32,
    #[serde(rename = "EPS")]
    pub eps: f32,
    pub relativistic_paths: bool,
    pub brightness_scale: f32,
    pub observer_frequency: f32,
    pub camera: CameraConfig,
    pub black_hole: BlackHoleConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraConfig {
    pub position: Vec3,
    pub rotation: Vec3,
    /// Start/end keyframes interpolated over the scene duration
    pub animation: Option<CameraKeyframes>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlackHoleConfig {
    pub schwarzschild_radius: f32,
    pub use_input_texture: bool,
    pub input_data_path: String,
    /// Dataset key of the scalar field
    pub input_field_key: String,
    /// Dataset key of the time coordinates
    pub input_time_key: String,
    /// Multiplier applied to every field value before upload
    pub density_scale: f32,
    pub input_data_height: f32,
    pub thick_disk: bool,
    pub disk_height: f32,
    pub inner_radius_coefficient: f32,
    pub base_temperature: f32,
    pub emission_coefficient: f32,
    pub absorption_coefficient: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderingConfig {
    pub resolution: Resolution,
    /// Wall-clock delay between ticks, ms; `0` paces to the refresh rate
    pub delay_ms: f64,
    pub should_animate: bool,
    /// Simulation step per tick, ms; defaults from the tick policy
    pub time_step_ms: Option<f64>,
    /// Hard stop for otherwise unbounded runs
    pub max_ticks: Option<u64>,
    pub log_factor: f32,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputConfig {
    /// Capture frames for export
    pub save: bool,
    /// Keep the display readable after drawing; follows `save` when unset
    pub preserve_drawing_buffer: Option<bool>,
    pub image: StillOutput,
    pub video: SequenceOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct StillOutput {
    #[serde(rename = "type")]
    pub encoding: ImageEncoding,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SequenceOutput {
    #[serde(rename = "imageType")]
    pub encoding: ImageEncoding,
}

impl Default for HorizonConfig {
    fn default() -> Self {
        Self {
            debug: false,
            passes: Vec::new(),
            scene: SceneConfig::default(),
            rendering: RenderingConfig::default(),
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            initial_time: 0.0,
            duration: 0.0,
            max_steps: 600,
            speed_scale: 1.0,
            min_step_size: 0.001,
            max_step_size: 0.05,
            max_distance: 40.0,
            eps: 1e-4,
            relativistic_paths: true,
            brightness_scale: 15000.0,
            observer_frequency: 0.0009,
            camera: CameraConfig::default(),
            black_hole: BlackHoleConfig::default(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, -25.0),
            rotation: Vec3::ZERO,
            animation: None,
        }
    }
}

impl Default for BlackHoleConfig {
    fn default() -> Self {
        Self {
            schwarzschild_radius: 1.0,
            use_input_texture: false,
            input_data_path: "/inputs/grmhd_history.json".to_string(),
            input_field_key: DEFAULT_FIELD_KEY.to_string(),
            input_time_key: DEFAULT_TIME_KEY.to_string(),
            density_scale: 1.0,
            input_data_height: 0.2,
            thick_disk: false,
            disk_height: 0.3,
            inner_radius_coefficient: 3.0,
            base_temperature: 10000.0,
            emission_coefficient: 10.0,
            absorption_coefficient: 0.01,
        }
    }
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            delay_ms: 100.0,
            should_animate: true,
            time_step_ms: None,
            max_ticks: None,
            log_factor: 5.0,
            output: OutputConfig::default(),
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            save: false,
            preserve_drawing_buffer: None,
            image: StillOutput {
                encoding: ImageEncoding::Png,
            },
            video: SequenceOutput::default(),
        }
    }
}

impl Default for SequenceOutput {
    fn default() -> Self {
        Self {
            encoding: ImageEncoding::Jpeg,
        }
    }
}

impl HorizonConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| HorizonError::Io {
            path: path.display().to_string(),
            status: status_of(&e),
        })?;
        Self::from_json_str(&json)
    }

    /// Rejects values no run can use.
    pub fn validate(&self) -> Result<()> {
        let Resolution { width, height } = self.rendering.resolution;
        if width == 0 || height == 0 {
            return Err(HorizonError::config(format!(
                "resolution must be non-zero, got {width}x{height}"
            )));
        }
        if self.scene.duration.is_nan() || self.scene.duration < 0.0 {
            return Err(HorizonError::config("duration must be non-negative"));
        }
        if self.rendering.delay_ms.is_nan() || self.rendering.delay_ms < 0.0 {
            return Err(HorizonError::config("delayMs must be non-negative"));
        }
        if let Some(step) = self.rendering.time_step_ms
            && (step.is_nan() || step <= 0.0)
        {
            return Err(HorizonError::config("timeStepMs must be positive"));
        }
        Ok(())
    }

    // ========================================================================
    // Builders
    // ========================================================================

    #[must_use]
    pub fn with_passes(mut self, passes: Vec<PassDeclaration>) -> Self {
        self.passes = passes;
        self
    }

    #[must_use]
    pub fn with_pass(mut self, pass: PassDeclaration) -> Self {
        self.passes.push(pass);
        self
    }

    #[must_use]
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.rendering.resolution = Resolution { width, height };
        self
    }

    #[must_use]
    pub fn with_animation(mut self, animate: bool) -> Self {
        self.rendering.should_animate = animate;
        self
    }

    #[must_use]
    pub fn with_initial_time(mut self, initial_ms: f64) -> Self {
        self.scene.initial_time = initial_ms;
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.scene.duration = duration_ms;
        self
    }

    #[must_use]
    pub fn with_delay_ms(mut self, delay_ms: f64) -> Self {
        self.rendering.delay_ms = delay_ms;
        self
    }

    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.rendering.max_ticks = Some(max_ticks);
        self
    }

    /// Enables frame capture. Display preservation follows unless set explicitly.
    #[must_use]
    pub fn with_capture(mut self, save: bool) -> Self {
        self.rendering.output.save = save;
        self
    }

    #[must_use]
    pub fn with_preserve_drawing_buffer(mut self, preserve: bool) -> Self {
        self.rendering.output.preserve_drawing_buffer = Some(preserve);
        self
    }

    #[must_use]
    pub fn with_camera_animation(mut self, keyframes: CameraKeyframes) -> Self {
        self.scene.camera.animation = Some(keyframes);
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    // ========================================================================
    // Derived values
    // ========================================================================

    #[must_use]
    pub fn tick_policy(&self) -> TickPolicy {
        TickPolicy::from_delay_ms(self.rendering.delay_ms)
    }

    /// Simulation step per tick: explicit step, else the fixed delay, else one
    /// refresh interval.
    #[must_use]
    pub fn step_ms(&self) -> f64 {
        match self.rendering.time_step_ms {
            Some(step) => step,
            None if self.rendering.delay_ms > 0.0 => self.rendering.delay_ms,
            None => self.tick_policy().default_step_ms(),
        }
    }

    #[must_use]
    pub fn stop_condition(&self) -> StopCondition {
        StopCondition {
            duration_ms: self.scene.duration,
            animate: self.rendering.should_animate,
            max_ticks: self.rendering.max_ticks,
        }
    }

    #[must_use]
    pub fn preserve_display(&self) -> bool {
        self.rendering
            .output
            .preserve_drawing_buffer
            .unwrap_or(self.rendering.output.save)
    }

    #[must_use]
    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            width: self.rendering.resolution.width,
            height: self.rendering.resolution.height,
            preserve_display: self.preserve_display(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn initial_camera(&self) -> CameraState {
        CameraState::new(self.scene.camera.position, self.scene.camera.rotation)
    }

    /// Camera motion over `[initial, initial + duration]`, when keyframes are set
    /// and the duration is positive.
    #[must_use]
    pub fn camera_animation(&self) -> Option<CameraAnimation> {
        self.scene
            .camera
            .animation
            .and_then(|keyframes| CameraAnimation::new(keyframes, self.scene.initial_time, self.scene.duration))
    }

    /// Encoding used for captured frames of this run.
    #[must_use]
    pub fn capture_encoding(&self) -> ImageEncoding {
        if self.rendering.should_animate {
            self.rendering.output.video.encoding
        } else {
            self.rendering.output.image.encoding
        }
    }
}

/// The stock ray-marched radiative-transfer pass, with uniforms derived from
/// `config`.
#[must_use]
pub fn default_black_hole_pass(config: &HorizonConfig) -> PassDeclaration {
    let scene = &config.scene;
    let hole = &scene.black_hole;
    let camera = config.initial_camera();
    let rs = hole.schwarzschild_radius;
    let inner_radius = rs * hole.inner_radius_coefficient;

    PassDeclaration::new(BLACK_HOLE_PASS_NAME, BLACK_HOLE_SHADER_PATH)
        .with_uniform(UniformDeclaration::builtin(builtin::INPUT_TEXTURE))
        .with_uniform(UniformDeclaration::builtin(builtin::RESOLUTION))
        .with_uniform(UniformDeclaration::with_value("uThickDisk", hole.thick_disk))
        .with_uniform(UniformDeclaration::with_value(builtin::CAMERA_POSITION, camera.position))
        .with_uniform(UniformDeclaration::with_value(builtin::CAMERA_ROTATION, camera.rotation))
        .with_uniform(UniformDeclaration::with_value("uInputDataHeight", hole.input_data_height))
        .with_uniform(UniformDeclaration::with_value("uRelativisticPaths", scene.relativistic_paths))
        .with_uniform(UniformDeclaration::with_value("uBaseTemperature", hole.base_temperature))
        .with_uniform(UniformDeclaration::with_value("uEmissionCoefficient", hole.emission_coefficient))
        .with_uniform(UniformDeclaration::with_value("uAbsorptionCoefficient", hole.absorption_coefficient))
        .with_uniform(UniformDeclaration::with_value("uMaxSteps", scene.max_steps))
        .with_uniform(UniformDeclaration::with_value("uMaxStepSize", scene.max_step_size))
        .with_uniform(UniformDeclaration::with_value("uMinStepSize", scene.min_step_size))
        .with_uniform(UniformDeclaration::with_value("uMaxDistance", scene.max_distance))
        .with_uniform(UniformDeclaration::with_value("uLogFactor", config.rendering.log_factor))
        .with_uniform(UniformDeclaration::with_value("uSchwarzschildRadius", rs))
        .with_uniform(UniformDeclaration::with_value("uUseInputTexture", hole.use_input_texture))
        .with_uniform(UniformDeclaration::with_value("uMass", rs / 2.0))
        .with_uniform(UniformDeclaration::with_value("uDiskHeight", hole.disk_height))
        .with_uniform(UniformDeclaration::with_value("uSpeedScale", scene.speed_scale))
        .with_uniform(UniformDeclaration::with_value("uPhotonRingRadius", rs * 1.5))
        .with_uniform(UniformDeclaration::with_value("uInnerRadius", inner_radius + scene.eps))
        .with_uniform(UniformDeclaration::with_value("uOuterRadius", inner_radius + 15.0))
        .with_uniform(UniformDeclaration::with_value("uBrightnessScale", scene.brightness_scale))
        .with_uniform(UniformDeclaration::with_value("uObserverFrequency", scene.observer_frequency))
        .with_uniform(UniformDeclaration::builtin(builtin::TIME))
}
