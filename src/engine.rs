//! Engine Core Module
//!
//! [`Engine`] owns everything a run needs: the pass graph, the per-pass GPU
//! resources, the optional time texture cache, the renderer and the frame
//! recorder. It is generic over the [`RenderDevice`] it draws with, so the
//! same engine drives the headless wgpu backend and test devices.
//!
//! # Lifecycle
//!
//! 1. [`Engine::new`] builds the graph, allocates resources and warms the
//!    time textures. Any failure releases what was allocated so far.
//! 2. [`Engine::run`] drives the animator until the run finishes, is
//!    cancelled or a tick fails.
//! 3. [`Engine::take_export`] hands out the captured frames.
//!
//! ```rust,ignore
//! let config = HorizonConfig::from_json_file("configs/disk.json")?;
//! let device = WgpuContext::new_blocking(&config.render_settings())?;
//! let loader = FileSourceLoader::new("public");
//! let datasets = JsonDatasetReader::new(&loader);
//!
//! let mut engine = Engine::new(config, device, &loader, Some(&datasets))?;
//! engine.run(ThreadScheduler::new())?;
//! if let Some(export) = engine.take_export() {
//!     DirectoryExporter::new("out").export(&export)?;
//! }
//! ```

use crate::animation::{
    Animator, CancelToken, RunSummary, SimulationClock, TickHandler, TickInfo, TickScheduler,
};
use crate::assets::{DatasetReader, SourceLoader};
use crate::capture::{Export, FrameRecorder};
use crate::config::{HorizonConfig, default_black_hole_pass};
use crate::errors::{HorizonError, Result};
use crate::renderer::device::RenderDevice;
use crate::renderer::graph::{PassGraph, build_graph};
use crate::renderer::pipeline::ShaderGenerator;
use crate::renderer::resource_manager::ResourceManager;
use crate::renderer::time_textures::TimeTextureCache;
use crate::renderer::{Renderer, TickReport};

pub struct Engine<D: RenderDevice> {
    config: HorizonConfig,
    device: D,
    graph: PassGraph,
    resources: ResourceManager,
    renderer: Renderer,
    time_textures: Option<TimeTextureCache>,
    recorder: Option<FrameRecorder>,
    export: Option<Export>,
    last_report: Option<TickReport>,
}

impl<D: RenderDevice> Engine<D> {
    /// Prepares a run.
    ///
    /// With no declared passes the stock radiative-transfer pass is used.
    /// When the config enables the input texture, `datasets` must be provided;
    /// the dataset at `inputDataPath` is split into time textures and warmed
    /// up before this returns.
    ///
    /// # Errors
    ///
    /// Configuration, source fetch, shader compile, dataset and device errors.
    /// Nothing stays allocated on the device when this fails.
    pub fn new(
        config: HorizonConfig,
        mut device: D,
        loader: &dyn SourceLoader,
        datasets: Option<&dyn DatasetReader>,
    ) -> Result<Self> {
        config.validate()?;

        let graph = if config.passes.is_empty() {
            log::info!("No passes declared, using the default black hole pass");
            build_graph(&[default_black_hole_pass(&config)])?
        } else {
            build_graph(&config.passes)?
        };

        let (width, height) = {
            let r = config.rendering.resolution;
            (r.width, r.height)
        };
        let vertex = ShaderGenerator::fullscreen_vertex()?;
        let mut resources = ResourceManager::allocate_graph(&mut device, &graph, loader, &vertex, width, height)?;

        let time_textures = match Self::load_time_textures(&config, &mut device, datasets) {
            Ok(cache) => cache,
            Err(e) => {
                resources.release(&mut device);
                return Err(e);
            }
        };

        let use_input_texture = config.scene.black_hole.use_input_texture;
        let renderer = Renderer::new(width, height)
            .with_camera(config.camera_animation())
            .with_input_texture(use_input_texture)
            .with_debug(config.debug);

        let recorder = config.rendering.output.save.then(|| {
            let encoding = config.capture_encoding();
            if config.rendering.should_animate {
                FrameRecorder::sequence(encoding)
            } else {
                FrameRecorder::still(encoding)
            }
        });

        log::info!(
            "Engine ready: {} pass(es), {width}x{height}, capture {}",
            graph.len(),
            if recorder.is_some() { "on" } else { "off" }
        );

        Ok(Self {
            config,
            device,
            graph,
            resources,
            renderer,
            time_textures,
            recorder,
            export: None,
            last_report: None,
        })
    }

    fn load_time_textures(
        config: &HorizonConfig,
        device: &mut D,
        datasets: Option<&dyn DatasetReader>,
    ) -> Result<Option<TimeTextureCache>> {
        let hole = &config.scene.black_hole;
        if !hole.use_input_texture {
            return Ok(None);
        }
        let reader = datasets.ok_or_else(|| {
            HorizonError::config("useInputTexture is set but no dataset reader was provided")
        })?;

        let dataset = reader.read_dataset(&hole.input_data_path)?;
        let mut cache = TimeTextureCache::from_dataset(
            device,
            &dataset,
            &hole.input_field_key,
            &hole.input_time_key,
            hole.density_scale,
        )?;
        if let Err(e) = cache.warm_up(device) {
            cache.release(device);
            return Err(e);
        }
        Ok(Some(cache))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn config(&self) -> &HorizonConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    #[inline]
    #[must_use]
    pub fn graph(&self) -> &PassGraph {
        &self.graph
    }

    #[inline]
    #[must_use]
    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    #[inline]
    #[must_use]
    pub fn time_textures(&self) -> Option<&TimeTextureCache> {
        self.time_textures.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn recorder(&self) -> Option<&FrameRecorder> {
        self.recorder.as_ref()
    }

    /// Report of the most recent successful tick.
    #[inline]
    #[must_use]
    pub fn last_report(&self) -> Option<&TickReport> {
        self.last_report.as_ref()
    }

    // ========================================================================
    // Driving
    // ========================================================================

    /// Renders one tick without capturing.
    pub fn render_tick(&mut self, tick: TickInfo) -> Result<TickReport> {
        let report = self.renderer.render_tick(
            &mut self.device,
            &mut self.graph,
            &self.resources,
            self.time_textures.as_ref(),
            tick,
        )?;
        self.last_report = Some(report.clone());
        Ok(report)
    }

    /// Captures the current display into the recorder.
    ///
    /// # Errors
    ///
    /// [`HorizonError::Configuration`] when capture is disabled, otherwise
    /// whatever [`FrameRecorder::capture_frame`] reports.
    pub fn capture_frame(&mut self) -> Result<()> {
        let recorder = self
            .recorder
            .as_mut()
            .ok_or_else(|| HorizonError::config("frame capture is disabled (output.save is false)"))?;
        recorder.capture_frame(&mut self.device)
    }

    /// A fresh animator configured from this engine's settings.
    #[must_use]
    pub fn animator<S: TickScheduler>(&self, scheduler: S) -> Animator<S> {
        let clock = SimulationClock::new(self.config.scene.initial_time, self.config.step_ms());
        Animator::new(clock, self.config.tick_policy(), self.config.stop_condition(), scheduler)
    }

    /// Runs to completion.
    pub fn run<S: TickScheduler>(&mut self, scheduler: S) -> Result<RunSummary> {
        self.run_with_cancel(scheduler, CancelToken::new())
    }

    /// Runs until finished or until `cancel` is triggered between ticks.
    pub fn run_with_cancel<S: TickScheduler>(&mut self, scheduler: S, cancel: CancelToken) -> Result<RunSummary> {
        let mut animator = self.animator(scheduler).with_cancel_token(cancel);
        animator.run(self)
    }

    /// The frames of the finished run.
    ///
    /// After an aborted or cancelled run the frames captured so far are
    /// exported instead.
    pub fn take_export(&mut self) -> Option<Export> {
        self.export
            .take()
            .or_else(|| self.recorder.as_mut().and_then(FrameRecorder::finish))
    }
}

impl<D: RenderDevice> TickHandler for Engine<D> {
    fn on_tick(&mut self, tick: TickInfo) -> Result<()> {
        self.render_tick(tick)?;
        if self.recorder.is_some() {
            self.capture_frame()?;
        }
        Ok(())
    }

    fn on_finished(&mut self, clock: &SimulationClock) -> Result<()> {
        if let Some(recorder) = self.recorder.as_mut() {
            self.export = recorder.finish();
            if let Some(export) = &self.export {
                log::info!("Recorded {} frame(s) over {} tick(s)", export.len(), clock.ticks());
            }
        }
        Ok(())
    }
}

impl<D: RenderDevice> Drop for Engine<D> {
    fn drop(&mut self) {
        self.resources.release(&mut self.device);
        if let Some(cache) = self.time_textures.as_mut() {
            cache.release(&mut self.device);
        }
    }
}
