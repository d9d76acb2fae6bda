//! Rendering
//!
//! - [`device`]: the [`RenderDevice`] seam and its resource handles
//! - [`core`]: the headless wgpu backend
//! - [`graph`]: pass declarations and the pass graph
//! - [`pipeline`]: WGSL template generation and validation
//! - [`resource_manager`]: per-pass targets and programs
//! - [`time_textures`]: per-sample data textures
//! - [`Renderer`]: executes one tick of the graph

pub mod core;
pub mod device;
pub mod graph;
pub mod pipeline;
pub mod resource_manager;
pub mod settings;
pub mod time_textures;

use std::time::Instant;

use glam::Vec2;

use crate::animation::{CameraAnimation, CameraState, TickInfo};
use crate::errors::{HorizonError, Result};
use crate::resources::{TextureBinding, UniformSchema};

use self::device::{DrawCommand, RenderDevice};
use self::graph::{PassGraph, PassId};
use self::resource_manager::ResourceManager;
use self::time_textures::TimeTextureCache;

/// One draw of a tick, as submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSubmission {
    pub pass: PassId,
    pub name: String,
    pub sequence: u64,
    pub is_combine: bool,
}

/// What a tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub time_ms: f64,
    /// Draws in submission order.
    pub submissions: Vec<PassSubmission>,
    /// Time sample bound to `uInputTexture` this tick, if one was.
    pub input_sample: Option<usize>,
    pub camera: Option<CameraState>,
}

impl TickReport {
    #[must_use]
    pub fn combine(&self) -> Option<&PassSubmission> {
        self.submissions.iter().find(|s| s.is_combine)
    }

    /// `true` when every input pass was submitted before the combine pass.
    #[must_use]
    pub fn inputs_precede_combine(&self) -> bool {
        let Some(combine) = self.combine() else {
            return false;
        };
        self.submissions
            .iter()
            .filter(|s| !s.is_combine)
            .all(|s| s.sequence < combine.sequence)
    }
}

/// Executes ticks of a [`PassGraph`].
///
/// Builtin uniforms are written into a staged copy of every pass schema. The
/// copies replace the graph's schemas only after the device accepted the
/// tick's submission, so a failed tick leaves the graph as it was.
#[derive(Debug, Clone)]
pub struct Renderer {
    resolution: Vec2,
    camera: Option<CameraAnimation>,
    use_input_texture: bool,
    debug: bool,
    next_sequence: u64,
}

impl Renderer {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            resolution: Vec2::new(width as f32, height as f32),
            camera: None,
            use_input_texture: true,
            debug: false,
            next_sequence: 0,
        }
    }

    #[must_use]
    pub fn with_camera(mut self, camera: Option<CameraAnimation>) -> Self {
        self.camera = camera;
        self
    }

    /// Whether `uInputTexture` is fed from the time texture cache.
    #[must_use]
    pub fn with_input_texture(mut self, enabled: bool) -> Self {
        self.use_input_texture = enabled;
        self
    }

    /// Enables per-pass and per-frame timing logs.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[inline]
    #[must_use]
    pub fn resolution(&self) -> Vec2 {
        self.resolution
    }

    /// Renders every pass for `tick` as a single submission.
    ///
    /// Input passes draw into their own targets in declaration order, then the
    /// combine pass samples all of them and draws to the display. The time
    /// sample for `tick.index` is bound when the cache has one; past the end of
    /// the cache the previously bound sample stays in place.
    pub fn render_tick<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        graph: &mut PassGraph,
        resources: &ResourceManager,
        time_textures: Option<&TimeTextureCache>,
        tick: TickInfo,
    ) -> Result<TickReport> {
        let started = Instant::now();
        let time_seconds = tick.time_seconds() as f32;
        let camera = self.camera.map(|c| c.sample(tick.time_ms));

        let input_sample = if self.use_input_texture {
            time_textures.and_then(|cache| {
                usize::try_from(tick.index)
                    .ok()
                    .and_then(|i| cache.get(i).map(|id| (i, id)))
            })
        } else {
            None
        };

        let mut staged: Vec<UniformSchema> = graph.passes().iter().map(|p| p.uniforms.clone()).collect();

        for schema in &mut staged {
            let builtins = schema.builtins();
            if let Some(slot) = builtins.time {
                schema.set(slot, time_seconds)?;
            }
            if let Some(slot) = builtins.resolution {
                schema.set(slot, self.resolution)?;
            }
            if let (Some(slot), Some((_, texture))) = (builtins.input_texture, input_sample) {
                schema.set(slot, TextureBinding::Data(texture))?;
            }
            if let Some(state) = camera {
                if let Some(slot) = builtins.camera_position {
                    schema.set(slot, state.position)?;
                }
                if let Some(slot) = builtins.camera_rotation {
                    schema.set(slot, state.rotation)?;
                }
            }
        }

        let combine = graph.combine_id();
        for &(input, slot) in graph.combine_inputs() {
            let target = resources.require(input)?.target.ok_or_else(|| {
                HorizonError::Device(format!("input pass #{} has no render target", input.index()))
            })?;
            staged[combine.index()].set(slot, TextureBinding::RenderTarget(target))?;
        }

        let submissions = {
            let mut draws = Vec::with_capacity(graph.len());
            for (id, pass) in graph.ids().zip(graph.passes()) {
                let pass_resources = resources.require(id)?;
                if self.debug {
                    log::info!("Rendering pass: {}", pass.name);
                }
                draws.push(DrawCommand {
                    pass_name: &pass.name,
                    program: pass_resources.program,
                    target: pass_resources.draw_target(),
                    uniforms: &staged[id.index()],
                    sequence: self.next_sequence + draws.len() as u64,
                });
            }

            device.submit(&draws)?;

            graph
                .ids()
                .zip(graph.passes())
                .zip(&draws)
                .map(|((id, pass), draw)| PassSubmission {
                    pass: id,
                    name: pass.name.clone(),
                    sequence: draw.sequence,
                    is_combine: pass.is_combine(),
                })
                .collect::<Vec<_>>()
        };

        self.next_sequence += submissions.len() as u64;
        for (pass, schema) in graph.passes_mut().iter_mut().zip(staged) {
            pass.uniforms = schema;
        }

        if self.debug {
            log::info!(
                "Frame took {} seconds to render",
                started.elapsed().as_secs_f64()
            );
        } else {
            log::debug!("Tick {} rendered at {} ms", tick.index, tick.time_ms);
        }

        Ok(TickReport {
            tick: tick.index,
            time_ms: tick.time_ms,
            submissions,
            input_sample: input_sample.map(|(i, _)| i),
            camera,
        })
    }
}
