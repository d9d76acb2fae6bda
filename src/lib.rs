#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Horizon renders a black-hole visualisation by compositing several
//! full-screen shader passes into a final image, optionally over a
//! time-varying simulation fed by scientific data.
//!
//! The crate is organised the way a frame flows through it:
//!
//! - [`config`]: immutable pipeline configuration
//! - [`assets`]: shader source and dataset loading boundaries
//! - [`resources`]: uniform schemas and texture bindings
//! - [`renderer`]: pass graph, GPU resources, time textures, tick execution
//! - [`animation`]: simulation clock, tick scheduling, camera interpolation
//! - [`capture`]: frame read-back and export
//! - [`engine`]: the top-level coordinator tying everything together

pub mod animation;
pub mod assets;
pub mod capture;
pub mod config;
pub mod engine;
pub mod errors;
pub mod renderer;
pub mod resources;

pub use animation::{Animator, AnimatorState, CancelToken, SimulationClock, TickPolicy};
pub use assets::{Dataset, DatasetReader, FileSourceLoader, JsonDatasetReader, MemorySourceLoader, SourceLoader};
pub use capture::{Export, FrameRecorder, ImageEncoding, NamedFrame};
pub use config::HorizonConfig;
pub use engine::Engine;
pub use errors::{HorizonError, Result};
pub use renderer::core::WgpuContext;
pub use renderer::device::RenderDevice;
pub use renderer::graph::{build_graph, Pass, PassDeclaration, PassGraph, PassId};
pub use renderer::{Renderer, TickReport};
pub use resources::{UniformDeclaration, UniformKind, UniformSchema, UniformValue};
