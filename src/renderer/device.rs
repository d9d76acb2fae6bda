//! Render device abstraction
//!
//! The orchestration layers (graph allocation, time textures, tick execution,
//! capture) only talk to the GPU through [`RenderDevice`]. The wgpu backend
//! lives in [`crate::renderer::core`]; tests substitute an in-memory device.
//!
//! All handles are generational [`slotmap`] keys, so a handle that outlives
//! its release is detected instead of aliasing a newer allocation.

use image::RgbaImage;
use slotmap::new_key_type;

use crate::errors::Result;
use crate::resources::{DataTextureDescriptor, UniformSchema};

new_key_type! {
    /// An off-screen color target owned by one pass.
    pub struct RenderTargetId;
    /// A compiled and linked pass program.
    pub struct ProgramId;
    /// An uploaded data texture.
    pub struct TextureId;
}

/// Which surface a program renders into. Determines the output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Offscreen,
    Display,
}

/// Where a single draw writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawTarget {
    Offscreen(RenderTargetId),
    Display,
}

impl DrawTarget {
    #[must_use]
    pub fn kind(self) -> TargetKind {
        match self {
            Self::Offscreen(_) => TargetKind::Offscreen,
            Self::Display => TargetKind::Display,
        }
    }
}

/// Everything a backend needs to build a pass program.
///
/// The uniform interface is generated from `schema` by the backend and placed
/// ahead of both sources.
#[derive(Debug, Clone, Copy)]
pub struct ProgramDescriptor<'a> {
    pub pass_name: &'a str,
    pub vertex_source: &'a str,
    pub fragment_source: &'a str,
    pub schema: &'a UniformSchema,
    pub target: TargetKind,
}

/// One full-screen draw within a submission.
#[derive(Debug, Clone, Copy)]
pub struct DrawCommand<'a> {
    pub pass_name: &'a str,
    pub program: ProgramId,
    pub target: DrawTarget,
    pub uniforms: &'a UniformSchema,
    /// Monotonic submission order assigned by the renderer.
    pub sequence: u64,
}

/// Result of asking the device to make a texture resident ahead of use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Residency {
    Primed,
    /// The backend has no explicit priming path; callers should draw with the
    /// texture once instead.
    Unsupported,
}

pub trait RenderDevice {
    /// Size of the display surface in pixels.
    fn output_size(&self) -> (u32, u32);

    /// Whether the display contents survive presentation and can be read back.
    fn preserves_display(&self) -> bool;

    fn create_render_target(&mut self, label: &str, width: u32, height: u32) -> Result<RenderTargetId>;

    fn release_render_target(&mut self, id: RenderTargetId);

    /// Compiles and links a program. Failures are
    /// [`ShaderCompile`](crate::errors::HorizonError::ShaderCompile) errors naming the pass.
    fn compile_program(&mut self, desc: &ProgramDescriptor<'_>) -> Result<ProgramId>;

    fn release_program(&mut self, id: ProgramId);

    /// Uploads a single-channel float texture. `texels.len()` must equal
    /// `desc.texel_count()`.
    fn create_data_texture(&mut self, desc: &DataTextureDescriptor, texels: &[f32]) -> Result<TextureId>;

    fn release_texture(&mut self, id: TextureId);

    fn prime_texture(&mut self, id: TextureId) -> Result<Residency>;

    /// Executes `draws` in order as one unit of work.
    ///
    /// Every draw is validated before anything is recorded. On error nothing
    /// has been submitted.
    fn submit(&mut self, draws: &[DrawCommand<'_>]) -> Result<()>;

    /// Blocks until all submitted work has completed.
    fn synchronize(&mut self);

    /// Reads the display surface as tightly packed RGBA8.
    fn read_display(&mut self) -> Result<RgbaImage>;
}
