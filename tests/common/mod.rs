//! Shared fixtures for integration tests.
//!
//! [`MockDevice`] is an in-memory [`RenderDevice`]. It records every
//! submission, validates programs with naga the way the wgpu backend does,
//! and synthesises display pixels from a hash of everything that flowed into
//! the final draw, so identical inputs read back identical images.

#![allow(dead_code)]

use horizon::errors::{HorizonError, Result};
use horizon::renderer::device::{
    DrawCommand, DrawTarget, ProgramDescriptor, ProgramId, RenderDevice, RenderTargetId, Residency,
    TargetKind, TextureId,
};
use horizon::renderer::pipeline::{ShaderGenerator, validate_wgsl};
use horizon::resources::{DataTextureDescriptor, TextureBinding, UniformSchema};
use horizon::{MemorySourceLoader, PassDeclaration, UniformDeclaration};
use image::{Rgba, RgbaImage};
use slotmap::SlotMap;
use xxhash_rust::xxh3::xxh3_64;

pub const EPSILON: f64 = 1e-9;

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A fragment stage that compiles against any generated interface.
pub const PLAIN_FRAGMENT: &str = r"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(in.uv, 0.0, 1.0);
}
";

/// A fragment stage that reads `uTime`; only valid for passes declaring it.
pub const TIME_FRAGMENT: &str = r"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(in.uv, fract(uniforms.uTime), 1.0);
}
";

pub fn shader_path(name: &str) -> String {
    format!("/shaders/{name}.wgsl")
}

/// A pass declaring `uTime` and `uResolution`.
pub fn timed_pass(name: &str) -> PassDeclaration {
    PassDeclaration::new(name, shader_path(name))
        .with_uniform(UniformDeclaration::builtin("uTime"))
        .with_uniform(UniformDeclaration::builtin("uResolution"))
}

/// Loader serving [`TIME_FRAGMENT`] for every pass in `names`.
pub fn loader_for(names: &[&str]) -> MemorySourceLoader {
    let mut loader = MemorySourceLoader::new();
    for name in names {
        loader.insert(shader_path(name), TIME_FRAGMENT);
    }
    loader
}

/// Loader serving a fragment that compiles against each declaration:
/// [`TIME_FRAGMENT`] when the pass declares `uTime`, else [`PLAIN_FRAGMENT`].
pub fn loader_for_passes(passes: &[PassDeclaration]) -> MemorySourceLoader {
    let mut loader = MemorySourceLoader::new();
    for pass in passes {
        let fragment = if pass.uniforms.iter().any(|u| u.name == "uTime") {
            TIME_FRAGMENT
        } else {
            PLAIN_FRAGMENT
        };
        loader.insert(pass.fragment_shader.clone(), fragment);
    }
    loader
}

#[derive(Debug, Clone)]
pub struct RecordedDraw {
    pub pass_name: String,
    pub program: ProgramId,
    pub target: DrawTarget,
    pub sequence: u64,
    pub uniforms: UniformSchema,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedProgram {
    pub target: TargetKind,
    pub texture_slots: usize,
}

struct MockTarget {
    label: String,
    content: u64,
}

struct MockTexture {
    side: u32,
    content: u64,
}

pub struct MockDevice {
    pub width: u32,
    pub height: u32,
    pub preserve_display: bool,
    pub prime_supported: bool,
    /// Run naga over every assembled program.
    pub validate_shaders: bool,
    /// Pass whose program fails to compile.
    pub fail_compile: Option<String>,
    /// Zero-based index of the data texture upload that fails.
    pub fail_upload_at: Option<usize>,
    /// Zero-based index of the submission that fails.
    pub fail_submit_at: Option<usize>,

    targets: SlotMap<RenderTargetId, MockTarget>,
    programs: SlotMap<ProgramId, RecordedProgram>,
    textures: SlotMap<TextureId, MockTexture>,
    display: u64,

    pub upload_attempts: usize,
    pub submit_attempts: usize,
    pub primed: Vec<TextureId>,
    pub submissions: Vec<Vec<RecordedDraw>>,
    pub syncs: usize,
    pub reads: usize,
}

impl MockDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            preserve_display: true,
            prime_supported: true,
            validate_shaders: true,
            fail_compile: None,
            fail_upload_at: None,
            fail_submit_at: None,
            targets: SlotMap::with_key(),
            programs: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            display: 0,
            upload_attempts: 0,
            submit_attempts: 0,
            primed: Vec::new(),
            submissions: Vec::new(),
            syncs: 0,
            reads: 0,
        }
    }

    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn is_idle(&self) -> bool {
        self.targets.is_empty() && self.programs.is_empty() && self.textures.is_empty()
    }

    pub fn program(&self, id: ProgramId) -> Option<RecordedProgram> {
        self.programs.get(id).copied()
    }

    pub fn target_label(&self, id: RenderTargetId) -> Option<&str> {
        self.targets.get(id).map(|t| t.label.as_str())
    }

    pub fn texture_side(&self, id: TextureId) -> Option<u32> {
        self.textures.get(id).map(|t| t.side)
    }

    /// Hash of the texels uploaded for `id`.
    pub fn texture_content(&self, id: TextureId) -> Option<u64> {
        self.textures.get(id).map(|t| t.content)
    }

    pub fn last_submission(&self) -> &[RecordedDraw] {
        self.submissions.last().map_or(&[], Vec::as_slice)
    }

    fn binding_content(&self, binding: Option<TextureBinding>) -> Result<u64> {
        match binding {
            None => Ok(0),
            Some(TextureBinding::Data(id)) => self
                .textures
                .get(id)
                .map(|t| t.content)
                .ok_or_else(|| HorizonError::Device("stale data texture".to_string())),
            Some(TextureBinding::RenderTarget(id)) => self
                .targets
                .get(id)
                .map(|t| t.content)
                .ok_or_else(|| HorizonError::Device("stale render target".to_string())),
        }
    }
}

impl RenderDevice for MockDevice {
    fn output_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn preserves_display(&self) -> bool {
        self.preserve_display
    }

    fn create_render_target(&mut self, label: &str, _width: u32, _height: u32) -> Result<RenderTargetId> {
        Ok(self.targets.insert(MockTarget {
            label: label.to_string(),
            content: 0,
        }))
    }

    fn release_render_target(&mut self, id: RenderTargetId) {
        self.targets.remove(id);
    }

    fn compile_program(&mut self, desc: &ProgramDescriptor<'_>) -> Result<ProgramId> {
        if self.fail_compile.as_deref() == Some(desc.pass_name) {
            return Err(HorizonError::ShaderCompile {
                pass: desc.pass_name.to_string(),
                diagnostic: "injected failure".to_string(),
            });
        }
        if self.validate_shaders {
            let prelude = ShaderGenerator::prelude(desc.pass_name, desc.schema)?;
            let source = ShaderGenerator::assemble(&prelude, desc.vertex_source, desc.fragment_source);
            validate_wgsl(desc.pass_name, &source)?;
        }
        Ok(self.programs.insert(RecordedProgram {
            target: desc.target,
            texture_slots: desc.schema.texture_slots().count(),
        }))
    }

    fn release_program(&mut self, id: ProgramId) {
        self.programs.remove(id);
    }

    fn create_data_texture(&mut self, desc: &DataTextureDescriptor, texels: &[f32]) -> Result<TextureId> {
        let attempt = self.upload_attempts;
        self.upload_attempts += 1;
        if self.fail_upload_at == Some(attempt) {
            return Err(HorizonError::Device(format!("injected upload failure at {attempt}")));
        }
        if texels.len() != desc.texel_count() {
            return Err(HorizonError::data_shape("texel count mismatch"));
        }
        Ok(self.textures.insert(MockTexture {
            side: desc.width,
            content: xxh3_64(bytemuck::cast_slice(texels)),
        }))
    }

    fn release_texture(&mut self, id: TextureId) {
        self.textures.remove(id);
    }

    fn prime_texture(&mut self, id: TextureId) -> Result<Residency> {
        if !self.textures.contains_key(id) {
            return Err(HorizonError::Device("priming a released texture".to_string()));
        }
        if !self.prime_supported {
            return Ok(Residency::Unsupported);
        }
        self.primed.push(id);
        Ok(Residency::Primed)
    }

    fn submit(&mut self, draws: &[DrawCommand<'_>]) -> Result<()> {
        let attempt = self.submit_attempts;
        self.submit_attempts += 1;
        if self.fail_submit_at == Some(attempt) {
            return Err(HorizonError::Device(format!("injected submit failure at {attempt}")));
        }

        for draw in draws {
            let program = self
                .programs
                .get(draw.program)
                .ok_or_else(|| HorizonError::Device(format!("pass '{}': stale program", draw.pass_name)))?;
            if program.target != draw.target.kind() {
                return Err(HorizonError::Device(format!("pass '{}': target mismatch", draw.pass_name)));
            }
            if let DrawTarget::Offscreen(id) = draw.target
                && !self.targets.contains_key(id)
            {
                return Err(HorizonError::Device(format!("pass '{}': stale target", draw.pass_name)));
            }
            for binding in draw.uniforms.texture_bindings() {
                self.binding_content(binding)?;
            }
        }

        let mut recorded = Vec::with_capacity(draws.len());
        for draw in draws {
            let mut input = draw.uniforms.pack_values();
            for binding in draw.uniforms.texture_bindings() {
                input.extend_from_slice(&self.binding_content(binding)?.to_le_bytes());
            }
            let content = xxh3_64(&input);
            match draw.target {
                DrawTarget::Offscreen(id) => {
                    if let Some(target) = self.targets.get_mut(id) {
                        target.content = content;
                    }
                }
                DrawTarget::Display => self.display = content,
            }
            recorded.push(RecordedDraw {
                pass_name: draw.pass_name.to_string(),
                program: draw.program,
                target: draw.target,
                sequence: draw.sequence,
                uniforms: draw.uniforms.clone(),
            });
        }
        self.submissions.push(recorded);
        Ok(())
    }

    fn synchronize(&mut self) {
        self.syncs += 1;
    }

    fn read_display(&mut self) -> Result<RgbaImage> {
        self.reads += 1;
        let seed = self.display;
        Ok(RgbaImage::from_fn(self.width, self.height, |x, y| {
            let mut key = seed.to_le_bytes().to_vec();
            key.extend_from_slice(&x.to_le_bytes());
            key.extend_from_slice(&y.to_le_bytes());
            let [r, g, b, ..] = xxh3_64(&key).to_le_bytes();
            Rgba([r, g, b, 255])
        }))
    }
}
