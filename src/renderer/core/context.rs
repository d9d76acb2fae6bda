//! wgpu Context
//!
//! The [`WgpuContext`] is the headless wgpu implementation of
//! [`RenderDevice`]. It owns the device and queue, an off-screen display
//! texture standing in for the presentation surface, and slotmap arenas for
//! pass targets, programs and data textures.
//!
//! Every program shares one bind group layout shape (see
//! [`shader_gen`](crate::renderer::pipeline::shader_gen)): uniform buffer,
//! linear sampler, then one texture per texture slot. Bind groups are cached
//! per `(program, bound textures)` and purged when any member is released.

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::errors::{HorizonError, Result};
use crate::renderer::device::{
    DrawCommand, DrawTarget, ProgramDescriptor, ProgramId, RenderDevice, RenderTargetId,
    Residency, TargetKind, TextureId,
};
use crate::renderer::pipeline::shader_gen::{SAMPLER_BINDING, UNIFORM_BINDING};
use crate::renderer::pipeline::{FRAGMENT_ENTRY, ShaderGenerator, ShaderManager, VERTEX_ENTRY};
use crate::renderer::settings::{DISPLAY_FORMAT, PASS_TARGET_FORMAT, RenderSettings};
use crate::resources::{DataTextureDescriptor, TextureBinding};

/// Vertices of the two full-screen triangles generated in the vertex stage.
const FULLSCREEN_VERTEX_COUNT: u32 = 6;

struct GpuRenderTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct GpuProgram {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_size: u64,
    texture_slots: usize,
    target: TargetKind,
}

struct GpuDataTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BindGroupKey {
    program: ProgramId,
    textures: SmallVec<[Option<TextureBinding>; 4]>,
}

/// Headless wgpu render device.
pub struct WgpuContext {
    /// The wgpu device for GPU operations
    pub device: wgpu::Device,
    /// The command queue for submitting work
    pub queue: wgpu::Queue,

    width: u32,
    height: u32,
    preserve_display: bool,
    clear_color: wgpu::Color,
    /// `R32Float` when the adapter can filter it, `R16Float` otherwise
    data_format: wgpu::TextureFormat,

    display: wgpu::Texture,
    display_view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    /// Bound to texture slots that have no value yet
    placeholder_view: wgpu::TextureView,

    shader_manager: ShaderManager,
    render_targets: SlotMap<RenderTargetId, GpuRenderTarget>,
    programs: SlotMap<ProgramId, GpuProgram>,
    textures: SlotMap<TextureId, GpuDataTexture>,
    bind_groups: FxHashMap<BindGroupKey, wgpu::BindGroup>,
}

impl WgpuContext {
    pub async fn new(settings: &RenderSettings) -> Result<Self> {
        if settings.width == 0 || settings.height == 0 {
            return Err(HorizonError::config(format!(
                "output resolution must be non-zero, got {}x{}",
                settings.width, settings.height
            )));
        }

        let instance = wgpu::Instance::default();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: settings.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| HorizonError::AdapterRequestFailed(e.to_string()))?;

        let float32_filterable = adapter
            .features()
            .contains(wgpu::Features::FLOAT32_FILTERABLE);
        let mut required_features = settings.required_features;
        if float32_filterable {
            required_features |= wgpu::Features::FLOAT32_FILTERABLE;
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Horizon Device"),
                required_features,
                required_limits: settings.required_limits.clone(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        let data_format = if float32_filterable {
            wgpu::TextureFormat::R32Float
        } else {
            log::info!("32-bit float filtering unavailable, data textures use R16Float");
            wgpu::TextureFormat::R16Float
        };

        let mut display_usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
        if settings.preserve_display {
            display_usage |= wgpu::TextureUsages::COPY_SRC;
        }
        let display = Self::create_texture(
            &device,
            "Display",
            (settings.width, settings.height),
            DISPLAY_FORMAT,
            display_usage,
        );
        let display_view = display.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Linear Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let placeholder_view = Self::create_texture(
            &device,
            "Placeholder",
            (1, 1),
            wgpu::TextureFormat::Rgba8Unorm,
            wgpu::TextureUsages::TEXTURE_BINDING,
        )
        .create_view(&wgpu::TextureViewDescriptor::default());

        log::info!(
            "Created headless wgpu context {}x{} (preserve display: {})",
            settings.width,
            settings.height,
            settings.preserve_display
        );

        Ok(Self {
            device,
            queue,
            width: settings.width,
            height: settings.height,
            preserve_display: settings.preserve_display,
            clear_color: settings.clear_color,
            data_format,
            display,
            display_view,
            sampler,
            placeholder_view,
            shader_manager: ShaderManager::new(),
            render_targets: SlotMap::with_key(),
            programs: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            bind_groups: FxHashMap::default(),
        })
    }

    /// Blocking constructor for callers outside an async context.
    pub fn new_blocking(settings: &RenderSettings) -> Result<Self> {
        pollster::block_on(Self::new(settings))
    }

    fn create_texture(
        device: &wgpu::Device,
        label: &str,
        (width, height): (u32, u32),
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        })
    }

    /// Format used for uploaded data textures.
    #[inline]
    #[must_use]
    pub fn data_format(&self) -> wgpu::TextureFormat {
        self.data_format
    }

    /// Returns the number of distinct shader modules compiled so far.
    #[must_use]
    pub fn shader_module_count(&self) -> usize {
        self.shader_manager.module_count()
    }

    fn target_view(&self, target: DrawTarget) -> Result<&wgpu::TextureView> {
        match target {
            DrawTarget::Display => Ok(&self.display_view),
            DrawTarget::Offscreen(id) => self
                .render_targets
                .get(id)
                .map(|t| &t.view)
                .ok_or_else(|| HorizonError::Device("render target was released".to_string())),
        }
    }

    fn binding_view(&self, binding: Option<TextureBinding>) -> Result<&wgpu::TextureView> {
        match binding {
            None => Ok(&self.placeholder_view),
            Some(TextureBinding::Data(id)) => self
                .textures
                .get(id)
                .map(|t| &t.view)
                .ok_or_else(|| HorizonError::Device("data texture was released".to_string())),
            Some(TextureBinding::RenderTarget(id)) => self.target_view(DrawTarget::Offscreen(id)),
        }
    }

    fn create_bind_group(&self, key: &BindGroupKey) -> Result<wgpu::BindGroup> {
        let program = self
            .programs
            .get(key.program)
            .ok_or_else(|| HorizonError::Device("program was released".to_string()))?;

        let mut views = Vec::with_capacity(key.textures.len());
        for binding in &key.textures {
            views.push(self.binding_view(*binding)?);
        }

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: UNIFORM_BINDING,
                resource: program.uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: SAMPLER_BINDING,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            },
        ];
        for (index, view) in views.into_iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: ShaderGenerator::texture_binding(index),
                resource: wgpu::BindingResource::TextureView(view),
            });
        }

        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Pass BindGroup"),
            layout: &program.layout,
            entries: &entries,
        }))
    }

    /// Checks a draw against the program it references and returns its bind group key.
    fn validate_draw(&self, draw: &DrawCommand<'_>) -> Result<BindGroupKey> {
        let program = self.programs.get(draw.program).ok_or_else(|| {
            HorizonError::Device(format!("pass '{}': program was released", draw.pass_name))
        })?;

        if program.target != draw.target.kind() {
            return Err(HorizonError::Device(format!(
                "pass '{}': program compiled for {:?} cannot draw to {:?}",
                draw.pass_name,
                program.target,
                draw.target.kind()
            )));
        }
        if draw.uniforms.packed_size() as u64 != program.uniform_size
            || draw.uniforms.texture_slots().count() != program.texture_slots
        {
            return Err(HorizonError::Device(format!(
                "pass '{}': uniforms do not match the compiled program",
                draw.pass_name
            )));
        }

        self.target_view(draw.target)?;
        let textures: SmallVec<[Option<TextureBinding>; 4]> = draw.uniforms.texture_bindings().collect();
        for binding in &textures {
            self.binding_view(*binding)?;
        }

        Ok(BindGroupKey {
            program: draw.program,
            textures,
        })
    }

    fn purge_bind_groups(&mut self, mut keep: impl FnMut(&BindGroupKey) -> bool) {
        self.bind_groups.retain(|key, _| keep(key));
    }
}

impl RenderDevice for WgpuContext {
    fn output_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn preserves_display(&self) -> bool {
        self.preserve_display
    }

    fn create_render_target(&mut self, label: &str, width: u32, height: u32) -> Result<RenderTargetId> {
        if width == 0 || height == 0 {
            return Err(HorizonError::config(format!(
                "render target '{label}' must be non-empty, got {width}x{height}"
            )));
        }
        let texture = Self::create_texture(
            &self.device,
            label,
            (width, height),
            PASS_TARGET_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(self.render_targets.insert(GpuRenderTarget {
            _texture: texture,
            view,
        }))
    }

    fn release_render_target(&mut self, id: RenderTargetId) {
        if self.render_targets.remove(id).is_some() {
            let binding = Some(TextureBinding::RenderTarget(id));
            self.purge_bind_groups(|key| !key.textures.contains(&binding));
        }
    }

    fn compile_program(&mut self, desc: &ProgramDescriptor<'_>) -> Result<ProgramId> {
        let prelude = ShaderGenerator::prelude(desc.pass_name, desc.schema)?;
        let source = ShaderGenerator::assemble(&prelude, desc.vertex_source, desc.fragment_source);

        // naga checks each stage on its own; interface mismatches between
        // stages only surface as validation errors on pipeline creation.
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let (module, source_hash) = self
            .shader_manager
            .get_or_compile(&self.device, desc.pass_name, source)?;

        let texture_slots = desc.schema.texture_slots().count();
        let mut entries = vec![
            wgpu::BindGroupLayoutEntry {
                binding: UNIFORM_BINDING,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: SAMPLER_BINDING,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ];
        for index in 0..texture_slots {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: ShaderGenerator::texture_binding(index),
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }

        let layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{} Layout", desc.pass_name)),
                entries: &entries,
            });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{} Pipeline Layout", desc.pass_name)),
                bind_group_layouts: &[Some(&layout)],
                immediate_size: 0,
            });

        let format = match desc.target {
            TargetKind::Offscreen => PASS_TARGET_FORMAT,
            TargetKind::Display => DISPLAY_FORMAT,
        };

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&format!("{} Pipeline", desc.pass_name)),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some(VERTEX_ENTRY),
                    buffers: &[],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some(FRAGMENT_ENTRY),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        if let Some(error) = pollster::block_on(scope.pop()) {
            self.shader_manager.evict(source_hash);
            return Err(HorizonError::ShaderCompile {
                pass: desc.pass_name.to_string(),
                diagnostic: error.to_string(),
            });
        }

        let uniform_size = desc.schema.packed_size() as u64;
        let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{} Uniforms", desc.pass_name)),
            size: uniform_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        log::debug!(
            "Compiled program for pass '{}' ({} texture slot(s))",
            desc.pass_name,
            texture_slots
        );

        Ok(self.programs.insert(GpuProgram {
            pipeline,
            layout,
            uniform_buffer,
            uniform_size,
            texture_slots,
            target: desc.target,
        }))
    }

    fn release_program(&mut self, id: ProgramId) {
        if self.programs.remove(id).is_some() {
            self.purge_bind_groups(|key| key.program != id);
        }
    }

    fn create_data_texture(&mut self, desc: &DataTextureDescriptor, texels: &[f32]) -> Result<TextureId> {
        if texels.len() != desc.texel_count() {
            return Err(HorizonError::data_shape(format!(
                "texture '{}' expects {} texels, got {}",
                desc.label,
                desc.texel_count(),
                texels.len()
            )));
        }

        let texture = Self::create_texture(
            &self.device,
            &desc.label,
            (desc.width, desc.height),
            self.data_format,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );

        let (bytes, texel_size): (Vec<u8>, u32) = match self.data_format {
            wgpu::TextureFormat::R32Float => (bytemuck::cast_slice(texels).to_vec(), 4),
            _ => {
                let halves: Vec<u16> = texels
                    .iter()
                    .map(|&v| half::f16::from_f32(v).to_bits())
                    .collect();
                (bytemuck::cast_slice(&halves).to_vec(), 2)
            }
        };

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(desc.width * texel_size),
                rows_per_image: Some(desc.height),
            },
            wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(self.textures.insert(GpuDataTexture {
            _texture: texture,
            view,
        }))
    }

    fn release_texture(&mut self, id: TextureId) {
        if self.textures.remove(id).is_some() {
            let binding = Some(TextureBinding::Data(id));
            self.purge_bind_groups(|key| !key.textures.contains(&binding));
        }
    }

    fn prime_texture(&mut self, id: TextureId) -> Result<Residency> {
        if !self.textures.contains_key(id) {
            return Err(HorizonError::Device("cannot prime a released texture".to_string()));
        }
        // An empty submission flushes pending queue writes, which makes the
        // upload resident.
        self.queue.submit(std::iter::empty());
        Ok(Residency::Primed)
    }

    fn submit(&mut self, draws: &[DrawCommand<'_>]) -> Result<()> {
        if draws.is_empty() {
            return Ok(());
        }

        let mut keys = Vec::with_capacity(draws.len());
        for draw in draws {
            keys.push(self.validate_draw(draw)?);
        }
        for key in &keys {
            if !self.bind_groups.contains_key(key) {
                let bind_group = self.create_bind_group(key)?;
                self.bind_groups.insert(key.clone(), bind_group);
            }
        }

        // Queue writes land before the command buffer below executes. A
        // program drawn twice in one batch sees the last write.
        for draw in draws {
            let program = &self.programs[draw.program];
            self.queue
                .write_buffer(&program.uniform_buffer, 0, &draw.uniforms.pack_values());
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Horizon Tick Encoder"),
            });

        for (draw, key) in draws.iter().zip(&keys) {
            let program = &self.programs[draw.program];
            let view = self.target_view(draw.target)?;
            let bind_group = self
                .bind_groups
                .get(key)
                .ok_or_else(|| HorizonError::Device("bind group cache miss".to_string()))?;

            encoder.push_debug_group(draw.pass_name);
            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some(draw.pass_name),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(self.clear_color),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    ..Default::default()
                });
                pass.set_pipeline(&program.pipeline);
                pass.set_bind_group(0, bind_group, &[]);
                pass.draw(0..FULLSCREEN_VERTEX_COUNT, 0..1);
            }
            encoder.pop_debug_group();
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn synchronize(&mut self) {
        if let Err(e) = self.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        }) {
            log::warn!("Device poll failed: {e}");
        }
    }

    fn read_display(&mut self) -> Result<image::RgbaImage> {
        if !self.preserve_display {
            return Err(HorizonError::Capture(
                "display was created without color-buffer preservation".to_string(),
            ));
        }

        let unpadded_bytes_per_row = self.width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Display Readback"),
            size: u64::from(padded_bytes_per_row) * u64::from(self.height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Display Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.display,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            sender.send(result).ok();
        });
        self.synchronize();

        match receiver.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(HorizonError::Capture(format!("buffer mapping failed: {e}"))),
            Err(_) => return Err(HorizonError::Capture("read-back channel closed".to_string())),
        }

        let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * self.height) as usize);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks_exact(padded_bytes_per_row as usize) {
                pixels.extend_from_slice(&row[..unpadded_bytes_per_row as usize]);
            }
        }
        buffer.unmap();

        image::RgbaImage::from_raw(self.width, self.height, pixels)
            .ok_or_else(|| HorizonError::Capture("read-back size mismatch".to_string()))
    }
}
