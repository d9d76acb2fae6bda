//! Time Texture Cache
//!
//! Splits a scalar field of `samples × side × side` values into one
//! single-channel float texture per time sample. Sample `i` is bound to
//! `uInputTexture` on tick `i`.

use crate::assets::Dataset;
use crate::errors::{HorizonError, Result};
use crate::renderer::device::{DrawCommand, RenderDevice, Residency, TextureId};
use crate::renderer::graph::{Pass, ProgramSource};
use crate::renderer::pipeline::ShaderGenerator;
use crate::renderer::resource_manager::AllocationScope;
use crate::resources::{DataTextureDescriptor, TextureBinding, UniformDeclaration, UniformSchema, builtin};

const PRIME_PASS_NAME: &str = "texture_prime";

/// Side length of each sample for a field of `total` values split into
/// `sample_count` samples.
///
/// # Errors
///
/// [`HorizonError::DataShape`] unless `total` divides evenly into
/// `sample_count` non-empty perfect squares.
pub fn sample_side(total: usize, sample_count: usize) -> Result<u32> {
    if sample_count == 0 {
        return Err(HorizonError::data_shape("dataset has no time samples"));
    }
    if total % sample_count != 0 {
        return Err(HorizonError::data_shape(format!(
            "field length {total} is not a multiple of the sample count {sample_count}"
        )));
    }
    let per_sample = total / sample_count;
    let side = per_sample.isqrt();
    if per_sample == 0 || side * side != per_sample {
        return Err(HorizonError::data_shape(format!(
            "{per_sample} values per sample do not form a square"
        )));
    }
    u32::try_from(side).map_err(|_| HorizonError::data_shape(format!("sample side {side} is too large")))
}

#[derive(Debug, Default)]
pub struct TimeTextureCache {
    textures: Vec<TextureId>,
    side: u32,
}

impl TimeTextureCache {
    /// Uploads one texture per time sample, multiplying each value by `scale`.
    ///
    /// The shape is validated before the first upload. If an upload fails,
    /// textures uploaded so far are released.
    pub fn build<D: RenderDevice + ?Sized>(
        device: &mut D,
        field: &[f64],
        sample_count: usize,
        scale: f32,
    ) -> Result<Self> {
        let side = sample_side(field.len(), sample_count)?;
        let per_sample = side as usize * side as usize;
        let scale = f64::from(scale);

        let mut textures = Vec::with_capacity(sample_count);
        for (index, sample) in field.chunks_exact(per_sample).enumerate() {
            let texels: Vec<f32> = sample.iter().map(|&v| (v * scale) as f32).collect();
            let desc = DataTextureDescriptor::square(format!("Time Sample {index}"), side);
            match device.create_data_texture(&desc, &texels) {
                Ok(id) => textures.push(id),
                Err(e) => {
                    for id in textures {
                        device.release_texture(id);
                    }
                    return Err(e);
                }
            }
        }

        log::info!("Uploaded {sample_count} time texture(s) of {side}x{side}");
        Ok(Self { textures, side })
    }

    /// Builds the cache from a dataset's `field_key`, with one sample per
    /// entry of `time_key`.
    pub fn from_dataset<D: RenderDevice + ?Sized>(
        device: &mut D,
        dataset: &Dataset,
        field_key: &str,
        time_key: &str,
        scale: f32,
    ) -> Result<Self> {
        let field = dataset.field(field_key)?;
        let sample_count = dataset.sample_count(time_key)?;
        Self::build(device, field, sample_count, scale)
    }

    /// Makes every texture resident before the first tick.
    ///
    /// Textures the device cannot prime directly are drawn once into a 1×1
    /// scratch target that is discarded afterwards. Ends with a device
    /// synchronization either way.
    pub fn warm_up<D: RenderDevice + ?Sized>(&self, device: &mut D) -> Result<()> {
        let mut pending = Vec::new();
        for &id in &self.textures {
            if device.prime_texture(id)? == Residency::Unsupported {
                pending.push(id);
            }
        }

        if !pending.is_empty() {
            log::warn!(
                "Texture priming unsupported, drawing {} texture(s) into a scratch target",
                pending.len()
            );
            Self::draw_and_discard(device, &pending)?;
        }

        device.synchronize();
        Ok(())
    }

    fn draw_and_discard<D: RenderDevice + ?Sized>(device: &mut D, textures: &[TextureId]) -> Result<()> {
        let fragment = ShaderGenerator::texture_prime_fragment()?;
        let vertex = ShaderGenerator::fullscreen_vertex()?;
        let schema = UniformSchema::from_declarations(
            PRIME_PASS_NAME,
            &[UniformDeclaration::builtin(builtin::INPUT_TEXTURE)],
        )?;
        let pass = Pass {
            name: PRIME_PASS_NAME.to_string(),
            program: ProgramSource::Inline(fragment.clone()),
            uniforms: schema.clone(),
            is_combine: false,
        };

        let mut bound = Vec::with_capacity(textures.len());
        for &id in textures {
            let mut uniforms = schema.clone();
            uniforms.set_by_name(builtin::INPUT_TEXTURE, TextureBinding::Data(id))?;
            bound.push(uniforms);
        }

        // Scratch resources are never committed; dropping the scope frees them.
        let mut scope = AllocationScope::new(device);
        let scratch = scope.allocate(&pass, &vertex, &fragment, 1, 1)?;
        let draws: Vec<DrawCommand<'_>> = bound
            .iter()
            .map(|uniforms| DrawCommand {
                pass_name: PRIME_PASS_NAME,
                program: scratch.program,
                target: scratch.draw_target(),
                uniforms,
                sequence: 0,
            })
            .collect();
        scope.device().submit(&draws)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<TextureId> {
        self.textures.get(index).copied()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Side length in texels of every sample.
    #[inline]
    #[must_use]
    pub fn side(&self) -> u32 {
        self.side
    }

    pub fn release<D: RenderDevice + ?Sized>(&mut self, device: &mut D) {
        for id in self.textures.drain(..) {
            device.release_texture(id);
        }
    }
}
