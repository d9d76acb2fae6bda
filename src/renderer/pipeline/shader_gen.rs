//! Shader Code Generator
//!
//! Renders the embedded templates into WGSL: the per-pass interface
//! (uniform struct, sampler and texture bindings), the shared full-screen
//! vertex stage, and the synthesized combine fragment.
//!
//! Binding layout, shared by every pass program:
//!
//! | Binding | Resource |
//! |---------|----------|
//! | 0 | `uniforms`: value slots, 16-byte stride |
//! | 1 | `linear_sampler` |
//! | 2.. | texture slots, in declaration order |

use minijinja::context;
use serde::Serialize;

use super::shader_manager::get_env;
use crate::errors::Result;
use crate::resources::UniformSchema;

/// Binding index of the uniform buffer.
pub const UNIFORM_BINDING: u32 = 0;
/// Binding index of the shared linear sampler.
pub const SAMPLER_BINDING: u32 = 1;
/// First binding index used by texture slots.
pub const FIRST_TEXTURE_BINDING: u32 = 2;

#[derive(Serialize)]
struct ValueEntry<'a> {
    name: &'a str,
    ty: &'static str,
}

#[derive(Serialize)]
struct TextureEntry<'a> {
    name: &'a str,
    binding: u32,
}

pub struct ShaderGenerator;

impl ShaderGenerator {
    /// Binding index of the `index`-th texture slot.
    #[inline]
    #[must_use]
    pub fn texture_binding(index: usize) -> u32 {
        FIRST_TEXTURE_BINDING + index as u32
    }

    /// Name of the combine pass sampler uniform fed by input pass `pass_name`.
    #[must_use]
    pub fn combine_texture_name(pass_name: &str) -> String {
        format!("t{pass_name}")
    }

    /// Generates the interface block declaring every uniform in `schema`.
    pub fn prelude(pass_name: &str, schema: &UniformSchema) -> Result<String> {
        let values: Vec<_> = schema
            .value_slots()
            .map(|s| ValueEntry {
                name: &s.name,
                ty: s.kind.wgsl_type(),
            })
            .collect();
        let textures: Vec<_> = schema
            .texture_slots()
            .enumerate()
            .map(|(i, s)| TextureEntry {
                name: &s.name,
                binding: Self::texture_binding(i),
            })
            .collect();

        let source = get_env().get_template("prelude")?.render(context! {
            pass_name => pass_name,
            values => values,
            textures => textures,
        })?;
        Ok(source)
    }

    /// The full-screen vertex stage shared by all passes.
    pub fn fullscreen_vertex() -> Result<String> {
        Ok(get_env().get_template("fullscreen")?.render(())?)
    }

    /// The fragment stage used to force data textures resident.
    pub fn texture_prime_fragment() -> Result<String> {
        Ok(get_env().get_template("texture_prime")?.render(())?)
    }

    /// Generates the additive composite of `pass_names`.
    ///
    /// Each input is sampled from `t<name>` at the fragment's coordinate and
    /// the RGB results are summed; alpha is forced to 1.
    pub fn combine_fragment(pass_names: &[&str]) -> Result<String> {
        Ok(get_env()
            .get_template("combine")?
            .render(context! { passes => pass_names })?)
    }

    /// Joins interface, vertex and fragment into one module source.
    #[must_use]
    pub fn assemble(prelude: &str, vertex: &str, fragment: &str) -> String {
        let mut source = String::with_capacity(prelude.len() + vertex.len() + fragment.len() + 2);
        source.push_str(prelude);
        source.push('\n');
        source.push_str(vertex);
        source.push('\n');
        source.push_str(fragment);
        source
    }
}
