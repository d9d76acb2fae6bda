//! Shader Template Manager
//!
//! Loads the embedded WGSL templates through minijinja and keeps a
//! `ShaderModule` cache keyed by the hash of the final, assembled source.
//!
//! Sources are validated with naga before they reach the device, so a bad
//! shader surfaces as a [`HorizonError::ShaderCompile`] naming its pass.

use minijinja::{Environment, Error, ErrorKind, syntax::SyntaxConfig};
use rust_embed::RustEmbed;
use rustc_hash::FxHashMap;
use std::borrow::Cow;
use std::sync::OnceLock;
use xxhash_rust::xxh3::xxh3_128;

use crate::errors::{HorizonError, Result};

/// Entry point every vertex source must define.
pub const VERTEX_ENTRY: &str = "vs_main";
/// Entry point every fragment source must define.
pub const FRAGMENT_ENTRY: &str = "fs_main";

pub static SHADER_ENV: OnceLock<Environment<'static>> = OnceLock::new();

#[derive(RustEmbed)]
#[folder = "src/renderer/pipeline/shaders"]
struct ShaderAssets;

pub fn get_env() -> &'static Environment<'static> {
    SHADER_ENV.get_or_init(|| {
        let mut env = Environment::new();

        match SyntaxConfig::builder()
            .block_delimiters("{$", "$}")
            .variable_delimiters("{{", "}}")
            .build()
        {
            Ok(syntax) => env.set_syntax(syntax),
            Err(e) => log::error!("Failed to configure shader template syntax: {e}"),
        }

        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        env.set_loader(shader_loader);

        env
    })
}

fn shader_loader(name: &str) -> std::result::Result<Option<String>, Error> {
    let filename = if std::path::Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wgsl"))
    {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}.wgsl"))
    };

    #[cfg(debug_assertions)]
    {
        let path = std::path::Path::new("src/renderer/pipeline/shaders").join(filename.as_ref());
        if path.exists() {
            return std::fs::read_to_string(&path).map(Some).map_err(|e| {
                Error::new(ErrorKind::TemplateNotFound, format!("Failed to read file: {e}"))
            });
        }
    }

    if let Some(file) = ShaderAssets::get(&filename)
        && let Ok(source) = std::str::from_utf8(file.data.as_ref())
    {
        return Ok(Some(source.to_string()));
    }

    Ok(None)
}

/// Parses and validates WGSL, checking both entry points exist.
///
/// Diagnostics are rendered against `source`, so line numbers refer to the
/// assembled program.
pub fn validate_wgsl(pass_name: &str, source: &str) -> Result<()> {
    let compile_error = |diagnostic: String| HorizonError::ShaderCompile {
        pass: pass_name.to_string(),
        diagnostic,
    };

    let module = naga::front::wgsl::parse_str(source).map_err(|e| compile_error(e.emit_to_string(source)))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| compile_error(e.emit_to_string(source)))?;

    for (entry, stage) in [
        (VERTEX_ENTRY, naga::ShaderStage::Vertex),
        (FRAGMENT_ENTRY, naga::ShaderStage::Fragment),
    ] {
        if !module
            .entry_points
            .iter()
            .any(|ep| ep.name == entry && ep.stage == stage)
        {
            return Err(compile_error(format!("missing {stage:?} entry point `{entry}`")));
        }
    }

    Ok(())
}

// ─── ShaderManager ────────────────────────────────────────────────────────────

/// Validated shader module cache.
///
/// Deduplicates `wgpu::ShaderModule`s by hashing the assembled WGSL with
/// xxh3-128. Identical sources (the shared fullscreen vertex stage combined
/// with an identical fragment and interface) compile once.
pub struct ShaderManager {
    module_cache: FxHashMap<u128, wgpu::ShaderModule>,
}

impl Default for ShaderManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            module_cache: FxHashMap::default(),
        }
    }

    /// Validates and compiles `source` (or returns the cached module).
    ///
    /// Returns `(module_ref, source_hash)`.
    pub fn get_or_compile(
        &mut self,
        device: &wgpu::Device,
        pass_name: &str,
        source: String,
    ) -> Result<(&wgpu::ShaderModule, u128)> {
        let hash = xxh3_128(source.as_bytes());

        if !self.module_cache.contains_key(&hash) {
            validate_wgsl(pass_name, &source)?;
            if cfg!(debug_assertions) {
                log::trace!("Generated shader for pass '{pass_name}':\n{source}");
            }
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("Pass Shader {pass_name}")),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
            self.module_cache.insert(hash, module);
        }

        let module = self
            .module_cache
            .get(&hash)
            .ok_or_else(|| HorizonError::Device(format!("shader module for '{pass_name}' vanished")))?;
        Ok((module, hash))
    }

    /// Drops the module compiled from the source with `hash`.
    pub fn evict(&mut self, hash: u128) {
        self.module_cache.remove(&hash);
    }

    /// Returns the number of cached shader modules.
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.module_cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_templates_are_loadable() {
        let env = get_env();
        for name in ["prelude", "fullscreen", "combine", "texture_prime"] {
            assert!(env.get_template(name).is_ok(), "template {name} missing");
        }
    }

    #[test]
    fn missing_fragment_entry_is_a_compile_error() {
        let source = "
            struct VertexOutput { @builtin(position) position: vec4<f32> };
            @vertex fn vs_main() -> VertexOutput {
                var out: VertexOutput;
                out.position = vec4<f32>(0.0);
                return out;
            }
        ";
        let err = validate_wgsl("halo", source).unwrap_err();
        match err {
            HorizonError::ShaderCompile { pass, diagnostic } => {
                assert_eq!(pass, "halo");
                assert!(diagnostic.contains(FRAGMENT_ENTRY));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn syntax_errors_name_the_pass() {
        let err = validate_wgsl("disk", "fn fs_main( {").unwrap_err();
        assert!(matches!(err, HorizonError::ShaderCompile { ref pass, .. } if pass == "disk"));
    }
}
