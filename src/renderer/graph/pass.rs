use serde::Deserialize;

use crate::resources::{UniformDeclaration, UniformSchema};

/// Stable index of a pass within its [`PassGraph`](super::PassGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(pub(crate) usize);

impl PassId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A pass as declared in configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PassDeclaration {
    pub name: String,
    /// Path of the fragment source, resolved by a
    /// [`SourceLoader`](crate::assets::SourceLoader).
    #[serde(rename = "fragmentShader")]
    pub fragment_shader: String,
    #[serde(default)]
    pub uniforms: Vec<UniformDeclaration>,
}

impl PassDeclaration {
    #[must_use]
    pub fn new(name: impl Into<String>, fragment_shader: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fragment_shader: fragment_shader.into(),
            uniforms: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_uniform(mut self, uniform: UniformDeclaration) -> Self {
        self.uniforms.push(uniform);
        self
    }
}

/// Where a pass's fragment stage comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramSource {
    /// Fetched through a source loader at allocation time.
    Path(String),
    /// Generated in memory (the combine pass).
    Inline(String),
}

/// A resolved pass.
#[derive(Debug, Clone)]
pub struct Pass {
    pub name: String,
    pub program: ProgramSource,
    pub uniforms: UniformSchema,
    pub(crate) is_combine: bool,
}

impl Pass {
    /// `true` for the synthesized pass that renders to the display.
    #[inline]
    #[must_use]
    pub fn is_combine(&self) -> bool {
        self.is_combine
    }
}
