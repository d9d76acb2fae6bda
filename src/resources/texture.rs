use crate::renderer::device::{RenderTargetId, TextureId};

/// A texture bound to a sampler uniform.
///
/// Pass outputs and uploaded data textures share the same sampling path, so a
/// uniform of kind [`Texture`](super::UniformKind::Texture) may reference either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureBinding {
    /// An uploaded single-channel data texture.
    Data(TextureId),
    /// The color output of another pass.
    RenderTarget(RenderTargetId),
}

/// Describes a square single-channel float texture built from one time sample.
///
/// Data textures are always sampled with linear filtering and uploaded with
/// tight (1-byte) row alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTextureDescriptor {
    pub label: String,
    pub width: u32,
    pub height: u32,
}

impl DataTextureDescriptor {
    #[must_use]
    pub fn square(label: impl Into<String>, side: u32) -> Self {
        Self {
            label: label.into(),
            width: side,
            height: side,
        }
    }

    /// Number of texels expected by an upload.
    #[inline]
    #[must_use]
    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}
