//! Core resource definitions
//!
//! Data structures shared by the pass graph and the device backends.
//! Nothing in here touches the GPU directly:
//! - Uniforms: declarations, kinds, values and per-pass schemas
//! - Texture: bindings and data texture descriptors

pub mod texture;
pub mod uniforms;

pub use texture::{DataTextureDescriptor, TextureBinding};
pub use uniforms::{
    BuiltinSlots, UNIFORM_SLOT_STRIDE, UniformDeclaration, UniformKind, UniformSchema,
    UniformSlot, UniformValue, builtin,
};
