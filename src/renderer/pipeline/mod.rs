pub mod shader_gen;
pub mod shader_manager;

pub use shader_gen::ShaderGenerator;
pub use shader_manager::{FRAGMENT_ENTRY, ShaderManager, VERTEX_ENTRY, validate_wgsl};
