//! wgpu backend
//!
//! - [`WgpuContext`]: headless device, queue and resource arenas behind [`RenderDevice`](crate::renderer::device::RenderDevice)

pub mod context;

pub use context::WgpuContext;
