//! Render Settings
//!
//! Device-level options for the headless wgpu backend.
//!
//! ```rust,ignore
//! use horizon::renderer::settings::RenderSettings;
//!
//! let settings = RenderSettings {
//!     width: 1280,
//!     height: 720,
//!     preserve_display: true,
//!     ..Default::default()
//! };
//! let context = pollster::block_on(WgpuContext::new(&settings))?;
//! ```

/// Color format of every off-screen pass target.
pub const PASS_TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Color format of the display surface.
pub const DISPLAY_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Keep the display contents readable after drawing (required for capture)
    pub preserve_display: bool,
    pub power_preference: wgpu::PowerPreference,
    /// Features requested in addition to the optional ones the backend probes for
    pub required_features: wgpu::Features,
    pub required_limits: wgpu::Limits,
    /// Clear color applied before every pass draws
    pub clear_color: wgpu::Color,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            preserve_display: false,
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            clear_color: wgpu::Color::BLACK,
        }
    }
}
