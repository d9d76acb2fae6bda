//! Frame capture
//!
//! - [`FrameRecorder`]: reads back the display after a tick and keeps encoded frames
//! - [`Export`]: the bundle handed out when a run completes
//! - [`DirectoryExporter`]: writes an export to disk

pub mod export;
pub mod recorder;

pub use export::{DirectoryExporter, Export, Exporter, NamedFrame};
pub use recorder::{CaptureMode, FrameRecorder, ImageEncoding};
