//! Asset loading boundaries
//!
//! - [`SourceLoader`]: fetches shader source text by path
//! - [`DatasetReader`]: reads the scientific dataset feeding the time textures

pub mod dataset;
pub mod io;

pub use dataset::{Dataset, DatasetReader, JsonDatasetReader};
pub use io::{FileSourceLoader, MemorySourceLoader, SourceLoader};
