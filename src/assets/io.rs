use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::errors::{HorizonError, Result};

/// HTTP-like status codes attached to [`HorizonError::Io`].
pub mod status {
    pub const FORBIDDEN: u16 = 403;
    pub const NOT_FOUND: u16 = 404;
    pub const UNSUPPORTED_MEDIA_TYPE: u16 = 415;
    pub const INTERNAL: u16 = 500;
}

/// Maps a filesystem error onto the status vocabulary used by [`HorizonError::Io`].
#[must_use]
pub fn status_of(err: &std::io::Error) -> u16 {
    match err.kind() {
        std::io::ErrorKind::NotFound => status::NOT_FOUND,
        std::io::ErrorKind::PermissionDenied => status::FORBIDDEN,
        _ => status::INTERNAL,
    }
}

/// Source reader trait.
///
/// Paths are opaque to the engine; implementations decide how to resolve
/// them. Any fetch failure is an [`HorizonError::Io`] carrying the requested
/// path and a status code.
pub trait SourceLoader {
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>>;

    /// Reads `path` as UTF-8 text.
    fn fetch_source(&self, path: &str) -> Result<String> {
        let bytes = self.read_bytes(path)?;
        String::from_utf8(bytes).map_err(|_| HorizonError::Io {
            path: path.to_string(),
            status: status::UNSUPPORTED_MEDIA_TYPE,
        })
    }
}

impl<T: SourceLoader + ?Sized> SourceLoader for &T {
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        (**self).read_bytes(path)
    }
}

/// Local file reader rooted at a directory.
///
/// Leading slashes are stripped so web-style absolute paths
/// (`/shaders/disk.wgsl`) resolve under the root.
pub struct FileSourceLoader {
    root_path: PathBuf,
}

impl FileSourceLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let root_path = if path.is_file() {
            path.parent().unwrap_or(Path::new(".")).to_path_buf()
        } else {
            path.to_path_buf()
        };
        Self { root_path }
    }

    #[inline]
    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    #[must_use]
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root_path.join(path.trim_start_matches('/'))
    }
}

impl SourceLoader for FileSourceLoader {
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let resolved = self.resolve(path);
        std::fs::read(&resolved).map_err(|e| {
            log::debug!("Failed to read {}: {e}", resolved.display());
            HorizonError::Io {
                path: path.to_string(),
                status: status_of(&e),
            }
        })
    }
}

/// In-memory sources, keyed by path. Missing paths report 404.
#[derive(Debug, Clone, Default)]
pub struct MemorySourceLoader {
    sources: HashMap<String, Vec<u8>>,
}

impl MemorySourceLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> &mut Self {
        self.sources.insert(path.into(), contents.into());
        self
    }

    #[must_use]
    pub fn with(mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }
}

impl SourceLoader for MemorySourceLoader {
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        self.sources.get(path).cloned().ok_or_else(|| HorizonError::Io {
            path: path.to_string(),
            status: status::NOT_FOUND,
        })
    }
}
