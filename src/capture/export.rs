use std::path::{Path, PathBuf};

use crate::assets::io::status_of;
use crate::errors::{HorizonError, Result};

/// An encoded frame with its export file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedFrame {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Frames produced by a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Export {
    /// A static run: one `output.<ext>` image.
    Still(NamedFrame),
    /// An animated run: `0000.<ext>`, `0001.<ext>`, ... in tick order.
    Sequence(Vec<NamedFrame>),
}

impl Export {
    #[must_use]
    pub fn frames(&self) -> &[NamedFrame] {
        match self {
            Self::Still(frame) => std::slice::from_ref(frame),
            Self::Sequence(frames) => frames,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames().is_empty()
    }
}

/// Consumes a finished export.
pub trait Exporter {
    fn export(&mut self, export: &Export) -> Result<()>;
}

/// Writes each frame as a file in a directory.
pub struct DirectoryExporter {
    root: PathBuf,
}

impl DirectoryExporter {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Exporter for DirectoryExporter {
    fn export(&mut self, export: &Export) -> Result<()> {
        let io_error = |path: &Path, e: &std::io::Error| HorizonError::Io {
            path: path.display().to_string(),
            status: status_of(e),
        };

        std::fs::create_dir_all(&self.root).map_err(|e| io_error(&self.root, &e))?;
        for frame in export.frames() {
            let path = self.root.join(&frame.file_name);
            std::fs::write(&path, &frame.bytes).map_err(|e| io_error(&path, &e))?;
        }
        log::info!("Exported {} frame(s) to {}", export.len(), self.root.display());
        Ok(())
    }
}
