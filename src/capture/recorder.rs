use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use serde::Deserialize;

use super::export::{Export, NamedFrame};
use crate::errors::{HorizonError, Result};
use crate::renderer::device::RenderDevice;

/// Image encoding of captured frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    #[default]
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
}

impl ImageEncoding {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
        }
    }

    /// Encodes an RGBA frame. JPEG has no alpha channel, so alpha is dropped.
    pub fn encode(self, frame: image::RgbaImage) -> Result<Vec<u8>> {
        let image = match self {
            Self::Png => DynamicImage::ImageRgba8(frame),
            Self::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(frame).to_rgb8()),
        };
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, self.image_format())?;
        Ok(bytes.into_inner())
    }
}

/// Whether a run produces one still or a numbered sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    Still,
    Sequence,
}

/// Append-only buffer of encoded frames.
#[derive(Debug)]
pub struct FrameRecorder {
    mode: CaptureMode,
    encoding: ImageEncoding,
    frames: Vec<Vec<u8>>,
}

impl FrameRecorder {
    #[must_use]
    pub fn still(encoding: ImageEncoding) -> Self {
        Self {
            mode: CaptureMode::Still,
            encoding,
            frames: Vec::new(),
        }
    }

    #[must_use]
    pub fn sequence(encoding: ImageEncoding) -> Self {
        Self {
            mode: CaptureMode::Sequence,
            encoding,
            frames: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    #[inline]
    #[must_use]
    pub fn encoding(&self) -> ImageEncoding {
        self.encoding
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Waits for the device, reads the display and stores the encoded frame.
    ///
    /// A still recorder keeps only the latest frame.
    pub fn capture_frame<D: RenderDevice + ?Sized>(&mut self, device: &mut D) -> Result<()> {
        if !device.preserves_display() {
            let err = HorizonError::Capture(
                "display contents are not preserved; enable color-buffer preservation to capture"
                    .to_string(),
            );
            log::error!("{err}");
            return Err(err);
        }

        device.synchronize();
        let frame = device.read_display().inspect_err(|e| log::error!("{e}"))?;
        let bytes = self.encoding.encode(frame)?;

        if self.mode == CaptureMode::Still {
            self.frames.clear();
        }
        self.frames.push(bytes);
        log::debug!("Captured frame {} ({})", self.frames.len(), self.encoding.extension());
        Ok(())
    }

    /// Drains the buffer into an export. `None` when nothing was captured.
    pub fn finish(&mut self) -> Option<Export> {
        if self.frames.is_empty() {
            return None;
        }
        let ext = self.encoding.extension();
        let frames = std::mem::take(&mut self.frames);

        Some(match self.mode {
            CaptureMode::Still => {
                let bytes = frames.into_iter().last().unwrap_or_default();
                Export::Still(NamedFrame {
                    file_name: format!("output.{ext}"),
                    bytes,
                })
            }
            CaptureMode::Sequence => Export::Sequence(
                frames
                    .into_iter()
                    .enumerate()
                    .map(|(index, bytes)| NamedFrame {
                        file_name: format!("{index:04}.{ext}"),
                        bytes,
                    })
                    .collect(),
            ),
        })
    }
}
