//! Finished frames and the sinks that consume them.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use thiserror::Error;

/// An RGBA8 pixel buffer. Row 0 is the bottom scanline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[u8; 4]>,
}

impl FrameBuffer {
    /// A frame filled with `background`.
    pub fn new(width: u32, height: u32, background: [u8; 4]) -> Self {
        Self {
            width,
            height,
            pixels: vec![background; width as usize * height as usize],
        }
    }

    pub fn get(&self, row: u32, col: u32) -> [u8; 4] {
        self.pixels[row as usize * self.width as usize + col as usize]
    }

    /// Raw bytes, 4 per pixel, bottom row first.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Upright image (top row first), as image files expect.
    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            image::Rgba(self.get(self.height - 1 - y, x))
        })
    }
}

/// Something that shows or stores a finished frame.
pub trait FrameSink {
    type Error;

    fn present(&mut self, frame: &FrameBuffer) -> Result<(), Self::Error>;
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to write image '{path}': {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("cannot write an empty {width}x{height} frame")]
    EmptyFrame { width: u32, height: u32 },
}

/// Writes each presented frame to a PNG file.
#[derive(Debug, Clone)]
pub struct PngSink {
    path: PathBuf,
}

impl PngSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSink for PngSink {
    type Error = SinkError;

    fn present(&mut self, frame: &FrameBuffer) -> Result<(), SinkError> {
        if frame.pixels.is_empty() {
            return Err(SinkError::EmptyFrame {
                width: frame.width,
                height: frame.height,
            });
        }

        frame
            .to_image()
            .save_with_format(&self.path, image::ImageFormat::Png)
            .map_err(|source| SinkError::Image {
                path: self.path.clone(),
                source,
            })?;

        log::info!(
            "Wrote {}x{} frame to {}",
            frame.width,
            frame.height,
            self.path.display()
        );
        Ok(())
    }
}
