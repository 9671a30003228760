//! Rendered image container and PNG output.

use crate::core::prism::*;
use glam::Vec3;
use std::path::Path;
use thiserror::Error;

/// Failures while writing render output to disk.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("image holds {got} pixels but claims {want}")]
    SizeMismatch { got: usize, want: usize },

    #[error("unable to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("unable to write composite file: {0}")]
    Io(#[from] std::io::Error),
}

/// A rendered frame: linear-RGB pixels in row-major order plus the
/// wall-clock breakdown of the render that produced it.
#[derive(Clone, Debug, Default)]
pub struct Image {
    /// Linear RGB pixels, row-major, `w * h` of them.
    pub colours: Vec<Vec3>,

    /// Width in pixels.
    pub w: usize,

    /// Height in pixels.
    pub h: usize,

    /// Total render seconds.
    pub time: Float,

    /// Seconds spent preparing (BVH build) before shading started.
    pub prepare: Float,

    /// Seconds spent after the workers finished.
    pub post: Float,
}

impl Image {
    /// Encode as an 8-bit sRGB PNG. Channels are clamped to [0, 1]
    /// and truncated onto the byte scale.
    ///
    /// * `path` - Destination file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SaveError> {
        if self.colours.len() != self.w * self.h {
            return Err(SaveError::SizeMismatch {
                got: self.colours.len(),
                want: self.w * self.h,
            });
        }
        let mut data = Vec::with_capacity(self.w * self.h * 3);
        for c in self.colours.iter() {
            let c = c.clamp(Vec3::ZERO, Vec3::ONE);
            data.push((c.x * 255.0) as u8);
            data.push((c.y * 255.0) as u8);
            data.push((c.z * 255.0) as u8);
        }
        let buffer = image::RgbImage::from_raw(self.w as u32, self.h as u32, data)
            .expect("pixel buffer length was validated above");
        buffer.save(path)?;
        Ok(())
    }
}
