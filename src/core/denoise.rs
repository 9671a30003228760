//! Auxiliary channels for an external denoiser.

use crate::core::image::SaveError;
use glam::Vec3;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// First-hit geometry of one pixel, recorded by the metadata probe.
#[derive(Copy, Clone, Debug)]
pub struct PixelMetadata {
    /// Geometric normal at the first hit.
    pub normal: Vec3,

    /// World position of the first hit.
    pub position: Vec3,

    /// Surface albedo, when the material exposes a meaningful one.
    pub albedo: Option<Vec3>,
}

/// Per-pixel geometry channels an external denoiser consumes
/// alongside the beauty image. Pixels never touched keep their
/// sentinel values: zero normal, far position, white albedo.
#[derive(Clone, Debug)]
pub struct DenoiseBuffer {
    /// Geometric normals.
    pub normals: Vec<Vec3>,

    /// First-hit positions.
    pub positions: Vec<Vec3>,

    /// Surface albedo.
    pub albedo: Vec<Vec3>,
}

impl DenoiseBuffer {
    /// Allocate channels for an image size.
    ///
    /// * `w` - Width in pixels.
    /// * `h` - Height in pixels.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            normals: vec![Vec3::ZERO; w * h],
            positions: vec![Vec3::splat(f32::MAX); w * h],
            albedo: vec![Vec3::ONE; w * h],
        }
    }

    /// Store one pixel's probe result.
    ///
    /// * `index` - Row-major pixel index.
    /// * `meta`  - The probe result; `None` leaves the sentinels.
    pub fn record(&mut self, index: usize, meta: Option<PixelMetadata>) {
        if let Some(meta) = meta {
            self.normals[index] = meta.normal;
            self.positions[index] = meta.position;
            if let Some(albedo) = meta.albedo {
                self.albedo[index] = albedo;
            }
        }
    }

    /// Write the channels as three sibling files
    /// (`<path>.normals/.positions/.albedo`), each a row-major run of
    /// little-endian f32 triples.
    ///
    /// * `path` - The beauty image path the siblings are derived from.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SaveError> {
        let base = path.as_ref().as_os_str().to_os_string();
        for (suffix, data) in [
            (".normals", &self.normals),
            (".positions", &self.positions),
            (".albedo", &self.albedo),
        ] {
            let mut name = base.clone();
            name.push(suffix);
            write_channel(Path::new(&name), data)?;
        }
        Ok(())
    }
}

fn write_channel(path: &Path, data: &[Vec3]) -> Result<(), SaveError> {
    let mut out = BufWriter::new(File::create(path)?);
    for v in data {
        out.write_all(&v.x.to_le_bytes())?;
        out.write_all(&v.y.to_le_bytes())?;
        out.write_all(&v.z.to_le_bytes())?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_survive_missed_pixels() {
        let mut buffer = DenoiseBuffer::new(2, 1);
        buffer.record(
            0,
            Some(PixelMetadata {
                normal: Vec3::Z,
                position: Vec3::ONE,
                albedo: None,
            }),
        );
        buffer.record(1, None);
        assert_eq!(buffer.normals[0], Vec3::Z);
        assert_eq!(buffer.albedo[0], Vec3::ONE);
        assert_eq!(buffer.positions[1], Vec3::splat(f32::MAX));
    }

    #[test]
    fn channels_are_packed_little_endian() {
        let dir = std::env::temp_dir().join("prism-denoise-test");
        std::fs::create_dir_all(&dir).unwrap();
        let base = dir.join("out.png");
        let mut buffer = DenoiseBuffer::new(1, 1);
        buffer.record(
            0,
            Some(PixelMetadata {
                normal: Vec3::new(1.0, 2.0, 3.0),
                position: Vec3::ZERO,
                albedo: Some(Vec3::ZERO),
            }),
        );
        buffer.save(&base).unwrap();
        let bytes = std::fs::read(dir.join("out.png.normals")).unwrap();
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[4..8], &2.0f32.to_le_bytes());
        assert_eq!(&bytes[8..12], &3.0f32.to_le_bytes());
    }
}
