//! Minimal RGB8 image support: the "image loader" collaborator from the
//! purpose statement, decoding textures for textured materials and the
//! optional environment map via the `image` crate.

use crate::core::error::GfxError;
use crate::core::math::Vec3;
use std::path::Path;

/// A decoded RGB8 image sampled by nearest-neighbor lookup (no filtering;
/// an explicit non-goal).
#[derive(Debug, Clone)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<Vec3>,
}

impl Image {
    /// Decodes an image from `path`, normalizing channels to `[0,1]`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GfxError> {
        let img = image::open(path.as_ref())
            .map_err(|e| GfxError::InvalidValue(format!("failed to decode image: {e}")))?
            .to_rgb8();
        let (width, height) = img.dimensions();
        let pixels = img
            .pixels()
            .map(|p| Vec3::new(p[0] as f32 / 255.0, p[1] as f32 / 255.0, p[2] as f32 / 255.0))
            .collect();
        Ok(Self { width, height, pixels })
    }

    /// Builds an image directly from normalized RGB triples, as used by the
    /// environment map entry point (`width*height` floats supplied by the
    /// caller, not read from disk).
    pub fn from_rgb_f32(width: u32, height: u32, rgb: &[f32]) -> Result<Self, GfxError> {
        if rgb.len() != (width as usize * height as usize * 3) {
            return Err(GfxError::InvalidValue("environment map buffer size mismatch".into()));
        }
        let pixels = rgb.chunks(3).map(|c| Vec3::new(c[0], c[1], c[2])).collect();
        Ok(Self { width, height, pixels })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Nearest-neighbor sample at normalized coordinates `u, v in [0,1]`.
    /// Callers outside that range should not call this directly — textured
    /// materials instead return black for out-of-range uv (see
    /// `scene::Material::color`).
    pub fn sample(&self, u: f32, v: f32) -> Vec3 {
        let x = ((u * self.width as f32) as i64).clamp(0, self.width as i64 - 1) as u32;
        let y = ((v * self.height as f32) as i64).clamp(0, self.height as i64 - 1) as u32;
        self.pixels[(y * self.width + x) as usize]
    }

    /// Equirectangular sample from a (not necessarily unit) ray direction,
    /// used by the environment map.
    pub fn sample_direction(&self, dir: Vec3) -> Vec3 {
        let d = dir.normalize();
        let u = 0.5 - d.z.atan2(d.x) / std::f32::consts::TAU;
        let v = 0.5 + d.y.asin() / std::f32::consts::PI;
        self.sample(u, v)
    }
}
