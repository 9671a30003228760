//! Pinhole camera.

use crate::core::geometry::*;
use crate::core::prism::*;
use glam::{Mat4, Vec3, Vec4};

/// A pinhole camera. `update` must run whenever the position, frame
/// vectors or output resolution change; ray generation reads the
/// cached inverse view.
#[derive(Clone, Debug)]
pub struct Camera {
    /// Eye position.
    pub position: Vec3,

    /// Unit view direction.
    pub look: Vec3,

    /// Up hint, not necessarily orthogonal to `look`.
    pub up: Vec3,

    /// Inverse of the look-at view transform.
    pub iview: Mat4,

    /// Vertical field of view in radians.
    pub hangle: Float,

    /// Horizontal field of view, derived from `hangle` and the aspect
    /// ratio.
    pub wangle: Float,

    /// Output width in pixels.
    pub width: usize,

    /// Output height in pixels.
    pub height: usize,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            look: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::new(0.0, 1.0, 0.0),
            iview: Mat4::IDENTITY,
            hangle: std::f32::consts::FRAC_PI_2,
            wangle: 0.0,
            width: 0,
            height: 0,
        }
    }
}

impl Camera {
    /// Recompute the derived horizontal angle and the inverse view for
    /// a target resolution.
    ///
    /// * `w` - Output width in pixels.
    /// * `h` - Output height in pixels.
    pub fn update(&mut self, w: usize, h: usize) {
        self.width = w;
        self.height = h;
        let aspect = w as Float / h as Float;
        self.wangle = 2.0 * (aspect * (self.hangle / 2.0).tan()).atan();

        let bw = -self.look.normalize();
        let bv = (self.up - self.up.dot(bw) * bw).normalize();
        let bu = bv.cross(bw);
        let rotate = Mat4::from_cols(
            Vec4::new(bu.x, bv.x, bw.x, 0.0),
            Vec4::new(bu.y, bv.y, bw.y, 0.0),
            Vec4::new(bu.z, bv.z, bw.z, 0.0),
            Vec4::new(0.0, 0.0, 0.0, 1.0),
        );
        let translate = Mat4::from_translation(-self.position);
        self.iview = (rotate * translate).inverse();
    }

    /// Generate the primary ray through a pixel centre.
    ///
    /// * `x` - Pixel column.
    /// * `y` - Pixel row.
    pub fn generate_ray(&self, x: usize, y: usize) -> Ray {
        self.generate_ray_offset(x, y, 0.0, 0.0)
    }

    /// Generate a primary ray through a pixel with a sub-pixel offset.
    /// Rows run top to bottom, so the vertical term is flipped.
    ///
    /// * `x`  - Pixel column.
    /// * `y`  - Pixel row.
    /// * `ox` - Horizontal offset within the pixel.
    /// * `oy` - Vertical offset within the pixel.
    pub fn generate_ray_offset(&self, x: usize, y: usize, ox: Float, oy: Float) -> Ray {
        let fx = x as Float + ox;
        let fy = y as Float + oy;
        let fw = self.width as Float;
        let fh = self.height as Float;
        let target = self.iview
            * Vec4::new(
                2.0 * (self.wangle / 2.0).tan() * ((fx + 0.5) / fw - 0.5),
                2.0 * (self.hangle / 2.0).tan() * ((fh - 0.5 - fy) / fh - 0.5),
                -1.0,
                1.0,
            );
        Ray::new(
            self.position,
            (target.truncate() - self.position).normalize(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_view_centre_ray_points_down_negative_z() {
        let mut camera = Camera::default();
        camera.update(101, 101);
        let ray = camera.generate_ray(50, 50);
        assert_relative_eq!(ray.d.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(ray.d.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(ray.d.z, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn image_rows_run_top_to_bottom() {
        let mut camera = Camera::default();
        camera.update(64, 64);
        let top = camera.generate_ray(32, 0);
        let bottom = camera.generate_ray(32, 63);
        assert!(top.d.y > 0.0);
        assert!(bottom.d.y < 0.0);
    }

    #[test]
    fn offset_shifts_within_the_pixel() {
        let mut camera = Camera::default();
        camera.update(64, 64);
        let a = camera.generate_ray_offset(10, 10, 0.0, 0.0);
        let b = camera.generate_ray_offset(10, 10, 0.4, 0.4);
        assert!(a.d != b.d);
        assert!(a.d.dot(b.d) > 0.999);
    }
}
