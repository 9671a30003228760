//! Optical scattering helpers.

use crate::core::prism::*;
use glam::Vec3;
use rand::Rng;
use std::f32::consts::PI;

/// Unpolarised Fresnel reflectance for a dielectric interface,
/// averaging the s and p polarised amplitudes. Total internal
/// reflection yields 1.
///
/// * `d2c`     - Unit vector from the surface towards the arriving
///               ray's origin.
/// * `normal`  - Surface normal.
/// * `ior_out` - Refractive index on the incident side.
/// * `ior_in`  - Refractive index on the transmitted side.
pub fn fresnel_dielectric(d2c: Vec3, normal: Vec3, ior_out: Float, ior_in: Float) -> Float {
    let mut cti = d2c.dot(normal).clamp(-1.0, 1.0);
    let (ior_out, ior_in) = if cti < 0.0 {
        cti = -cti;
        (ior_in, ior_out)
    } else {
        (ior_out, ior_in)
    };
    let ior = ior_out / ior_in;
    let sti = (1.0 - cti * cti).max(0.0).sqrt();
    let stt = ior * sti;
    if stt >= 1.0 {
        return 1.0;
    }
    let ctt = (1.0 - stt * stt).max(0.0).sqrt();
    let rs = (ior_out * cti - ior_in * ctt) / (ior_out * cti + ior_in * ctt);
    let rp = (ior_in * cti - ior_out * ctt) / (ior_in * cti + ior_out * ctt);
    (0.5 * (rs * rs + rp * rp)).clamp(0.0, 1.0)
}

/// Draw a cosine-weighted direction in the canonical +z hemisphere.
pub fn hemisphere_sample() -> Vec3 {
    let mut rng = rand::thread_rng();
    let r1: Float = rng.gen();
    let r2: Float = rng.gen();
    let phi = 2.0 * PI * r1;
    Vec3::new(
        phi.cos() * (1.0 - r2).sqrt(),
        phi.sin() * (1.0 - r2).sqrt(),
        r2.sqrt(),
    )
}

/// Rotate a canonical-hemisphere direction into the frame of a
/// surface normal.
///
/// * `normal` - The frame's z axis.
/// * `local`  - The direction in the canonical frame.
pub fn onb(normal: Vec3, local: Vec3) -> Vec3 {
    let w = normal;
    let a = if w.x.abs() > 0.9 {
        Vec3::new(0.0, 1.0, 0.0)
    } else {
        Vec3::new(1.0, 0.0, 0.0)
    };
    let v = w.cross(a).normalize();
    let u = w.cross(v).normalize();
    local.x * u + local.y * v + local.z * w
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn normal_incidence_glass_reflects_four_percent() {
        let r = fresnel_dielectric(
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 1.0),
            1.0,
            1.5,
        );
        assert_relative_eq!(r, 0.04, epsilon = 1e-4);
    }

    #[test]
    fn grazing_incidence_reflects_everything() {
        let r = fresnel_dielectric(
            Vec3::new(1.0, 0.0, 0.001).normalize(),
            Vec3::new(0.0, 0.0, 1.0),
            1.0,
            1.5,
        );
        assert!(r > 0.9);
    }

    #[test]
    fn shallow_exit_hits_total_internal_reflection() {
        // Leaving glass at a shallow angle exceeds the critical angle.
        let r = fresnel_dielectric(
            Vec3::new(0.9, 0.0, 0.1).normalize(),
            Vec3::new(0.0, 0.0, 1.0),
            1.5,
            1.0,
        );
        assert_eq!(r, 1.0);
    }

    #[test]
    fn hemisphere_samples_lie_above_the_normal() {
        let n = Vec3::new(0.3, -0.5, 0.8).normalize();
        for _ in 0..256 {
            let d = onb(n, hemisphere_sample());
            assert!(d.dot(n) >= -1e-5);
            assert_relative_eq!(d.length(), 1.0, epsilon = 1e-4);
        }
    }
}
