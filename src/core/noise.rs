//! Gradient noise for volumetric density.

use crate::core::prism::*;
use glam::Vec3;
use itertools::iproduct;

/// Lattice period; densities tile with this wavelength.
const PERIOD: Float = 7.0;

fn hash_lattice(x: i32, y: i32, z: i32) -> u32 {
    let mut h = (x as u32)
        .wrapping_mul(1619)
        .wrapping_add((y as u32).wrapping_mul(31337))
        .wrapping_add((z as u32).wrapping_mul(6971));
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// Gradient at a lattice point: a unit vector along one of the twelve
/// edge directions, picked by hash bits.
fn gradient(lattice: Vec3) -> Vec3 {
    let h = hash_lattice(lattice.x as i32, lattice.y as i32, lattice.z as i32);
    let mut gx = if h & 1 != 0 { 1.0 } else { -1.0 };
    let mut gy = if h & 2 != 0 { 1.0 } else { -1.0 };
    let mut gz = if h & 4 != 0 { 1.0 } else { -1.0 };
    match (h >> 3) & 3 {
        0 => gx = 0.0,
        1 => gy = 0.0,
        _ => gz = 0.0,
    }
    Vec3::new(gx, gy, gz).normalize()
}

/// Floor-modulus onto the lattice period.
fn wrap(v: Vec3) -> Vec3 {
    v - Vec3::splat(PERIOD) * (v / PERIOD).floor()
}

/// Sample 3-D Perlin noise at a point. The result lies in [0, 1].
///
/// * `p` - The sample position.
pub fn perlin(p: Vec3) -> Float {
    let wrapped = wrap(p);
    let i = wrapped.floor();
    let f = wrapped - i;

    // Quintic fade.
    let u = f * f * f * (f * (f * 6.0 - 15.0) + 10.0);

    let mut result = 0.0;
    for (z, y, x) in iproduct!(0..2, 0..2, 0..2) {
        let offset = Vec3::new(x as Float, y as Float, z as Float);
        let lattice = wrap(i + offset);
        let g = gradient(lattice);
        let d = f - offset;
        let w = (if x == 1 { u.x } else { 1.0 - u.x })
            * (if y == 1 { u.y } else { 1.0 - u.y })
            * (if z == 1 { u.z } else { 1.0 - u.z });
        result += w * g.dot(d);
    }

    ((result + 1.0) * 0.5).clamp(0.0, 1.0)
}
