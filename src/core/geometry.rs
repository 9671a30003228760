//! Rays, bounding boxes and direction helpers.

use crate::core::prism::*;
use glam::Vec3;

/// A ray with origin `p` and direction `d`.
#[derive(Copy, Clone, Debug, Default)]
pub struct Ray {
    /// Origin.
    pub p: Vec3,

    /// Direction, normalised by the producer.
    pub d: Vec3,
}

impl Ray {
    /// Create a new `Ray`.
    ///
    /// * `p` - Origin.
    /// * `d` - Direction.
    pub fn new(p: Vec3, d: Vec3) -> Self {
        Self { p, d }
    }

    /// The point at parameter `t` along the ray.
    pub fn at(&self, t: Float) -> Vec3 {
        self.p + self.d * t
    }
}

/// An axis-aligned bounding box with a cached centroid.
#[derive(Copy, Clone, Debug)]
pub struct Aabb {
    /// Smallest corner.
    pub min: Vec3,

    /// Largest corner.
    pub max: Vec3,

    /// Midpoint of the box.
    pub centroid: Vec3,
}

impl Aabb {
    /// Create a new `Aabb` with the centroid derived from the corners.
    ///
    /// * `min` - Smallest corner.
    /// * `max` - Largest corner.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min,
            max,
            centroid: (min + max) * 0.5,
        }
    }
}

/// Mirror an incident direction across the plane perpendicular to a
/// normal.
///
/// * `incident` - The incident direction.
/// * `normal`   - The plane normal.
pub fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * normal.dot(incident) * normal
}

/// Bend a direction through an interface by the ratio of refractive
/// indices. Returns zero on total internal reflection.
///
/// * `incident` - The incident direction.
/// * `normal`   - The interface normal.
/// * `eta`      - Ratio of the indices on either side.
pub fn refract(incident: Vec3, normal: Vec3, eta: Float) -> Vec3 {
    let cos = normal.dot(incident);
    let k = 1.0 - eta * eta * (1.0 - cos * cos);
    if k < 0.0 {
        return Vec3::ZERO;
    }
    eta * incident - (eta * cos + k.sqrt()) * normal
}
