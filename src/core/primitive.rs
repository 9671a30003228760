//! Scene primitives and their ray intersections.

use crate::core::geometry::*;
use crate::core::prism::*;
use glam::Vec3;

/// A successful or failed ray intersection. `t < 0` means no hit; the
/// remaining fields are only meaningful for `t > 0`.
#[derive(Copy, Clone, Debug)]
pub struct Hit {
    /// Ray parameter of the intersection.
    pub t: Float,

    /// World-space intersection point.
    pub p: Vec3,

    /// Geometric normal, flipped so it faces the ray origin.
    pub n: Vec3,

    /// Unit vector from the hit point back to the ray origin.
    pub d2c: Vec3,

    /// `d2c` mirrored about the normal: the specular bounce direction.
    pub d2r: Vec3,

    /// Index into the scene materials, or -1 for the default material.
    pub material: i32,
}

impl Hit {
    /// The canonical miss.
    pub fn miss() -> Self {
        Self {
            t: -1.0,
            p: Vec3::ZERO,
            n: Vec3::ZERO,
            d2c: Vec3::ZERO,
            d2r: Vec3::ZERO,
            material: -1,
        }
    }

    /// True when the intersection found a surface.
    pub fn is_hit(&self) -> bool {
        self.t > 0.0
    }
}

/// Renderable geometry.
#[derive(Copy, Clone, Debug)]
pub enum Primitive {
    Sphere {
        center: Vec3,
        radius: Float,
        material: i32,
    },
    Triangle {
        v1: Vec3,
        v2: Vec3,
        v3: Vec3,
        material: i32,
    },
}

impl Primitive {
    /// Create a sphere.
    ///
    /// * `center`   - Centre point.
    /// * `radius`   - Radius.
    /// * `material` - Scene material index or -1.
    pub fn sphere(center: Vec3, radius: Float, material: i32) -> Self {
        Self::Sphere {
            center,
            radius,
            material,
        }
    }

    /// Create a triangle.
    ///
    /// * `v1`, `v2`, `v3` - The vertices, counter-clockwise.
    /// * `material`       - Scene material index or -1.
    pub fn triangle(v1: Vec3, v2: Vec3, v3: Vec3, material: i32) -> Self {
        Self::Triangle {
            v1,
            v2,
            v3,
            material,
        }
    }

    /// The material index carried by the primitive.
    pub fn material(&self) -> i32 {
        match self {
            Self::Sphere { material, .. } => *material,
            Self::Triangle { material, .. } => *material,
        }
    }

    /// The bounding box of the primitive.
    pub fn aabb(&self) -> Aabb {
        match self {
            Self::Sphere { center, radius, .. } => {
                let r = Vec3::splat(*radius);
                Aabb::new(*center - r, *center + r)
            }
            Self::Triangle { v1, v2, v3, .. } => Aabb::new(v1.min(*v2).min(*v3), v1.max(*v2).max(*v3)),
        }
    }

    /// Intersect a ray against the primitive. The returned hit carries
    /// the raw geometric normal; orientation towards the ray origin is
    /// the caller's concern.
    ///
    /// * `ray` - The ray.
    pub fn intersect(&self, ray: &Ray) -> Hit {
        match self {
            Self::Sphere {
                center,
                radius,
                material,
            } => sphere_intersect(ray, *center, *radius, *material),
            Self::Triangle {
                v1,
                v2,
                v3,
                material,
            } => triangle_intersect(ray, *v1, *v2, *v3, *material),
        }
    }
}

fn sphere_intersect(ray: &Ray, center: Vec3, radius: Float, material: i32) -> Hit {
    let mut h = Hit::miss();
    let l = ray.p - center;
    let hb = ray.d.dot(l);
    let c = l.dot(l) - radius * radius;
    let disc = hb * hb - c;
    if disc < 0.0 {
        return h;
    }
    let sq = disc.sqrt();
    let mut t1 = -hb - sq;
    let mut t2 = -hb + sq;
    if t1 < 0.0 {
        t1 = t2;
    }
    if t2 < 0.0 {
        t2 = t1;
    }
    h.t = t1.min(t2);
    h.p = ray.at(h.t);
    h.n = (h.p - center).normalize();
    h.material = material;
    h
}

fn triangle_intersect(ray: &Ray, v1: Vec3, v2: Vec3, v3: Vec3, material: i32) -> Hit {
    const DET_EPSILON: Float = 1e-8;
    let mut h = Hit::miss();
    let ab = v2 - v1;
    let ac = v3 - v1;
    let pvec = ray.d.cross(ac);
    let det = ab.dot(pvec);
    if det.abs() < DET_EPSILON {
        return h;
    }
    let idet = 1.0 / det;
    let tvec = ray.p - v1;
    let u = tvec.dot(pvec) * idet;
    if !(0.0..=1.0).contains(&u) {
        return h;
    }
    let qvec = tvec.cross(ab);
    let v = ray.d.dot(qvec) * idet;
    if v < 0.0 || u + v > 1.0 {
        return h;
    }
    h.t = ac.dot(qvec) * idet;
    h.p = ray.at(h.t);
    h.n = ab.cross(ac).normalize();
    h.material = material;
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sphere_head_on() {
        let s = Primitive::sphere(Vec3::ZERO, 0.5, -1);
        let h = s.intersect(&Ray::new(Vec3::new(0.0, 0.0, 3.0), Vec3::new(0.0, 0.0, -1.0)));
        assert!(h.is_hit());
        assert_relative_eq!(h.t, 2.5, epsilon = 1e-5);
        assert_relative_eq!(h.n.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn sphere_miss() {
        let s = Primitive::sphere(Vec3::ZERO, 0.5, -1);
        let h = s.intersect(&Ray::new(Vec3::new(0.0, 2.0, 3.0), Vec3::new(0.0, 0.0, -1.0)));
        assert!(!h.is_hit());
    }

    #[test]
    fn triangle_barycentric_bounds() {
        let t = Primitive::triangle(
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            -1,
        );
        let inside = t.intersect(&Ray::new(Vec3::new(0.0, 0.0, 2.0), Vec3::new(0.0, 0.0, -1.0)));
        assert!(inside.is_hit());
        assert_relative_eq!(inside.t, 2.0, epsilon = 1e-5);
        let outside = t.intersect(&Ray::new(Vec3::new(0.9, 0.9, 2.0), Vec3::new(0.0, 0.0, -1.0)));
        assert!(!outside.is_hit());
    }

    #[test]
    fn aabb_encloses_geometry() {
        let s = Primitive::sphere(Vec3::new(1.0, 2.0, 3.0), 0.5, -1).aabb();
        assert_eq!(s.min, Vec3::new(0.5, 1.5, 2.5));
        assert_eq!(s.max, Vec3::new(1.5, 2.5, 3.5));
        assert_eq!(s.centroid, Vec3::new(1.0, 2.0, 3.0));
    }
}
