//! Light sources and direct lighting.

use crate::core::fourier::Fourier;
use crate::core::geometry::*;
use crate::core::material::Material;
use crate::core::primitive::Hit;
use crate::core::prism::*;
use crate::core::spectrum::Spectrum;
use glam::Vec3;
use log::warn;
use rand::Rng;

/// A light source. The field shape selects the kind: zero `direction`
/// means a point light, non-zero with zero penumbra and angle a
/// directional light, anything else a spot; non-zero `wvec`/`hvec`
/// span an area quad, and a non-zero `radius` marks an emissive
/// sphere.
#[derive(Clone, Debug, Default)]
pub struct Light {
    /// Position, unused for directional lights.
    pub position: Vec3,

    /// Emission curve over wavelength.
    pub colour: Fourier,

    /// Distance attenuation coefficients.
    pub attenuation: Vec3,

    /// Direction towards the light for directional lights.
    pub direction: Vec3,

    /// Spot penumbra angle.
    pub penumbra: Float,

    /// Spot cone angle.
    pub angle: Float,

    /// Area-quad width span.
    pub wvec: Vec3,

    /// Area-quad height span.
    pub hvec: Vec3,

    /// Radius of an emissive sphere light.
    pub radius: Float,
}

impl Light {
    /// True when the light spans a non-degenerate area quad.
    pub fn is_area(&self) -> bool {
        self.wvec.cross(self.hvec).length_squared() != 0.0
    }
}

/// Direct-lighting terms for a single light at a single point.
#[derive(Clone, Debug)]
pub struct DirectLight {
    /// The light's spectral colour.
    pub colour: Spectrum,

    /// Lambert cosine factor.
    pub diffuse: Float,

    /// Phong lobe factor, already raised to the shininess exponent.
    pub specular: Float,

    /// Unit direction from the shaded point towards the light.
    pub d2l: Vec3,
}

/// Evaluate the direct contribution of one light at a hit point.
/// Spot lights are not implemented; they fall back to the point-light
/// direction with no shading terms.
///
/// * `light`    - The light.
/// * `hit`      - The shaded point.
/// * `material` - The material at the point, for its Phong exponent.
pub fn direct_light(light: &Light, hit: &Hit, material: &Material) -> DirectLight {
    let colour = Spectrum::from(&light.colour);
    let mut ld = Vec3::ZERO;
    let d2l;
    if light.direction.length() == 0.0 {
        // Point light.
        d2l = (light.position - hit.p).normalize();
        ld = d2l;
    } else if light.penumbra == 0.0 && light.angle == 0.0 {
        // Directional light.
        d2l = light.direction.normalize();
        ld = d2l;
    } else {
        d2l = (light.position - hit.p).normalize();
        warn!("Spot lights are not implemented yet");
    }
    let diffuse = hit.n.dot(ld).max(0.0);
    let specular = if diffuse > 0.0 {
        reflect(ld, hit.n)
            .normalize()
            .dot(hit.d2c)
            .max(0.0)
            .powf(material.shiny())
    } else {
        0.0
    };
    DirectLight {
        colour,
        diffuse,
        specular,
        d2l,
    }
}

/// Jittered positions over an area light's quad, `⌊√samples⌋²` of
/// them in a stratified grid.
///
/// * `light`   - The area light.
/// * `samples` - Requested sample count.
pub fn sample_area_light(light: &Light, samples: usize) -> Vec<Vec3> {
    let mut rng = rand::thread_rng();
    let n = (samples as Float).sqrt() as usize;
    let mut positions = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            let u = (i as Float + rng.gen::<Float>()) / n as Float;
            let v = (j as Float + rng.gen::<Float>()) / n as Float;
            positions.push(light.position + u * light.wvec + v * light.hvec);
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit_hit() -> Hit {
        let mut h = Hit::miss();
        h.t = 1.0;
        h.p = Vec3::ZERO;
        h.n = Vec3::new(0.0, 0.0, 1.0);
        h.d2c = Vec3::new(0.0, 0.0, 1.0);
        h.d2r = Vec3::new(0.0, 0.0, 1.0);
        h
    }

    #[test]
    fn directional_light_uses_its_direction() {
        let light = Light {
            direction: Vec3::new(0.0, 0.0, 2.0),
            colour: Fourier::from_spectrum(&Spectrum::new(1.0)),
            ..Light::default()
        };
        let dld = direct_light(&light, &lit_hit(), &Material::default());
        assert_eq!(dld.d2l, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(dld.diffuse, 1.0);
    }

    #[test]
    fn point_light_points_from_surface_to_light() {
        let light = Light {
            position: Vec3::new(0.0, 0.0, 5.0),
            colour: Fourier::from_spectrum(&Spectrum::new(1.0)),
            ..Light::default()
        };
        let dld = direct_light(&light, &lit_hit(), &Material::default());
        assert_eq!(dld.d2l, Vec3::new(0.0, 0.0, 1.0));
        // The lobe mirrors the to-light vector through the surface, so
        // a head-on view sits at its zero.
        assert_eq!(dld.specular, 0.0);
        assert_eq!(dld.diffuse, 1.0);
    }

    #[test]
    fn back_facing_light_contributes_nothing() {
        let light = Light {
            direction: Vec3::new(0.0, 0.0, -1.0),
            colour: Fourier::from_spectrum(&Spectrum::new(1.0)),
            ..Light::default()
        };
        let dld = direct_light(&light, &lit_hit(), &Material::default());
        assert_eq!(dld.diffuse, 0.0);
        assert_eq!(dld.specular, 0.0);
    }

    #[test]
    fn area_samples_cover_the_quad() {
        let light = Light {
            position: Vec3::ZERO,
            wvec: Vec3::new(1.0, 0.0, 0.0),
            hvec: Vec3::new(0.0, 1.0, 0.0),
            ..Light::default()
        };
        assert!(light.is_area());
        for p in sample_area_light(&light, 25) {
            assert!((0.0..=1.0).contains(&p.x));
            assert!((0.0..=1.0).contains(&p.y));
            assert_eq!(p.z, 0.0);
        }
    }
}
