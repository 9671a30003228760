//! Materials and their scattering behaviour.

use crate::core::fourier::Fourier;
use crate::core::geometry::*;
use crate::core::medium::*;
use crate::core::noise;
use crate::core::primitive::Hit;
use crate::core::prism::*;
use crate::core::reflection::*;
use crate::core::spectrum::Spectrum;
use glam::Vec3;
use once_cell::sync::Lazy;
use rand::Rng;
use std::f32::consts::PI;

/// Raymarch step count through volumetric media.
const RAYMARCH_STEPS: usize = 32;

/// Scale applied to accumulated volumetric optical depth.
const DENSITY_SCALE: Float = 1.25;

/// Scattering model of a material.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MaterialType {
    Lambertian,
    Dielectric,
    Volumetric,
}

/// One candidate continuation of a path, produced by
/// [`Material::sample`].
#[derive(Clone, Debug)]
pub struct SurfaceSample {
    /// Direction the path continues in.
    pub incoming: Vec3,

    /// Probability density of this direction.
    pub pdf: Float,

    /// Spectral contribution of the event.
    pub colour: Spectrum,

    /// True for specular events whose direction admits no density.
    pub delta: bool,

    /// Spectral bucket the path is collapsed to, or
    /// [`ALL_WAVELENGTHS`].
    pub wavelength: usize,

    /// Refractive index the continuation travels through.
    pub ior: Float,

    /// Transmittance through a volumetric segment; only meaningful
    /// for volumetric samples.
    pub transmission: Float,
}

/// A surface or volume description: a bundle of Fourier response and
/// reflectance curves plus the scattering model that interprets them.
#[derive(Clone, Debug)]
pub struct Material {
    ambient: Fourier,
    convert: Fourier,
    absorb: Fourier,
    diffuse: Fourier,
    specular: Fourier,
    ior: Fourier,
    emission: Fourier,
    transmission: Fourier,
    shiny: Float,
    emissive: bool,
    diffract: bool,
    material_type: MaterialType,
}

impl Default for Material {
    /// The gray Lambertian fallback.
    fn default() -> Self {
        Self {
            ambient: Fourier::from_spectrum(&Spectrum::new(0.0)),
            convert: Fourier::default(),
            absorb: Fourier::from_spectrum(&Spectrum::new(0.8)),
            diffuse: Fourier::default(),
            specular: Fourier::default(),
            ior: Fourier::from_spectrum(&Spectrum::new(1.0)),
            emission: Fourier::from_spectrum(&Spectrum::new(0.0)),
            transmission: Fourier::from_spectrum(&Spectrum::new(0.0)),
            shiny: 25.0,
            emissive: false,
            diffract: false,
            material_type: MaterialType::Lambertian,
        }
    }
}

/// The global fallback material.
pub static DEFAULT_MATERIAL: Lazy<Material> = Lazy::new(Material::default);

/// The medium eye rays start in.
pub static AIR_MATERIAL: Lazy<Material> = Lazy::new(Material::air);

/// The built-in volumetric fog.
pub static FOG_MATERIAL: Lazy<Material> = Lazy::new(Material::fog);

impl Material {
    /// The empty-curve air medium with unit refractive index.
    pub fn air() -> Self {
        Self {
            ambient: Fourier::default(),
            convert: Fourier::default(),
            absorb: Fourier::default(),
            diffuse: Fourier::default(),
            specular: Fourier::default(),
            ior: Fourier::from_spectrum(&Spectrum::new(1.0)),
            emission: Fourier::default(),
            transmission: Fourier::from_spectrum(&Spectrum::new(0.0)),
            shiny: 0.0,
            emissive: false,
            diffract: false,
            material_type: MaterialType::Lambertian,
        }
    }

    /// The built-in fog volume.
    pub fn fog() -> Self {
        Self {
            ambient: Fourier::from_spectrum(&Spectrum::new(1.0)),
            absorb: Fourier::from_spectrum(&Spectrum::new(0.7)),
            material_type: MaterialType::Volumetric,
            ..Self::default()
        }
    }

    pub fn ambient(&self) -> &Fourier {
        &self.ambient
    }

    pub fn convert(&self) -> &Fourier {
        &self.convert
    }

    pub fn absorb(&self) -> &Fourier {
        &self.absorb
    }

    pub fn diffuse(&self) -> &Fourier {
        &self.diffuse
    }

    pub fn specular(&self) -> &Fourier {
        &self.specular
    }

    pub fn ior(&self) -> &Fourier {
        &self.ior
    }

    pub fn emission(&self) -> &Fourier {
        &self.emission
    }

    pub fn transmission(&self) -> &Fourier {
        &self.transmission
    }

    pub fn shiny(&self) -> Float {
        self.shiny
    }

    pub fn emissive(&self) -> bool {
        self.emissive
    }

    pub fn diffract(&self) -> bool {
        self.diffract
    }

    pub fn material_type(&self) -> MaterialType {
        self.material_type
    }

    pub fn set_ambient(&mut self, f: Fourier) {
        self.ambient = f;
    }

    pub fn set_convert(&mut self, f: Fourier) {
        self.convert = f;
    }

    pub fn set_absorb(&mut self, f: Fourier) {
        self.absorb = f;
    }

    pub fn set_diffuse(&mut self, f: Fourier) {
        self.diffuse = f;
    }

    pub fn set_specular(&mut self, f: Fourier) {
        self.specular = f;
    }

    pub fn set_ior(&mut self, f: Fourier) {
        self.ior = f;
    }

    /// Setting a non-empty emission curve marks the material emissive.
    pub fn set_emission(&mut self, f: Fourier) {
        self.emissive = !f.empty();
        self.emission = f;
    }

    pub fn set_transmission(&mut self, f: Fourier) {
        self.transmission = f;
    }

    pub fn set_shiny(&mut self, f: Float) {
        self.shiny = f;
    }

    pub fn set_material_type(&mut self, t: MaterialType) {
        self.material_type = t;
    }

    pub fn set_diffract(&mut self, b: bool) {
        self.diffract = b;
    }

    /// Sample the continuation directions of a path that hit this
    /// material.
    ///
    /// * `hit`    - The intersection record.
    /// * `medium` - The medium the arriving ray travelled through.
    /// * `me`     - The handle the scene resolves this material by;
    ///              compared against `medium.material` to detect rays
    ///              travelling inside the material.
    pub fn sample(&self, hit: &Hit, medium: &Medium, me: MaterialRef) -> Vec<SurfaceSample> {
        match self.material_type {
            MaterialType::Lambertian => self.sample_lambertian(hit, medium),
            MaterialType::Dielectric => {
                if self.diffract {
                    self.sample_dielectric_diffractive(hit, medium, me)
                } else {
                    vec![self.sample_dielectric(hit, medium, me)]
                }
            }
            MaterialType::Volumetric => vec![self.sample_volumetric(hit, medium)],
        }
    }

    fn sample_lambertian(&self, hit: &Hit, medium: &Medium) -> Vec<SurfaceSample> {
        let wi = onb(hit.n, hemisphere_sample()).normalize();
        let pdf = hit.n.dot(wi).max(0.0) / PI;
        vec![SurfaceSample {
            incoming: wi,
            pdf,
            colour: Spectrum::from(&self.absorb) / PI,
            delta: false,
            wavelength: medium.wavelength,
            ior: medium.ior,
            transmission: 0.0,
        }]
    }

    fn sample_dielectric(&self, hit: &Hit, medium: &Medium, me: MaterialRef) -> SurfaceSample {
        let mut rng = rand::thread_rng();
        let distance = (hit.p - medium.previous).length();
        let inside = medium.material == me;

        // Hero wavelength: a broadband path collapses to one bucket
        // that the dispersion-dependent terms are evaluated at.
        let bin = if medium.wavelength >= SPECTRAL_SAMPLES {
            rng.gen_range(0..SPECTRAL_SAMPLES)
        } else {
            medium.wavelength
        };
        let t = if inside {
            (-distance * self.transmission.evaluate(wavelength(bin))).exp()
        } else {
            1.0
        };
        let ior = self.ior.evaluate(wavelength(bin));
        let r = fresnel_dielectric(hit.d2c, hit.n, medium.ior, ior);

        if rng.gen::<Float>() > r {
            // Refract.
            SurfaceSample {
                incoming: refract(hit.d2c, hit.n, medium.ior / ior).normalize(),
                pdf: 1.0 - r,
                colour: Spectrum::from(&self.absorb) * ((1.0 - r) * t),
                delta: true,
                wavelength: bin,
                ior,
                transmission: 0.0,
            }
        } else {
            // Reflect; an interior reflection keeps the full spectrum.
            let colour = if inside {
                Spectrum::new(1.0)
            } else {
                Spectrum::from(&self.absorb)
            };
            SurfaceSample {
                incoming: hit.d2r,
                pdf: r,
                colour: colour * (r * t),
                delta: true,
                wavelength: medium.wavelength,
                ior: medium.ior,
                transmission: 0.0,
            }
        }
    }

    fn sample_dielectric_diffractive(
        &self,
        hit: &Hit,
        medium: &Medium,
        me: MaterialRef,
    ) -> Vec<SurfaceSample> {
        // A collapsed path stays in its bucket; a broadband one splits
        // into one sample per bucket.
        if medium.wavelength < SPECTRAL_SAMPLES {
            vec![self.sample_dielectric_bin(hit, medium, me, medium.wavelength)]
        } else {
            (0..SPECTRAL_SAMPLES)
                .map(|bin| self.sample_dielectric_bin(hit, medium, me, bin))
                .collect()
        }
    }

    fn sample_dielectric_bin(
        &self,
        hit: &Hit,
        medium: &Medium,
        me: MaterialRef,
        bin: usize,
    ) -> SurfaceSample {
        let mut rng = rand::thread_rng();
        let distance = (hit.p - medium.previous).length();
        let inside = medium.material == me;

        let ior = self.ior.evaluate(wavelength(bin));
        let r = fresnel_dielectric(hit.d2c, hit.n, medium.ior, ior);
        let t = if inside {
            (-distance * self.transmission.evaluate(wavelength(bin))).exp()
        } else {
            1.0
        };
        let mut absorption = Spectrum::isolate(&Spectrum::from(&self.absorb), bin);

        if rng.gen::<Float>() > r {
            // Refract.
            SurfaceSample {
                incoming: refract(hit.d2c, hit.n, medium.ior / ior).normalize(),
                pdf: 1.0 - r,
                colour: absorption * ((1.0 - r) * t),
                delta: true,
                wavelength: bin,
                ior,
                transmission: 0.0,
            }
        } else {
            // Reflect.
            if inside {
                absorption = Spectrum::new(1.0);
            }
            SurfaceSample {
                incoming: hit.d2r,
                pdf: r,
                colour: absorption * (r * t),
                delta: true,
                wavelength: bin,
                ior: medium.ior,
                transmission: 0.0,
            }
        }
    }

    fn sample_volumetric(&self, hit: &Hit, medium: &Medium) -> SurfaceSample {
        let mut rng = rand::thread_rng();
        let dir = hit.p - medium.previous;
        let distance = dir.length();
        let ray_dir = dir.normalize();

        // Attenuation-only raymarch: threshold the noise field and
        // accumulate optical depth.
        let mut weight = 0.0;
        for i in 0..RAYMARCH_STEPS {
            let pos = medium.previous
                + ray_dir * (distance * (i as Float + 0.5) / RAYMARCH_STEPS as Float);
            let mut density = noise::perlin(pos);
            density = if density < 0.22 {
                0.0
            } else {
                (density - 0.5) * 2.0
            };
            weight += density * DENSITY_SCALE * (distance / RAYMARCH_STEPS as Float);
        }
        let t = (-weight).exp();

        let bin = if medium.wavelength >= SPECTRAL_SAMPLES {
            rng.gen_range(0..SPECTRAL_SAMPLES)
        } else {
            medium.wavelength
        };

        let fog_colour = Spectrum::new(1.0);
        SurfaceSample {
            incoming: ray_dir,
            pdf: 1.0,
            colour: fog_colour * (1.0 - t) + Spectrum::new(t),
            delta: true,
            wavelength: bin,
            ior: medium.ior,
            transmission: t,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::primitive::Primitive;

    fn head_on_hit(material: i32) -> Hit {
        let sphere = Primitive::sphere(Vec3::ZERO, 0.5, material);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 3.0), Vec3::new(0.0, 0.0, -1.0));
        let mut h = sphere.intersect(&ray);
        h.d2c = (ray.p - h.p).normalize();
        h.d2r = (-reflect(h.d2c, h.n)).normalize();
        h
    }

    fn glass() -> Material {
        let mut m = Material::default();
        m.set_material_type(MaterialType::Dielectric);
        m.set_ior(Fourier::from_spectrum(&Spectrum::new(1.5)));
        m.set_absorb(Fourier::from_spectrum(&Spectrum::new(1.0)));
        m
    }

    #[test]
    fn lambertian_sample_is_cosine_weighted() {
        let m = Material::default();
        let hit = head_on_hit(-1);
        let medium = Medium::camera(Vec3::new(0.0, 0.0, 3.0));
        let samples = m.sample(&hit, &medium, MaterialRef::Default);
        assert_eq!(samples.len(), 1);
        let s = &samples[0];
        assert!(!s.delta);
        let cos = hit.n.dot(s.incoming).max(0.0);
        assert!((s.pdf - cos / PI).abs() < 1e-5);
    }

    #[test]
    fn dielectric_pdfs_partition_fresnel() {
        let m = glass();
        let hit = head_on_hit(0);
        let medium = Medium::camera(Vec3::new(0.0, 0.0, 3.0));
        // Head-on glass reflects ~4%; whichever branch the coin picks,
        // the pdf must match that Fresnel weight.
        for _ in 0..64 {
            let s = &m.sample(&hit, &medium, MaterialRef::Scene(0))[0];
            assert!(s.delta);
            if s.incoming.z > 0.0 {
                assert!((s.pdf - 0.04).abs() < 1e-3, "reflection pdf {}", s.pdf);
            } else {
                assert!((s.pdf - 0.96).abs() < 1e-3, "refraction pdf {}", s.pdf);
            }
        }
    }

    #[test]
    fn diffractive_glass_splits_per_bucket() {
        let mut m = glass();
        m.set_diffract(true);
        let hit = head_on_hit(0);
        let medium = Medium::camera(Vec3::new(0.0, 0.0, 3.0));
        let samples = m.sample(&hit, &medium, MaterialRef::Scene(0));
        assert_eq!(samples.len(), SPECTRAL_SAMPLES);
        for (bin, s) in samples.iter().enumerate() {
            assert_eq!(s.wavelength, bin);
            for other in 0..SPECTRAL_SAMPLES {
                if other != bin {
                    assert_eq!(s.colour[other], 0.0);
                }
            }
        }
    }

    #[test]
    fn collapsed_medium_yields_exactly_one_diffractive_sample() {
        let mut m = glass();
        m.set_diffract(true);
        let hit = head_on_hit(0);
        let mut medium = Medium::camera(Vec3::new(0.0, 0.0, 3.0));
        medium.wavelength = 4;
        let samples = m.sample(&hit, &medium, MaterialRef::Scene(0));
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].wavelength, 4);
    }

    #[test]
    fn volumetric_sample_passes_straight_through() {
        let m = Material::fog();
        let hit = head_on_hit(0);
        let medium = Medium::camera(Vec3::new(0.0, 0.0, 3.0));
        let s = &m.sample(&hit, &medium, MaterialRef::Fog)[0];
        assert!(s.delta);
        assert_eq!(s.pdf, 1.0);
        assert!((0.0..=1.0).contains(&s.transmission));
        let expected = (hit.p - medium.previous).normalize();
        assert!(s.incoming.dot(expected) > 0.999);
    }
}
