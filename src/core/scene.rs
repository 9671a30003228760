//! Scene ownership and the light-transport integrator.

use crate::accelerators::bvh::Bvh;
use crate::core::camera::Camera;
use crate::core::config::Config;
use crate::core::denoise::PixelMetadata;
use crate::core::geometry::*;
use crate::core::light::*;
use crate::core::material::*;
use crate::core::medium::*;
use crate::core::primitive::*;
use crate::core::prism::*;
use crate::core::sampler;
use crate::core::spectrum::Spectrum;
use glam::Vec3;
use rand::Rng;
use std::collections::HashMap;
use std::f32::consts::PI;
use std::path::PathBuf;

/// Area-light samples per next-event estimate in path mode.
const NEE_LIGHT_SAMPLES: usize = 25;

/// Area-light samples per direct estimate in classic mode.
const CLASSIC_LIGHT_SAMPLES: usize = 100;

/// Everything the renderer needs to shade a frame. Built by the scene
/// loader, then treated as read-only shared state across the worker
/// pool once the BVH exists.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    /// Path of the file the scene was loaded from.
    pub filepath: PathBuf,

    /// True once loading produced usable geometry.
    pub validated: bool,

    /// The camera.
    pub camera: Camera,

    /// Geometric vertices referenced by primitives.
    pub vertices: Vec<Vec3>,

    /// Non-geometric vectors (directions, up hints).
    pub nongeos: Vec<Vec3>,

    /// All light sources.
    pub lights: Vec<Light>,

    /// Renderable geometry.
    pub primitives: Vec<Primitive>,

    /// Emissive geometry backing sphere lights; folded into
    /// `primitives` when the BVH is built.
    pub light_primitives: Vec<Primitive>,

    /// Materials declared by the scene's material libraries.
    pub materials: Vec<Material>,

    /// Material indices by declaration name.
    pub material_names: HashMap<String, usize>,

    /// The acceleration structure over `primitives`.
    pub bvh: Bvh,
}

impl Scene {
    /// Resolve a material handle against the scene and the process
    /// singletons.
    ///
    /// * `r` - The handle.
    pub fn material(&self, r: MaterialRef) -> &Material {
        match r {
            MaterialRef::Air => &AIR_MATERIAL,
            MaterialRef::Default => &DEFAULT_MATERIAL,
            MaterialRef::Fog => &FOG_MATERIAL,
            MaterialRef::Scene(i) => &self.materials[i],
        }
    }

    /// Fold the light geometry into the primitive list and build the
    /// acceleration structure over the result. Must complete before
    /// any worker shades.
    pub fn build_bvh(&mut self) {
        let mut extra = std::mem::take(&mut self.light_primitives);
        self.primitives.append(&mut extra);
        self.bvh = Bvh::build(&self.primitives);
    }

    /// Trace a ray into the scene. On a hit the record's normal is
    /// oriented towards the ray origin and the specular mirror
    /// direction is filled in.
    ///
    /// * `ray` - The ray.
    pub fn intersect(&self, ray: &Ray) -> Hit {
        if self.bvh.is_empty() || !self.bvh.hit_node(ray, 0) {
            return Hit::miss();
        }
        let mut h = self.bvh.intersect(ray, &self.primitives);
        if h.t > 0.0 {
            h.d2c = (ray.p - h.p).normalize();
            if h.n.dot(h.d2c) < 0.0 {
                h.n = -h.n;
            }
            h.d2r = (-reflect(h.d2c, h.n)).normalize();
        }
        h
    }

    /// The Monte-Carlo radiance estimate for one pixel: Halton-offset
    /// primaries averaged over the configured sample count.
    ///
    /// * `x` - Pixel column.
    /// * `y` - Pixel row.
    pub fn shade_pixel(&self, x: usize, y: usize) -> Spectrum {
        let config = Config::get();
        let count = if config.pathtrace {
            config.path_samples.max(1)
        } else {
            1
        };
        let offsets = sampler::generate(count, x, y);
        let mut s = Spectrum::default();
        for offset in offsets.iter() {
            let ray = self.camera.generate_ray_offset(x, y, offset.x, offset.y);
            s += self.shade(&ray, &Medium::camera(ray.p), true);
        }
        s / count as Float
    }

    /// Radiance arriving along a ray through a given medium.
    ///
    /// On a miss in path mode the surrounding medium still matters: a
    /// ray that escaped from inside a non-air, non-volumetric material
    /// picks up direct lighting evaluated at its exit direction, which
    /// is how surfaces see the scene's directional and point lights.
    ///
    /// * `ray`    - The ray.
    /// * `medium` - The medium the ray travels through.
    /// * `area`   - Whether area-light next-event estimation runs on
    ///              the hit this ray produces.
    pub fn shade(&self, ray: &Ray, medium: &Medium, area: bool) -> Spectrum {
        let config = Config::get();
        let h = self.intersect(ray);
        if h.is_hit() {
            return if config.pathtrace {
                self.path_colour(&h, medium, area)
            } else {
                self.ray_colour(&h, medium)
            };
        }
        let surrounding = self.material(medium.material);
        if config.pathtrace
            && medium.material != MaterialRef::Air
            && surrounding.material_type() != MaterialType::Volumetric
        {
            let mut h2 = Hit::miss();
            h2.n = ray.d;
            h2.p = ray.p;
            let mut s = Spectrum::default();
            for light in self.lights.iter() {
                let dld = direct_light(light, &h2, surrounding);
                s += dld.colour
                    * surrounding.diffuse().evaluate(dld.diffuse)
                    * medium.throughput;
            }
            return s;
        }
        Spectrum::default()
    }

    /// The path-tracing estimator.
    fn path_colour(&self, hit: &Hit, medium: &Medium, area: bool) -> Spectrum {
        let config = Config::get();
        let me = MaterialRef::from_id(hit.material);
        let m = self.material(me);

        if m.emissive() {
            return medium.throughput * m.emission();
        }

        let mut s = Spectrum::default();

        // Next-event estimation against area lights, primary hits
        // only; deeper bounces find emissive geometry by sampling.
        if area {
            for light in self.lights.iter().filter(|l| l.is_area()) {
                let light_normal = light.wvec.cross(light.hvec).normalize();
                let quad_area = light.wvec.cross(light.hvec).length();
                let positions = sample_area_light(light, NEE_LIGHT_SAMPLES);
                for point in positions.iter() {
                    let direction = *point - hit.p;
                    let dir_norm = direction.normalize();
                    let dist = direction.length();
                    let cos_light = (-dir_norm).dot(light_normal);
                    if cos_light <= 0.0 {
                        continue;
                    }
                    let t = self
                        .intersect(&Ray::new(hit.p + dir_norm * EPSILON, dir_norm))
                        .t;
                    if t >= 0.0 && t < hit.t {
                        continue;
                    }
                    let cos_theta = hit.n.dot(dir_norm).max(0.0);
                    let diffuse =
                        Spectrum::from(&light.colour) * (m.diffuse().evaluate(cos_theta) / PI);
                    let factor = quad_area / (dist * dist);
                    s += diffuse
                        * (cos_light * factor / positions.len() as Float)
                        * medium.throughput;
                }
            }
        }

        let mut rng = rand::thread_rng();
        let volumetric = m.material_type() == MaterialType::Volumetric;
        for sample in m.sample(hit, medium, me) {
            if sample.pdf <= 0.0 || medium.bounces >= config.max_depth {
                continue;
            }
            let cos_theta = sample.incoming.dot(hit.n).max(0.0);

            // A delta pass through a volume attenuates but keeps the
            // surrounding medium; every other event enters this
            // material.
            let (mut next_t, next_material) = if volumetric && sample.delta {
                (
                    medium.throughput * Spectrum::new(sample.transmission),
                    medium.material,
                )
            } else {
                let weight = if sample.delta {
                    1.0
                } else {
                    cos_theta / sample.pdf
                };
                (medium.throughput * sample.colour * weight, me)
            };

            // A black path can never contribute; don't recurse for it.
            if next_t.black() {
                continue;
            }

            if medium.bounces > config.min_depth && !russian_roulette(&mut next_t, &mut rng) {
                continue;
            }

            s += self.shade(
                &Ray::new(hit.p + sample.incoming * EPSILON, sample.incoming),
                &Medium {
                    ior: sample.ior,
                    bounces: medium.bounces + 1,
                    material: next_material,
                    throughput: next_t,
                    wavelength: sample.wavelength,
                    previous: hit.p,
                },
                false,
            );
        }

        s.translate(m.convert());
        s
    }

    /// The classic recursive estimator: ambient plus shadow-tested
    /// direct lighting plus a Fresnel-weighted dielectric split.
    fn ray_colour(&self, hit: &Hit, medium: &Medium) -> Spectrum {
        let config = Config::get();
        let me = MaterialRef::from_id(hit.material);
        let m = self.material(me);

        let mut s = m.ambient().spectrum();
        for light in self.lights.iter() {
            if light.is_area() {
                let positions = sample_area_light(light, CLASSIC_LIGHT_SAMPLES);
                let mut aggregate = Spectrum::default();
                for point in positions.iter() {
                    let mut sample_light = light.clone();
                    sample_light.position = *point;
                    let dld = direct_light(&sample_light, hit, m);
                    let t = self
                        .intersect(&Ray::new(hit.p + dld.d2l * EPSILON, dld.d2l))
                        .t;
                    if t <= 0.0 || t > hit.t {
                        aggregate += Spectrum::from(m.absorb())
                            * dld.colour
                            * (m.diffuse().evaluate(dld.diffuse)
                                + m.specular().evaluate(dld.specular));
                    }
                }
                s += aggregate / positions.len() as Float;
            } else {
                let dld = direct_light(light, hit, m);
                if self
                    .intersect(&Ray::new(hit.p + dld.d2l * EPSILON, dld.d2l))
                    .t
                    <= 0.0
                {
                    s += Spectrum::from(m.absorb())
                        * dld.colour
                        * (m.diffuse().evaluate(dld.diffuse)
                            + m.specular().evaluate(dld.specular));
                }
            }
        }

        let next_t = medium.throughput * Spectrum::from(m.absorb());
        let next_bounces = medium.bounces + 1;
        if m.material_type() == MaterialType::Dielectric && medium.bounces < config.max_depth {
            let mut split = Spectrum::default();
            for i in 0..SPECTRAL_SAMPLES {
                split[i] = crate::core::reflection::fresnel_dielectric(
                    hit.d2c,
                    hit.n,
                    medium.ior,
                    m.ior().evaluate(wavelength(i)),
                );
            }

            let reflected = self.shade(
                &Ray::new(hit.p + hit.d2r * EPSILON, hit.d2r),
                &Medium {
                    ior: medium.ior,
                    bounces: next_bounces,
                    material: me,
                    throughput: next_t,
                    wavelength: medium.wavelength,
                    previous: hit.p,
                },
                false,
            ) * split;

            // One refraction recurse per live bucket, each collapsed
            // to its wavelength.
            let bins: Vec<usize> = if medium.wavelength < SPECTRAL_SAMPLES {
                vec![medium.wavelength]
            } else {
                (0..SPECTRAL_SAMPLES).collect()
            };
            let mut refracted = Spectrum::default();
            for i in bins {
                let next_ref = if me == medium.material {
                    MaterialRef::Air
                } else {
                    me
                };
                let ior = self.material(next_ref).ior().evaluate(wavelength(i));
                if ior <= 0.0 {
                    continue;
                }
                let refract_dir = refract(hit.d2c, hit.n, medium.ior / ior);
                if refract_dir == Vec3::ZERO {
                    continue;
                }
                let refract_dir = refract_dir.normalize();
                refracted[i] += self.shade(
                    &Ray::new(hit.p + refract_dir * EPSILON, refract_dir),
                    &Medium {
                        ior,
                        bounces: next_bounces,
                        material: next_ref,
                        throughput: next_t,
                        wavelength: i,
                        previous: hit.p,
                    },
                    false,
                )[i]
                    * (1.0 - split[i]);
            }
            s += refracted + reflected;
        }

        s.translate(m.convert());
        s * medium.throughput
    }

    /// Probe the first-hit geometry of a primary ray for the denoiser
    /// channels. Dielectrics report no albedo.
    ///
    /// * `ray` - The primary ray.
    pub fn poll_metadata(&self, ray: &Ray) -> Option<PixelMetadata> {
        let h = self.intersect(ray);
        if !h.is_hit() {
            return None;
        }
        let m = self.material(MaterialRef::from_id(h.material));
        let albedo = (m.material_type() != MaterialType::Dielectric)
            .then(|| Spectrum::from(m.absorb()).rgb().clamp(Vec3::ZERO, Vec3::ONE));
        Some(PixelMetadata {
            normal: h.n,
            position: h.p,
            albedo,
        })
    }
}

/// Probabilistically terminate a path, reweighting the survivor so
/// the estimator stays unbiased. Returns false when the path dies.
///
/// * `next_t` - The candidate throughput; divided by the survival
///              probability in place.
/// * `rng`    - The random source.
pub fn russian_roulette(next_t: &mut Spectrum, rng: &mut impl Rng) -> bool {
    let p = next_t.max().clamp(0.05, 1.0);
    if rng.gen::<Float>() > p {
        return false;
    }
    *next_t /= p;
    true
}
