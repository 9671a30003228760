//! Path state carried between bounces.

use crate::core::prism::*;
use crate::core::spectrum::Spectrum;
use glam::Vec3;

/// A handle to a material: one of the process-wide singletons or an
/// index into the scene's material table. Carried instead of
/// references so path state stays `Copy` and shareable across worker
/// threads.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MaterialRef {
    /// The surrounding-vacuum singleton.
    Air,

    /// The gray fallback singleton.
    Default,

    /// The volumetric fog singleton.
    Fog,

    /// A material owned by the scene.
    Scene(usize),
}

impl MaterialRef {
    /// Resolve the index stored on a primitive, where -1 selects the
    /// default material.
    ///
    /// * `id` - The stored index.
    pub fn from_id(id: i32) -> Self {
        if id < 0 {
            Self::Default
        } else {
            Self::Scene(id as usize)
        }
    }
}

/// The medium a ray is travelling through, together with the
/// bookkeeping the recursive estimator threads along the path.
#[derive(Copy, Clone, Debug)]
pub struct Medium {
    /// Refractive index of the current medium.
    pub ior: Float,

    /// Bounce count so far.
    pub bounces: usize,

    /// The material the ray is inside.
    pub material: MaterialRef,

    /// Accumulated path throughput.
    pub throughput: Spectrum,

    /// Live spectral bucket, or [`ALL_WAVELENGTHS`] while the path is
    /// still broadband.
    pub wavelength: usize,

    /// Origin of the current segment, for absorption distances.
    pub previous: Vec3,
}

impl Medium {
    /// The medium of a freshly spawned eye ray: air, full throughput,
    /// every wavelength live.
    ///
    /// * `origin` - The camera position.
    pub fn camera(origin: Vec3) -> Self {
        Self {
            ior: 1.0,
            bounces: 0,
            material: MaterialRef::Air,
            throughput: Spectrum::new(1.0),
            wavelength: ALL_WAVELENGTHS,
            previous: origin,
        }
    }
}
