//! CIE 1931 colour matching.

use crate::core::prism::*;
use glam::Vec3;
use once_cell::sync::Lazy;

/// CIE 1931 2-degree standard observer sampled at the bucket centre
/// wavelengths. Buckets below 360nm sit outside the observer's
/// support and are zero.
#[rustfmt::skip]
const RAW_CMF: [[Float; 3]; SPECTRAL_SAMPLES] = [
    [0.000000, 0.000000, 0.000000], // 130nm
    [0.000000, 0.000000, 0.000000], // 190nm
    [0.000000, 0.000000, 0.000000], // 250nm
    [0.000000, 0.000000, 0.000000], // 310nm
    [0.000415, 0.000012, 0.001946], // 370nm
    [0.283890, 0.011600, 1.385600], // 430nm
    [0.032010, 0.208020, 0.465180], // 490nm
    [0.433450, 0.994950, 0.008750], // 550nm
    [1.002600, 0.503000, 0.003400], // 610nm
    [0.087470, 0.032100, 0.000000], // 670nm
];

/// D65 white point in XYZ.
const WHITE: [Float; 3] = [0.950456, 1.0, 1.088754];

// The coarse 10-bucket sampling does not integrate to the observer's
// white, so each column is rescaled such that an equal-energy
// spectrum lands exactly on the sensor white point.
static CMF: Lazy<[Vec3; SPECTRAL_SAMPLES]> = Lazy::new(|| {
    let mut sums = [0.0 as Float; 3];
    for row in RAW_CMF.iter() {
        for (sum, v) in sums.iter_mut().zip(row.iter()) {
            *sum += v * BIN_WIDTH;
        }
    }
    let mut table = [Vec3::ZERO; SPECTRAL_SAMPLES];
    for (entry, row) in table.iter_mut().zip(RAW_CMF.iter()) {
        *entry = Vec3::new(
            row[0] * WHITE[0] / sums[0],
            row[1] * WHITE[1] / sums[1],
            row[2] * WHITE[2] / sums[2],
        );
    }
    table
});

/// Returns the colour-matching weights for a bucket centre.
///
/// * `bin` - The spectral bucket index.
pub fn matching(bin: usize) -> Vec3 {
    CMF[bin]
}

/// Returns the colour-matching weights for an arbitrary wavelength by
/// snapping it to the bucket that contains it.
///
/// * `lambda` - The wavelength in nanometers.
pub fn lookup(lambda: Float) -> Vec3 {
    let bin = ((lambda - LAMBDA_START) / BIN_WIDTH)
        .clamp(0.0, SPECTRAL_SAMPLES as Float - 1.0) as usize;
    CMF[bin]
}

/// Forces the lazily-built table so later lookups never race its
/// construction.
pub fn init() {
    Lazy::force(&CMF);
}
