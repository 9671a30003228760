//! Power spectral density vectors.

use crate::core::cie;
use crate::core::fourier::Fourier;
use crate::core::prism::*;
use glam::Vec3;
use std::ops::{Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Sub, SubAssign};

/// A fixed-resolution power spectral density covering
/// [`LAMBDA_START`, `LAMBDA_END`]. Bucket `i` carries the power at the
/// centre wavelength returned by [`wavelength`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Spectrum {
    samples: [Float; SPECTRAL_SAMPLES],
}

impl Default for Spectrum {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Spectrum {
    /// Create a spectrum with every bucket set to a constant.
    ///
    /// * `v` - The power in each bucket.
    pub fn new(v: Float) -> Self {
        Self {
            samples: [v; SPECTRAL_SAMPLES],
        }
    }

    /// Create a spectrum from (wavelength, value) pairs. Each value is
    /// stored in the bucket containing its wavelength; buckets without
    /// a pair remain zero.
    ///
    /// * `lambdas` - The wavelengths in nanometers. Must be in range
    ///               and match `values` in length.
    /// * `values`  - The power values.
    pub fn from_pairs(lambdas: &[Float], values: &[Float]) -> Self {
        assert!(
            lambdas.len() == values.len(),
            "each wavelength needs exactly one value"
        );
        let mut s = Self::default();
        for (lambda, value) in lambdas.iter().zip(values.iter()) {
            assert!(
                (LAMBDA_START..=LAMBDA_END).contains(lambda),
                "wavelength {} is out of range",
                lambda
            );
            let bin = ((lambda - LAMBDA_START) / BIN_WIDTH) as usize;
            s.samples[bin.min(SPECTRAL_SAMPLES - 1)] = *value;
        }
        s
    }

    /// The bucket containing a wavelength, clamped to the valid range.
    ///
    /// * `lambda` - The wavelength in nanometers.
    pub fn bin(lambda: Float) -> usize {
        ((lambda - LAMBDA_START) / BIN_WIDTH).clamp(0.0, SPECTRAL_SAMPLES as Float - 1.0) as usize
    }

    /// Redistribute each bucket into the bucket selected by a mapping
    /// curve (a histogram remap; the cheap way to shift wavelengths
    /// without resampling). An empty curve maps every bucket onto
    /// itself.
    ///
    /// * `f` - Curve mapping a source wavelength to a target one.
    pub fn translate(&mut self, f: &Fourier) {
        let old = self.samples;
        self.samples = [0.0; SPECTRAL_SAMPLES];
        for (i, v) in old.iter().enumerate() {
            self.samples[Self::bin(f.evaluate(wavelength(i)))] += v;
        }
    }

    /// True when every bucket is exactly zero.
    pub fn black(&self) -> bool {
        self.samples.iter().all(|v| *v == 0.0)
    }

    /// True when any bucket is NaN.
    pub fn nan(&self) -> bool {
        self.samples.iter().any(|v| v.is_nan())
    }

    /// The largest bucket value.
    pub fn max(&self) -> Float {
        self.samples[1..]
            .iter()
            .fold(self.samples[0], |m, v| m.max(*v))
    }

    /// Integrate against the CIE colour matching functions.
    pub fn xyz(&self) -> Vec3 {
        let mut out = Vec3::ZERO;
        for (i, v) in self.samples.iter().enumerate() {
            out += cie::matching(i) * *v * BIN_WIDTH;
        }
        out
    }

    /// Convert to linear sRGB, clamped to non-negative channels.
    #[rustfmt::skip]
    pub fn rgb(&self) -> Vec3 {
        let xyz = self.xyz();
        let rgb = Vec3::new(
             3.240479 * xyz.x - 1.537150 * xyz.y - 0.498535 * xyz.z,
            -0.969256 * xyz.x + 1.875991 * xyz.y + 0.041556 * xyz.z,
             0.055648 * xyz.x - 0.204043 * xyz.y + 1.057311 * xyz.z,
        );
        rgb.max(Vec3::ZERO)
    }

    /// A spectrum equal to `s` in one bucket and zero elsewhere.
    ///
    /// * `s`   - The source spectrum.
    /// * `bin` - The bucket to keep.
    pub fn isolate(s: &Spectrum, bin: usize) -> Spectrum {
        let mut out = Spectrum::default();
        out.samples[bin] = s.samples[bin];
        out
    }

    /// The raw bucket values.
    pub fn samples(&self) -> &[Float] {
        &self.samples
    }
}

impl From<&Fourier> for Spectrum {
    /// Sample a curve at every bucket centre.
    fn from(f: &Fourier) -> Self {
        let mut s = Self::default();
        for (i, v) in s.samples.iter_mut().enumerate() {
            *v = f.evaluate(wavelength(i));
        }
        s
    }
}

impl Index<usize> for Spectrum {
    type Output = Float;

    fn index(&self, i: usize) -> &Float {
        &self.samples[i]
    }
}

impl IndexMut<usize> for Spectrum {
    fn index_mut(&mut self, i: usize) -> &mut Float {
        &mut self.samples[i]
    }
}

// Bucket-wise arithmetic against another spectrum. Division performs
// no zero guarding; a caller dividing by a black spectrum gets NaNs it
// can detect with `nan()`.
macro_rules! spectrum_binop {
    ($op: ident, $func: ident, $assign_op: ident, $assign_func: ident, $binop: tt) => {
        impl $op<Spectrum> for Spectrum {
            type Output = Spectrum;

            fn $func(self, rhs: Spectrum) -> Spectrum {
                let mut out = self;
                for (v, r) in out.samples.iter_mut().zip(rhs.samples.iter()) {
                    *v = *v $binop r;
                }
                out
            }
        }

        impl $assign_op<Spectrum> for Spectrum {
            fn $assign_func(&mut self, rhs: Spectrum) {
                for (v, r) in self.samples.iter_mut().zip(rhs.samples.iter()) {
                    *v = *v $binop r;
                }
            }
        }
    };
}

// Bucket-wise arithmetic against a curve evaluated at bucket centres.
macro_rules! spectrum_fourier_binop {
    ($op: ident, $func: ident, $assign_op: ident, $assign_func: ident, $binop: tt) => {
        impl $op<&Fourier> for Spectrum {
            type Output = Spectrum;

            fn $func(self, rhs: &Fourier) -> Spectrum {
                let mut out = self;
                for (i, v) in out.samples.iter_mut().enumerate() {
                    *v = *v $binop rhs.evaluate(wavelength(i));
                }
                out
            }
        }

        impl $assign_op<&Fourier> for Spectrum {
            fn $assign_func(&mut self, rhs: &Fourier) {
                for (i, v) in self.samples.iter_mut().enumerate() {
                    *v = *v $binop rhs.evaluate(wavelength(i));
                }
            }
        }
    };
}

// Uniform arithmetic against a scalar.
macro_rules! spectrum_scalar_binop {
    ($op: ident, $func: ident, $assign_op: ident, $assign_func: ident, $binop: tt) => {
        impl $op<Float> for Spectrum {
            type Output = Spectrum;

            fn $func(self, rhs: Float) -> Spectrum {
                let mut out = self;
                for v in out.samples.iter_mut() {
                    *v = *v $binop rhs;
                }
                out
            }
        }

        impl $assign_op<Float> for Spectrum {
            fn $assign_func(&mut self, rhs: Float) {
                for v in self.samples.iter_mut() {
                    *v = *v $binop rhs;
                }
            }
        }
    };
}

spectrum_binop!(Add, add, AddAssign, add_assign, +);
spectrum_binop!(Sub, sub, SubAssign, sub_assign, -);
spectrum_binop!(Mul, mul, MulAssign, mul_assign, *);
spectrum_binop!(Div, div, DivAssign, div_assign, /);

spectrum_fourier_binop!(Add, add, AddAssign, add_assign, +);
spectrum_fourier_binop!(Sub, sub, SubAssign, sub_assign, -);
spectrum_fourier_binop!(Mul, mul, MulAssign, mul_assign, *);
spectrum_fourier_binop!(Div, div, DivAssign, div_assign, /);

spectrum_scalar_binop!(Add, add, AddAssign, add_assign, +);
spectrum_scalar_binop!(Sub, sub, SubAssign, sub_assign, -);
spectrum_scalar_binop!(Mul, mul, MulAssign, mul_assign, *);
spectrum_scalar_binop!(Div, div, DivAssign, div_assign, /);

impl Mul<Spectrum> for Float {
    type Output = Spectrum;

    fn mul(self, rhs: Spectrum) -> Spectrum {
        rhs * self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn arithmetic_is_bucket_wise() {
        let a = Spectrum::from_pairs(&[130.0, 430.0], &[1.0, 2.0]);
        let b = Spectrum::from_pairs(&[130.0, 670.0], &[3.0, 4.0]);
        let sum = a + b;
        assert_eq!(sum[0], 4.0);
        assert_eq!(sum[5], 2.0);
        assert_eq!(sum[9], 4.0);
        for i in 0..SPECTRAL_SAMPLES {
            assert_eq!(sum[i], a[i] + b[i]);
        }
    }

    #[test]
    fn scalar_constants_multiply_like_scalars() {
        let product = Spectrum::new(3.0) * Spectrum::new(0.5);
        assert_eq!(product, Spectrum::new(1.5));
    }

    #[test]
    fn division_by_black_is_detectable() {
        let q = Spectrum::new(1.0) / Spectrum::new(0.0);
        assert!(q.nan() || q.max().is_infinite());
    }

    #[test]
    fn flat_spectrum_is_white_after_normalisation() {
        let white = Spectrum::new(1.0).rgb();
        assert!(white.min_element() > 0.0);
        let grey = Spectrum::new(0.25).rgb();
        for c in 0..3 {
            assert_relative_eq!(grey[c] / white[c], 0.25, epsilon = 1e-3);
        }
        // The sensor is balanced so equal energy maps to equal
        // channels.
        assert_relative_eq!(white.x, white.y, epsilon = 1e-3);
        assert_relative_eq!(white.y, white.z, epsilon = 1e-3);
    }

    #[test]
    fn translate_with_empty_curve_is_identity() {
        let mut s = Spectrum::from_pairs(&[430.0, 550.0], &[1.0, 2.0]);
        let before = s;
        s.translate(&Fourier::default());
        assert_eq!(s, before);
    }

    #[test]
    fn translate_clamps_out_of_range_targets() {
        // A constant curve maps every bucket to 1200nm, past the end
        // of the spectrum; everything piles into the last bucket.
        let curve = Fourier::from_samples(&[1200.0, 1200.0], LAMBDA_START, LAMBDA_END);
        let mut s = Spectrum::new(1.0);
        s.translate(&curve);
        assert_relative_eq!(s[SPECTRAL_SAMPLES - 1], SPECTRAL_SAMPLES as Float, epsilon = 1e-3);
        assert_eq!(s[0], 0.0);
    }

    #[test]
    fn isolate_keeps_one_bucket() {
        let s = Spectrum::new(2.0);
        let iso = Spectrum::isolate(&s, 3);
        assert_eq!(iso[3], 2.0);
        assert!(iso[0] == 0.0 && iso[9] == 0.0);
    }

    #[test]
    fn black_means_exactly_zero_everywhere() {
        assert!(Spectrum::default().black());
        assert!(!Spectrum::new(1e-30).black());
        let mut s = Spectrum::default();
        s[7] = -0.0;
        assert!(s.black());
    }
}
