//! Truncated real Fourier series.

use crate::core::prism::*;
use crate::core::spectrum::Spectrum;
use std::f32::consts::PI;

/// A truncated real Fourier series over a closed interval, used as the
/// continuous representation of reflectance, emission and IOR curves.
///
/// The empty series (`start == end`, the `Default`) acts as "unset":
/// it evaluates to its input, so response curves default to
/// pass-through and remap curves default to the identity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fourier {
    a0: Float,
    a: Vec<Float>,
    b: Vec<Float>,
    start: Float,
    end: Float,
}

impl Fourier {
    /// Fit a series to evenly spaced samples of a function over
    /// [`start`, `end`]. Keeps `⌊N/2⌋` harmonics.
    ///
    /// * `samples` - The sample values, at least two.
    /// * `start`   - Start of the interval.
    /// * `end`     - End of the interval, distinct from `start`.
    pub fn from_samples(samples: &[Float], start: Float, end: Float) -> Self {
        debug_assert!(start != end, "a fitted series needs a real interval");
        let n = samples.len();
        let a0 = samples.iter().sum::<Float>() / n as Float;
        let mut a = vec![0.0; n / 2];
        let mut b = vec![0.0; n / 2];
        for k in 1..=n / 2 {
            let mut ak = 0.0;
            let mut bk = 0.0;
            for (i, f) in samples.iter().enumerate() {
                let angle = 2.0 * PI * k as Float * (i as Float / n as Float);
                ak += f * angle.cos();
                bk += f * angle.sin();
            }
            a[k - 1] = 2.0 / n as Float * ak;
            b[k - 1] = 2.0 / n as Float * bk;
        }
        Self { a0, a, b, start, end }
    }

    /// Fit a series to a spectrum's bucket values over the full
    /// wavelength range.
    pub fn from_spectrum(s: &Spectrum) -> Self {
        Self::from_samples(s.samples(), LAMBDA_START, LAMBDA_END)
    }

    /// True for the unset series.
    pub fn empty(&self) -> bool {
        self.start == self.end
    }

    /// Evaluate the series. The empty series is the identity;
    /// out-of-interval inputs evaluate to zero.
    ///
    /// * `t` - The evaluation point.
    pub fn evaluate(&self, t: Float) -> Float {
        if self.empty() {
            return t;
        }
        if t < self.start || t > self.end {
            return 0.0;
        }
        let omega = 2.0 * PI / (self.end - self.start);
        let x = t - self.start;
        let mut sum = self.a0;
        for (k, (ak, bk)) in self.a.iter().zip(self.b.iter()).enumerate() {
            let angle = (k + 1) as Float * omega * x;
            sum += ak * angle.cos() + bk * angle.sin();
        }
        sum
    }

    /// Resample the series at the spectral bucket centres.
    pub fn spectrum(&self) -> Spectrum {
        Spectrum::from(self)
    }
}
