//! Recursive radix-2 decimation-in-time FFT.
//!
//! Only power-of-two sizes are supported. The size is checked once when an
//! [`FftEngine`] is created; `transform` itself never validates.

use std::f64::consts::PI;

use super::complex::Complex;
use crate::error::ConfigError;

pub fn validate_size(size: usize) -> Result<(), ConfigError> {
    if size.is_power_of_two() {
        Ok(())
    } else {
        Err(ConfigError::NotPowerOfTwo(size))
    }
}

/// Unnormalized forward FFT of one fixed size.
///
/// The complex working buffer, the scratch buffer used by the recursion and
/// the twiddle table are allocated in [`FftEngine::new`] and reused by every
/// call, so transforming a block does not allocate.
#[derive(Clone, Debug)]
pub struct FftEngine {
    size: usize,
    buffer: Vec<Complex>,
    scratch: Vec<Complex>,
    /// `exp(-2πi·k/N)` for `k` in `[0, N/2)`
    twiddles: Vec<Complex>,
}

impl FftEngine {
    pub fn new(size: usize) -> Result<Self, ConfigError> {
        validate_size(size)?;

        let twiddles = (0..size / 2)
            .map(|k| Complex::new(0.0, -2.0 * PI * k as f64 / size as f64).cexp())
            .collect();

        Ok(Self {
            size,
            buffer: vec![Complex::ZERO; size],
            scratch: vec![Complex::ZERO; size],
            twiddles,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Transform one block of real amplitudes.
    ///
    /// A block shorter than the configured size is zero padded, a longer one
    /// is truncated. Coefficient `k` corresponds to `k * sample_rate / size`.
    pub fn transform<S: Copy + Into<f64>>(&mut self, amplitudes: &[S]) -> &[Complex] {
        let n = amplitudes.len().min(self.size);
        for (dst, &src) in self.buffer.iter_mut().zip(&amplitudes[..n]) {
            *dst = Complex::from_real(src.into());
        }
        for dst in &mut self.buffer[n..] {
            *dst = Complex::ZERO;
        }

        butterfly(&mut self.buffer, &mut self.scratch, &self.twiddles, 1);
        &self.buffer
    }

    /// Transform `amplitudes` and write `|X[k]|` into `out`.
    pub fn magnitudes<S: Copy + Into<f64>>(&mut self, amplitudes: &[S], out: &mut [f64]) {
        let coefficients = self.transform(amplitudes);
        for (dst, c) in out.iter_mut().zip(coefficients) {
            *dst = c.mag();
        }
    }
}

/// One-shot transform. Allocates an engine per call; keep an [`FftEngine`]
/// around for repeated blocks.
pub fn fft(amplitudes: &[f64]) -> Result<Vec<Complex>, ConfigError> {
    let mut engine = FftEngine::new(amplitudes.len())?;
    Ok(engine.transform(amplitudes).to_vec())
}

/// In-place Cooley-Tukey step over `data`, whose length is a power of two.
///
/// `scratch` holds at least `data.len()` entries. It receives the even and odd
/// halves, and `data` in turn serves as scratch space for the two recursive
/// calls before the butterflies overwrite it. At recursion depth `d` the
/// twiddle for index `k` is `twiddles[k * 2^d]`, passed down as `stride`.
fn butterfly(data: &mut [Complex], scratch: &mut [Complex], twiddles: &[Complex], stride: usize) {
    let n = data.len();
    if n <= 1 {
        return;
    }
    let half = n / 2;
    let scratch = &mut scratch[..n];

    for i in 0..half {
        scratch[i] = data[2 * i];
        scratch[half + i] = data[2 * i + 1];
    }

    let (even, odd) = scratch.split_at_mut(half);
    {
        let (lo, hi) = data.split_at_mut(half);
        butterfly(even, lo, twiddles, stride * 2);
        butterfly(odd, hi, twiddles, stride * 2);
    }

    for k in 0..half {
        let t = twiddles[k * stride] * odd[k];
        data[k] = even[k] + t;
        data[k + half] = even[k] - t;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Direct `Σ x[n]·e^{-2πi·kn/N}`.
    fn reference_dft(input: &[f64]) -> Vec<Complex> {
        let n = input.len();
        (0..n)
            .map(|k| {
                input.iter().enumerate().fold(Complex::ZERO, |acc, (j, &x)| {
                    // reduce k*j mod n to keep the angle small
                    let angle = -2.0 * PI * ((k * j) % n) as f64 / n as f64;
                    acc + Complex::new(0.0, angle).cexp() * Complex::from_real(x)
                })
            })
            .collect()
    }

    fn pseudo_random(n: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
            })
            .collect()
    }

    #[test]
    fn matches_reference_dft() {
        for exp in 0..=11 {
            let n = 1usize << exp;
            let input = pseudo_random(n, 42 + exp as u64);
            let expected = reference_dft(&input);
            let actual = fft(&input).unwrap();

            assert_eq!(actual.len(), n);
            let scale = 1.0 + expected.iter().map(|c| c.mag()).fold(0.0, f64::max);
            for (k, (a, e)) in actual.iter().zip(&expected).enumerate() {
                assert!(
                    (*a - *e).mag() <= 1e-9 * scale,
                    "n={} k={}: {:?} vs {:?}",
                    n,
                    k,
                    a,
                    e
                );
            }
        }
    }

    #[test]
    fn matches_rustfft() {
        use rustfft::{num_complex::Complex as RefComplex, FftPlanner};

        let n = 1024;
        let input = pseudo_random(n, 7);
        let mut expected: Vec<RefComplex<f64>> =
            input.iter().map(|&x| RefComplex::new(x, 0.0)).collect();
        FftPlanner::new().plan_fft_forward(n).process(&mut expected);

        let actual = fft(&input).unwrap();
        for (a, e) in actual.iter().zip(&expected) {
            assert!((a.re - e.re).abs() < 1e-9);
            assert!((a.im - e.im).abs() < 1e-9);
        }
    }

    #[test]
    fn impulse_is_flat() {
        for n in [1, 2, 8, 64, 2048] {
            let mut input = vec![0.0; n];
            input[0] = 1.0;
            let out = fft(&input).unwrap();
            for c in out {
                assert!((c.re - 1.0).abs() < 1e-12);
                assert!(c.im.abs() < 1e-12);
                assert!((c.mag() - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn sinusoid_peaks_at_its_bin() {
        let n = 256;
        let k0 = 10;
        let input: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * k0 as f64 * i as f64 / n as f64).sin())
            .collect();

        let mut engine = FftEngine::new(n).unwrap();
        let mut mags = vec![0.0; n];
        engine.magnitudes(&input, &mut mags);

        for (k, &m) in mags.iter().enumerate() {
            if k == k0 || k == n - k0 {
                assert!((m - n as f64 / 2.0).abs() < 1e-9, "k={} m={}", k, m);
            } else {
                assert!(m < 1e-9, "k={} m={}", k, m);
            }
        }
    }

    #[test]
    fn rejects_non_power_of_two() {
        assert_eq!(FftEngine::new(0).unwrap_err(), ConfigError::NotPowerOfTwo(0));
        assert_eq!(FftEngine::new(3).unwrap_err(), ConfigError::NotPowerOfTwo(3));
        assert_eq!(fft(&[0.0; 1000]).unwrap_err(), ConfigError::NotPowerOfTwo(1000));
        assert!(FftEngine::new(1).is_ok());
        assert!(FftEngine::new(4096).is_ok());
    }

    #[test]
    fn single_sample_passes_through() {
        let out = fft(&[3.5]).unwrap();
        assert_eq!(out, vec![Complex::new(3.5, 0.0)]);
    }

    #[test]
    fn engine_reuse_is_stable() {
        let input = pseudo_random(512, 3);
        let other = pseudo_random(512, 4);
        let mut engine = FftEngine::new(512).unwrap();

        let first = engine.transform(&input).to_vec();
        engine.transform(&other);
        let again = engine.transform(&input).to_vec();
        assert_eq!(first, again);
    }

    #[test]
    fn short_block_is_zero_padded() {
        let mut engine = FftEngine::new(8).unwrap();
        let padded = engine.transform(&[1.0f32, 0.0, 0.0]).to_vec();
        let full = fft(&[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(padded, full);

        // and a long block is truncated
        let truncated = engine.transform(&[1.0f32; 16]).to_vec();
        let eight = fft(&[1.0; 8]).unwrap();
        assert_eq!(truncated, eight);
    }
}
