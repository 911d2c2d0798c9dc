//! Logarithmic index remapping.
//!
//! `f(x) = b * (log10(a + x) - log10(a))` maps `[0, last]` onto itself,
//! stretching the low end. Its inverse `a * (10^(x / b) - 1)` compresses it
//! instead, and sampling a spectrum through the inverse spends more of a fixed
//! number of lookups on low frequencies.

use crate::error::ConfigError;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LogScale {
    a: f64,
    b: f64,
    log10_a: f64,
}

impl LogScale {
    /// `a` must be positive; `last_sample` is the upper end of the domain.
    pub fn new(a: f64, last_sample: f64) -> Result<Self, ConfigError> {
        if !(a > 0.0 && a.is_finite()) {
            return Err(ConfigError::InvalidLogCoefficient(a));
        }
        if !(last_sample > 0.0 && last_sample.is_finite()) {
            return Err(ConfigError::EmptySlice);
        }

        let b = last_sample / (last_sample / a + 1.0).log10();
        Ok(Self {
            a,
            b,
            log10_a: a.log10(),
        })
    }

    pub fn coefficient(&self) -> f64 {
        self.a
    }

    pub fn log(&self, x: f64) -> f64 {
        self.b * ((self.a + x).log10() - self.log10_a)
    }

    pub fn inv_log(&self, x: f64) -> f64 {
        self.a * (10f64.powf(x / self.b) - 1.0)
    }
}

/// `round(inv_log(i))` for every `i` in `[0, size)`.
///
/// Non-decreasing, starts at 0, and every entry is clamped into
/// `[0, size - 1]` so it can index a spectrum of `size` entries directly.
/// Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct LogIndexMap {
    indices: Vec<usize>,
}

impl LogIndexMap {
    pub fn new(a: f64, size: usize) -> Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::EmptySlice);
        }
        let scale = LogScale::new(a, size as f64)?;
        let last = size - 1;

        let indices = (0..size)
            .map(|i| {
                let k = scale.inv_log(i as f64).round();
                // rounding may land one past the end
                if k <= 0.0 {
                    0
                } else {
                    (k as usize).min(last)
                }
            })
            .collect();

        Ok(Self { indices })
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }
}
