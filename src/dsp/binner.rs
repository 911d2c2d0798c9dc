//! Magnitude spectrum → a handful of perceptually spaced bins.
//!
//! Each output bin is a discrete convolution of the spectrum against a window
//! centred at `(bin + 1) * conv_width`. The quadratic window is evaluated at
//! the indices picked by a [`LogIndexMap`] with fractional widths; the
//! exponent window runs over the plain indices `0..slice_at` with floored
//! widths. Everything that depends on the configuration alone, including every
//! window weight, is computed by [`BinnerBuilder::build`];
//! [`SpectralBinner::compute_into`] is a plain multiply-accumulate.

use serde::{Deserialize, Serialize};

use super::freq::conv_width_for_bins;
use super::log_index::{LogIndexMap, LogScale};
use crate::error::ConfigError;

pub const DEFAULT_LOG_COEFFICIENT: f64 = 20.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowShape {
    /// `max(0, 1 - ((x - x0) / half_width)^2)`, zero outside `x0 ± half_width`
    #[default]
    Quadratic,
    /// `exp(-(x - x0)^2 / half_width^2)` over linear indices with floored
    /// widths, never quite zero
    Exponent,
}

impl WindowShape {
    pub fn weight(self, x: f64, x0: f64, half_width: f64) -> f64 {
        let d = (x - x0) / half_width;
        match self {
            WindowShape::Quadratic => (1.0 - d * d).max(0.0),
            WindowShape::Exponent => {
                let dx = x - x0;
                (-1.0 / (half_width * half_width) * dx * dx).exp()
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    #[default]
    None,
    /// Divide every bin by the total so the vector sums to 1.
    Sum,
}

/// Scale `bins` to sum to 1. An all-zero vector is left as is.
pub fn normalize_by_sum(bins: &mut [f64]) {
    let sum: f64 = bins.iter().sum();
    if sum != 0.0 {
        for bin in bins.iter_mut() {
            *bin /= sum;
        }
    }
}

#[derive(Clone, Debug)]
pub struct BinnerBuilder {
    num_bins: usize,
    slice_at: usize,
    log_coefficient: f64,
    window: WindowShape,
    normalization: Normalization,
}

impl BinnerBuilder {
    pub fn new(num_bins: usize, slice_at: usize) -> Self {
        Self {
            num_bins,
            slice_at,
            log_coefficient: DEFAULT_LOG_COEFFICIENT,
            window: WindowShape::default(),
            normalization: Normalization::default(),
        }
    }

    pub fn log_coefficient(mut self, a: f64) -> Self {
        self.log_coefficient = a;
        self
    }

    pub fn window(mut self, window: WindowShape) -> Self {
        self.window = window;
        self
    }

    pub fn normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn build(self) -> Result<SpectralBinner, ConfigError> {
        if self.num_bins == 0 {
            return Err(ConfigError::NoBins);
        }
        if self.slice_at == 0 {
            return Err(ConfigError::EmptySlice);
        }

        let scale = LogScale::new(self.log_coefficient, self.slice_at as f64)?;
        let index_map = LogIndexMap::new(self.log_coefficient, self.slice_at)?;
        let (conv_width, half_width, sample_indices) = match self.window {
            WindowShape::Quadratic => {
                let conv_width = self.slice_at as f64 / self.num_bins as f64;
                (conv_width, conv_width / 2.0, index_map.as_slice().to_vec())
            }
            WindowShape::Exponent => {
                let conv_width = conv_width_for_bins(self.num_bins, self.slice_at);
                let half_width = conv_width / 2;
                if half_width == 0 {
                    return Err(ConfigError::WindowTooNarrow {
                        num_bins: self.num_bins,
                        slice_at: self.slice_at,
                    });
                }
                (conv_width as f64, half_width as f64, (0..self.slice_at).collect())
            }
        };

        let mut weights = Vec::with_capacity(self.num_bins * self.slice_at);
        for bin in 0..self.num_bins {
            let x0 = (bin + 1) as f64 * conv_width;
            weights.extend(
                sample_indices
                    .iter()
                    .map(|&k| self.window.weight(k as f64, x0, half_width)),
            );
        }

        log::debug!(
            "Binner: {} bins over {} entries, conv_width={:.2}, a={}, {:?}/{:?}",
            self.num_bins,
            self.slice_at,
            conv_width,
            self.log_coefficient,
            self.window,
            self.normalization
        );

        Ok(SpectralBinner {
            num_bins: self.num_bins,
            slice_at: self.slice_at,
            conv_width,
            half_width,
            scale,
            index_map,
            sample_indices,
            window: self.window,
            normalization: self.normalization,
            weights,
        })
    }
}

/// Immutable, reusable spectrum binner. Safe to share between threads.
#[derive(Clone, Debug)]
pub struct SpectralBinner {
    num_bins: usize,
    slice_at: usize,
    conv_width: f64,
    half_width: f64,
    scale: LogScale,
    index_map: LogIndexMap,
    /// Spectrum entries read per bin: the log table, or `0..slice_at`
    sample_indices: Vec<usize>,
    window: WindowShape,
    normalization: Normalization,
    /// `weights[bin * slice_at + j]` is the window weight of `sample_indices[j]`
    weights: Vec<f64>,
}

impl SpectralBinner {
    pub fn builder(num_bins: usize, slice_at: usize) -> BinnerBuilder {
        BinnerBuilder::new(num_bins, slice_at)
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    pub fn slice_at(&self) -> usize {
        self.slice_at
    }

    pub fn conv_width(&self) -> f64 {
        self.conv_width
    }

    pub fn half_width(&self) -> f64 {
        self.half_width
    }

    pub fn log_scale(&self) -> &LogScale {
        &self.scale
    }

    pub fn index_map(&self) -> &LogIndexMap {
        &self.index_map
    }

    pub fn window(&self) -> WindowShape {
        self.window
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// Window centre of `bin`, in spectrum-index units.
    pub fn bin_center(&self, bin: usize) -> f64 {
        (bin + 1) as f64 * self.conv_width
    }

    /// Span where the window of `bin` is non-zero (for the quadratic window),
    /// in spectrum-index units.
    pub fn bin_support(&self, bin: usize) -> (f64, f64) {
        let x0 = self.bin_center(bin);
        (x0 - self.half_width, x0 + self.half_width)
    }

    /// Fails when a spectrum of `available` entries would be too short.
    pub fn check_spectrum_len(&self, available: usize) -> Result<(), ConfigError> {
        if available < self.slice_at {
            return Err(ConfigError::SliceTooLong {
                slice_at: self.slice_at,
                available,
            });
        }
        Ok(())
    }

    /// Bin `spectrum` into `out`, which holds `num_bins` entries.
    ///
    /// Only the first `slice_at` entries of `spectrum` are read; it must have
    /// at least that many (see [`Self::check_spectrum_len`]).
    pub fn compute_into(&self, spectrum: &[f64], out: &mut [f64]) {
        debug_assert_eq!(out.len(), self.num_bins);
        let spectrum = &spectrum[..self.slice_at];
        let indices = &self.sample_indices;

        for (value, weights) in out.iter_mut().zip(self.weights.chunks_exact(self.slice_at)) {
            *value = indices
                .iter()
                .zip(weights)
                .map(|(&k, &w)| spectrum[k] * w)
                .sum();
        }

        if self.normalization == Normalization::Sum {
            normalize_by_sum(out);
        }
    }

    /// Allocating convenience over [`Self::compute_into`].
    pub fn compute(&self, spectrum: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.num_bins];
        self.compute_into(spectrum, &mut out);
        out
    }
}
