//! Bin index ↔ frequency arithmetic and display labels.

use serde::Serialize;

use super::log_index::LogScale;

/// Remapped index at which the low axis label is taken.
pub const LOW_LABEL_INDEX: f64 = 20.0;

/// Width of one FFT coefficient in Hz.
pub fn bin_width(sampling_rate: f64, fft_size: usize) -> f64 {
    sampling_rate / fft_size as f64
}

/// Frequency label for (possibly fractional) index `i`.
///
/// Indices are spaced half a bin width apart here; the display axis has
/// always been labelled this way.
pub fn bin_to_frequency(bin_width: f64, i: f64) -> f64 {
    i * (bin_width / 2.0)
}

/// Nearest coefficient index for `freq`. Negative frequencies map to 0.
pub fn frequency_to_bin(bin_width: f64, freq: f64) -> usize {
    (freq / bin_width).round().max(0.0) as usize
}

/// Integer convolution width for `num_bins` bins over `num_samples` entries.
/// `num_bins` must be non-zero.
pub fn conv_width_for_bins(num_bins: usize, num_samples: usize) -> usize {
    num_samples / num_bins
}

/// Low, geometric-middle and high labels for a spectrum display axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FrequencyLabels {
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

impl FrequencyLabels {
    pub fn new(low: f64, high: f64) -> Self {
        let mid = 10f64.powf((low * high).log10() / 2.0);
        Self { low, mid, high }
    }

    /// Labels for a binner over the first `slice_at` coefficients.
    pub fn for_slice(bin_width: f64, scale: &LogScale, slice_at: usize) -> Self {
        let low = bin_to_frequency(bin_width, scale.inv_log(LOW_LABEL_INDEX));
        let high = bin_width * slice_at as f64;
        Self::new(low, high)
    }
}

/// `"86 Hz"` below 1 kHz, `"5.5 kHz"` above. Digits are truncated, not rounded.
pub fn format_frequency(hz: f64) -> String {
    if hz >= 1000.0 {
        let khz = (hz / 100.0).trunc() / 10.0;
        format!("{:.1} kHz", khz)
    } else {
        format!("{} Hz", hz.trunc())
    }
}
