pub mod binner;
pub mod complex;
pub mod fft;
pub mod freq;
pub mod log_index;

pub use binner::{normalize_by_sum, BinnerBuilder, Normalization, SpectralBinner, WindowShape};
pub use complex::Complex;
pub use fft::{fft, FftEngine};
pub use freq::{
    bin_to_frequency, bin_width, conv_width_for_bins, format_frequency, frequency_to_bin,
    FrequencyLabels,
};
pub use log_index::{LogIndexMap, LogScale};
