//! Real-time spectrum binning for audio visualisation and light control.
//!
//! A fixed-size block of samples goes through a radix-2 FFT, its magnitude
//! spectrum is checked for NaN/Infinity, and a precomputed [`SpectralBinner`]
//! folds the low part of the spectrum into a few log-spaced bins. All
//! configuration is validated once, up front; the per-block path neither
//! allocates nor fails.

pub mod color;
pub mod dsp;
pub mod error;
pub mod pipeline;

pub use color::{ColorMapping, HeightCurve, Rgb};
pub use dsp::{FftEngine, FrequencyLabels, Normalization, SpectralBinner, WindowShape};
pub use error::ConfigError;
pub use pipeline::{AnalysisConfig, BlockOutcome, Pipeline};
