use thiserror::Error;

/// Rejected analysis parameters.
///
/// These are raised once, when a configuration is built. The per-block path
/// never validates and never fails.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("FFT size must be a non-zero power of two, got {0}")]
    NotPowerOfTwo(usize),
    #[error("log coefficient must be positive and finite, got {0}")]
    InvalidLogCoefficient(f64),
    #[error("sampling rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),
    #[error("number of bins must be at least 1")]
    NoBins,
    #[error("slice length must be at least 1")]
    EmptySlice,
    #[error("slice of {slice_at} entries exceeds the {available}-entry spectrum")]
    SliceTooLong { slice_at: usize, available: usize },
    #[error("{num_bins} bins over {slice_at} entries leave an exponent window less than one entry wide")]
    WindowTooNarrow { num_bins: usize, slice_at: usize },
    #[error("binner ({binner}) does not match the analysis config ({config})")]
    BinnerMismatch { binner: String, config: String },
    #[error("color channel {bin} is out of range for {num_bins} bins")]
    ChannelOutOfRange { bin: usize, num_bins: usize },
    #[error("height curve needs at least two matching, ascending breakpoints")]
    InvalidCurve,
}
