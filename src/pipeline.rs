//! Per-block analysis: samples → FFT → magnitudes → guard → bins.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dsp::binner::DEFAULT_LOG_COEFFICIENT;
use crate::dsp::{self, FftEngine, FrequencyLabels, Normalization, SpectralBinner, WindowShape};
use crate::error::ConfigError;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub fft_size: usize,
    pub sample_rate: f64,
    pub num_bins: usize,
    /// Number of spectrum entries fed to the binner
    pub slice_at: usize,
    pub log_coefficient: f64,
    pub window: WindowShape,
    pub normalization: Normalization,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            sample_rate: 44100.0,
            num_bins: 10,
            slice_at: 256,
            log_coefficient: DEFAULT_LOG_COEFFICIENT,
            window: WindowShape::Quadratic,
            normalization: Normalization::None,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        dsp::fft::validate_size(self.fft_size)?;
        if !(self.sample_rate > 0.0 && self.sample_rate.is_finite()) {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        if self.slice_at > self.fft_size {
            return Err(ConfigError::SliceTooLong {
                slice_at: self.slice_at,
                available: self.fft_size,
            });
        }
        Ok(())
    }

    pub fn bin_width(&self) -> f64 {
        dsp::bin_width(self.sample_rate, self.fft_size)
    }

    pub fn build_binner(&self) -> Result<SpectralBinner, ConfigError> {
        SpectralBinner::builder(self.num_bins, self.slice_at)
            .log_coefficient(self.log_coefficient)
            .window(self.window)
            .normalization(self.normalization)
            .build()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockOutcome {
    /// The bin vector now reflects this block.
    Updated,
    /// The spectrum held NaN or Infinity; the previous bins were kept.
    Skipped,
}

pub fn spectrum_is_finite(spectrum: &[f64]) -> bool {
    spectrum.iter().all(|v| v.is_finite())
}

/// Owns everything one caller needs to turn sample blocks into bins.
///
/// The binner is shared behind an `Arc`, so several pipelines (one per
/// thread) can reuse a single precomputed configuration.
pub struct Pipeline {
    config: AnalysisConfig,
    fft: FftEngine,
    binner: Arc<SpectralBinner>,
    spectrum: Vec<f64>,
    bins: Vec<f64>,
}

impl Pipeline {
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let binner = Arc::new(config.build_binner()?);
        Self::with_binner(config, binner)
    }

    /// Build a pipeline around an existing binner.
    ///
    /// The binner must have been built from the same bin, slice, log, window
    /// and normalization settings as `config`.
    pub fn with_binner(config: AnalysisConfig, binner: Arc<SpectralBinner>) -> Result<Self, ConfigError> {
        config.validate()?;
        check_binner_matches(&config, &binner)?;
        binner.check_spectrum_len(config.fft_size)?;
        let fft = FftEngine::new(config.fft_size)?;

        Ok(Self {
            spectrum: vec![0.0; config.fft_size],
            bins: vec![0.0; binner.num_bins()],
            config,
            fft,
            binner,
        })
    }

    /// Run one block of samples through the whole chain.
    pub fn process_block<S: Copy + Into<f64>>(&mut self, block: &[S]) -> BlockOutcome {
        self.fft.magnitudes(block, &mut self.spectrum);
        guarded_bins(&self.binner, &self.spectrum, &mut self.bins)
    }

    /// Bin an externally computed magnitude spectrum, with the same guard.
    ///
    /// A spectrum shorter than `slice_at` is rejected and leaves the bins
    /// untouched.
    pub fn apply_spectrum(&mut self, spectrum: &[f64]) -> Result<BlockOutcome, ConfigError> {
        self.binner.check_spectrum_len(spectrum.len())?;
        Ok(guarded_bins(&self.binner, spectrum, &mut self.bins))
    }

    /// Latest accepted bin vector (all zeros before the first update).
    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn binner(&self) -> &Arc<SpectralBinner> {
        &self.binner
    }

    pub fn labels(&self) -> FrequencyLabels {
        FrequencyLabels::for_slice(
            self.config.bin_width(),
            self.binner.log_scale(),
            self.binner.slice_at(),
        )
    }

    /// Frequencies in Hz covered by the window of `bin`.
    pub fn bin_frequency_range(&self, bin: usize) -> (f64, f64) {
        let width = self.config.bin_width();
        let (lo, hi) = self.binner.bin_support(bin);
        (lo.max(0.0) * width, hi * width)
    }
}

fn check_binner_matches(config: &AnalysisConfig, binner: &SpectralBinner) -> Result<(), ConfigError> {
    let matches = binner.num_bins() == config.num_bins
        && binner.slice_at() == config.slice_at
        && binner.log_scale().coefficient() == config.log_coefficient
        && binner.window() == config.window
        && binner.normalization() == config.normalization;
    if matches {
        return Ok(());
    }
    Err(ConfigError::BinnerMismatch {
        binner: format!(
            "{} bins over {}, a={}, {:?}, {:?}",
            binner.num_bins(),
            binner.slice_at(),
            binner.log_scale().coefficient(),
            binner.window(),
            binner.normalization()
        ),
        config: format!(
            "{} bins over {}, a={}, {:?}, {:?}",
            config.num_bins, config.slice_at, config.log_coefficient, config.window, config.normalization
        ),
    })
}

fn guarded_bins(binner: &SpectralBinner, spectrum: &[f64], bins: &mut [f64]) -> BlockOutcome {
    if !spectrum_is_finite(spectrum) {
        return BlockOutcome::Skipped;
    }
    binner.compute_into(spectrum, bins);
    BlockOutcome::Updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, sample_rate: f64, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate).sin() as f32)
            .collect()
    }

    fn argmax(values: &[f64]) -> usize {
        values
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
            .0
    }

    #[test]
    fn sine_at_440_lands_in_bracketing_bin() {
        let config = AnalysisConfig::default();
        let mut pipeline = Pipeline::new(config.clone()).unwrap();

        let block = sine(440.0, config.sample_rate, config.fft_size);
        assert_eq!(pipeline.process_block(&block), BlockOutcome::Updated);

        let bins = pipeline.bins();
        assert_eq!(bins.len(), 10);
        assert!(bins.iter().all(|v| v.is_finite() && *v >= 0.0));

        let loudest = argmax(bins);
        let (lo, hi) = pipeline.bin_frequency_range(loudest);
        assert!(lo <= 440.0 && 440.0 <= hi, "bin {} covers {}..{} Hz", loudest, lo, hi);
    }

    #[test]
    fn higher_tone_moves_to_higher_bin() {
        let config = AnalysisConfig::default();
        let mut pipeline = Pipeline::new(config.clone()).unwrap();

        pipeline.process_block(&sine(440.0, config.sample_rate, config.fft_size));
        let low = argmax(pipeline.bins());
        pipeline.process_block(&sine(3000.0, config.sample_rate, config.fft_size));
        let high = argmax(pipeline.bins());
        assert!(high > low, "440 Hz in bin {}, 3 kHz in bin {}", low, high);
    }

    #[test]
    fn nan_block_keeps_previous_bins() {
        let config = AnalysisConfig::default();
        let mut pipeline = Pipeline::new(config.clone()).unwrap();

        pipeline.process_block(&sine(440.0, config.sample_rate, config.fft_size));
        let previous = pipeline.bins().to_vec();

        let mut poisoned: Vec<f64> = (0..config.fft_size).map(|i| i as f64).collect();
        poisoned[0] = f64::NAN;
        assert_eq!(pipeline.process_block(&poisoned), BlockOutcome::Skipped);
        assert_eq!(pipeline.bins(), previous.as_slice());
    }

    #[test]
    fn guard_on_external_spectrum() {
        let mut pipeline = Pipeline::new(AnalysisConfig::default()).unwrap();

        let good: Vec<f64> = (0..256).map(|i| (i % 7) as f64).collect();
        assert_eq!(pipeline.apply_spectrum(&good), Ok(BlockOutcome::Updated));
        let previous = pipeline.bins().to_vec();

        let mut bad = good.clone();
        bad.insert(0, f64::NAN);
        assert_eq!(pipeline.apply_spectrum(&bad), Ok(BlockOutcome::Skipped));
        assert_eq!(pipeline.bins(), previous.as_slice());

        let mut infinite = good;
        infinite[100] = f64::INFINITY;
        assert_eq!(pipeline.apply_spectrum(&infinite), Ok(BlockOutcome::Skipped));
        assert_eq!(pipeline.bins(), previous.as_slice());
    }

    #[test]
    fn short_external_spectrum_is_rejected() {
        let mut pipeline = Pipeline::new(AnalysisConfig::default()).unwrap();
        let good: Vec<f64> = (0..256).map(|i| (i % 5) as f64).collect();
        pipeline.apply_spectrum(&good).unwrap();
        let previous = pipeline.bins().to_vec();

        assert_eq!(
            pipeline.apply_spectrum(&[1.0; 100]),
            Err(ConfigError::SliceTooLong {
                slice_at: 256,
                available: 100
            })
        );
        assert_eq!(pipeline.bins(), previous.as_slice());
    }

    #[test]
    fn silence_gives_zero_bins() {
        let mut pipeline = Pipeline::new(AnalysisConfig::default()).unwrap();
        assert_eq!(pipeline.process_block(&[0.0f32; 2048]), BlockOutcome::Updated);
        assert!(pipeline.bins().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn pipelines_sharing_a_binner_agree() {
        let config = AnalysisConfig::default();
        let binner = Arc::new(config.build_binner().unwrap());
        let mut a = Pipeline::with_binner(config.clone(), Arc::clone(&binner)).unwrap();
        let mut b = Pipeline::with_binner(config.clone(), binner).unwrap();

        let block = sine(1000.0, config.sample_rate, config.fft_size);
        a.process_block(&block);
        b.process_block(&block);
        assert_eq!(a.bins(), b.bins());
        assert!(Arc::ptr_eq(a.binner(), b.binner()));
    }

    #[test]
    fn rejects_binner_built_for_another_config() {
        let config = AnalysisConfig::default();

        let fewer_bins = AnalysisConfig {
            num_bins: 8,
            ..config.clone()
        };
        let binner = Arc::new(fewer_bins.build_binner().unwrap());
        assert!(matches!(
            Pipeline::with_binner(config.clone(), binner),
            Err(ConfigError::BinnerMismatch { .. })
        ));

        let shorter_slice = AnalysisConfig {
            slice_at: 128,
            ..config.clone()
        };
        let binner = Arc::new(shorter_slice.build_binner().unwrap());
        assert!(matches!(
            Pipeline::with_binner(config.clone(), binner),
            Err(ConfigError::BinnerMismatch { .. })
        ));

        let other_window = AnalysisConfig {
            window: WindowShape::Exponent,
            normalization: Normalization::Sum,
            ..config.clone()
        };
        let binner = Arc::new(other_window.build_binner().unwrap());
        assert!(matches!(
            Pipeline::with_binner(config.clone(), binner),
            Err(ConfigError::BinnerMismatch { .. })
        ));

        let other_coeff = AnalysisConfig {
            log_coefficient: 10.0,
            ..config.clone()
        };
        let binner = Arc::new(other_coeff.build_binner().unwrap());
        assert!(matches!(
            Pipeline::with_binner(config, binner),
            Err(ConfigError::BinnerMismatch { .. })
        ));
    }

    #[test]
    fn rejects_invalid_configs() {
        let bad_size = AnalysisConfig {
            fft_size: 1000,
            ..Default::default()
        };
        assert_eq!(Pipeline::new(bad_size).err(), Some(ConfigError::NotPowerOfTwo(1000)));

        let long_slice = AnalysisConfig {
            fft_size: 128,
            ..Default::default()
        };
        assert_eq!(
            Pipeline::new(long_slice).err(),
            Some(ConfigError::SliceTooLong {
                slice_at: 256,
                available: 128
            })
        );

        let bad_coeff = AnalysisConfig {
            log_coefficient: -1.0,
            ..Default::default()
        };
        assert_eq!(
            Pipeline::new(bad_coeff).err(),
            Some(ConfigError::InvalidLogCoefficient(-1.0))
        );

        let bad_rate = AnalysisConfig {
            sample_rate: 0.0,
            ..Default::default()
        };
        assert_eq!(Pipeline::new(bad_rate).err(), Some(ConfigError::InvalidSampleRate(0.0)));
    }

    #[test]
    fn labels_match_default_player_axis() {
        let pipeline = Pipeline::new(AnalysisConfig::default()).unwrap();
        let labels = pipeline.labels();
        assert!((labels.high - 5512.5).abs() < 1e-9);
        assert!(labels.low < 100.0);
    }

    #[test]
    fn deserializes_partial_config() {
        let config: AnalysisConfig = serde_json::from_str(r#"{"num_bins": 8, "window": "exponent"}"#).unwrap();
        assert_eq!(config.num_bins, 8);
        assert_eq!(config.window, WindowShape::Exponent);
        assert_eq!(config.fft_size, 2048);
        assert_eq!(config.normalization, Normalization::None);
    }
}
