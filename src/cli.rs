use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use bandlight::{Normalization, WindowShape};

use crate::report::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "bandlight", about = "Log-spaced spectrum bins and RGB light commands from audio files")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: Option<PathBuf>,

    /// Write results to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file (default: ./bandlight.toml, then the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// FFT size in samples (power of two)
    #[arg(long, default_value_t = 2048)]
    pub fft_size: usize,

    /// Number of output bins
    #[arg(long, default_value_t = 10)]
    pub bins: usize,

    /// Number of spectrum entries fed to the binner
    #[arg(long, default_value_t = 256)]
    pub slice_at: usize,

    /// Log remap coefficient (> 0; smaller favours low frequencies more)
    #[arg(long, default_value_t = 20.0)]
    pub log_coeff: f64,

    /// Convolution window shape
    #[arg(long, value_enum, default_value_t = WindowArg::Quadratic)]
    pub window: WindowArg,

    /// Scale each block's bins to sum to 1
    #[arg(long)]
    pub normalize: bool,

    /// Sampling rate in Hz, used when the file does not carry one and for --labels
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Channel to analyze (0 = first)
    #[arg(long, default_value_t = 0)]
    pub channel: usize,

    /// Samples between block starts (default: the FFT size)
    #[arg(long)]
    pub hop: Option<usize>,

    /// Analyze blocks on all cores
    #[arg(long)]
    pub parallel: bool,

    /// Print frequency labels and per-bin ranges, then exit
    #[arg(long)]
    pub labels: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum WindowArg {
    Quadratic,
    Exponent,
}

impl From<WindowArg> for WindowShape {
    fn from(arg: WindowArg) -> Self {
        match arg {
            WindowArg::Quadratic => WindowShape::Quadratic,
            WindowArg::Exponent => WindowShape::Exponent,
        }
    }
}

impl From<WindowShape> for WindowArg {
    fn from(shape: WindowShape) -> Self {
        match shape {
            WindowShape::Quadratic => WindowArg::Quadratic,
            WindowShape::Exponent => WindowArg::Exponent,
        }
    }
}

impl Cli {
    pub fn normalization(&self) -> Normalization {
        if self.normalize {
            Normalization::Sum
        } else {
            Normalization::None
        }
    }
}
