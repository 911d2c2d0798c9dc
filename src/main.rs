mod audio;
mod cli;
mod config;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{BufWriter, Write};

use bandlight::{AnalysisConfig, ColorMapping, Pipeline, WindowShape};

use cli::{Cli, WindowArg};
use report::OutputFormat;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();
    let mut color = ColorMapping::default();
    let mut sample_rate = AnalysisConfig::default().sample_rate;

    // Explicit --config path, or auto-detect bandlight.toml / user config
    let config_path = cli.config.clone().or_else(config::find_config);
    if let Some(ref path) = config_path {
        match config::load_config(path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                // Merge: config values apply only when CLI is at its default
                if cli.fft_size == 2048 { cli.fft_size = cfg.analysis.fft_size; }
                if cli.bins == 10 { cli.bins = cfg.analysis.num_bins; }
                if cli.slice_at == 256 { cli.slice_at = cfg.analysis.slice_at; }
                if cli.log_coeff == 20.0 { cli.log_coeff = cfg.analysis.log_coefficient; }
                if cli.window == WindowArg::Quadratic { cli.window = cfg.analysis.window.into(); }
                if !cli.normalize { cli.normalize = cfg.analysis.normalization == bandlight::Normalization::Sum; }
                if cli.channel == 0 { cli.channel = cfg.stream.channel; }
                if cli.hop.is_none() { cli.hop = cfg.stream.hop_size; }
                if cli.format == OutputFormat::Table { cli.format = cfg.output.format; }
                sample_rate = cfg.analysis.sample_rate;
                color = cfg.color;
            }
            Err(err) => log::warn!("Ignoring config {}: {:#}", path.display(), err),
        }
    }
    if let Some(sr) = cli.sample_rate {
        sample_rate = sr as f64;
    }

    let mut analysis = AnalysisConfig {
        fft_size: cli.fft_size,
        sample_rate,
        num_bins: cli.bins,
        slice_at: cli.slice_at,
        log_coefficient: cli.log_coeff,
        window: WindowShape::from(cli.window),
        normalization: cli.normalization(),
    };

    // Labels mode needs no input file
    if cli.labels {
        let pipeline = Pipeline::new(analysis).context("Invalid analysis configuration")?;
        let ranges: Vec<(f64, f64)> = (0..pipeline.binner().num_bins())
            .map(|bin| pipeline.bin_frequency_range(bin))
            .collect();
        let stdout = std::io::stdout();
        report::write_labels(&mut stdout.lock(), &pipeline.labels(), &ranges)?;
        return Ok(());
    }

    let input = cli.input.as_ref().context("Input audio file is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    log::info!("bandlight - spectrum bins for visualisation and light control");
    log::info!("Input: {}", input.display());

    // 1. Decode the analysed channel
    log::info!("Decoding audio...");
    let track = audio::decode::decode_channel(input, cli.channel)?;
    match (track.sample_rate, cli.sample_rate) {
        (Some(sr), None) => analysis.sample_rate = sr as f64,
        (Some(sr), Some(forced)) if sr != forced => {
            log::warn!("File reports {}Hz, using --sample-rate {}Hz", sr, forced);
        }
        (None, _) => log::warn!("Unknown sample rate, assuming {}Hz", analysis.sample_rate),
        _ => {}
    }

    // 2. Validate everything before touching a single block
    analysis.validate().context("Invalid analysis configuration")?;
    color
        .validate(analysis.num_bins)
        .context("Invalid color mapping")?;
    let hop = cli.hop.unwrap_or(analysis.fft_size);
    if hop == 0 {
        anyhow::bail!("Hop size must be at least 1");
    }

    log::info!(
        "FFT {} @ {}Hz ({:.2} Hz/bin), {} bins over {} entries, a={}, hop {}, channel {} of {}",
        analysis.fft_size,
        analysis.sample_rate,
        analysis.bin_width(),
        analysis.num_bins,
        analysis.slice_at,
        analysis.log_coefficient,
        hop,
        cli.channel,
        track.channels
    );

    // 3. Analyze
    let total_blocks = audio::stream::block_count(track.samples.len(), analysis.fft_size, hop);
    let pb = ProgressBar::new(total_blocks as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} blocks ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    let blocks = if cli.parallel {
        audio::stream::analyze_parallel(&track.samples, &analysis, hop, &pb)?
    } else {
        audio::stream::analyze_sequential(&track.samples, &analysis, hop, &pb)?
    };
    pb.finish_with_message("Analysis complete");

    let skipped = blocks.iter().filter(|b| b.skipped).count();
    if skipped > 0 {
        log::warn!("{} of {} blocks had a non-finite spectrum and were skipped", skipped, blocks.len());
    }

    // 4. Write results
    match cli.output {
        Some(ref path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            report::write_blocks(&mut writer, cli.format, &blocks, &color)?;
            writer.flush()?;
            log::info!("Done! Output: {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            report::write_blocks(&mut writer, cli.format, &blocks, &color)?;
            writer.flush()?;
        }
    }

    Ok(())
}
