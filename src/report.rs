use std::io::Write;

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use bandlight::color::COMMAND_TERMINATOR;
use bandlight::dsp::format_frequency;
use bandlight::{ColorMapping, FrequencyLabels};

use crate::audio::stream::BlockBins;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One aligned row of bin values per block
    #[default]
    Table,
    /// One JSON object per line
    Json,
    /// One `RGB r g b` light command per block
    Rgb,
}

#[derive(Serialize)]
struct JsonBlock<'a> {
    block: usize,
    time: f64,
    bins: &'a [f64],
    heights: Vec<f64>,
    skipped: bool,
}

pub fn write_blocks(
    out: &mut dyn Write,
    format: OutputFormat,
    blocks: &[BlockBins],
    color: &ColorMapping,
) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if let Some(first) = blocks.first() {
                write!(out, "{:>9}", "time")?;
                for i in 0..first.bins.len() {
                    write!(out, " {:>9}", format!("bin{}", i))?;
                }
                writeln!(out)?;
            }
            for block in blocks {
                write!(out, "{:>9.3}", block.time)?;
                for value in &block.bins {
                    write!(out, " {:>9.2}", value)?;
                }
                if block.skipped {
                    write!(out, "  (skipped)")?;
                }
                writeln!(out)?;
            }
        }
        OutputFormat::Json => {
            for block in blocks {
                let mut heights = vec![0.0; block.bins.len()];
                color.heights_into(&block.bins, &mut heights);
                let line = JsonBlock {
                    block: block.index,
                    time: block.time,
                    bins: &block.bins,
                    heights,
                    skipped: block.skipped,
                };
                serde_json::to_writer(&mut *out, &line)?;
                writeln!(out)?;
            }
        }
        OutputFormat::Rgb => {
            for block in blocks {
                write!(out, "{}{}", color.rgb(&block.bins), COMMAND_TERMINATOR)?;
            }
        }
    }
    Ok(())
}

/// Axis labels followed by the frequency span of every bin.
pub fn write_labels(
    out: &mut dyn Write,
    labels: &FrequencyLabels,
    ranges: &[(f64, f64)],
) -> Result<()> {
    writeln!(
        out,
        "axis: {} | {} | {}",
        format_frequency(labels.low),
        format_frequency(labels.mid),
        format_frequency(labels.high)
    )?;
    for (i, (lo, hi)) in ranges.iter().enumerate() {
        writeln!(out, "bin{:<3} {:>9.1} - {:>9.1} Hz", i, lo, hi)?;
    }
    Ok(())
}
