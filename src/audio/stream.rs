use std::sync::Arc;

use anyhow::Result;
use indicatif::ProgressBar;
use rayon::prelude::*;

use bandlight::{AnalysisConfig, BlockOutcome, Pipeline};

/// Bins for one block. A skipped block repeats the previous bins.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockBins {
    pub index: usize,
    /// Start of the block in seconds
    pub time: f64,
    pub bins: Vec<f64>,
    pub skipped: bool,
}

/// Number of blocks of `block` samples, `hop` apart, in `total` samples.
/// A non-empty track shorter than one block still yields one padded block.
pub fn block_count(total: usize, block: usize, hop: usize) -> usize {
    if total == 0 {
        0
    } else if total <= block {
        1
    } else {
        (total - block) / hop + 1
    }
}

fn block_at(samples: &[f32], index: usize, block: usize, hop: usize) -> &[f32] {
    let start = index * hop;
    let end = (start + block).min(samples.len());
    &samples[start..end]
}

pub fn analyze_sequential(
    samples: &[f32],
    config: &AnalysisConfig,
    hop: usize,
    pb: &ProgressBar,
) -> Result<Vec<BlockBins>> {
    let mut pipeline = Pipeline::new(config.clone())?;
    let block = config.fft_size;
    let count = block_count(samples.len(), block, hop);

    let mut out = Vec::with_capacity(count);
    for index in 0..count {
        let outcome = pipeline.process_block(block_at(samples, index, block, hop));
        out.push(BlockBins {
            index,
            time: (index * hop) as f64 / pipeline.config().sample_rate,
            bins: pipeline.bins().to_vec(),
            skipped: outcome == BlockOutcome::Skipped,
        });
        pb.inc(1);
    }
    Ok(out)
}

/// Same result as [`analyze_sequential`], with blocks spread over the rayon
/// pool. Every worker owns its FFT buffers and shares one binner.
pub fn analyze_parallel(
    samples: &[f32],
    config: &AnalysisConfig,
    hop: usize,
    pb: &ProgressBar,
) -> Result<Vec<BlockBins>> {
    config.validate()?;
    let binner = Arc::new(config.build_binner()?);
    // Fail here rather than inside a worker
    Pipeline::with_binner(config.clone(), Arc::clone(&binner))?;

    let block = config.fft_size;
    let count = block_count(samples.len(), block, hop);

    let raw: Vec<Option<Vec<f64>>> = (0..count)
        .into_par_iter()
        .map_init(
            || Pipeline::with_binner(config.clone(), Arc::clone(&binner)).ok(),
            |pipeline, index| {
                let pipeline = pipeline.as_mut()?;
                let outcome = pipeline.process_block(block_at(samples, index, block, hop));
                pb.inc(1);
                match outcome {
                    BlockOutcome::Updated => Some(pipeline.bins().to_vec()),
                    BlockOutcome::Skipped => None,
                }
            },
        )
        .collect();

    // Carry the last good vector over skipped blocks, as the serial path does
    let mut previous = vec![0.0; binner.num_bins()];
    let out = raw
        .into_iter()
        .enumerate()
        .map(|(index, bins)| {
            let skipped = bins.is_none();
            if let Some(bins) = bins {
                previous = bins;
            }
            BlockBins {
                index,
                time: (index * hop) as f64 / config.sample_rate,
                bins: previous.clone(),
                skipped,
            }
        })
        .collect();
    Ok(out)
}
