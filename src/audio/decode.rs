use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// One channel of a decoded file.
pub struct AudioTrack {
    pub samples: Vec<f32>,
    /// `None` when the container does not say
    pub sample_rate: Option<u32>,
    pub channels: usize,
}

pub fn decode_channel(path: &Path, channel: usize) -> Result<AudioTrack> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let detected = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to detect audio format")?;

    let mut format = detected.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .context("No audio tracks found")?;

    let track_id = track.id;
    let track_channels = track.codec_params.channels.map(|c| c.count());
    let sample_rate = track.codec_params.sample_rate;

    // Some containers only report the layout once packets are decoded
    if let Some(count) = track_channels {
        if channel >= count {
            anyhow::bail!(
                "Channel {} requested but {} has only {} channel(s)",
                channel,
                path.display(),
                count
            );
        }
    }

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let mut samples: Vec<f32> = Vec::new();
    let mut channels = track_channels.unwrap_or(0);

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(err)) => {
                log::debug!("Skipping undecodable packet: {}", err);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();
        channels = spec.channels.count();

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        extract_channel(sample_buf.samples(), channels, channel, &mut samples).with_context(|| {
            format!("Cannot read channel {} of {}", channel, path.display())
        })?;
    }

    log::info!(
        "Decoded channel {} of {}: {} samples, {}",
        channel,
        channels,
        samples.len(),
        sample_rate.map_or_else(|| "unknown rate".to_string(), |sr| format!("{}Hz", sr))
    );

    Ok(AudioTrack {
        samples,
        sample_rate,
        channels,
    })
}

/// Append channel `channel` of interleaved `frames` with `channels` samples
/// per frame to `out`.
fn extract_channel(frames: &[f32], channels: usize, channel: usize, out: &mut Vec<f32>) -> Result<()> {
    if channel >= channels {
        anyhow::bail!("buffer has only {} channel(s)", channels);
    }
    out.extend(frames.chunks_exact(channels).map(|frame| frame[channel]));
    Ok(())
}
