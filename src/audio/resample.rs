// Sample rate and channel layout conversion for decoded clips
use rubato::{FftFixedIn, Resampler};

use super::decoder::DecodedClip;
use crate::error::AudioError;

const CHUNK_FRAMES: usize = 1024;

/// Convert interleaved samples from `from` Hz to `to` Hz
pub fn resample_interleaved(
    samples: &[f32],
    channels: usize,
    from: u32,
    to: u32,
) -> Result<Vec<f32>, AudioError> {
    if from == to || channels == 0 || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let frames = samples.len() / channels;
    let planar: Vec<Vec<f32>> = (0..channels)
        .map(|ch| samples.iter().skip(ch).step_by(channels).copied().collect())
        .collect();

    let mut resampler =
        FftFixedIn::<f32>::new(from as usize, to as usize, CHUNK_FRAMES, 2, channels)
            .map_err(|e| AudioError::Resample(e.to_string()))?;

    let mut out: Vec<Vec<f32>> = vec![Vec::new(); channels];
    let mut pos = 0;
    while frames - pos >= resampler.input_frames_next() {
        let needed = resampler.input_frames_next();
        let chunk: Vec<&[f32]> = planar.iter().map(|c| &c[pos..pos + needed]).collect();
        let processed = resampler
            .process(chunk.as_slice(), None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        for (dst, src) in out.iter_mut().zip(processed) {
            dst.extend(src);
        }
        pos += needed;
    }
    if pos < frames {
        let chunk: Vec<&[f32]> = planar.iter().map(|c| &c[pos..]).collect();
        let processed = resampler
            .process_partial(Some(chunk.as_slice()), None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        for (dst, src) in out.iter_mut().zip(processed) {
            dst.extend(src);
        }
    }

    // Output lags the input by the filter delay; flush until the tail is out
    let delay = resampler.output_delay();
    let expected = (frames as u64 * to as u64 / from as u64) as usize;
    while out[0].len() < delay + expected {
        let processed = resampler
            .process_partial::<Vec<f32>>(None, None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        if processed[0].is_empty() {
            break;
        }
        for (dst, src) in out.iter_mut().zip(processed) {
            dst.extend(src);
        }
    }

    let out_frames = out[0].len().saturating_sub(delay).min(expected);
    let mut interleaved = Vec::with_capacity(out_frames * channels);
    for frame in delay..delay + out_frames {
        for plane in &out {
            interleaved.push(plane[frame]);
        }
    }
    Ok(interleaved)
}

/// Map interleaved samples onto a different channel count
///
/// Mono is duplicated to every output channel; anything else is averaged
/// down to mono first when the layouts differ.
pub fn remix(samples: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return samples.to_vec();
    }

    let frames = samples.len() / from;
    let mut out = Vec::with_capacity(frames * to);
    for frame in samples.chunks_exact(from) {
        let value = if from == 1 {
            frame[0]
        } else {
            frame.iter().sum::<f32>() / from as f32
        };
        out.extend(std::iter::repeat(value).take(to));
    }
    out
}

/// Bring a decoded clip to the output device's layout
pub fn conform(clip: DecodedClip, sample_rate: u32, channels: usize) -> Result<Vec<f32>, AudioError> {
    let resampled = resample_interleaved(&clip.samples, clip.channels, clip.sample_rate, sample_rate)?;
    Ok(remix(&resampled, clip.channels, channels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_is_passthrough() {
        let samples = vec![0.1, 0.2, 0.3, 0.4];
        assert_eq!(resample_interleaved(&samples, 2, 44100, 44100).unwrap(), samples);
    }

    #[test]
    fn test_downsample_halves_length() {
        let samples = vec![0.25f32; 4800 * 2];
        let out = resample_interleaved(&samples, 2, 48000, 24000).unwrap();
        assert_eq!(out.len(), 2400 * 2);
    }

    #[test]
    fn test_step_keeps_its_position() {
        // Silence then a unit step halfway through; the step must not shift late
        let mut samples = vec![0.0f32; 4800];
        samples[2400..].fill(1.0);
        let out = resample_interleaved(&samples, 1, 48000, 24000).unwrap();
        assert_eq!(out.len(), 2400);
        assert!(out[1100].abs() < 0.1, "before the step: {}", out[1100]);
        assert!(out[1300] > 0.9, "after the step: {}", out[1300]);
    }

    #[test]
    fn test_upsample_doubles_length() {
        let samples = vec![0.0f32; 1000];
        let out = resample_interleaved(&samples, 1, 22050, 44100).unwrap();
        assert_eq!(out.len(), 2000);
    }

    #[test]
    fn test_remix_mono_to_stereo() {
        assert_eq!(remix(&[0.5, -0.5], 1, 2), vec![0.5, 0.5, -0.5, -0.5]);
    }

    #[test]
    fn test_remix_stereo_to_mono() {
        assert_eq!(remix(&[1.0, 0.0, 0.5, 0.5], 2, 1), vec![0.5, 0.5]);
    }

    #[test]
    fn test_conform_runs_both_steps() {
        let clip = DecodedClip {
            samples: vec![0.0; 800],
            sample_rate: 8000,
            channels: 1,
        };
        let out = conform(clip, 16000, 2).unwrap();
        assert_eq!(out.len(), 1600 * 2);
    }
}
