use super::spectral::{self, SpectralFrames};

/// Noise level reported when the recording is too short to carve out
/// edge segments.
pub const NOISE_FALLBACK: f32 = 0.1;

/// Sub-score weights for the combined quality heuristic.
pub const SNR_WEIGHT: f32 = 0.5;
pub const DYNAMIC_WEIGHT: f32 = 0.3;
pub const CLARITY_WEIGHT: f32 = 0.2;

/// Estimate the noise floor from the recording's edges, in [0, 1].
///
/// Speech recordings typically start and end with room tone, so the
/// leading and trailing `min(0.5s, duration/4)` segments approximate the
/// noise floor without a separate calibration recording. Recordings that
/// are noisy throughout (constant hum under the speech) are systematically
/// underestimated by this heuristic.
pub fn estimate_noise_level(samples: &[f32], sample_rate: u32) -> f32 {
    if sample_rate == 0 {
        return NOISE_FALLBACK;
    }

    let duration = samples.len() as f64 / sample_rate as f64;
    let noise_duration = (duration / 4.0).min(0.5);
    let noise_samples = (noise_duration * sample_rate as f64) as usize;

    if noise_samples == 0 {
        return NOISE_FALLBACK;
    }

    let mut reference = Vec::with_capacity(noise_samples * 2);
    reference.extend_from_slice(&samples[..noise_samples]);
    reference.extend_from_slice(&samples[samples.len() - noise_samples..]);

    spectral::rms(&reference).min(1.0)
}

/// Combine SNR, dynamic range and spectral clarity into one score in [0, 1].
///
/// This is a heuristic, not a perceptual model; it has no validated
/// correlation with listening-test MOS scores.
pub fn signal_quality(samples: &[f32], sample_rate: u32, noise_level: f32) -> f32 {
    let signal_rms = spectral::rms(samples);

    let snr_score = if noise_level > 0.0 {
        (signal_rms / noise_level / 10.0).min(1.0)
    } else if signal_rms > 0.0 {
        1.0
    } else {
        0.0
    };

    let frame_rms = spectral::frame_rms(samples);
    let dynamic_range = dynamic_range_of(&frame_rms);
    let dynamic_score = (dynamic_range * 10.0).min(1.0);

    let frames = spectral::stft_magnitudes(samples, sample_rate);
    let clarity_score = spectral_clarity_score(&frames);

    let quality =
        snr_score * SNR_WEIGHT + dynamic_score * DYNAMIC_WEIGHT + clarity_score * CLARITY_WEIGHT;
    quality.min(1.0)
}

/// Spread of the frame RMS envelope: max minus min.
pub fn dynamic_range_of(frame_rms: &[f32]) -> f32 {
    if frame_rms.is_empty() {
        return 0.0;
    }
    let max = frame_rms.iter().copied().fold(f32::MIN, f32::max);
    let min = frame_rms.iter().copied().fold(f32::MAX, f32::min);
    max - min
}

fn spectral_clarity_score(frames: &SpectralFrames) -> f32 {
    let (mean, std) = spectral::magnitude_stats(frames);
    let clarity = mean / (std + 1e-8);
    (clarity / 100.0).min(1.0)
}
