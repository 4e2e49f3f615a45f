use serde::Serialize;

use super::spectral::{self, HOP_SIZE};

/// Descriptive recording information beyond the quality metrics.
#[derive(Debug, Clone, Serialize)]
pub struct AudioInfo {
    pub duration: f64,
    pub sample_rate: u32,
    pub channels: usize,
    pub max_amplitude: f32,
    pub rms: f32,
    pub dominant_frequency: f32,
    pub tempo_bpm: f32,
    pub beat_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// Compute descriptive info: peak, RMS, dominant frequency, tempo/beats.
pub fn audio_info(samples: &[f32], sample_rate: u32) -> AudioInfo {
    let duration = if sample_rate > 0 {
        samples.len() as f64 / sample_rate as f64
    } else {
        0.0
    };

    let max_amplitude = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
    let rms = spectral::rms(samples);

    let frames = spectral::stft_magnitudes(samples, sample_rate);
    let dominant_frequency = dominant_frequency(&frames);

    let flux = spectral_flux(&frames, sample_rate);
    let beat_times = detect_beats(&flux);
    let tempo_bpm = estimate_tempo(&beat_times);

    AudioInfo {
        duration,
        sample_rate,
        channels: 1,
        max_amplitude,
        rms,
        dominant_frequency,
        tempo_bpm,
        beat_count: beat_times.len(),
        file_size: None,
    }
}

/// Frequency of the strongest bin in the time-averaged magnitude spectrum.
fn dominant_frequency(frames: &spectral::SpectralFrames) -> f32 {
    if frames.magnitudes.is_empty() {
        return 0.0;
    }

    let num_bins = frames.magnitudes[0].len();
    let mut mean_bins = vec![0.0f32; num_bins];
    for frame in &frames.magnitudes {
        for (i, &m) in frame.iter().enumerate() {
            mean_bins[i] += m;
        }
    }

    let mut best_bin = 0;
    let mut best_mag = 0.0f32;
    for (i, &m) in mean_bins.iter().enumerate() {
        if m > best_mag {
            best_mag = m;
            best_bin = i;
        }
    }

    best_bin as f32 * frames.freq_resolution
}

/// Positive spectral flux per frame: (time, flux) pairs.
fn spectral_flux(frames: &spectral::SpectralFrames, sample_rate: u32) -> Vec<(f32, f32)> {
    if sample_rate == 0 {
        return Vec::new();
    }

    let mut flux_values = Vec::with_capacity(frames.magnitudes.len());
    for (i, pair) in frames.magnitudes.windows(2).enumerate() {
        let flux: f32 = pair[1]
            .iter()
            .zip(pair[0].iter())
            .map(|(cur, prev)| (cur - prev).max(0.0))
            .sum();
        let time = ((i + 1) * HOP_SIZE) as f32 / sample_rate as f32;
        flux_values.push((time, flux));
    }
    flux_values
}

fn detect_beats(flux_values: &[(f32, f32)]) -> Vec<f32> {
    if flux_values.is_empty() {
        return Vec::new();
    }

    let window = 9; // ~200ms of context at hop 512
    let mut beat_times = Vec::new();

    for i in 0..flux_values.len() {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(flux_values.len());
        let local_mean: f32 =
            flux_values[start..end].iter().map(|(_, f)| f).sum::<f32>() / (end - start) as f32;

        let threshold = local_mean * 1.5 + 0.01;

        if flux_values[i].1 > threshold {
            let is_peak = (i == 0 || flux_values[i].1 >= flux_values[i - 1].1)
                && (i == flux_values.len() - 1 || flux_values[i].1 >= flux_values[i + 1].1);

            // Minimum gap between beats (100ms)
            let far_enough = beat_times
                .last()
                .map_or(true, |&last: &f32| flux_values[i].0 - last > 0.1);

            if is_peak && far_enough {
                beat_times.push(flux_values[i].0);
            }
        }
    }

    beat_times
}

fn estimate_tempo(beat_times: &[f32]) -> f32 {
    if beat_times.len() < 2 {
        return 0.0;
    }

    let intervals: Vec<f32> = beat_times.windows(2).map(|w| w[1] - w[0]).collect();

    // Keep intervals in the 60-200 BPM range (0.3-1.0s)
    let reasonable: Vec<f32> = intervals
        .iter()
        .copied()
        .filter(|&i| (0.3..=1.0).contains(&i))
        .collect();

    if reasonable.is_empty() {
        return 0.0;
    }

    let median_interval = {
        let mut sorted = reasonable.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        sorted[sorted.len() / 2]
    };

    60.0 / median_interval
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::spectral::FFT_SIZE;

    #[test]
    fn info_on_empty_buffer() {
        let info = audio_info(&[], 22050);
        assert_eq!(info.duration, 0.0);
        assert_eq!(info.max_amplitude, 0.0);
        assert_eq!(info.dominant_frequency, 0.0);
        assert_eq!(info.beat_count, 0);
        assert_eq!(info.tempo_bpm, 0.0);
    }

    #[test]
    fn dominant_frequency_of_sine() {
        let rate = 22050u32;
        let signal: Vec<f32> = (0..rate * 2)
            .map(|i| {
                let t = i as f32 / rate as f32;
                0.5 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
            })
            .collect();

        let info = audio_info(&signal, rate);
        let resolution = rate as f32 / FFT_SIZE as f32;
        assert!(
            (info.dominant_frequency - 440.0).abs() < resolution * 2.0,
            "dominant {}",
            info.dominant_frequency
        );
        assert!((info.max_amplitude - 0.5).abs() < 1e-3);
    }

    #[test]
    fn steady_tone_has_no_beats() {
        let rate = 16000u32;
        let signal: Vec<f32> = (0..rate * 2)
            .map(|i| {
                let t = i as f32 / rate as f32;
                0.4 * (2.0 * std::f32::consts::PI * 200.0 * t).sin()
            })
            .collect();

        let info = audio_info(&signal, rate);
        assert!(info.beat_count < 3, "beats {}", info.beat_count);
    }
}
