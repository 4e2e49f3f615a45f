use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};

pub const FFT_SIZE: usize = 2048;
pub const HOP_SIZE: usize = 512;

/// Magnitude spectrogram of one analysis call.
///
/// Ephemeral: built for a single analyze/denoise invocation and dropped
/// with it, never cached across calls.
pub struct SpectralFrames {
    /// Per-frame magnitudes, `FFT_SIZE / 2` bins each.
    pub magnitudes: Vec<Vec<f32>>,
    /// Hz per bin.
    pub freq_resolution: f32,
}

/// Summary spectral statistics averaged over all analysis frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpectralSummary {
    pub centroid: f32,
    pub bandwidth: f32,
    pub rolloff: f32,
    pub zero_crossing_rate: f32,
}

pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let x = (i as f32 / size as f32) * std::f32::consts::PI * 2.0;
            0.5 * (1.0 - x.cos())
        })
        .collect()
}

/// Windowed STFT magnitudes with a 2048-point Hann window, hop 512.
///
/// Signals shorter than one window are zero-padded into a single frame, so
/// any non-empty input yields at least one frame.
pub fn stft_magnitudes(samples: &[f32], sample_rate: u32) -> SpectralFrames {
    let freq_resolution = sample_rate as f32 / FFT_SIZE as f32;
    if samples.is_empty() {
        return SpectralFrames {
            magnitudes: Vec::new(),
            freq_resolution,
        };
    }

    let hann = hann_window(FFT_SIZE);
    let num_frames = samples.len().div_ceil(HOP_SIZE).max(1);

    let magnitudes: Vec<Vec<f32>> = (0..num_frames)
        .into_par_iter()
        .map(|frame_idx| {
            let start = frame_idx * HOP_SIZE;
            let end = (start + FFT_SIZE).min(samples.len());

            let mut fft_input: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); FFT_SIZE];
            for i in 0..end.saturating_sub(start) {
                fft_input[i] = Complex::new(samples[start + i] * hann[i], 0.0);
            }

            // Per-thread FFT planner (rayon-safe)
            let mut planner = FftPlanner::<f32>::new();
            let fft = planner.plan_fft_forward(FFT_SIZE);
            fft.process(&mut fft_input);

            fft_input[..FFT_SIZE / 2].iter().map(|c| c.norm()).collect()
        })
        .collect();

    SpectralFrames {
        magnitudes,
        freq_resolution,
    }
}

/// RMS of the whole buffer. Empty input is defined as 0, not NaN.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Per-frame RMS envelope over hop-spaced windows (2048/512).
///
/// The trailing partial frame is included so short signals still produce
/// at least one value.
pub fn frame_rms(samples: &[f32]) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let num_frames = samples.len().div_ceil(HOP_SIZE).max(1);
    (0..num_frames)
        .map(|i| {
            let start = i * HOP_SIZE;
            let end = (start + FFT_SIZE).min(samples.len());
            rms(&samples[start..end])
        })
        .collect()
}

/// Centroid, bandwidth, 85%-rolloff and zero-crossing rate of a buffer.
///
/// All values are finite; silent or empty input yields zeros.
pub fn spectral_summary(samples: &[f32], sample_rate: u32) -> SpectralSummary {
    let zcr = zero_crossing_rate(samples);

    let frames = stft_magnitudes(samples, sample_rate);
    if frames.magnitudes.is_empty() {
        return SpectralSummary {
            zero_crossing_rate: zcr,
            ..Default::default()
        };
    }

    // Frames are weighted by their total magnitude so that near-silent
    // frames (and zero-padded tails) don't skew the averages.
    let mut centroid_sum = 0.0f32;
    let mut bandwidth_sum = 0.0f32;
    let mut rolloff_sum = 0.0f32;
    let mut weight_sum = 0.0f32;

    for mags in &frames.magnitudes {
        let total: f32 = mags.iter().sum();
        if total <= 1e-10 {
            continue;
        }

        let centroid = mags
            .iter()
            .enumerate()
            .map(|(i, &m)| i as f32 * frames.freq_resolution * m)
            .sum::<f32>()
            / total;

        let spread = mags
            .iter()
            .enumerate()
            .map(|(i, &m)| {
                let d = i as f32 * frames.freq_resolution - centroid;
                m * d * d
            })
            .sum::<f32>()
            / total;

        let rolloff_target = total * 0.85;
        let mut cumulative = 0.0f32;
        let mut rolloff = 0.0f32;
        for (i, &m) in mags.iter().enumerate() {
            cumulative += m;
            if cumulative >= rolloff_target {
                rolloff = i as f32 * frames.freq_resolution;
                break;
            }
        }

        centroid_sum += centroid * total;
        bandwidth_sum += spread.sqrt() * total;
        rolloff_sum += rolloff * total;
        weight_sum += total;
    }

    if weight_sum <= 1e-10 {
        return SpectralSummary {
            zero_crossing_rate: zcr,
            ..Default::default()
        };
    }

    SpectralSummary {
        centroid: centroid_sum / weight_sum,
        bandwidth: bandwidth_sum / weight_sum,
        rolloff: rolloff_sum / weight_sum,
        zero_crossing_rate: zcr,
    }
}

/// Fraction of adjacent-sample sign changes.
pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f32 / (samples.len() - 1) as f32
}

/// Mean and standard deviation over every cell of the magnitude grid.
pub fn magnitude_stats(frames: &SpectralFrames) -> (f32, f32) {
    let count: usize = frames.magnitudes.iter().map(|f| f.len()).sum();
    if count == 0 {
        return (0.0, 0.0);
    }

    let sum: f32 = frames.magnitudes.iter().flatten().sum();
    let mean = sum / count as f32;

    let var: f32 = frames
        .magnitudes
        .iter()
        .flatten()
        .map(|&m| (m - mean) * (m - mean))
        .sum::<f32>()
        / count as f32;

    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amplitude: f32, secs: f32, rate: u32) -> Vec<f32> {
        let n = (secs * rate as f32) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / rate as f32;
                amplitude * (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect()
    }

    #[test]
    fn empty_input_yields_zeros() {
        let summary = spectral_summary(&[], 22050);
        assert_eq!(summary.centroid, 0.0);
        assert_eq!(summary.bandwidth, 0.0);
        assert_eq!(summary.rolloff, 0.0);
        assert_eq!(summary.zero_crossing_rate, 0.0);
        assert_eq!(rms(&[]), 0.0);
        assert!(frame_rms(&[]).is_empty());
    }

    #[test]
    fn silence_yields_finite_zeros() {
        let silence = vec![0.0f32; 44100];
        let summary = spectral_summary(&silence, 44100);
        assert_eq!(summary.centroid, 0.0);
        assert_eq!(summary.zero_crossing_rate, 0.0);
        assert_eq!(rms(&silence), 0.0);
    }

    #[test]
    fn sine_centroid_near_fundamental() {
        let signal = sine(440.0, 0.5, 1.0, 22050);
        let summary = spectral_summary(&signal, 22050);
        assert!(
            summary.centroid > 300.0 && summary.centroid < 700.0,
            "centroid {} not near 440 Hz",
            summary.centroid
        );
        assert!(summary.rolloff < 2000.0);
        assert!(summary.centroid.is_finite() && summary.bandwidth.is_finite());
    }

    #[test]
    fn sine_zero_crossing_rate() {
        let signal = sine(440.0, 0.5, 1.0, 22050);
        let zcr = zero_crossing_rate(&signal);
        // 440 Hz crosses zero ~880 times per second.
        let expected = 2.0 * 440.0 / 22050.0;
        assert!((zcr - expected).abs() < expected * 0.1, "zcr {}", zcr);
    }

    #[test]
    fn short_signal_still_framed() {
        let signal = vec![0.25f32; 100];
        let frames = stft_magnitudes(&signal, 16000);
        assert_eq!(frames.magnitudes.len(), 1);
        assert!(!frame_rms(&signal).is_empty());
    }

    #[test]
    fn rms_of_constant() {
        let signal = vec![0.5f32; 4096];
        assert!((rms(&signal) - 0.5).abs() < 1e-6);
    }
}
