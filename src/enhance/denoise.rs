use anyhow::{bail, Result};
use rustfft::{num_complex::Complex, FftPlanner};

use super::filter::{filtfilt, FilterSpec};
use crate::analysis::spectral::{hann_window, FFT_SIZE, HOP_SIZE};

/// How many standard deviations above the per-bin mean a frame must rise
/// to count as signal rather than noise.
const GATE_STD_FACTOR: f32 = 1.5;

/// Cutoff for the rumble-removal fallback filter.
const FALLBACK_HP_CUTOFF: f64 = 80.0;

/// Result of a denoise call, tagging which path produced it.
///
/// Spectral gating is a capability with a fallback, not a hard dependency:
/// callers (and tests) can observe whether the primary path ran.
pub struct DenoiseOutcome {
    pub samples: Vec<f32>,
    pub fallback_used: bool,
}

/// Remove background noise, preserving the buffer length.
///
/// Primary path: spectral gating with an unsupervised noise profile taken
/// from the signal itself. On any primary-path failure this falls back
/// unconditionally to a zero-phase order-4 high-pass at 80 Hz, which only
/// removes low-frequency rumble but never fails the stage outright.
pub fn denoise(samples: &[f32], sample_rate: u32, strength: f32) -> DenoiseOutcome {
    match spectral_gate(samples, sample_rate, strength) {
        Ok(clean) => DenoiseOutcome {
            samples: clean,
            fallback_used: false,
        },
        Err(err) => {
            log::warn!("Spectral gating unavailable ({}), falling back to high-pass", err);
            let samples = match (FilterSpec::HighPass { order: 4, cutoff_hz: FALLBACK_HP_CUTOFF })
                .design(sample_rate)
            {
                Ok(filter) => filtfilt(&filter, samples),
                // Sample rate too low for even the fallback cutoff;
                // pass the signal through untouched.
                Err(_) => samples.to_vec(),
            };
            DenoiseOutcome {
                samples,
                fallback_used: true,
            }
        }
    }
}

/// Spectral-domain noise suppression.
///
/// Estimates a per-bin noise threshold (mean + 1.5 sigma of the dB
/// magnitude over all frames), builds a smoothed time-frequency mask, and
/// attenuates sub-threshold content by `strength` (0.8 = 80% reduction)
/// before overlap-add resynthesis.
fn spectral_gate(samples: &[f32], sample_rate: u32, strength: f32) -> Result<Vec<f32>> {
    if sample_rate == 0 {
        bail!("sample rate must be positive");
    }
    if !(0.0..=1.0).contains(&strength) {
        bail!("suppression strength {} outside [0, 1]", strength);
    }
    if samples.len() < FFT_SIZE * 2 {
        bail!(
            "signal too short for a noise profile: {} samples, need {}",
            samples.len(),
            FFT_SIZE * 2
        );
    }

    let window = hann_window(FFT_SIZE);
    let num_frames = samples.len().div_ceil(HOP_SIZE);
    let half = FFT_SIZE / 2;

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(FFT_SIZE);
    let ifft = planner.plan_fft_inverse(FFT_SIZE);

    // Forward STFT, keeping complex spectra for reconstruction.
    let mut spectra: Vec<Vec<Complex<f32>>> = Vec::with_capacity(num_frames);
    for frame_idx in 0..num_frames {
        let start = frame_idx * HOP_SIZE;
        let end = (start + FFT_SIZE).min(samples.len());

        let mut buf = vec![Complex::new(0.0, 0.0); FFT_SIZE];
        for i in 0..end - start {
            buf[i] = Complex::new(samples[start + i] * window[i], 0.0);
        }
        fft.process(&mut buf);
        spectra.push(buf);
    }

    // Per-bin noise threshold from dB magnitude statistics over time.
    let db: Vec<Vec<f32>> = spectra
        .iter()
        .map(|s| {
            s[..half]
                .iter()
                .map(|c| 20.0 * (c.norm() + 1e-10).log10())
                .collect()
        })
        .collect();

    let n = spectra.len() as f32;
    let mut threshold = vec![0.0f32; half];
    for bin in 0..half {
        let mean: f32 = db.iter().map(|frame| frame[bin]).sum::<f32>() / n;
        let var: f32 = db
            .iter()
            .map(|frame| (frame[bin] - mean) * (frame[bin] - mean))
            .sum::<f32>()
            / n;
        threshold[bin] = mean + GATE_STD_FACTOR * var.sqrt();
    }

    // Binary mask, then a small box blur over time and frequency to avoid
    // musical-noise artifacts from isolated cells.
    let raw_mask: Vec<Vec<f32>> = db
        .iter()
        .map(|frame| {
            frame
                .iter()
                .zip(threshold.iter())
                .map(|(&v, &t)| if v > t { 1.0 } else { 0.0 })
                .collect()
        })
        .collect();
    let mask = smooth_mask(&raw_mask);

    // Attenuate sub-threshold bins and resynthesize.
    let mut output = vec![0.0f32; samples.len()];
    let mut window_sum = vec![0.0f32; samples.len()];

    for (frame_idx, spectrum) in spectra.iter().enumerate() {
        let mut buf = spectrum.clone();
        for bin in 0..half {
            let gain = 1.0 - strength * (1.0 - mask[frame_idx][bin]);
            buf[bin] *= gain;
            if bin > 0 {
                buf[FFT_SIZE - bin] *= gain;
            }
        }

        ifft.process(&mut buf);

        let start = frame_idx * HOP_SIZE;
        for i in 0..FFT_SIZE {
            let idx = start + i;
            if idx >= output.len() {
                break;
            }
            // Inverse FFT is unnormalized; synthesis window for overlap-add.
            output[idx] += buf[i].re / FFT_SIZE as f32 * window[i];
            window_sum[idx] += window[i] * window[i];
        }
    }

    for (out, &wsum) in output.iter_mut().zip(window_sum.iter()) {
        if wsum > 1e-8 {
            *out /= wsum;
        }
    }

    Ok(output)
}

fn smooth_mask(mask: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let frames = mask.len();
    let bins = mask[0].len();
    let mut smoothed = vec![vec![0.0f32; bins]; frames];

    for t in 0..frames {
        let t0 = t.saturating_sub(2);
        let t1 = (t + 3).min(frames);
        for f in 0..bins {
            let f0 = f.saturating_sub(2);
            let f1 = (f + 3).min(bins);
            let mut sum = 0.0;
            for row in &mask[t0..t1] {
                for &v in &row[f0..f1] {
                    sum += v;
                }
            }
            smoothed[t][f] = sum / ((t1 - t0) * (f1 - f0)) as f32;
        }
    }

    smoothed
}
