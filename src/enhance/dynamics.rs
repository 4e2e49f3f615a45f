use anyhow::{bail, Result};

/// Envelope smoothing window for the compressor (samples, odd).
pub const SMOOTHING_WINDOW: usize = 101;
/// Polynomial order of the envelope smoother.
pub const SMOOTHING_ORDER: usize = 3;

/// Scale so the peak hits `headroom` (0.95 leaves 5% below full scale).
///
/// No-op on silence. Idempotent: a second application finds the peak
/// already at `headroom` and rescales by 1.
pub fn normalize_peak(samples: &[f32], headroom: f32) -> Vec<f32> {
    let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
    if peak <= 0.0 {
        return samples.to_vec();
    }
    let gain = headroom / peak;
    samples.iter().map(|&s| s * gain).collect()
}

/// Two-stage gain control: peak normalization, then RMS leveling.
///
/// Peak first prevents clipping before leveling; RMS second gives
/// consistent perceived loudness across recordings of different dynamic
/// character. The RMS step can push individual peaks back above the
/// headroom target for very dynamic material.
pub fn normalize(samples: &[f32], headroom: f32, target_rms: f32) -> Vec<f32> {
    let peaked = normalize_peak(samples, headroom);

    let current_rms = crate::analysis::spectral::rms(&peaked);
    if current_rms <= 0.0 {
        return peaked;
    }

    let gain = target_rms / current_rms;
    peaked.iter().map(|&s| s * gain).collect()
}

/// Soft-knee envelope compression above `threshold` at `ratio`:1.
///
/// The absolute-value envelope is smoothed with a Savitzky-Golay filter
/// (window 101, order 3) so instantaneous peaks don't pump the gain, the
/// smoothed envelope is mapped through the knee, and the original signal
/// is multiplied by `compressed / smoothed`. Deterministic, with no
/// attack/release constants beyond the smoothing window.
///
/// Buffers shorter than the smoothing window cannot be smoothed and are a
/// stage error.
pub fn compress(samples: &[f32], threshold: f32, ratio: f32) -> Result<Vec<f32>> {
    if ratio <= 0.0 {
        bail!("compression ratio must be positive, got {}", ratio);
    }

    let envelope: Vec<f32> = samples.iter().map(|s| s.abs()).collect();
    let smoothed = savgol_smooth(&envelope, SMOOTHING_WINDOW, SMOOTHING_ORDER)?;

    let output = samples
        .iter()
        .zip(smoothed.iter())
        .map(|(&s, &env)| {
            if env > 0.0 {
                let compressed = if env > threshold {
                    threshold + (env - threshold) / ratio
                } else {
                    env
                };
                s * (compressed / env)
            } else {
                s
            }
        })
        .collect();

    Ok(output)
}

/// Savitzky-Golay smoothing: least-squares polynomial fit over a sliding
/// window, evaluated at the window center.
///
/// Edges are handled by mirror extension. The convolution weights come
/// from solving the normal equations of the fit once per call.
pub fn savgol_smooth(samples: &[f32], window: usize, order: usize) -> Result<Vec<f32>> {
    if window % 2 == 0 {
        bail!("smoothing window must be odd, got {}", window);
    }
    if order >= window {
        bail!("polynomial order {} requires window > {}", order, order);
    }
    if samples.len() < window {
        bail!(
            "signal of {} samples is shorter than smoothing window {}",
            samples.len(),
            window
        );
    }

    let half = window / 2;
    let weights = savgol_weights(half, order)?;

    let mut output = Vec::with_capacity(samples.len());
    for i in 0..samples.len() {
        let mut acc = 0.0f64;
        for (j, &w) in weights.iter().enumerate() {
            let offset = j as isize - half as isize;
            let idx = mirror_index(i as isize + offset, samples.len());
            acc += w * samples[idx] as f64;
        }
        output.push(acc as f32);
    }

    Ok(output)
}

fn mirror_index(i: isize, len: usize) -> usize {
    let last = len as isize - 1;
    let mut i = i;
    if i < 0 {
        i = -i;
    }
    if i > last {
        i = 2 * last - i;
    }
    i.clamp(0, last) as usize
}

/// Center-point smoothing weights: w = A (A^T A)^{-1} e0 for the
/// Vandermonde matrix A over x = -half..=half.
fn savgol_weights(half: usize, order: usize) -> Result<Vec<f64>> {
    let terms = order + 1;

    // Normal-equation matrix: sums of powers of x.
    let mut ata = vec![vec![0.0f64; terms]; terms];
    for j in 0..terms {
        for k in 0..terms {
            let mut sum = 0.0f64;
            for x in -(half as i64)..=(half as i64) {
                sum += (x as f64).powi((j + k) as i32);
            }
            ata[j][k] = sum;
        }
    }

    // Solve ata * c = e0.
    let mut rhs = vec![0.0f64; terms];
    rhs[0] = 1.0;
    let coeffs = solve_linear(ata, rhs)?;

    let weights = (-(half as i64)..=(half as i64))
        .map(|x| {
            (0..terms)
                .map(|j| coeffs[j] * (x as f64).powi(j as i32))
                .sum()
        })
        .collect();

    Ok(weights)
}

/// Gaussian elimination with partial pivoting for the small normal system.
fn solve_linear(mut m: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> Result<Vec<f64>> {
    let n = rhs.len();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&a, &b| m[a][col].abs().partial_cmp(&m[b][col].abs()).unwrap())
            .unwrap();
        if m[pivot][col].abs() < 1e-12 {
            bail!("singular smoothing system");
        }
        m.swap(col, pivot);
        rhs.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = m[row][col] / m[col][col];
            for k in col..n {
                m[row][k] -= factor * m[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut solution = vec![0.0f64; n];
    for row in (0..n).rev() {
        let mut acc = rhs[row];
        for k in (row + 1)..n {
            acc -= m[row][k] * solution[k];
        }
        solution[row] = acc / m[row][row];
    }

    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::spectral::rms;

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
    fn peak_normalization_is_idempotent() {
        let signal = sine(440.0, 0.3, 0.5, 16000);
        let once = normalize_peak(&signal, 0.95);
        let twice = normalize_peak(&once, 0.95);
        for (a, b) in once.iter().zip(twice.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
        let peak = once.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        assert!((peak - 0.95).abs() < 1e-5);
    }

    #[test]
    fn normalize_is_a_noop_on_silence() {
        let silence = vec![0.0f32; 1000];
        let out = normalize(&silence, 0.95, 0.2);
        assert_eq!(out, silence);
    }

    #[test]
    fn normalize_hits_target_rms() {
        let signal = sine(440.0, 0.1, 1.0, 16000);
        let out = normalize(&signal, 0.95, 0.2);
        assert!((rms(&out) - 0.2).abs() < 1e-3, "rms {}", rms(&out));
    }

    #[test]
    fn constant_above_threshold_is_compressed() {
        // Smoothed envelope of a constant is the constant itself, so the
        // knee maps 0.8 to 0.5 + 0.3/4 = 0.575 exactly.
        let signal = vec![0.8f32; 2000];
        let out = compress(&signal, 0.5, 4.0).unwrap();
        for &s in &out[200..1800] {
            assert!((s - 0.575).abs() < 1e-3, "sample {}", s);
        }
    }

    #[test]
    fn constant_below_threshold_passes_through() {
        let signal = vec![0.3f32; 2000];
        let out = compress(&signal, 0.5, 4.0).unwrap();
        for &s in &out[200..1800] {
            assert!((s - 0.3).abs() < 1e-3);
        }
    }

    #[test]
    fn ramp_follows_the_knee() {
        let n = 10000usize;
        let signal: Vec<f32> = (0..n).map(|i| i as f32 / n as f32).collect();
        let out = compress(&signal, 0.5, 4.0).unwrap();

        // At envelope 0.9 the knee gives 0.5 + 0.4/4 = 0.6.
        let idx = 9000;
        assert!((out[idx] - 0.6).abs() < 5e-3, "sample {}", out[idx]);
        // At envelope 0.25, below the knee, the ramp is untouched.
        let idx = 2500;
        assert!((out[idx] - 0.25).abs() < 5e-3, "sample {}", out[idx]);
    }

    #[test]
    fn compressed_envelope_never_exceeds_knee() {
        let signal = sine(5.0, 0.9, 2.0, 4000);
        let out = compress(&signal, 0.5, 4.0).unwrap();
        let envelope: Vec<f32> = out.iter().map(|s| s.abs()).collect();
        let smoothed = savgol_smooth(&envelope, SMOOTHING_WINDOW, SMOOTHING_ORDER).unwrap();
        let limit = 0.5 + (0.9 - 0.5) / 4.0 + 0.02;
        for &e in &smoothed {
            assert!(e <= limit, "envelope {} above knee limit {}", e, limit);
        }
    }

    #[test]
    fn short_buffer_is_a_stage_error() {
        let signal = vec![0.5f32; 50];
        assert!(compress(&signal, 0.5, 4.0).is_err());
    }

    #[test]
    fn savgol_preserves_polynomials() {
        // Order-3 smoothing reproduces a quadratic exactly (away from
        // mirrored edges).
        let signal: Vec<f32> = (0..500).map(|i| {
            let x = i as f32 / 500.0;
            0.1 + 0.5 * x * x
        }).collect();
        let out = savgol_smooth(&signal, 101, 3).unwrap();
        for i in 100..400 {
            assert!((out[i] - signal[i]).abs() < 1e-4);
        }
    }
}
