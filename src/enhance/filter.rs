use anyhow::{bail, Result};
use rustfft::num_complex::Complex;
use std::f64::consts::PI;

/// Filter design request: type, order, and band edges in Hz.
///
/// A value object constructed fresh per enhancement call from the pipeline
/// constants; designing it against a sample rate yields the digital
/// coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterSpec {
    LowPass { order: usize, cutoff_hz: f64 },
    HighPass { order: usize, cutoff_hz: f64 },
    BandPass { order: usize, low_hz: f64, high_hz: f64 },
}

/// Digital Butterworth filter as b/a transfer-function coefficients.
#[derive(Debug, Clone)]
pub struct Filter {
    pub b: Vec<f64>,
    pub a: Vec<f64>,
}

impl FilterSpec {
    /// Design the digital filter via bilinear transform of the analog
    /// Butterworth prototype.
    pub fn design(&self, sample_rate: u32) -> Result<Filter> {
        if sample_rate == 0 {
            bail!("sample rate must be positive");
        }
        let fs = sample_rate as f64;
        let nyquist = fs / 2.0;

        match *self {
            FilterSpec::LowPass { order, cutoff_hz } | FilterSpec::HighPass { order, cutoff_hz } => {
                if cutoff_hz <= 0.0 || cutoff_hz >= nyquist {
                    bail!(
                        "cutoff {} Hz outside (0, {}) for sample rate {}",
                        cutoff_hz,
                        nyquist,
                        sample_rate
                    );
                }
                if order == 0 {
                    bail!("filter order must be at least 1");
                }

                let warped = prewarp(cutoff_hz, fs);
                let proto = butter_prototype(order);

                let (zeros, poles, gain) = match self {
                    FilterSpec::LowPass { .. } => {
                        let poles: Vec<_> = proto.iter().map(|&p| p * warped).collect();
                        (Vec::new(), poles, warped.powi(order as i32))
                    }
                    _ => {
                        let poles: Vec<_> = proto.iter().map(|&p| Complex::new(warped, 0.0) / p).collect();
                        let zeros = vec![Complex::new(0.0, 0.0); order];
                        (zeros, poles, 1.0)
                    }
                };

                Ok(bilinear(&zeros, &poles, gain, fs))
            }
            FilterSpec::BandPass { order, low_hz, high_hz } => {
                if low_hz <= 0.0 || high_hz >= nyquist || low_hz >= high_hz {
                    bail!(
                        "band [{}, {}] Hz invalid for sample rate {}",
                        low_hz,
                        high_hz,
                        sample_rate
                    );
                }
                if order == 0 {
                    bail!("filter order must be at least 1");
                }

                let w1 = prewarp(low_hz, fs);
                let w2 = prewarp(high_hz, fs);
                let bw = w2 - w1;
                let w0 = (w1 * w2).sqrt();

                // Lowpass-to-bandpass transform doubles the pole count.
                let mut poles = Vec::with_capacity(order * 2);
                for p in butter_prototype(order) {
                    let half = p * bw / 2.0;
                    let disc = (half * half - Complex::new(w0 * w0, 0.0)).sqrt();
                    poles.push(half + disc);
                    poles.push(half - disc);
                }
                let zeros = vec![Complex::new(0.0, 0.0); order];
                let gain = bw.powi(order as i32);

                Ok(bilinear(&zeros, &poles, gain, fs))
            }
        }
    }
}

/// Bilinear-transform frequency prewarping.
fn prewarp(freq_hz: f64, fs: f64) -> f64 {
    2.0 * fs * (PI * freq_hz / fs).tan()
}

/// Analog Butterworth prototype poles on the unit circle, left half-plane.
fn butter_prototype(order: usize) -> Vec<Complex<f64>> {
    (0..order)
        .map(|k| {
            let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
            Complex::new(theta.cos(), theta.sin())
        })
        .collect()
}

/// Map analog zeros/poles/gain to digital b/a coefficients.
fn bilinear(zeros: &[Complex<f64>], poles: &[Complex<f64>], gain: f64, fs: f64) -> Filter {
    let fs2 = 2.0 * fs;

    let z_digital: Vec<Complex<f64>> = zeros
        .iter()
        .map(|&z| (Complex::new(fs2, 0.0) + z) / (Complex::new(fs2, 0.0) - z))
        .collect();
    let p_digital: Vec<Complex<f64>> = poles
        .iter()
        .map(|&p| (Complex::new(fs2, 0.0) + p) / (Complex::new(fs2, 0.0) - p))
        .collect();

    let num: Complex<f64> = zeros
        .iter()
        .map(|&z| Complex::new(fs2, 0.0) - z)
        .product();
    let den: Complex<f64> = poles
        .iter()
        .map(|&p| Complex::new(fs2, 0.0) - p)
        .product();
    let k_digital = gain * (num / den).re;

    // Analog zeros at infinity land at z = -1.
    let mut z_full = z_digital;
    z_full.resize(p_digital.len(), Complex::new(-1.0, 0.0));

    let b: Vec<f64> = poly(&z_full).iter().map(|&c| (c * k_digital).re).collect();
    let a: Vec<f64> = poly(&p_digital).iter().map(|c| c.re).collect();

    Filter { b, a }
}

/// Expand a root list into monic polynomial coefficients, highest power
/// first.
fn poly(roots: &[Complex<f64>]) -> Vec<Complex<f64>> {
    let mut coeffs = vec![Complex::new(1.0, 0.0)];
    for root in roots {
        let mut next = vec![Complex::new(0.0, 0.0); coeffs.len() + 1];
        for (i, &c) in coeffs.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c * *root;
        }
        coeffs = next;
    }
    coeffs
}

impl Filter {
    /// Single causal pass, direct-form transversal with explicit delay
    /// lines. State lives on the stack of this call only.
    fn apply_forward(&self, input: &[f64]) -> Vec<f64> {
        let mut x_delays = vec![0.0f64; self.b.len().saturating_sub(1)];
        let mut y_delays = vec![0.0f64; self.a.len().saturating_sub(1)];
        let mut output = Vec::with_capacity(input.len());

        for &x in input {
            let mut y = self.b[0] * x;
            for (i, &xd) in x_delays.iter().enumerate() {
                y += self.b[i + 1] * xd;
            }
            for (i, &yd) in y_delays.iter().enumerate() {
                y -= self.a[i + 1] * yd;
            }
            y /= self.a[0];

            for i in (1..x_delays.len()).rev() {
                x_delays[i] = x_delays[i - 1];
            }
            if !x_delays.is_empty() {
                x_delays[0] = x;
            }
            for i in (1..y_delays.len()).rev() {
                y_delays[i] = y_delays[i - 1];
            }
            if !y_delays.is_empty() {
                y_delays[0] = y;
            }

            output.push(y);
        }

        output
    }
}

/// Zero-phase filtering: forward pass, then a second pass over the
/// time-reversed signal so the phase distortion of the two passes cancels.
///
/// The signal is extended at both ends with an odd reflection to suppress
/// startup transients; the extension is stripped before returning. Requires
/// the whole signal in memory (offline only).
pub fn filtfilt(filter: &Filter, samples: &[f32]) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let ntaps = filter.b.len().max(filter.a.len());
    let pad = (3 * (ntaps - 1)).min(samples.len() - 1);

    let mut extended = Vec::with_capacity(samples.len() + 2 * pad);
    let first = samples[0] as f64;
    let last = samples[samples.len() - 1] as f64;
    for i in (1..=pad).rev() {
        extended.push(2.0 * first - samples[i] as f64);
    }
    extended.extend(samples.iter().map(|&s| s as f64));
    for i in 1..=pad {
        extended.push(2.0 * last - samples[samples.len() - 1 - i] as f64);
    }

    let mut forward = filter.apply_forward(&extended);
    forward.reverse();
    let mut backward = filter.apply_forward(&forward);
    backward.reverse();

    backward[pad..pad + samples.len()]
        .iter()
        .map(|&s| s as f32)
        .collect()
}
