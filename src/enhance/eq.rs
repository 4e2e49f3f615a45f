use anyhow::Result;

use super::filter::{filtfilt, FilterSpec};

/// Fixed-band EQ settings for speech intelligibility.
#[derive(Debug, Clone, Copy)]
pub struct EqSettings {
    /// Rumble removal high-pass cutoff (Hz).
    pub hp_cutoff: f64,
    /// Presence-boost passband (Hz).
    pub presence_low: f64,
    pub presence_high: f64,
    /// Mix level of the presence band added back onto the base signal.
    pub presence_gain: f32,
    /// Anti-alias low-pass cutoff (Hz), applied only below Nyquist.
    pub lp_cutoff: f64,
}

impl Default for EqSettings {
    fn default() -> Self {
        Self {
            hp_cutoff: 80.0,
            presence_low: 2000.0,
            presence_high: 3000.0,
            presence_gain: 0.3,
            lp_cutoff: 8000.0,
        }
    }
}

/// Speech-band equalization, all passes zero-phase.
///
/// High-pass at 80 Hz removes rumble; the 2-3 kHz band is extracted and
/// mixed back at 0.3x to lift consonant intelligibility; a final order-4
/// low-pass at 8 kHz guards against aliasing before resampling whenever
/// the signal's Nyquist leaves room for it.
///
/// The presence-boost addition can push peaks above the normalizer's
/// headroom; the chain deliberately does not re-normalize here.
pub fn voice_eq(samples: &[f32], sample_rate: u32, settings: &EqSettings) -> Result<Vec<f32>> {
    let hp = FilterSpec::HighPass { order: 2, cutoff_hz: settings.hp_cutoff }
        .design(sample_rate)?;
    let base = filtfilt(&hp, samples);

    let bp = FilterSpec::BandPass {
        order: 2,
        low_hz: settings.presence_low,
        high_hz: settings.presence_high,
    }
    .design(sample_rate)?;
    let presence = filtfilt(&bp, &base);

    let mut output: Vec<f32> = base
        .iter()
        .zip(presence.iter())
        .map(|(&b, &p)| b + settings.presence_gain * p)
        .collect();

    let nyquist = sample_rate as f64 / 2.0;
    if settings.lp_cutoff < nyquist {
        let lp = FilterSpec::LowPass { order: 4, cutoff_hz: settings.lp_cutoff }
            .design(sample_rate)?;
        output = filtfilt(&lp, &output);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::spectral::rms;

    fn sine(freq: f32, secs: f32, rate: u32) -> Vec<f32> {
        let n = (secs * rate as f32) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / rate as f32;
                0.4 * (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect()
    }

    #[test]
    fn preserves_length() {
        let signal = sine(440.0, 0.5, 44100);
        let out = voice_eq(&signal, 44100, &EqSettings::default()).unwrap();
        assert_eq!(out.len(), signal.len());
    }

    #[test]
    fn boosts_presence_band() {
        let settings = EqSettings::default();

        let mid = sine(500.0, 0.5, 22050);
        let mid_out = voice_eq(&mid, 22050, &settings).unwrap();
        let mid_gain = rms(&mid_out) / rms(&mid);

        let presence = sine(2500.0, 0.5, 22050);
        let presence_out = voice_eq(&presence, 22050, &settings).unwrap();
        let presence_gain = rms(&presence_out) / rms(&presence);

        assert!(
            presence_gain > mid_gain * 1.15,
            "presence {} vs mid {}",
            presence_gain,
            mid_gain
        );
        // The boost is why post-EQ peaks can exceed the earlier headroom.
        assert!(presence_gain > 1.1 && presence_gain < 1.4);
    }

    #[test]
    fn removes_rumble() {
        let rumble = sine(20.0, 0.5, 22050);
        let out = voice_eq(&rumble, 22050, &EqSettings::default()).unwrap();
        assert!(rms(&out) / rms(&rumble) < 0.1);
    }

    #[test]
    fn skips_lowpass_at_low_rates() {
        // Nyquist of 8 kHz equals the cutoff, so the anti-alias pass must
        // be skipped instead of failing the design.
        let signal = sine(440.0, 0.5, 16000);
        let out = voice_eq(&signal, 16000, &EqSettings::default()).unwrap();
        assert_eq!(out.len(), signal.len());
    }
}
