use anyhow::{bail, Context, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Resample mono f32 audio to `target_rate` with a windowed-sinc
/// polyphase resampler. No-op when the rates already match.
pub fn resample(samples: &[f32], from_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    if from_rate == 0 || target_rate == 0 {
        bail!("sample rates must be positive ({} -> {})", from_rate, target_rate);
    }
    if from_rate == target_rate {
        return Ok(samples.to_vec());
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / from_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(
        ratio,
        2.0, // max relative ratio
        params,
        samples.len(),
        1, // mono
    )
    .context("Failed to create resampler")?;

    let input = vec![samples.to_vec()];
    let output = resampler.process(&input, None).context("Resampling failed")?;

    let resampled = output.into_iter().next().unwrap_or_default();

    log::info!(
        "Resampled {}Hz -> {}Hz: {} -> {} samples",
        from_rate,
        target_rate,
        samples.len(),
        resampled.len()
    );

    Ok(resampled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_rate_is_a_noop() {
        let signal = vec![0.25f32; 4410];
        let out = resample(&signal, 22050, 22050).unwrap();
        assert_eq!(out, signal);
    }

    #[test]
    fn halves_sample_count() {
        let signal: Vec<f32> = (0..44100)
            .map(|i| {
                let t = i as f32 / 44100.0;
                0.5 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
            })
            .collect();

        let out = resample(&signal, 44100, 22050).unwrap();
        let expected = signal.len() as f64 / 2.0;
        assert!(
            (out.len() as f64 - expected).abs() <= 4.0,
            "expected ~{} samples, got {}",
            expected,
            out.len()
        );
    }

    #[test]
    fn round_trip_preserves_duration() {
        let rate = 44100u32;
        let signal: Vec<f32> = (0..rate as usize)
            .map(|i| {
                let t = i as f32 / rate as f32;
                0.5 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
            })
            .collect();

        let down = resample(&signal, rate, 22050).unwrap();
        let back = resample(&down, 22050, rate).unwrap();

        let in_dur = signal.len() as f64 / rate as f64;
        let out_dur = back.len() as f64 / rate as f64;
        // Interpolation rounds frame counts; duration must survive within
        // a few sample periods.
        assert!(
            (in_dur - out_dur).abs() < 8.0 / rate as f64,
            "duration drifted: {} vs {}",
            in_dur,
            out_dur
        );
    }

    #[test]
    fn rejects_zero_rates() {
        assert!(resample(&[0.0], 0, 22050).is_err());
        assert!(resample(&[0.0], 22050, 0).is_err());
    }
}
