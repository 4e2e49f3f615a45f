use crate::analysis::spectral::{rms, FFT_SIZE, HOP_SIZE};

/// Remove leading and trailing silence below `threshold_db` (dBFS).
///
/// Frame RMS (2048-sample windows, hop 512) is compared against the
/// threshold from both ends inward; interior silence is never touched.
/// An entirely silent buffer trims to length zero — callers must not
/// assume non-empty output.
pub fn trim_silence(samples: &[f32], threshold_db: f32) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let num_frames = samples.len().div_ceil(HOP_SIZE);
    let loud = |frame_idx: usize| -> bool {
        let start = frame_idx * HOP_SIZE;
        let end = (start + FFT_SIZE).min(samples.len());
        let level = rms(&samples[start..end]);
        20.0 * (level + 1e-10).log10() > threshold_db
    };

    let first = match (0..num_frames).find(|&i| loud(i)) {
        Some(i) => i,
        None => return Vec::new(),
    };
    let last = (0..num_frames).rev().find(|&i| loud(i)).unwrap_or(first);

    let start = first * HOP_SIZE;
    let end = (last * HOP_SIZE + FFT_SIZE).min(samples.len());
    samples[start..end].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(secs: f32, rate: u32) -> Vec<f32> {
        let n = (secs * rate as f32) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / rate as f32;
                0.5 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
            })
            .collect()
    }

    #[test]
    fn trims_edges_but_not_interior() {
        let rate = 16000u32;
        let silence = vec![0.0f32; rate as usize]; // 1s each side
        let mut signal = silence.clone();
        signal.extend(tone(3.0, rate));
        signal.extend(silence.clone());

        let trimmed = trim_silence(&signal, -40.0);
        let expected = 3 * rate as usize;
        assert!(
            (trimmed.len() as i64 - expected as i64).unsigned_abs() as usize <= 2 * FFT_SIZE,
            "trimmed to {} samples, expected ~{}",
            trimmed.len(),
            expected
        );
    }

    #[test]
    fn keeps_interior_silence() {
        let rate = 16000u32;
        let mut signal = tone(1.0, rate);
        signal.extend(vec![0.0f32; rate as usize]);
        signal.extend(tone(1.0, rate));

        let trimmed = trim_silence(&signal, -40.0);
        // Both tone bursts plus the interior gap survive.
        assert!(trimmed.len() >= 3 * rate as usize - 2 * FFT_SIZE);
    }

    #[test]
    fn all_silence_trims_to_empty() {
        let silence = vec![0.0f32; 32000];
        assert!(trim_silence(&silence, -40.0).is_empty());
        assert!(trim_silence(&[], -40.0).is_empty());
    }

    #[test]
    fn trim_is_idempotent() {
        let rate = 16000u32;
        let mut signal = vec![0.0f32; rate as usize / 2];
        signal.extend(tone(2.0, rate));
        signal.extend(vec![0.0f32; rate as usize / 2]);

        let once = trim_silence(&signal, -40.0);
        let twice = trim_silence(&once, -40.0);
        assert_eq!(once, twice);
    }

    #[test]
    fn loud_signal_is_untouched() {
        let signal = tone(1.0, 16000);
        let trimmed = trim_silence(&signal, -40.0);
        assert_eq!(trimmed.len(), signal.len());
    }
}
