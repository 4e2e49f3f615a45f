use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Write mono f32 samples as 16-bit PCM WAV.
///
/// Samples are clamped to [-1, 1] before quantization; the enhancement
/// chain does not guarantee headroom after the EQ presence boost.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;

    for &s in samples {
        let clamped = s.clamp(-1.0, 1.0);
        writer.write_sample((clamped * i16::MAX as f32) as i16)?;
    }

    writer.finalize().context("Failed to finalize WAV file")?;

    log::info!(
        "Wrote {}: {} samples @ {}Hz",
        path.display(),
        samples.len(),
        sample_rate
    );

    Ok(())
}

/// Build a collision-resistant output path like `<dir>/<prefix>_<uuid>.wav`.
///
/// Concurrent invocations share the output directory, so names must be
/// unique per invocation.
pub fn unique_output_path(dir: &Path, prefix: &str) -> PathBuf {
    dir.join(format!("{}_{}.wav", prefix, Uuid::new_v4()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_paths_do_not_collide() {
        let dir = Path::new("/tmp");
        let a = unique_output_path(dir, "enhanced");
        let b = unique_output_path(dir, "enhanced");
        assert_ne!(a, b);
        assert!(a.to_string_lossy().ends_with(".wav"));
        assert!(a.file_name().unwrap().to_string_lossy().starts_with("enhanced_"));
    }

    #[test]
    fn wav_round_trip() {
        let dir = std::env::temp_dir();
        let path = unique_output_path(&dir, "test");
        let samples: Vec<f32> = (0..1000)
            .map(|i| (i as f32 * 0.01).sin() * 0.5)
            .collect();
        write_wav(&path, &samples, 22050).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 22050);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.len() as usize, samples.len());

        let first: i16 = reader.samples::<i16>().next().unwrap().unwrap();
        assert_eq!(first, 0);

        std::fs::remove_file(&path).ok();
    }
}
