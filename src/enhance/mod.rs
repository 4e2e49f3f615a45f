pub mod denoise;
pub mod dynamics;
pub mod eq;
pub mod filter;
pub mod resample;
pub mod trim;

use thiserror::Error;

pub use eq::EqSettings;

/// Pipeline constants, overridable for testing and experimentation.
///
/// Defaults match the production chain; nothing in the stages hard-codes
/// these values.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub target_sample_rate: u32,
    pub peak_headroom: f32,
    pub target_rms: f32,
    pub compressor_threshold: f32,
    pub compressor_ratio: f32,
    /// Spectral-gate suppression strength: 0.8 removes 80% of
    /// sub-threshold energy.
    pub noise_reduction: f32,
    pub eq: EqSettings,
    pub trim_threshold_db: f32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            target_sample_rate: 22050,
            peak_headroom: 0.95,
            target_rms: 0.2,
            compressor_threshold: 0.5,
            compressor_ratio: 4.0,
            noise_reduction: 0.8,
            eq: EqSettings::default(),
            trim_threshold_db: -40.0,
        }
    }
}

/// A non-recoverable failure in one enhancement stage.
///
/// Only the denoise stage recovers internally (its high-pass fallback);
/// any other stage error surfaces here. The documented caller fallback is
/// to keep using the original, unenhanced buffer, so a failed enhancement
/// degrades quality instead of blocking the workflow.
#[derive(Debug, Error)]
#[error("enhancement failed at {stage} stage: {source}")]
pub struct EnhanceError {
    pub stage: &'static str,
    #[source]
    pub source: anyhow::Error,
}

impl EnhanceError {
    fn at(stage: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| Self { stage, source }
    }
}

/// Run the full enhancement chain:
/// denoise -> normalize -> compress -> equalize -> resample.
///
/// Deterministic for a given input and settings; writes nothing itself.
/// Returns the enhanced buffer and its (target) sample rate. Stage order
/// is fixed and unconditional; there is no branching on intermediate
/// quality. The EQ presence boost is not re-normalized afterwards, so the
/// output peak may exceed the normalizer's headroom (the encoder clamps
/// at write time).
pub fn enhance(
    samples: &[f32],
    sample_rate: u32,
    settings: &PipelineSettings,
) -> Result<(Vec<f32>, u32), EnhanceError> {
    log::info!(
        "Enhancing {} samples @ {}Hz -> {}Hz",
        samples.len(),
        sample_rate,
        settings.target_sample_rate
    );

    let outcome = denoise::denoise(samples, sample_rate, settings.noise_reduction);
    if outcome.fallback_used {
        log::info!("Denoise: high-pass fallback");
    } else {
        log::info!("Denoise: spectral gating");
    }

    let normalized = dynamics::normalize(
        &outcome.samples,
        settings.peak_headroom,
        settings.target_rms,
    );

    let compressed = dynamics::compress(
        &normalized,
        settings.compressor_threshold,
        settings.compressor_ratio,
    )
    .map_err(EnhanceError::at("compress"))?;

    let equalized =
        eq::voice_eq(&compressed, sample_rate, &settings.eq).map_err(EnhanceError::at("equalize"))?;

    let resampled = resample::resample(&equalized, sample_rate, settings.target_sample_rate)
        .map_err(EnhanceError::at("resample"))?;

    Ok((resampled, settings.target_sample_rate))
}
