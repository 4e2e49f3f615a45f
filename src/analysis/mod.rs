pub mod info;
pub mod quality;
pub mod spectral;

use serde::Serialize;

/// Flat record of objective quality measurements for one recording.
///
/// This is the sole analysis output contract: produced once per call,
/// immutable afterwards, persisted by callers rather than by the core.
#[derive(Debug, Clone, Serialize)]
pub struct QualityMetrics {
    pub duration: f64,
    pub sample_rate: u32,
    pub channels: usize,
    pub avg_rms: f32,
    pub noise_level: f32,
    pub signal_quality: f32,
    pub spectral_centroid: f32,
    pub spectral_bandwidth: f32,
    pub spectral_rolloff: f32,
    pub zero_crossing_rate: f32,
    pub dynamic_range: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QualityMetrics {
    /// Safe-default record for inputs that could not be decoded at all.
    ///
    /// Analysis never blocks a caller's workflow: a failure is reported
    /// inside the record (worst-case noise, zero quality), not raised.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            duration: 0.0,
            sample_rate: 0,
            channels: 0,
            avg_rms: 0.0,
            noise_level: 1.0,
            signal_quality: 0.0,
            spectral_centroid: 0.0,
            spectral_bandwidth: 0.0,
            spectral_rolloff: 0.0,
            zero_crossing_rate: 0.0,
            dynamic_range: 0.0,
            error: Some(message.into()),
        }
    }
}

/// Analyze a mono buffer and extract quality metrics.
///
/// Pure and total: never panics, never returns NaN or infinite values.
/// An empty or silent buffer produces all-zero metrics rather than an
/// error.
pub fn analyze(samples: &[f32], sample_rate: u32) -> QualityMetrics {
    let duration = if sample_rate > 0 {
        samples.len() as f64 / sample_rate as f64
    } else {
        0.0
    };

    let frame_rms = spectral::frame_rms(samples);
    let avg_rms = if frame_rms.is_empty() {
        0.0
    } else {
        frame_rms.iter().sum::<f32>() / frame_rms.len() as f32
    };

    let noise_level = quality::estimate_noise_level(samples, sample_rate);
    let signal_quality = quality::signal_quality(samples, sample_rate, noise_level);
    let summary = spectral::spectral_summary(samples, sample_rate);
    let dynamic_range = quality::dynamic_range_of(&frame_rms);

    QualityMetrics {
        duration,
        sample_rate,
        channels: 1,
        avg_rms,
        noise_level,
        signal_quality,
        spectral_centroid: summary.centroid,
        spectral_bandwidth: summary.bandwidth,
        spectral_rolloff: summary.rolloff,
        zero_crossing_rate: summary.zero_crossing_rate,
        dynamic_range,
        error: None,
    }
}
