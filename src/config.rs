use serde::Deserialize;
use std::path::PathBuf;

use crate::enhance::{EqSettings, PipelineSettings};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
}

/// Pipeline constants as they appear in `voxprep.toml`. Every tunable the
/// stages recognize is overridable here; the defaults are the production
/// values.
#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_target_rate")]
    pub target_sample_rate: u32,
    #[serde(default = "default_peak_headroom")]
    pub peak_headroom: f32,
    #[serde(default = "default_target_rms")]
    pub target_rms: f32,
    #[serde(default = "default_compressor_threshold")]
    pub compressor_threshold: f32,
    #[serde(default = "default_compressor_ratio")]
    pub compressor_ratio: f32,
    #[serde(default = "default_noise_reduction")]
    pub noise_reduction: f32,
    #[serde(default = "default_hp_cutoff")]
    pub hp_cutoff: f64,
    #[serde(default = "default_presence_low")]
    pub presence_low: f64,
    #[serde(default = "default_presence_high")]
    pub presence_high: f64,
    #[serde(default = "default_presence_gain")]
    pub presence_gain: f32,
    #[serde(default = "default_lp_cutoff")]
    pub lp_cutoff: f64,
    #[serde(default = "default_trim_threshold_db")]
    pub trim_threshold_db: f32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: default_dir() }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: default_target_rate(),
            peak_headroom: default_peak_headroom(),
            target_rms: default_target_rms(),
            compressor_threshold: default_compressor_threshold(),
            compressor_ratio: default_compressor_ratio(),
            noise_reduction: default_noise_reduction(),
            hp_cutoff: default_hp_cutoff(),
            presence_low: default_presence_low(),
            presence_high: default_presence_high(),
            presence_gain: default_presence_gain(),
            lp_cutoff: default_lp_cutoff(),
            trim_threshold_db: default_trim_threshold_db(),
        }
    }
}

impl PipelineConfig {
    pub fn to_settings(&self) -> PipelineSettings {
        PipelineSettings {
            target_sample_rate: self.target_sample_rate,
            peak_headroom: self.peak_headroom,
            target_rms: self.target_rms,
            compressor_threshold: self.compressor_threshold,
            compressor_ratio: self.compressor_ratio,
            noise_reduction: self.noise_reduction,
            eq: EqSettings {
                hp_cutoff: self.hp_cutoff,
                presence_low: self.presence_low,
                presence_high: self.presence_high,
                presence_gain: self.presence_gain,
                lp_cutoff: self.lp_cutoff,
            },
            trim_threshold_db: self.trim_threshold_db,
        }
    }
}

fn default_dir() -> PathBuf { PathBuf::from("processed") }
fn default_target_rate() -> u32 { 22050 }
fn default_peak_headroom() -> f32 { 0.95 }
fn default_target_rms() -> f32 { 0.2 }
fn default_compressor_threshold() -> f32 { 0.5 }
fn default_compressor_ratio() -> f32 { 4.0 }
fn default_noise_reduction() -> f32 { 0.8 }
fn default_hp_cutoff() -> f64 { 80.0 }
fn default_presence_low() -> f64 { 2000.0 }
fn default_presence_high() -> f64 { 3000.0 }
fn default_presence_gain() -> f32 { 0.3 }
fn default_lp_cutoff() -> f64 { 8000.0 }
fn default_trim_threshold_db() -> f32 { -40.0 }

pub fn load_config(path: &PathBuf) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_settings() {
        let settings = PipelineConfig::default().to_settings();
        let reference = PipelineSettings::default();
        assert_eq!(settings.target_sample_rate, reference.target_sample_rate);
        assert_eq!(settings.peak_headroom, reference.peak_headroom);
        assert_eq!(settings.target_rms, reference.target_rms);
        assert_eq!(settings.compressor_threshold, reference.compressor_threshold);
        assert_eq!(settings.trim_threshold_db, reference.trim_threshold_db);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [pipeline]
            target_sample_rate = 16000
            noise_reduction = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.target_sample_rate, 16000);
        assert_eq!(config.pipeline.noise_reduction, 0.5);
        assert_eq!(config.pipeline.peak_headroom, 0.95);
        assert_eq!(config.output.dir, PathBuf::from("processed"));
    }
}
