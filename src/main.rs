mod analysis;
mod audio;
mod cli;
mod config;
mod enhance;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use cli::{Cli, Command};
use config::Config;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect voxprep.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("voxprep.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("voxprep").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("voxprep").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });

    let config = match config_path {
        Some(ref path) => match config::load_config(path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };

    match cli.command {
        Command::Analyze { input, json } => run_analyze(&input, json.as_deref()),
        Command::Enhance {
            input,
            output_dir,
            target_rate,
            noise_reduction,
        } => {
            let mut settings = config.pipeline.to_settings();
            if let Some(rate) = target_rate {
                settings.target_sample_rate = rate;
            }
            if let Some(strength) = noise_reduction {
                settings.noise_reduction = strength;
            }
            let dir = output_dir.unwrap_or_else(|| config.output.dir.clone());
            run_enhance(&input, &dir, &settings)
        }
        Command::Trim {
            input,
            output_dir,
            threshold_db,
        } => {
            let threshold = threshold_db.unwrap_or(config.pipeline.trim_threshold_db);
            let dir = output_dir.unwrap_or_else(|| config.output.dir.clone());
            run_trim(&input, &dir, threshold)
        }
        Command::Info { input } => run_info(&input),
        Command::Convert { input, output_dir } => {
            let dir = output_dir.unwrap_or_else(|| config.output.dir.clone());
            run_convert(&input, &dir)
        }
    }
}

/// Quality inspection never blocks a workflow: a decode failure becomes an
/// error-tagged metrics record instead of a process error.
fn run_analyze(input: &Path, json_out: Option<&Path>) -> Result<()> {
    let metrics = match audio::decode::decode_audio(input) {
        Ok(data) => {
            let mut metrics = analysis::analyze(&data.samples, data.sample_rate);
            metrics.channels = data.source_channels;
            metrics
        }
        Err(err) => {
            log::warn!("Analysis failed: {:#}", err);
            analysis::QualityMetrics::failed(format!("{:#}", err))
        }
    };

    let rendered = serde_json::to_string_pretty(&metrics)?;
    println!("{}", rendered);

    if let Some(path) = json_out {
        std::fs::write(path, &rendered)
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
        log::info!("Metrics written to {}", path.display());
    }

    Ok(())
}

fn run_enhance(input: &Path, output_dir: &Path, settings: &enhance::PipelineSettings) -> Result<()> {
    let data = audio::decode::decode_audio(input)?;

    // A failed enhancement degrades quality silently: the original audio
    // is still a usable reference, so never block on a stage error.
    let (samples, rate) = match enhance::enhance(&data.samples, data.sample_rate, settings) {
        Ok(enhanced) => enhanced,
        Err(err) => {
            log::warn!("{}; writing original audio unenhanced", err);
            (data.samples, data.sample_rate)
        }
    };

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
    let path = audio::encode::unique_output_path(output_dir, "enhanced");
    audio::encode::write_wav(&path, &samples, rate)?;

    println!("{}", path.display());
    Ok(())
}

fn run_trim(input: &Path, output_dir: &Path, threshold_db: f32) -> Result<()> {
    let data = audio::decode::decode_audio(input)?;

    let trimmed = enhance::trim::trim_silence(&data.samples, threshold_db);
    if trimmed.is_empty() {
        log::warn!("Input is entirely below {} dBFS; writing empty file", threshold_db);
    }

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
    let path = audio::encode::unique_output_path(output_dir, "trimmed");
    audio::encode::write_wav(&path, &trimmed, data.sample_rate)?;

    println!("{}", path.display());
    Ok(())
}

fn run_info(input: &Path) -> Result<()> {
    let data = audio::decode::decode_audio(input)?;

    let mut info = analysis::info::audio_info(&data.samples, data.sample_rate);
    info.channels = data.source_channels;
    info.file_size = std::fs::metadata(input).map(|m| m.len()).ok();

    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn run_convert(input: &Path, output_dir: &Path) -> Result<()> {
    let data = audio::decode::decode_audio(input)?;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
    let path = audio::encode::unique_output_path(output_dir, "converted");
    audio::encode::write_wav(&path, &data.samples, data.sample_rate)?;

    println!("{}", path.display());
    Ok(())
}
