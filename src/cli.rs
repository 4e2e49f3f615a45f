use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "voxprep", about = "Analyze and enhance speech recordings for voice-cloning reference audio")]
pub struct Cli {
    /// Config file (default: ./voxprep.toml or ~/.config/voxprep/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute quality metrics (noise level, signal quality, spectral
    /// shape) and print them as JSON
    Analyze {
        /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
        input: PathBuf,

        /// Also write the metrics to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Run the enhancement chain and write the result as WAV
    Enhance {
        /// Input audio file
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Target sample rate in Hz
        #[arg(long)]
        target_rate: Option<u32>,

        /// Noise suppression strength (0.0-1.0)
        #[arg(long)]
        noise_reduction: Option<f32>,
    },

    /// Remove leading and trailing silence and write the result as WAV
    Trim {
        /// Input audio file
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Silence threshold in dBFS
        #[arg(long, allow_hyphen_values = true)]
        threshold_db: Option<f32>,
    },

    /// Print descriptive info (peak, RMS, dominant frequency, tempo)
    Info {
        /// Input audio file
        input: PathBuf,
    },

    /// Decode any supported container and write uncompressed WAV
    Convert {
        /// Input audio file
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}
