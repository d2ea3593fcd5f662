//! PMS Sim - simulated sensor byte stream generator

use anyhow::{Context, Result};
use clap::Parser;
use pms_frame::simulate::{SimulatedStream, StreamProfile};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Stream generator configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "pms-sim")]
#[command(about = "Write a simulated PMS sensor byte stream")]
pub struct SimConfig {
    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of frames to write
    #[arg(short = 'n', long, default_value = "10")]
    pub frames: u64,

    /// Up to this many junk bytes before each frame
    #[arg(long, default_value = "0")]
    pub max_garbage: usize,

    /// Probability (0.0 to 1.0) that a frame is corrupted
    #[arg(long, default_value = "0.0")]
    pub corruption_rate: f64,

    /// Seed for a reproducible stream
    #[arg(long)]
    pub seed: Option<u64>,

    /// Pause between frames in milliseconds, like a streaming sensor
    #[arg(long, default_value = "0")]
    pub interval_ms: u64,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

fn main() -> Result<()> {
    let config = SimConfig::parse();

    tracing_subscriber::fmt()
        .with_max_level(if config.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        })
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if !(0.0..=1.0).contains(&config.corruption_rate) {
        anyhow::bail!(
            "Corruption rate must be between 0.0 and 1.0, got {}",
            config.corruption_rate
        );
    }

    let profile = StreamProfile {
        max_garbage: config.max_garbage,
        corruption_rate: config.corruption_rate,
    };
    let mut stream = match config.seed {
        Some(seed) => SimulatedStream::with_seed(seed, profile),
        None => SimulatedStream::new(profile),
    };

    let mut out: Box<dyn Write> = match &config.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {:?}", path))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    };

    let mut written = 0usize;
    for frame in 0..config.frames {
        let chunk = stream.next_chunk();
        out.write_all(&chunk).context("Failed to write frame")?;
        written += chunk.len();

        if config.interval_ms > 0 && frame + 1 < config.frames {
            out.flush()?;
            std::thread::sleep(Duration::from_millis(config.interval_ms));
        }
    }
    out.flush()?;

    info!("Wrote {} frames ({} bytes)", stream.frames(), written);
    Ok(())
}
