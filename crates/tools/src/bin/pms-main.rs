//! PMS - read and control particulate-matter sensors
//!
//! This is the main entry point for reading, watching and commanding a sensor

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use tracing::info;

use pms_frame::command::{ReportingMode, SensorCommand};
use pms_frame::frame::{FRAME_LENGTH, FRAME_SIZE};
use pms_tools::{
    init_logging, GlobalConfig, HardwareSensor, Monitor, MonitorConfig, OutputFormat,
    SensorHandle, SourceArgs,
};

/// PMS particulate-matter sensor tool
#[derive(Parser)]
#[command(name = "pms")]
#[command(about = "Read and control PMS particulate-matter sensors")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalConfig,

    #[command(flatten)]
    source: SourceArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a single reading
    Read {
        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Poll readings continuously
    Watch {
        /// Stop after this many readings
        #[arg(short = 'n', long)]
        count: Option<u64>,

        /// Pause between readings in milliseconds
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Send one command frame to the sensor
    Command {
        #[arg(value_enum)]
        action: CommandAction,
    },
    /// Show wire format and effective configuration
    Info,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CommandAction {
    Sleep,
    Wake,
    Active,
    Passive,
    Request,
}

impl From<CommandAction> for SensorCommand {
    fn from(action: CommandAction) -> Self {
        match action {
            CommandAction::Sleep => SensorCommand::Sleep,
            CommandAction::Wake => SensorCommand::Wake,
            CommandAction::Active => SensorCommand::SetMode(ReportingMode::Active),
            CommandAction::Passive => SensorCommand::SetMode(ReportingMode::Passive),
            CommandAction::Request => SensorCommand::RequestRead,
        }
    }
}

fn load_monitor_config(cli: &Cli) -> Result<MonitorConfig> {
    let mut config = match &cli.global.config {
        Some(path) => MonitorConfig::from_file(path)?,
        None => MonitorConfig::default(),
    };
    config.apply(&cli.source);
    config.validate()?;
    Ok(config)
}

fn watch(config: &MonitorConfig, count: Option<u64>, format: OutputFormat) -> Result<()> {
    let handle = SensorHandle::open(config)?;
    let mut monitor = Monitor::new(handle, config);
    let stdout = std::io::stdout();

    let outcome = monitor.run(count, config.interval(), |sample| {
        let mut out = stdout.lock();
        writeln!(out, "{}", sample.format(format)?)?;
        out.flush()?;
        Ok(())
    });

    info!("Discarded {} failed read(s)", monitor.discarded());
    let released = monitor.into_inner().release(config.sleep_on_exit);

    let taken = outcome?;
    released?;
    info!("Delivered {} reading(s)", taken);
    Ok(())
}

fn send_command(config: &MonitorConfig, action: CommandAction) -> Result<()> {
    if config.simulate {
        anyhow::bail!("Commands need a sensor port, not --simulate");
    }
    let port = config
        .port
        .as_deref()
        .context("No sensor port given (use --port)")?;

    let mut sensor = HardwareSensor::open(port, config.eof_policy())?;
    let command = SensorCommand::from(action);
    sensor.send(command)?;

    println!("✓ Sent {:?} to {:?}", command, port);
    Ok(())
}

fn show_info(config: &MonitorConfig) -> Result<()> {
    println!("PMS sensor tool");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));

    println!("\n=== Wire Format ===");
    println!("  • Start marker 0x42 0x4D");
    println!("  • Length field {} (big-endian)", FRAME_LENGTH);
    println!("  • 12 big-endian fields + reserved word + checksum");
    println!("  • {} bytes per frame", FRAME_SIZE);

    println!("\n=== Commands ===");
    for action in CommandAction::value_variants() {
        let bytes = SensorCommand::from(*action).to_bytes();
        let hex: Vec<String> = bytes.iter().map(|b| format!("{:02X}", b)).collect();
        println!("  • {:<8} {}", format!("{:?}", action).to_lowercase(), hex.join(" "));
    }

    println!("\n=== Effective Configuration ===");
    print!("{}", toml::to_string_pretty(config).context("Failed to render configuration")?);

    println!("\n=== Example Usage ===");
    println!("  Read:     pms --port /dev/serial0 --eof-as-timeout read");
    println!("  Watch:    pms --simulate watch -n 10 --format json");
    println!("  Command:  pms --port /dev/serial0 command sleep");
    println!("  Replay:   pms-sim -n 5 | pms --port - watch -n 5");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.global);
    info!("PMS sensor tool starting");

    let config = load_monitor_config(&cli)?;

    match cli.command {
        Commands::Read { format } => {
            watch(&config, Some(1), format.unwrap_or(config.format))?;
        }

        Commands::Watch {
            count,
            interval_ms,
            format,
        } => {
            let mut config = config;
            if let Some(interval_ms) = interval_ms {
                config.interval_ms = interval_ms;
            }
            watch(&config, count, format.unwrap_or(config.format))?;
        }

        Commands::Command { action } => {
            send_command(&config, action)?;
        }

        Commands::Info => {
            show_info(&config)?;
        }
    }

    Ok(())
}
