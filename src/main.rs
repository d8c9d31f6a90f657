// src/main.rs
//! badger-gps - draw the current GPS fix on an e-ink badge

use anyhow::Context;
use badger_gps::{
    config::{GpsConfig, OutputKind},
    display,
    gps::reader::{list_serial_ports, open_serial},
    monitor::{GpsMonitor, MonitorOptions},
};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "badger-gps", version, about = "Show the current GPS fix on an e-ink badge")]
struct Cli {
    /// Serial port of the GPS module
    #[arg(short, long)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Seconds between fixes requested from the module (1-10)
    #[arg(short, long)]
    rate: Option<u64>,

    /// Seconds between redraws once a fix is held
    #[arg(short, long)]
    interval: Option<u32>,

    /// Raw 88x108 1bpp bitmap shown beside the fix
    #[arg(long)]
    image: Option<PathBuf>,

    /// Where to draw
    #[arg(short, long, value_enum)]
    output: Option<OutputKind>,

    /// PBM file written by the e-ink output
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Enable the pulse-per-second LED
    #[arg(long)]
    pps: bool,

    /// Let the module sleep between fixes (15-300 seconds)
    #[arg(long, value_name = "SECS")]
    periodic: Option<u64>,

    /// Cold boot the module before starting
    #[arg(long)]
    cold_boot: bool,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Store the resulting settings as the new defaults
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    /// Command line flags win over the stored configuration
    fn apply(&self, config: &mut GpsConfig) {
        if let Some(port) = &self.port {
            config.update_serial(port.clone(), self.baud.unwrap_or(config.serial_baudrate));
        } else if let Some(baud) = self.baud {
            config.serial_baudrate = baud;
        }
        if let Some(rate) = self.rate {
            config.update_rate_secs = rate;
        }
        if let Some(interval) = self.interval {
            config.refresh_interval_secs = interval;
        }
        if let Some(image) = &self.image {
            config.image_path = Some(image.clone());
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(snapshot) = &self.snapshot {
            config.snapshot_path = snapshot.clone();
        }
        if self.pps {
            config.pps = true;
        }
        if self.periodic.is_some() {
            config.periodic_secs = self.periodic;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if cli.list_ports {
        list_serial_ports()?;
        return Ok(());
    }

    let mut config = GpsConfig::load().unwrap_or_else(|e| {
        log::warn!("Using default configuration: {}", e);
        GpsConfig::default()
    });
    cli.apply(&mut config);

    if cli.save_config {
        config.save().context("saving configuration")?;
        log::info!("Configuration saved to {}", GpsConfig::get_config_path()?.display());
    }

    let port = config
        .serial_port
        .clone()
        .context("no serial port configured, pass --port (see --list-ports)")?;

    let mut display = display::from_config(&config).context("setting up display")?;

    let serial = open_serial(&port, config.serial_baudrate)?;
    let (reader, writer) = tokio::io::split(serial);

    let mut options = MonitorOptions::from(&config);
    options.cold_boot = cli.cold_boot;
    let mut monitor = GpsMonitor::new(reader, writer, options);

    monitor.configure().await.context("configuring GPS module")?;
    log::info!("Waiting for a fix...");

    tokio::select! {
        result = monitor.run(display.as_mut()) => result?,
        _ = tokio::signal::ctrl_c() => log::info!("Shutting down..."),
    }

    Ok(())
}
