//! loststone CLI: program settings, profiles and sensor firmware into a loststone.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use loststone_core::config::{DeviceIds, LoststoneConfig};
use loststone_core::error::Error;
use loststone_core::firmware::FirmwareImage;
use loststone_core::safety::BRICKING_DISCLAIMER;
use loststone_core::transport::HidTransport;
use loststone_core::{Programmer, TransferOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;

/// hidapi read buffer: one input report, no report ID.
const READ_BUF_LEN: usize = 64;

struct CliHidTransport {
    device: hidapi::HidDevice,
}

impl CliHidTransport {
    fn open(ids: DeviceIds) -> Result<Self> {
        let api = hidapi::HidApi::new().map_err(|e| anyhow::anyhow!("hidapi init: {e}"))?;
        let device = api.open(ids.vid, ids.pid).map_err(|e| {
            anyhow::anyhow!(
                "open HID device (VID=0x{:04X} PID=0x{:04X}): {e}",
                ids.vid,
                ids.pid
            )
        })?;
        device
            .set_blocking_mode(true)
            .map_err(|e| anyhow::anyhow!("set blocking mode: {e}"))?;

        println!("Attached");
        println!(
            "Manufacturer: {}",
            device.get_manufacturer_string().ok().flatten().unwrap_or_default()
        );
        println!(
            "Product:      {}",
            device.get_product_string().ok().flatten().unwrap_or_default()
        );
        println!(
            "Serial No:    {}",
            device.get_serial_number_string().ok().flatten().unwrap_or_default()
        );

        Ok(Self { device })
    }
}

impl HidTransport for CliHidTransport {
    fn write_report(&self, data: &[u8]) -> loststone_core::Result<()> {
        self.device
            .write(data)
            .map_err(|e| Error::Hid(format!("write: {e}")))?;
        Ok(())
    }

    fn read_report(&self, timeout: Duration) -> loststone_core::Result<Vec<u8>> {
        let mut response = [0u8; READ_BUF_LEN];
        let ms = timeout.as_millis().min(i32::MAX as u128) as i32;
        let n = self
            .device
            .read_timeout(&mut response, ms)
            .map_err(|e| Error::Hid(format!("read_timeout: {e}")))?;

        if n == 0 {
            return Err(Error::Timeout(format!("hid_read timed out after {ms}ms")));
        }

        Ok(response[..n].to_vec())
    }
}

fn parse_u16(s: &str) -> std::result::Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid 16-bit id {s:?}: {e}"))
}

#[derive(Parser)]
#[command(
    name = "loststone",
    version,
    about = "Configure a loststone trackball over USB HID"
)]
struct Cli {
    /// File containing all settings.
    #[arg(long, global = true, default_value = "loststone.cfg")]
    config_file: PathBuf,

    /// More logging (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct DeviceArgs {
    /// USB vendor ID (defaults to [config] VID).
    #[arg(long, value_parser = parse_u16)]
    vid: Option<u16>,
    /// USB product ID (defaults to [config] PID).
    #[arg(long, value_parser = parse_u16)]
    pid: Option<u16>,
}

impl DeviceArgs {
    fn resolve(&self, from_config: DeviceIds) -> DeviceIds {
        DeviceIds {
            vid: self.vid.unwrap_or(from_config.vid),
            pid: self.pid.unwrap_or(from_config.pid),
            ..from_config
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and print the resolved settings and profiles.
    Show {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Write settings, profiles and ADNS firmware to the device.
    Program {
        /// Clear ALL device memory first.
        #[arg(long)]
        init: bool,
        /// Skip the ADNS firmware upload.
        #[arg(long)]
        no_firmware: bool,
        /// ADNS firmware listing, one hex byte per line.
        #[arg(long, default_value = "adns9500_srom_91.txt")]
        adns_firmware_file: PathBuf,
        #[command(flatten)]
        device: DeviceArgs,
    },
    /// Clear ALL device memory. Firmware must be reloaded afterwards.
    Init {
        #[command(flatten)]
        device: DeviceArgs,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(path: &Path) -> std::result::Result<LoststoneConfig, ExitCode> {
    match LoststoneConfig::load(path) {
        Ok(cfg) => Ok(cfg),
        Err(Error::ConfigInvalid(problems)) => {
            for p in &problems {
                eprintln!("{p}");
            }
            eprintln!("Exiting, nothing has been programmed.");
            Err(ExitCode::from(2))
        }
        Err(Error::Io(e)) => {
            eprintln!("Unable to load settings file {}: {e}", path.display());
            Err(ExitCode::from(2))
        }
        Err(e) => {
            eprintln!("{e}");
            Err(ExitCode::from(2))
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(3)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let cfg = match load_config(&cli.config_file) {
        Ok(cfg) => cfg,
        Err(code) => return Ok(code),
    };

    match cli.command {
        Commands::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else {
                println!(
                    "Device: VID 0x{:04X} PID 0x{:04X}",
                    cfg.device.vid, cfg.device.pid
                );
                println!("Settings:");
                for (id, v) in cfg.model.settings().iter() {
                    println!("  {:<16} {v:>6} (0x{v:04X})", id.name());
                }
                for profile in cfg.model.profiles() {
                    println!("Profile {}:", profile.label());
                    for (id, v) in profile.iter() {
                        println!("  {:<16} {v:>6} (0x{v:04X})", id.name());
                    }
                }
            }
        }
        Commands::Program {
            init,
            no_firmware,
            adns_firmware_file,
            device,
        } => {
            let firmware = if no_firmware {
                None
            } else {
                Some(FirmwareImage::load(&adns_firmware_file).with_context(|| {
                    format!("load ADNS firmware {}", adns_firmware_file.display())
                })?)
            };

            eprintln!("{BRICKING_DISCLAIMER}");
            let transport = CliHidTransport::open(device.resolve(cfg.device))?;
            let options = TransferOptions {
                init,
                ..TransferOptions::default()
            };
            let report = Programmer::new(&transport, options).run(&cfg.model, firmware.as_ref())?;

            for m in &report.mismatches {
                eprintln!("ERROR: {m}");
            }
            info!(
                reports = report.reports_sent,
                firmware_bytes = report.firmware_bytes,
                "Programming finished"
            );
            if let Err(e) = report.into_result() {
                eprintln!("{e}");
                return Ok(ExitCode::from(1));
            }
            println!("Programming complete.");
        }
        Commands::Init { device } => {
            println!("Clearing *ALL* loststone configurations.");
            println!("The ADNS firmware MUST be reloaded before the loststone will work.");
            let transport = CliHidTransport::open(device.resolve(cfg.device))?;
            Programmer::new(&transport, TransferOptions::default()).init()?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
