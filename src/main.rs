//! hidled CLI
//!
//! Lights every keyboard LED when run without arguments and clears them when
//! run with any. The exit status is always success; failures are logged.

use anyhow::Result;
use clap::error::ErrorKind;
use tracing::{debug, error};

use hidled::Driver;
use hidled_host::BoxedHost;

mod cli;
use cli::{Backend, Cli, ReportFormat};

fn main() -> Result<()> {
    let (cli, parse_error) = Cli::parse_or_count(std::env::args_os());

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Some(e) = parse_error {
        match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                if let Err(io) = e.print() {
                    error!("Failed to print usage: {io}");
                }
            }
            _ => error!("Ignoring options: {}", e.to_string().trim_end()),
        }
    }

    let pattern = cli.pattern();
    debug!("Using {:?} backend, pattern {:#04x}", cli.backend, pattern);

    let host = match open_backend(cli.backend) {
        Ok(host) => host,
        Err(e) => {
            error!("{e:#}");
            return Ok(());
        }
    };

    match Driver::new(&host, pattern).run() {
        Ok(report) => match cli.report {
            ReportFormat::None => {}
            ReportFormat::Text => println!("{report}"),
            ReportFormat::Json => match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(e) => error!("Failed to serialize report: {e}"),
            },
        },
        Err(e) => error!("{e}"),
    }

    Ok(())
}

fn open_backend(backend: Backend) -> Result<BoxedHost> {
    match backend {
        #[cfg(all(feature = "evdev", target_os = "linux"))]
        Backend::Evdev => Ok(Box::new(hidled_host::EvdevHost::new())),
        #[cfg(not(all(feature = "evdev", target_os = "linux")))]
        Backend::Evdev => anyhow::bail!("evdev backend not available in this build"),

        #[cfg(feature = "hidraw")]
        Backend::Hidraw => Ok(Box::new(hidled_host::HidrawHost::new())),
        #[cfg(not(feature = "hidraw"))]
        Backend::Hidraw => anyhow::bail!("hidraw backend not available in this build"),
    }
}
