// CLI definitions using clap

use std::ffi::OsString;

use clap::{Parser, ValueEnum};

use hidled::pattern_for_args;

#[derive(Parser, Debug)]
#[command(name = "hidled")]
#[command(author, version, about = "Set keyboard indicator LEDs")]
#[command(
    long_about = "Set keyboard indicator LEDs.\n\n\
    Run with no arguments to light every LED on every keyboard; pass any \
    argument to turn them off. Only the number of arguments matters."
)]
pub struct Cli {
    /// Explicit LED pattern (decimal or 0x-prefixed hex), overriding the argument rule
    #[arg(long, value_parser = parse_pattern)]
    pub pattern: Option<u64>,

    /// HID host backend
    #[arg(long, value_enum, default_value_t = Backend::Evdev)]
    pub backend: Backend,

    /// Print a report of the pass to stdout
    #[arg(long, value_enum, default_value_t = ReportFormat::None)]
    pub report: ReportFormat,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Any arguments turn the LEDs off; their content is ignored
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    pub args: Vec<String>,
}

impl Cli {
    /// Parse `args`, falling back to plain argument counting
    ///
    /// A command line that does not parse as options still selects a pattern
    /// by its argument count, with every option at its default. The clap
    /// error is handed back for the caller to report.
    pub fn parse_or_count<I, T>(args: I) -> (Self, Option<clap::Error>)
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        match Self::try_parse_from(args.iter().cloned()) {
            Ok(cli) => (cli, None),
            Err(e) => {
                let positional = args
                    .iter()
                    .skip(1)
                    .map(|arg| arg.to_string_lossy().into_owned())
                    .collect();
                (Self::counting(positional), Some(e))
            }
        }
    }

    /// Defaults for every option, with `args` as the positional arguments
    fn counting(args: Vec<String>) -> Self {
        Self {
            pattern: None,
            backend: Backend::Evdev,
            report: ReportFormat::None,
            log_level: "warn".to_string(),
            args,
        }
    }

    /// Pattern for this invocation
    pub fn pattern(&self) -> u64 {
        self.pattern.unwrap_or_else(|| pattern_for_args(self.args.len()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Linux input event nodes (EV_LED)
    Evdev,
    /// hidraw via hidapi (boot keyboard output report)
    Hidraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    None,
    Text,
    Json,
}

/// Parse a pattern as decimal or 0x-prefixed hex
fn parse_pattern(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid pattern '{s}': {e}"))
}
