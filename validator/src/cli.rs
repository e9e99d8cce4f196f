//! CLI argument definitions for the plugin list validator.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::config::{Bitness, Overrides};
use camino::Utf8PathBuf;
use clap::Parser;
use std::time::Duration;

/// Environment variable naming the build server API used for reporting.
pub const API_URL_ENV: &str = "APPVEYOR_API_URL";

/// Validate a plugin list release before publication.
#[derive(Parser, Debug, Clone)]
#[command(name = "plugin-list-validator")]
#[command(version, about)]
#[command(long_about = concat!(
    "Validate a plugin list release before publication.\n\n",
    "The plugin descriptor is checked against its JSON schema and the manifest ",
    "against its XML schema. Every listed plugin archive is then downloaded, the ",
    "plugin binary extracted, and its embedded file version compared with the ",
    "version the list declares.\n\n",
    "Every failure is reported and the run carries on, so one pass surfaces all ",
    "problems. The exit status is nonzero when anything was reported.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Validate the 64-bit list:\n",
    "    $ plugin-list-validator x64\n\n",
    "  Validate the 32-bit list, writing binaries under build/:\n",
    "    $ plugin-list-validator x86 --output-root build\n\n",
    "  Stop before downloading when a schema check fails:\n",
    "    $ plugin-list-validator x64 --strict\n",
))]
pub struct Cli {
    /// Target architecture: x64 or x86 (x32 is accepted as an alias).
    #[arg(value_name = "BITNESS")]
    pub bitness: Bitness,

    /// TOML file relocating the input files and output root.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Directory under which `<bitness>/` receives extracted binaries.
    #[arg(long, value_name = "DIR")]
    pub output_root: Option<Utf8PathBuf>,

    /// Skip XML schema validation of the manifest.
    #[arg(long)]
    pub skip_xsd: bool,

    /// Stop before checking plugins when a schema check fails.
    #[arg(long)]
    pub strict: bool,

    /// Per-request HTTP timeout in seconds [default: 60].
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Build server API base URL; errors are also posted there.
    #[arg(long, value_name = "URL", env = API_URL_ENV)]
    pub api_url: Option<String>,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        alias = "verbosity",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Settings from the command line that take precedence over the layout.
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::Parser;
    /// use plugin_list_validator::cli::Cli;
    ///
    /// let cli = Cli::parse_from(["plugin-list-validator", "x64", "--strict", "--timeout", "5"]);
    /// let overrides = cli.overrides();
    /// assert!(overrides.strict);
    /// assert_eq!(overrides.timeout, Some(std::time::Duration::from_secs(5)));
    /// ```
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            output_root: self.output_root.clone(),
            skip_xsd: self.skip_xsd,
            strict: self.strict,
            timeout: self.timeout.map(Duration::from_secs),
            api_url: self.api_url.clone(),
        }
    }

    /// Log level implied by `-v` repetitions; `quiet` keeps only errors.
    #[must_use]
    pub const fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
