//! Plugin list validator CLI entrypoint.
//!
//! This binary validates a plugin list release for one target architecture
//! and exits nonzero when any problem was reported.

use clap::Parser;
use plugin_list_validator::cli::Cli;
use plugin_list_validator::config::{Layout, RunConfiguration};
use plugin_list_validator::error::Result;
use plugin_list_validator::output::{summary_message, write_stderr_line};
use plugin_list_validator::pipeline::{PipelineContext, RunSummary, run_validation};
use plugin_list_validator::report::{BuildApiReporter, ErrorLog, Reporter, StreamReporter};
use std::io::Write;

/// Exit status when the run completed but recorded validation errors.
const VALIDATION_FAILED: i32 = -2;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Install `env_logger`; `RUST_LOG` overrides the level chosen by `-v`/`-q`.
fn init_logging(cli: &Cli) {
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<RunSummary> {
    let config = resolve_configuration(cli)?;
    log::debug!("resolved configuration: {config:?}");

    let mut reporter = reporter_for(&config);
    let context = PipelineContext {
        config: &config,
        quiet: cli.quiet,
    };
    let summary = {
        let mut log = ErrorLog::new(reporter.as_mut());
        run_validation(&context, &mut log, stderr)?
    };

    if !cli.quiet {
        write_stderr_line(stderr, "");
        write_stderr_line(
            stderr,
            summary_message(summary.processed, summary.passed, summary.errors),
        );
    }
    Ok(summary)
}

/// Load the layout file when given and apply the command-line overrides.
fn resolve_configuration(cli: &Cli) -> Result<RunConfiguration> {
    let layout = match &cli.config {
        Some(path) => Layout::load(path)?,
        None => Layout::default(),
    };
    Ok(RunConfiguration::resolve(
        cli.bitness,
        &layout,
        cli.overrides(),
    ))
}

/// Post to the build server when one is configured, otherwise print locally.
fn reporter_for(config: &RunConfiguration) -> Box<dyn Reporter> {
    let local = StreamReporter::new(std::io::stderr());
    match &config.api_url {
        Some(api_url) => {
            let reporter = BuildApiReporter::new(api_url, config.request_timeout, local);
            log::info!("reporting errors to {}", reporter.endpoint());
            Box::new(reporter)
        }
        None => Box::new(local),
    }
}

fn exit_code_for_run_result(result: Result<RunSummary>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(summary) if summary.is_clean() => 0,
        Ok(_) => VALIDATION_FAILED,
        Err(err) => {
            write_stderr_line(stderr, err);
            1
        }
    }
}
