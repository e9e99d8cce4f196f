//! Validation pipeline orchestration.
//!
//! A run prepares the output directory, validates the descriptor and the
//! manifest against their schemas, reads the manifest, and then checks each
//! plugin in turn:
//!
//! fetch → open archive → find entry → extract and write → read version →
//! compare.
//!
//! Every failure after output directory preparation is recorded in the
//! [`ErrorLog`] and the run moves on; a broken plugin never stops the others
//! from being checked.

use crate::archive::{ArchiveError, PluginArchive};
use crate::config::{RunConfiguration, SchemaPolicy};
use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::fetch::{ArtifactFetcher, FetchError, HttpFetcher};
use crate::manifest::{PluginRecord, read_manifest};
use crate::output::write_stderr_line;
use crate::report::ErrorLog;
use crate::schema::{Document, validate_json, validate_xml};
use crate::stager::{StageError, Stager};
use crate::version::{PeVersionReader, VersionError, VersionReader, VersionString};
use camino::Utf8Path;
use std::io::Write;

/// Settings for one pipeline run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineContext<'a> {
    /// The resolved run configuration.
    pub config: &'a RunConfiguration,
    /// Suppress progress output.
    pub quiet: bool,
}

/// Counts describing a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Plugins that were checked.
    pub processed: usize,
    /// Plugins that passed every check.
    pub passed: usize,
    /// Validation errors recorded during the run, including schema errors.
    pub errors: usize,
    /// True when plugin checks were skipped after schema failures.
    pub halted: bool,
}

impl RunSummary {
    /// True when no validation error was recorded.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.errors == 0
    }
}

/// Why a single plugin failed; the message follows `<plugin>: `.
#[derive(Debug, thiserror::Error)]
enum PluginFailure {
    #[error("failed to download plugin. Returned code {code}")]
    BadStatus { code: u16 },

    #[error("{0}")]
    Unreachable(FetchError),

    #[error("Invalid zip file")]
    CorruptArchive,

    #[error("Zip file does not contain {expected}")]
    EntryMissing { expected: String },

    #[error("{0}")]
    Extract(#[from] ArchiveError),

    #[error("{0}")]
    Write(#[from] StageError),

    #[error("Does not contain any version information")]
    NoVersionInfo,

    #[error("failed to read extracted binary: {0}")]
    ReadBinary(std::io::Error),

    #[error("Unexpected DLL version. DLL is {found} but expected {expected}")]
    VersionMismatch {
        found: VersionString,
        expected: VersionString,
    },
}

impl From<FetchError> for PluginFailure {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Status { code, .. } => Self::BadStatus { code },
            transport @ FetchError::Transport { .. } => Self::Unreachable(transport),
        }
    }
}

impl From<VersionError> for PluginFailure {
    fn from(err: VersionError) -> Self {
        match err {
            VersionError::Io(e) => Self::ReadBinary(e),
            VersionError::NoVersionInfo | VersionError::NotPortableExecutable { .. } => {
                Self::NoVersionInfo
            }
        }
    }
}

/// Run a validation pass using HTTP downloads and PE version parsing.
///
/// # Errors
///
/// Returns an error only when the output directory cannot be prepared.
/// Validation failures are recorded in `log`.
pub fn run_validation(
    context: &PipelineContext<'_>,
    log: &mut ErrorLog<'_>,
    stderr: &mut dyn Write,
) -> Result<RunSummary> {
    let fetcher = HttpFetcher::new(context.config.request_timeout);
    run_validation_with(context, &fetcher, &PeVersionReader, log, stderr)
}

/// Testable inner function with injected fetch and version seams.
///
/// # Errors
///
/// Returns an error only when the output directory cannot be prepared.
pub fn run_validation_with(
    context: &PipelineContext<'_>,
    fetcher: &dyn ArtifactFetcher,
    reader: &dyn VersionReader,
    log: &mut ErrorLog<'_>,
    stderr: &mut dyn Write,
) -> Result<RunSummary> {
    let config = context.config;
    let stager = Stager::new(config.output_dir.clone());
    stager.prepare()?;
    progress(context, stderr, format!("input: {}", config.bitness));

    let descriptor = check_descriptor(context, log, stderr);
    let manifest_text = read_input(&config.manifest_path, log);
    if let Some(xsd_path) = &config.xsd_path {
        check_manifest_schema(context, xsd_path, manifest_text.as_deref(), log, stderr);
    }

    if config.schema_policy == SchemaPolicy::Halt && !log.is_clean() {
        progress(
            context,
            stderr,
            "Schema validation failed; skipping plugin checks.",
        );
        return Ok(RunSummary {
            errors: log.len(),
            halted: true,
            ..RunSummary::default()
        });
    }

    let entries = match manifest_text {
        Some(text) => {
            let document = Document::new(config.manifest_path.as_str(), &text);
            read_manifest(document, config.bitness, descriptor.as_ref()).unwrap_or_else(|e| {
                log.record(e.to_string());
                Vec::new()
            })
        }
        None => Vec::new(),
    };

    let mut summary = RunSummary::default();
    for entry in &entries {
        summary.processed += 1;
        let record = match entry {
            Ok(record) => record,
            Err(invalid) => {
                progress(context, stderr, format!("  FAILED: {invalid}"));
                log.record(invalid.to_string());
                continue;
            }
        };
        progress(context, stderr, &record.download_url);
        match check_plugin(record, fetcher, reader, &stager) {
            Ok(version) => {
                summary.passed += 1;
                log::debug!("{} verified at {version}", record.display_name);
            }
            Err(failure) => {
                progress(context, stderr, format!("  FAILED: {failure}"));
                log.record(format!("{}: {failure}", record.display_name));
            }
        }
    }
    summary.errors = log.len();
    Ok(summary)
}

/// Validate the descriptor and return its typed form when it parses.
fn check_descriptor(
    context: &PipelineContext<'_>,
    log: &mut ErrorLog<'_>,
    stderr: &mut dyn Write,
) -> Option<Descriptor> {
    let config = context.config;
    let schema_text = read_input(&config.schema_path, log);
    let descriptor_text = read_input(&config.descriptor_path, log)?;
    let descriptor_name = config.descriptor_path.as_str();

    let schema_checked = schema_text.is_some();
    if let Some(schema_text) = schema_text {
        progress(
            context,
            stderr,
            format!("JSON schema for plugin descriptor: {}", config.schema_path),
        );
        let errors = validate_json(
            Document::new(config.schema_path.as_str(), &schema_text),
            Document::new(descriptor_name, &descriptor_text),
        );
        progress(context, stderr, outcome_line("JSON schema", errors.len()));
        log.extend(errors);
    }

    match Descriptor::parse(descriptor_name, &descriptor_text) {
        Ok(descriptor) => Some(descriptor),
        // Without the schema step nothing else reports a malformed descriptor.
        Err(e) if !schema_checked => {
            log.record(e.to_string());
            None
        }
        Err(e) => {
            log::debug!("descriptor unavailable for manifest join: {e}");
            None
        }
    }
}

fn check_manifest_schema(
    context: &PipelineContext<'_>,
    xsd_path: &Utf8Path,
    manifest_text: Option<&str>,
    log: &mut ErrorLog<'_>,
    stderr: &mut dyn Write,
) {
    let Some(xsd_text) = read_input(xsd_path, log) else {
        return;
    };
    let Some(manifest_text) = manifest_text else {
        return;
    };
    progress(
        context,
        stderr,
        format!("XML schema for validation metadata: {xsd_path}"),
    );
    let errors = validate_xml(
        Document::new(xsd_path.as_str(), &xsd_text),
        Document::new(context.config.manifest_path.as_str(), manifest_text),
    );
    progress(context, stderr, outcome_line("XML schema", errors.len()));
    log.extend(errors);
}

/// Run the per-plugin checks, returning the verified version.
fn check_plugin(
    record: &PluginRecord,
    fetcher: &dyn ArtifactFetcher,
    reader: &dyn VersionReader,
    stager: &Stager,
) -> std::result::Result<VersionString, PluginFailure> {
    let body = fetcher.fetch(&record.download_url)?;
    let mut archive = PluginArchive::open(body).map_err(|_| PluginFailure::CorruptArchive)?;

    let expected_name = record.expected_entry_name();
    let entry_name = archive
        .find_entry(&expected_name)
        .ok_or(PluginFailure::EntryMissing {
            expected: expected_name,
        })?;
    let content = archive.extract(&entry_name)?;
    let path = stager.stage(&entry_name, &content)?;
    log::debug!("{} extracted to {path}", record.display_name);

    let found = reader.read_version(&path)?;
    let expected = record.declared_version.normalized();
    if !found.matches(&expected) {
        return Err(PluginFailure::VersionMismatch {
            found: found.normalized(),
            expected,
        });
    }
    Ok(found)
}

/// Read an input file, recording a failure against its path.
fn read_input(path: &Utf8Path, log: &mut ErrorLog<'_>) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) => {
            log.record(format!("{path} - {e}"));
            None
        }
    }
}

fn outcome_line(what: &str, errors: usize) -> String {
    if errors == 0 {
        format!("Validating metadata against {what}\tOK")
    } else {
        format!("Validating metadata against {what}\tERROR ({errors})")
    }
}

fn progress(context: &PipelineContext<'_>, stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if !context.quiet {
        write_stderr_line(stderr, message);
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
