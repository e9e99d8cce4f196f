//! Validation error records, reporting sinks, and the run-wide error log.
//!
//! Every recoverable failure becomes one [`ValidationError`]. The pipeline
//! appends errors to an [`ErrorLog`], which forwards each one to a
//! [`Reporter`] as soon as it is recorded. Two reporters are provided: one
//! that prints to a local stream and one that posts to a build server's
//! message API.

use serde::Serialize;
use std::io::Write;
use std::time::Duration;

/// Path appended to the build server URL when posting messages.
const MESSAGES_ENDPOINT: &str = "api/build/messages";

/// Severity attached to a reported message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// A failure that makes the run fail.
    #[default]
    Error,
}

/// A single accumulated validation failure.
///
/// Serialises to the build-message wire shape
/// `{"message": "...", "category": "error", "details": ""}`.
///
/// # Examples
///
/// ```
/// use plugin_list_validator::report::ValidationError;
///
/// let err = ValidationError::new("Foo: Invalid zip file");
/// let json = serde_json::to_string(&err).expect("serialise");
/// assert_eq!(json, r#"{"message":"Foo: Invalid zip file","category":"error","details":""}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    message: String,
    category: Category,
    details: String,
}

impl ValidationError {
    /// Create an error-category record with empty details.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: Category::Error,
            details: String::new(),
        }
    }

    /// The human-readable failure description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The message category.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    /// Additional details; always empty for errors raised by the validator.
    #[must_use]
    pub fn details(&self) -> &str {
        &self.details
    }
}

/// Sink receiving each validation error as it is recorded.
pub trait Reporter {
    /// Publish one error.
    fn report(&mut self, error: &ValidationError);
}

/// Reporter that pretty-prints each error as JSON to a stream.
pub struct StreamReporter<W> {
    out: W,
}

impl<W: Write> StreamReporter<W> {
    /// Wrap the given writer.
    #[must_use]
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Consume the reporter and return the writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for StreamReporter<W> {
    fn report(&mut self, error: &ValidationError) {
        let rendered = serde_json::to_string_pretty(error)
            .unwrap_or_else(|_| error.message().to_owned());
        if writeln!(self.out, "{rendered}").is_err() {
            // Best-effort output; the error is still counted by the log.
        }
    }
}

/// Reporter that posts each error to a build server message API.
///
/// Posting is best effort. A failed request is logged and the error is
/// echoed to the fallback reporter so it is never lost.
pub struct BuildApiReporter<F> {
    endpoint: String,
    agent: ureq::Agent,
    fallback: F,
}

impl<F: Reporter> BuildApiReporter<F> {
    /// Create a reporter posting to `<api_url>/api/build/messages`.
    #[must_use]
    pub fn new(api_url: &str, timeout: Duration, fallback: F) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            endpoint: messages_url(api_url),
            agent: ureq::Agent::new_with_config(config),
            fallback,
        }
    }

    /// The full URL errors are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl<F: Reporter> Reporter for BuildApiReporter<F> {
    fn report(&mut self, error: &ValidationError) {
        if let Err(e) = self.agent.post(&self.endpoint).send_json(error) {
            log::warn!("failed to post build message to {}: {e}", self.endpoint);
            self.fallback.report(error);
        }
    }
}

/// Join a build server base URL and the messages endpoint with one slash.
#[must_use]
pub fn messages_url(api_url: &str) -> String {
    format!("{}/{MESSAGES_ENDPOINT}", api_url.trim_end_matches('/'))
}

/// Append-only collection of validation errors for one run.
///
/// The log never clears; [`ErrorLog::is_clean`] at the end of the run is the
/// pass/fail decision.
pub struct ErrorLog<'r> {
    errors: Vec<ValidationError>,
    reporter: &'r mut dyn Reporter,
}

impl<'r> ErrorLog<'r> {
    /// Create an empty log forwarding to `reporter`.
    #[must_use]
    pub fn new(reporter: &'r mut dyn Reporter) -> Self {
        Self {
            errors: Vec::new(),
            reporter,
        }
    }

    /// Record and report an error built from `message`.
    pub fn record(&mut self, message: impl Into<String>) {
        self.push(ValidationError::new(message));
    }

    /// Record and report an existing error value.
    pub fn push(&mut self, error: ValidationError) {
        log::debug!("recorded validation error: {}", error.message());
        self.reporter.report(&error);
        self.errors.push(error);
    }

    /// Record every error in `errors`, in order.
    pub fn extend(&mut self, errors: impl IntoIterator<Item = ValidationError>) {
        for error in errors {
            self.push(error);
        }
    }

    /// The errors recorded so far.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Number of errors recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// True when the run has not failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.is_empty()
    }
}
