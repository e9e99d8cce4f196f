//! Progress and summary output for the validator CLI.

use std::io::Write;

/// Write a line to the progress stream, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Format the closing summary for a run.
///
/// # Examples
///
/// ```
/// use plugin_list_validator::output::summary_message;
///
/// assert_eq!(
///     summary_message(3, 2, 1),
///     "Checked 3 plugins: 2 passed, 1 error recorded"
/// );
/// ```
#[must_use]
pub fn summary_message(processed: usize, passed: usize, errors: usize) -> String {
    let plugins = if processed == 1 { "plugin" } else { "plugins" };
    let recorded = if errors == 1 { "error" } else { "errors" };
    format!("Checked {processed} {plugins}: {passed} passed, {errors} {recorded} recorded")
}
