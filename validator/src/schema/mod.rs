//! Structural validation of the plugin descriptor and manifest.
//!
//! - [`json`] validates the JSON descriptor against a Draft-4 JSON Schema,
//!   reporting every violation.
//! - [`xml`] validates the XML manifest against an XML Schema Definition
//!   with libxml2, folding its diagnostics into one error.
//!
//! Both return plain [`ValidationError`](crate::report::ValidationError)
//! values so the pipeline can accumulate them alongside per-plugin failures.

pub mod json;
pub mod xml;

pub use json::validate_json;
pub use xml::validate_xml;

/// A named input document.
///
/// The name is used to attribute parse failures to the file they came from.
#[derive(Debug, Clone, Copy)]
pub struct Document<'a> {
    /// Display name, usually the file path.
    pub name: &'a str,
    /// The document text.
    pub text: &'a str,
}

impl<'a> Document<'a> {
    /// Pair a display name with document text.
    #[must_use]
    pub const fn new(name: &'a str, text: &'a str) -> Self {
        Self { name, text }
    }
}
