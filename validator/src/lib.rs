//! Plugin list validator library.
//!
//! This crate checks a plugin list release before it is published: the
//! plugin descriptor against its JSON schema, the manifest against its XML
//! schema, and every listed plugin archive against the version the list
//! declares for it. It is used by the `plugin-list-validator` CLI binary and
//! can be driven programmatically through [`pipeline::run_validation_with`].
//!
//! # Modules
//!
//! - [`archive`] - In-memory ZIP inspection and case-insensitive entry lookup
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Bitness, input layout and run configuration
//! - [`descriptor`] - Typed plugin descriptor
//! - [`error`] - Fatal error types
//! - [`fetch`] - Artifact download seam and HTTP implementation
//! - [`manifest`] - Manifest reading for both supported shapes
//! - [`output`] - Progress and summary output
//! - [`pipeline`] - Validation pipeline orchestration
//! - [`report`] - Accumulated validation errors and reporting sinks
//! - [`schema`] - JSON Schema and XML Schema validation
//! - [`stager`] - Writing extracted binaries to the output directory
//! - [`version`] - Four-part version strings and PE version extraction

pub mod archive;
pub mod cli;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod stager;
pub mod version;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
