//! Typed view of the JSON plugin descriptor.
//!
//! The descriptor is schema-validated as an opaque document, but the legacy
//! manifest shape carries only download URLs, so plugin identity and
//! declared version are joined in from here by position.

use serde::Deserialize;

/// One plugin entry in the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DescriptorEntry {
    /// Base name of the plugin binary, without the `.dll` extension.
    pub folder_name: String,
    /// Name shown to users and used as the prefix of error messages.
    pub display_name: String,
    /// Declared version, checked against the binary's file version.
    pub version: String,
    /// Archive digest. Carried but not verified.
    #[serde(default)]
    pub id: Option<String>,
}

/// The parsed descriptor document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Descriptor {
    #[serde(rename = "npp-plugins")]
    plugins: Vec<DescriptorEntry>,
}

/// Errors arising from reading the descriptor.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// The text is not JSON or does not have the descriptor shape.
    #[error("{name} - {source}")]
    Parse {
        /// Display name of the descriptor.
        name: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl Descriptor {
    /// Parse descriptor text. `name` identifies the document in errors.
    ///
    /// Fields other than those on [`DescriptorEntry`] are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Parse`] when the text is not a descriptor.
    ///
    /// # Examples
    ///
    /// ```
    /// use plugin_list_validator::descriptor::Descriptor;
    ///
    /// let text = r#"{"npp-plugins": [{
    ///     "folder-name": "ComparePlugin",
    ///     "display-name": "Compare",
    ///     "version": "2.0.2",
    ///     "repository": "https://example.test/compare.zip"
    /// }]}"#;
    /// let descriptor = Descriptor::parse("validate.json", text).expect("descriptor");
    /// assert_eq!(descriptor.entries()[0].folder_name, "ComparePlugin");
    /// ```
    pub fn parse(name: &str, text: &str) -> Result<Self, DescriptorError> {
        serde_json::from_str(text).map_err(|source| DescriptorError::Parse {
            name: name.to_owned(),
            source,
        })
    }

    /// Entries in document order.
    #[must_use]
    pub fn entries(&self) -> &[DescriptorEntry] {
        &self.plugins
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// True when the descriptor lists no plugins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
