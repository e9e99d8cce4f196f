//! Manifest reading.
//!
//! Two manifest shapes are understood, selected by [`ManifestFormat::sniff`]:
//!
//! - **Plugin list**: each `<plugin name="...">` element carries its own
//!   `<download>` URL and per-target `<x64Version>`/`<x86Version>`.
//! - **Legacy downloads**: a flat list of `<download>` URLs. Identity and
//!   declared version come from the descriptor entry at the same position.
//!
//! Either way the result is one [`ManifestEntry`] per listed plugin. An entry
//! that cannot be turned into a [`PluginRecord`] is an error for that plugin
//! alone; the remaining entries are still returned.

use crate::config::Bitness;
use crate::descriptor::Descriptor;
use crate::schema::Document;
use crate::version::VersionString;
use roxmltree::Node;

/// One plugin to verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRecord {
    /// Name used as the prefix of every error about this plugin.
    pub display_name: String,
    /// Base name of the expected binary inside the archive.
    pub component: String,
    /// Archive URL.
    pub download_url: String,
    /// Version the binary must report.
    pub declared_version: VersionString,
}

impl PluginRecord {
    /// The archive entry expected to hold the plugin binary.
    ///
    /// # Examples
    ///
    /// ```
    /// use plugin_list_validator::manifest::PluginRecord;
    /// use plugin_list_validator::version::VersionString;
    ///
    /// let record = PluginRecord {
    ///     display_name: "Compare".to_owned(),
    ///     component: "ComparePlugin".to_owned(),
    ///     download_url: "https://example.test/compare.zip".to_owned(),
    ///     declared_version: "2.0".parse::<VersionString>().expect("version"),
    /// };
    /// assert_eq!(record.expected_entry_name(), "ComparePlugin.dll");
    /// ```
    #[must_use]
    pub fn expected_entry_name(&self) -> String {
        format!("{}.dll", self.component)
    }
}

/// One listed plugin: its record, or why the entry could not be read.
pub type ManifestEntry = Result<PluginRecord, ManifestError>;

/// Errors arising from reading a manifest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestError {
    /// The manifest is not well-formed XML.
    #[error("{name} - XML Syntax Error: {reason}")]
    Syntax {
        /// Manifest display name.
        name: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// The root element holds neither `<plugin>` nor `<download>` elements.
    #[error("{name} - no <plugin> or <download> elements found")]
    UnknownFormat {
        /// Manifest display name.
        name: String,
    },

    /// A plugin entry lacks required data.
    #[error("{name} - plugin #{position} ({plugin}): {reason}")]
    InvalidPlugin {
        /// Manifest display name.
        name: String,
        /// One-based position of the entry.
        position: usize,
        /// Plugin name, or `unnamed` when the entry has none.
        plugin: String,
        /// What is wrong with the entry.
        reason: String,
    },

    /// A legacy manifest was read without a descriptor to join.
    #[error("{name} - a plugin descriptor is required to read a download-only manifest")]
    DescriptorRequired {
        /// Manifest display name.
        name: String,
    },

    /// The legacy manifest and descriptor list different numbers of plugins.
    #[error("{name} - lists {downloads} downloads but the descriptor lists {entries} plugins")]
    DescriptorMismatch {
        /// Manifest display name.
        name: String,
        /// Number of `<download>` elements.
        downloads: usize,
        /// Number of descriptor entries.
        entries: usize,
    },
}

/// The shape of a manifest document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// `<plugin>` elements carrying name, URL and versions.
    PluginList,
    /// Bare `<download>` URLs joined with the descriptor by position.
    LegacyDownloads,
}

impl ManifestFormat {
    /// Determine the manifest shape from its root element.
    ///
    /// A root with any `<plugin>` child is a plugin list; otherwise any
    /// `<download>` element makes it a legacy manifest.
    #[must_use]
    pub fn sniff(root: Node<'_, '_>) -> Option<Self> {
        if element_children(root, "plugin").next().is_some() {
            Some(Self::PluginList)
        } else if downloads(root).next().is_some() {
            Some(Self::LegacyDownloads)
        } else {
            None
        }
    }
}

/// Read the plugin entries for `bitness` from a manifest.
///
/// Incomplete entries come back as [`ManifestError::InvalidPlugin`] in their
/// own slot and do not affect their neighbours.
///
/// # Errors
///
/// Returns a [`ManifestError`] when the document as a whole is unusable: it
/// cannot be parsed, has an unknown shape, or is a legacy manifest that
/// cannot be joined with the descriptor. No entries are returned then.
///
/// # Examples
///
/// ```
/// use plugin_list_validator::config::Bitness;
/// use plugin_list_validator::manifest::read_manifest;
/// use plugin_list_validator::schema::Document;
///
/// let xml = r#"<plugins>
///   <plugin name="ComparePlugin">
///     <x64Version>2.0</x64Version>
///     <download>https://example.test/compare.zip</download>
///   </plugin>
/// </plugins>"#;
/// let entries = read_manifest(Document::new("plugins64.xml", xml), Bitness::X64, None)
///     .expect("valid manifest");
/// let record = entries[0].as_ref().expect("complete entry");
/// assert_eq!(record.expected_entry_name(), "ComparePlugin.dll");
/// assert_eq!(record.declared_version.normalized().to_string(), "2.0.0.0");
/// ```
pub fn read_manifest(
    manifest: Document<'_>,
    bitness: Bitness,
    descriptor: Option<&Descriptor>,
) -> Result<Vec<ManifestEntry>, ManifestError> {
    let document =
        roxmltree::Document::parse(manifest.text).map_err(|e| ManifestError::Syntax {
            name: manifest.name.to_owned(),
            reason: e.to_string(),
        })?;
    let root = document.root_element();
    let format = ManifestFormat::sniff(root).ok_or_else(|| ManifestError::UnknownFormat {
        name: manifest.name.to_owned(),
    })?;
    log::debug!("{} read as {format:?}", manifest.name);

    let entries = match format {
        ManifestFormat::PluginList => read_plugin_list(manifest.name, root, bitness),
        ManifestFormat::LegacyDownloads => {
            let descriptor = descriptor.ok_or_else(|| ManifestError::DescriptorRequired {
                name: manifest.name.to_owned(),
            })?;
            read_legacy(manifest.name, root, descriptor)?
        }
    };
    log::debug!("{} lists {} plugin(s)", manifest.name, entries.len());
    Ok(entries)
}

fn read_plugin_list(
    name: &str,
    root: Node<'_, '_>,
    bitness: Bitness,
) -> Vec<ManifestEntry> {
    element_children(root, "plugin")
        .enumerate()
        .map(|(index, node)| {
            let plugin = node.attribute("name").map(str::trim).unwrap_or_default();
            let invalid = |reason: String| ManifestError::InvalidPlugin {
                name: name.to_owned(),
                position: index + 1,
                plugin: if plugin.is_empty() {
                    "unnamed".to_owned()
                } else {
                    plugin.to_owned()
                },
                reason,
            };
            if plugin.is_empty() {
                return Err(invalid("missing \"name\" attribute".to_owned()));
            }
            let download_url = child_text(node, "download")
                .ok_or_else(|| invalid("missing <download> URL".to_owned()))?;
            let version_element = bitness.version_element();
            let version = child_text(node, version_element)
                .ok_or_else(|| invalid(format!("missing <{version_element}>")))?;
            let declared_version = version
                .parse::<VersionString>()
                .map_err(|e| invalid(format!("<{version_element}>: {e}")))?;
            Ok(PluginRecord {
                display_name: plugin.to_owned(),
                component: plugin.to_owned(),
                download_url,
                declared_version,
            })
        })
        .collect()
}

fn read_legacy(
    name: &str,
    root: Node<'_, '_>,
    descriptor: &Descriptor,
) -> Result<Vec<ManifestEntry>, ManifestError> {
    let urls: Vec<String> = downloads(root).map(trimmed_text).collect();
    if urls.len() != descriptor.len() {
        return Err(ManifestError::DescriptorMismatch {
            name: name.to_owned(),
            downloads: urls.len(),
            entries: descriptor.len(),
        });
    }
    Ok(urls
        .into_iter()
        .zip(descriptor.entries())
        .enumerate()
        .map(|(index, (download_url, entry))| {
            let invalid = |reason: String| ManifestError::InvalidPlugin {
                name: name.to_owned(),
                position: index + 1,
                plugin: entry.display_name.clone(),
                reason,
            };
            if download_url.is_empty() {
                return Err(invalid("empty <download> URL".to_owned()));
            }
            let declared_version = entry
                .version
                .parse::<VersionString>()
                .map_err(|e| invalid(format!("descriptor version: {e}")))?;
            Ok(PluginRecord {
                display_name: entry.display_name.clone(),
                component: entry.folder_name.clone(),
                download_url,
                declared_version,
            })
        })
        .collect())
}

fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
    local_name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |child| child.is_element() && child.tag_name().name() == local_name)
}

fn downloads<'a, 'input>(root: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    root.descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == "download")
}

fn trimmed_text(node: Node<'_, '_>) -> String {
    node.text().map(str::trim).unwrap_or_default().to_owned()
}

/// Trimmed text of the first `local_name` child, if present and non-empty.
fn child_text(node: Node<'_, '_>, local_name: &'static str) -> Option<String> {
    element_children(node, local_name)
        .next()
        .map(trimmed_text)
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
