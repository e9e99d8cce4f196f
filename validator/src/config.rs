//! Run configuration.
//!
//! A run is fully described by a [`RunConfiguration`], resolved once at
//! startup from the command line and an optional TOML layout file, then
//! passed read-only to the pipeline.
//!
//! The layout file relocates inputs and the output root. Every key is
//! optional; omitted keys keep the defaults shown here:
//!
//! ```toml
//! schema = "pl.schema"
//! descriptor = "plugins/validate.json"
//! output_root = "."
//!
//! [x64]
//! manifest = "plugins/plugins64.xml"
//! xsd = "plugins/plugins64.xsd"
//!
//! [x86]
//! manifest = "plugins/plugins32.xml"
//! ```
//!
//! A target table that is present replaces that target's defaults entirely,
//! so `[x64]` without `xsd` disables schema validation of the 64-bit
//! manifest.

use crate::error::{Result, ValidatorError};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Target architecture whose plugin list is being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bitness {
    /// 32-bit plugins. Also accepted as `x32`.
    X86,
    /// 64-bit plugins.
    X64,
}

impl Bitness {
    /// The canonical lower-case name, also used as the output subdirectory.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X64 => "x64",
        }
    }

    /// Name of the manifest child element holding this target's version.
    #[must_use]
    pub const fn version_element(self) -> &'static str {
        match self {
            Self::X86 => "x86Version",
            Self::X64 => "x64Version",
        }
    }
}

impl fmt::Display for Bitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bitness {
    type Err = ValidatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x64" => Ok(Self::X64),
            "x86" | "x32" => Ok(Self::X86),
            _ => Err(ValidatorError::UnsupportedBitness {
                value: s.to_owned(),
            }),
        }
    }
}

/// What to do when the descriptor or manifest fails schema validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchemaPolicy {
    /// Record the failures and still check every plugin.
    #[default]
    Continue,
    /// Record the failures and stop before checking any plugin.
    Halt,
}

/// Input and output locations for one target.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetLayout {
    /// The XML plugin manifest.
    pub manifest: Utf8PathBuf,
    /// XSD for the manifest; `None` skips XML schema validation.
    #[serde(default)]
    pub xsd: Option<Utf8PathBuf>,
}

/// File layout, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Layout {
    /// Draft-4 JSON Schema for the descriptor.
    pub schema: Utf8PathBuf,
    /// The JSON plugin descriptor.
    pub descriptor: Utf8PathBuf,
    /// Directory under which `<bitness>/` output directories are created.
    pub output_root: Utf8PathBuf,
    /// 64-bit target layout.
    pub x64: TargetLayout,
    /// 32-bit target layout.
    pub x86: TargetLayout,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            schema: Utf8PathBuf::from("pl.schema"),
            descriptor: Utf8PathBuf::from("plugins/validate.json"),
            output_root: Utf8PathBuf::from("."),
            x64: TargetLayout {
                manifest: Utf8PathBuf::from("plugins/plugins64.xml"),
                xsd: Some(Utf8PathBuf::from("plugins/plugins64.xsd")),
            },
            x86: TargetLayout {
                manifest: Utf8PathBuf::from("plugins/plugins32.xml"),
                xsd: None,
            },
        }
    }
}

impl Layout {
    /// Load a layout from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::ConfigUnreadable`] when the file cannot be
    /// read and [`ValidatorError::InvalidConfig`] when it is not valid TOML
    /// or contains unknown keys.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            ValidatorError::ConfigUnreadable {
                path: path.to_owned(),
                source,
            }
        })?;
        Self::from_toml(path, &text)
    }

    /// Parse layout TOML. `path` is used only in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::InvalidConfig`] for malformed TOML or
    /// unknown keys.
    pub fn from_toml(path: &Utf8Path, text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ValidatorError::InvalidConfig {
            path: path.to_owned(),
            reason: e.message().to_owned(),
        })
    }

    /// The layout entry for `bitness`.
    #[must_use]
    pub const fn target(&self, bitness: Bitness) -> &TargetLayout {
        match bitness {
            Bitness::X64 => &self.x64,
            Bitness::X86 => &self.x86,
        }
    }
}

/// Everything one validation run needs, resolved up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfiguration {
    /// Target architecture.
    pub bitness: Bitness,
    /// XML plugin manifest.
    pub manifest_path: Utf8PathBuf,
    /// XSD for the manifest, when XML schema validation is enabled.
    pub xsd_path: Option<Utf8PathBuf>,
    /// Draft-4 JSON Schema for the descriptor.
    pub schema_path: Utf8PathBuf,
    /// JSON plugin descriptor.
    pub descriptor_path: Utf8PathBuf,
    /// Directory extracted binaries are written to.
    pub output_dir: Utf8PathBuf,
    /// Behaviour after schema validation failures.
    pub schema_policy: SchemaPolicy,
    /// Timeout applied to each network request.
    pub request_timeout: Duration,
    /// Build server base URL; errors are posted there when set.
    pub api_url: Option<String>,
}

/// Command-line choices that shape a [`RunConfiguration`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Replaces the layout's output root.
    pub output_root: Option<Utf8PathBuf>,
    /// Disables XML schema validation for every target.
    pub skip_xsd: bool,
    /// Selects [`SchemaPolicy::Halt`].
    pub strict: bool,
    /// Replaces the default request timeout.
    pub timeout: Option<Duration>,
    /// Build server base URL.
    pub api_url: Option<String>,
}

impl RunConfiguration {
    /// Resolve the configuration for `bitness` from a layout and overrides.
    ///
    /// # Examples
    ///
    /// ```
    /// use plugin_list_validator::config::{Bitness, Layout, Overrides, RunConfiguration};
    ///
    /// let config = RunConfiguration::resolve(Bitness::X86, &Layout::default(), Overrides::default());
    /// assert_eq!(config.manifest_path, "plugins/plugins32.xml");
    /// assert_eq!(config.output_dir, "./x86");
    /// assert!(config.xsd_path.is_none());
    /// ```
    #[must_use]
    pub fn resolve(bitness: Bitness, layout: &Layout, overrides: Overrides) -> Self {
        let target = layout.target(bitness);
        let output_root = overrides
            .output_root
            .unwrap_or_else(|| layout.output_root.clone());
        let xsd_path = if overrides.skip_xsd {
            None
        } else {
            target.xsd.clone()
        };
        Self {
            bitness,
            manifest_path: target.manifest.clone(),
            xsd_path,
            schema_path: layout.schema.clone(),
            descriptor_path: layout.descriptor.clone(),
            output_dir: output_root.join(bitness.as_str()),
            schema_policy: if overrides.strict {
                SchemaPolicy::Halt
            } else {
                SchemaPolicy::Continue
            },
            request_timeout: overrides.timeout.unwrap_or(crate::fetch::DEFAULT_TIMEOUT),
            api_url: overrides.api_url.filter(|url| !url.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::x64("x64", Bitness::X64)]
    #[case::x86("x86", Bitness::X86)]
    #[case::x32_alias("x32", Bitness::X86)]
    #[case::upper("X64", Bitness::X64)]
    fn bitness_parses_known_targets(#[case] input: &str, #[case] expected: Bitness) {
        assert_eq!(input.parse::<Bitness>().expect("parse"), expected);
    }

    #[rstest]
    #[case::empty("")]
    #[case::arm("arm64")]
    #[case::number("64")]
    fn bitness_rejects_unknown_targets(#[case] input: &str) {
        let err = input.parse::<Bitness>().expect_err("should reject");
        assert!(matches!(err, ValidatorError::UnsupportedBitness { value } if value == input));
    }

    #[test]
    fn default_layout_enables_xsd_only_for_x64() {
        let layout = Layout::default();
        let x64 = RunConfiguration::resolve(Bitness::X64, &layout, Overrides::default());
        let x86 = RunConfiguration::resolve(Bitness::X86, &layout, Overrides::default());
        assert_eq!(x64.xsd_path.as_deref(), Some(Utf8Path::new("plugins/plugins64.xsd")));
        assert_eq!(x64.manifest_path, "plugins/plugins64.xml");
        assert_eq!(x86.xsd_path, None);
        assert_eq!(x64.schema_policy, SchemaPolicy::Continue);
        assert_eq!(x64.request_timeout, crate::fetch::DEFAULT_TIMEOUT);
    }

    #[test]
    fn overrides_apply() {
        let overrides = Overrides {
            output_root: Some(Utf8PathBuf::from("/tmp/out")),
            skip_xsd: true,
            strict: true,
            timeout: Some(Duration::from_secs(5)),
            api_url: Some("https://ci.example.test/".to_owned()),
        };
        let config = RunConfiguration::resolve(Bitness::X64, &Layout::default(), overrides);
        assert_eq!(config.output_dir, "/tmp/out/x64");
        assert_eq!(config.xsd_path, None);
        assert_eq!(config.schema_policy, SchemaPolicy::Halt);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.api_url.as_deref(), Some("https://ci.example.test/"));
    }

    #[test]
    fn blank_api_url_is_treated_as_unset() {
        let overrides = Overrides {
            api_url: Some("  ".to_owned()),
            ..Overrides::default()
        };
        let config = RunConfiguration::resolve(Bitness::X64, &Layout::default(), overrides);
        assert_eq!(config.api_url, None);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let layout = Layout::from_toml(
            Utf8Path::new("validator.toml"),
            "descriptor = \"list/validate.json\"\n[x86]\nmanifest = \"list/x86.xml\"\nxsd = \"list/x86.xsd\"\n",
        )
        .expect("valid layout");
        assert_eq!(layout.descriptor, "list/validate.json");
        assert_eq!(layout.schema, "pl.schema");
        assert_eq!(layout.x64, Layout::default().x64);
        assert_eq!(layout.x86.xsd.as_deref(), Some(Utf8Path::new("list/x86.xsd")));
    }

    #[rstest]
    #[case::unknown_key("colour = \"red\"\n")]
    #[case::unknown_target_key("[x64]\nmanifest = \"a.xml\"\nschema = \"b\"\n")]
    #[case::wrong_type("schema = 3\n")]
    fn invalid_toml_is_rejected(#[case] text: &str) {
        let err = Layout::from_toml(Utf8Path::new("validator.toml"), text).expect_err("invalid");
        assert!(matches!(err, ValidatorError::InvalidConfig { .. }));
        assert!(err.to_string().contains("validator.toml"));
    }

    #[test]
    fn load_reports_missing_file() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::try_from(temp.path().join("absent.toml")).expect("UTF-8 path");
        let err = Layout::load(&path).expect_err("missing file");
        assert!(matches!(err, ValidatorError::ConfigUnreadable { .. }));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::try_from(temp.path().join("layout.toml")).expect("UTF-8 path");
        std::fs::write(&path, "output_root = \"build\"\n").expect("write layout");
        let layout = Layout::load(&path).expect("load");
        assert_eq!(layout.output_root, "build");
    }
}
