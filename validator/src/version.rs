//! Dotted version strings and embedded DLL version extraction.
//!
//! A declared plugin version has between one and four numeric components.
//! Windows stores a binary's file version as four 16-bit words, so declared
//! versions are right-padded with `.0` before the two are compared. The
//! comparison is textual: `01.2` does not match a binary reporting `1.2.0.0`.

use camino::Utf8Path;
use pelite::pe32::{Pe as _, PeFile as PeFile32};
use pelite::pe64::{Pe as _, PeFile as PeFile64};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Number of components in a file version.
pub const VERSION_COMPONENTS: usize = 4;

/// Errors arising from parsing a dotted version string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    /// The string was empty or whitespace.
    #[error("version must not be empty")]
    Empty,

    /// More than four components were supplied.
    #[error("version \"{value}\" has more than {VERSION_COMPONENTS} components")]
    TooManyComponents {
        /// The rejected version string.
        value: String,
    },

    /// A component was empty, non-numeric, or larger than 65535.
    #[error("version \"{value}\" has invalid component \"{component}\"")]
    InvalidComponent {
        /// The rejected version string.
        value: String,
        /// The offending component text.
        component: String,
    },
}

/// A version of one to four dot-separated 16-bit components.
///
/// # Examples
///
/// ```
/// use plugin_list_validator::version::VersionString;
///
/// let declared: VersionString = "1.2".parse().expect("valid version");
/// assert_eq!(declared.normalized().to_string(), "1.2.0.0");
/// ```
///
/// Components keep the text they were written with, so leading zeros
/// survive normalisation and take part in [`VersionString::matches`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct VersionString(Vec<String>);

impl VersionString {
    /// Build a four-component version from file-version words.
    #[must_use]
    pub fn from_parts(parts: [u16; VERSION_COMPONENTS]) -> Self {
        Self(parts.iter().map(u16::to_string).collect())
    }

    /// Return this version padded with `0` components to exactly four.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut parts = self.0.clone();
        parts.resize(VERSION_COMPONENTS, "0".to_owned());
        Self(parts)
    }

    /// True when both versions render identically after normalisation.
    ///
    /// ```
    /// use plugin_list_validator::version::VersionString;
    ///
    /// let found = VersionString::from_parts([1, 2, 0, 0]);
    /// assert!("1.2".parse::<VersionString>().expect("valid").matches(&found));
    /// assert!(!"01.2".parse::<VersionString>().expect("valid").matches(&found));
    /// ```
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }

    /// The components as written.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromStr for VersionString {
    type Err = VersionParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(VersionParseError::Empty);
        }
        let parts = trimmed
            .split('.')
            .map(|component| {
                let digits_only =
                    !component.is_empty() && component.bytes().all(|b| b.is_ascii_digit());
                digits_only
                    .then(|| component.parse::<u16>().ok())
                    .flatten()
                    .map(|_| component.to_owned())
                    .ok_or_else(|| VersionParseError::InvalidComponent {
                        value: trimmed.to_owned(),
                        component: component.to_owned(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if parts.len() > VERSION_COMPONENTS {
            return Err(VersionParseError::TooManyComponents {
                value: trimmed.to_owned(),
            });
        }
        Ok(Self(parts))
    }
}

impl TryFrom<String> for VersionString {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for VersionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Errors arising from reading a binary's embedded version.
#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    /// The file could not be opened or mapped.
    #[error("failed to read binary: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a PE32 or PE32+ image.
    #[error("not a portable executable: {reason}")]
    NotPortableExecutable {
        /// The parser diagnostic.
        reason: String,
    },

    /// The image carries no fixed file-version resource.
    #[error("no version information")]
    NoVersionInfo,
}

/// Reads the embedded file version of a binary on disk.
#[cfg_attr(test, mockall::automock)]
pub trait VersionReader {
    /// Read the four-component file version of the binary at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::NoVersionInfo`] when the binary has no
    /// version resource, and other variants when it cannot be parsed.
    fn read_version(&self, path: &Utf8Path) -> Result<VersionString, VersionError>;
}

/// Version reader for Windows PE images, backed by `pelite`.
///
/// Reads the `VS_FIXEDFILEINFO` block of the `VS_VERSIONINFO` resource and
/// renders `dwFileVersion` as `major.minor.patch.build`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeVersionReader;

impl VersionReader for PeVersionReader {
    fn read_version(&self, path: &Utf8Path) -> Result<VersionString, VersionError> {
        let map = pelite::FileMap::open(path.as_std_path())?;
        file_version(map.as_ref())
    }
}

/// Parse a PE image of either bitness and extract its file version.
fn file_version(image: &[u8]) -> Result<VersionString, VersionError> {
    match PeFile64::from_bytes(image) {
        Ok(file) => fixed_file_version(file.resources()),
        Err(pelite::Error::PeMagic) => {
            let file = PeFile32::from_bytes(image).map_err(not_portable_executable)?;
            fixed_file_version(file.resources())
        }
        Err(other) => Err(not_portable_executable(other)),
    }
}

fn fixed_file_version(
    resources: pelite::Result<pelite::resources::Resources<'_>>,
) -> Result<VersionString, VersionError> {
    let resources = resources.map_err(|_| VersionError::NoVersionInfo)?;
    let info = resources
        .version_info()
        .map_err(|_| VersionError::NoVersionInfo)?;
    let fixed = info.fixed().ok_or(VersionError::NoVersionInfo)?;
    let file_version = &fixed.dwFileVersion;
    Ok(VersionString::from_parts([
        file_version.Major,
        file_version.Minor,
        file_version.Patch,
        file_version.Build,
    ]))
}

fn not_portable_executable(err: pelite::Error) -> VersionError {
    VersionError::NotPortableExecutable {
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Bitness;
    use crate::test_utils::pe_image;
    use camino::Utf8PathBuf;
    use rstest::rstest;

    #[rstest]
    #[case::one_component("1", "1.0.0.0")]
    #[case::two_components("1.2", "1.2.0.0")]
    #[case::three_components("1.2.3", "1.2.3.0")]
    #[case::four_components("1.2.3.4", "1.2.3.4")]
    #[case::surrounding_whitespace(" 2.0 ", "2.0.0.0")]
    fn normalizes_to_four_components(#[case] declared: &str, #[case] expected: &str) {
        let version: VersionString = declared.parse().expect("valid version");
        assert_eq!(version.normalized().to_string(), expected);
    }

    #[rstest]
    #[case::empty("")]
    #[case::blank("   ")]
    #[case::trailing_dot("1.2.")]
    #[case::letters("1.2b")]
    #[case::negative("1.-2")]
    #[case::too_large("1.70000")]
    #[case::five_components("1.2.3.4.5")]
    fn rejects_malformed_versions(#[case] declared: &str) {
        assert!(declared.parse::<VersionString>().is_err(), "{declared:?}");
    }

    #[rstest]
    #[case::padded("1.2", true)]
    #[case::complete("1.2.0.0", true)]
    #[case::other_minor("1.3", false)]
    #[case::leading_zero("01.2", false)]
    #[case::padded_leading_zero("1.2.00", false)]
    fn matches_compares_text_after_padding(#[case] declared: &str, #[case] expected: bool) {
        let declared: VersionString = declared.parse().expect("valid");
        let extracted = VersionString::from_parts([1, 2, 0, 0]);
        assert_eq!(declared.matches(&extracted), expected);
    }

    #[test]
    fn display_preserves_components_as_written() {
        let version: VersionString = "7.08.1".parse().expect("valid");
        assert_eq!(version.to_string(), "7.08.1");
        assert_eq!(version.components().collect::<Vec<_>>(), ["7", "08", "1"]);
        assert_eq!(version.normalized().to_string(), "7.08.1.0");
    }

    #[test]
    fn deserialises_from_json_string() {
        let version: VersionString = serde_json::from_str("\"3.1\"").expect("valid");
        assert_eq!(version.normalized(), VersionString::from_parts([3, 1, 0, 0]));
        assert!(serde_json::from_str::<VersionString>("\"x.y\"").is_err());
    }

    fn write_binary(dir: &tempfile::TempDir, content: &[u8]) -> Utf8PathBuf {
        let path = Utf8PathBuf::try_from(dir.path().join("Plugin.dll")).expect("UTF-8 path");
        std::fs::write(&path, content).expect("write binary");
        path
    }

    #[rstest]
    #[case::pe32_plus(Bitness::X64, [1, 2, 0, 0], "1.2.0.0")]
    #[case::pe32(Bitness::X86, [7, 8, 9, 10], "7.8.9.10")]
    fn pe_reader_reads_the_fixed_file_version(
        #[case] bitness: Bitness,
        #[case] parts: [u16; VERSION_COMPONENTS],
        #[case] expected: &str,
    ) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_binary(&dir, &pe_image(bitness, Some(parts)));

        let version = PeVersionReader.read_version(&path).expect("version resource");
        assert_eq!(version.to_string(), expected);
        assert_eq!(version, VersionString::from_parts(parts));
    }

    #[rstest]
    #[case::pe32_plus(Bitness::X64)]
    #[case::pe32(Bitness::X86)]
    fn pe_reader_reports_images_without_a_version_resource(#[case] bitness: Bitness) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_binary(&dir, &pe_image(bitness, None));

        let result = PeVersionReader.read_version(&path);
        assert!(matches!(result, Err(VersionError::NoVersionInfo)), "got {result:?}");
    }

    #[test]
    fn pe_reader_rejects_non_pe_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::try_from(dir.path().join("fake.dll")).expect("UTF-8 path");
        std::fs::write(&path, b"this is not a portable executable image").expect("write");

        let result = PeVersionReader.read_version(&path);
        assert!(
            matches!(result, Err(VersionError::NotPortableExecutable { .. })),
            "got {result:?}"
        );
    }

    #[test]
    fn pe_reader_reports_missing_file_as_io() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::try_from(dir.path().join("absent.dll")).expect("UTF-8 path");
        let result = PeVersionReader.read_version(&path);
        assert!(matches!(result, Err(VersionError::Io(_))), "got {result:?}");
    }
}
