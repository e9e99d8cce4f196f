//! In-memory ZIP inspection for downloaded plugin archives.
//!
//! Plugin hosts treat DLL names case-insensitively but ZIP entry lookup is
//! exact, so the expected name is matched case-insensitively and the stored
//! spelling is what gets extracted and written to disk.

use std::io::{Cursor, Read};

/// Errors arising from archive inspection.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The bytes are not a readable ZIP archive.
    #[error("invalid zip file: {0}")]
    Corrupt(#[source] zip::result::ZipError),

    /// An entry could not be located or decompressed.
    #[error("failed to read entry {name}: {reason}")]
    Entry {
        /// The entry name as stored in the archive.
        name: String,
        /// Description of the failure.
        reason: String,
    },
}

/// A ZIP archive held in memory.
pub struct PluginArchive {
    zip: zip::ZipArchive<Cursor<Vec<u8>>>,
}

impl PluginArchive {
    /// Open `bytes` as a ZIP archive.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Corrupt`] when the central directory cannot be
    /// read.
    pub fn open(bytes: Vec<u8>) -> Result<Self, ArchiveError> {
        let zip = zip::ZipArchive::new(Cursor::new(bytes)).map_err(ArchiveError::Corrupt)?;
        Ok(Self { zip })
    }

    /// Entry names exactly as stored in the archive.
    #[must_use]
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.zip.file_names()
    }

    /// Find the stored name of the entry matching `expected_name`, ignoring
    /// case. Only top-level entries can match.
    #[must_use]
    pub fn find_entry(&self, expected_name: &str) -> Option<String> {
        let wanted = expected_name.to_lowercase();
        let found = self
            .entry_names()
            .find(|name| name.to_lowercase() == wanted)
            .map(str::to_owned);
        log::trace!("entry lookup for {wanted}: {found:?}");
        found
    }

    /// Read the raw content of the entry stored as `entry_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Entry`] when the entry is missing or its data
    /// cannot be decompressed.
    pub fn extract(&mut self, entry_name: &str) -> Result<Vec<u8>, ArchiveError> {
        let entry_error = |reason: String| ArchiveError::Entry {
            name: entry_name.to_owned(),
            reason,
        };
        let mut entry = self
            .zip
            .by_name(entry_name)
            .map_err(|e| entry_error(e.to_string()))?;
        let mut content = Vec::new();
        entry
            .read_to_end(&mut content)
            .map_err(|e| entry_error(e.to_string()))?;
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::zip_bytes;
    use rstest::rstest;

    #[test]
    fn open_rejects_non_zip_bytes() {
        let result = PluginArchive::open(b"<html>404</html>".to_vec());
        assert!(matches!(result, Err(ArchiveError::Corrupt(_))));
    }

    #[rstest]
    #[case::exact("foo.dll", "foo.dll")]
    #[case::upper_stored("MyPlugin.DLL", "myplugin.dll")]
    #[case::upper_expected("compare.dll", "Compare.dll")]
    fn find_entry_ignores_case_and_returns_stored_name(
        #[case] stored: &str,
        #[case] expected: &str,
    ) {
        let archive = PluginArchive::open(zip_bytes(&[("readme.txt", b"hi"), (stored, b"MZ")]))
            .expect("valid zip");
        assert_eq!(archive.find_entry(expected).as_deref(), Some(stored));
    }

    #[test]
    fn find_entry_does_not_match_nested_paths() {
        let archive =
            PluginArchive::open(zip_bytes(&[("x64/foo.dll", b"MZ")])).expect("valid zip");
        assert_eq!(archive.find_entry("foo.dll"), None);
    }

    #[test]
    fn extract_returns_entry_content() {
        let mut archive =
            PluginArchive::open(zip_bytes(&[("Foo.dll", b"binary content")])).expect("valid zip");
        let content = archive.extract("Foo.dll").expect("extract");
        assert_eq!(content, b"binary content");
    }

    #[test]
    fn extract_is_case_sensitive() {
        let mut archive =
            PluginArchive::open(zip_bytes(&[("Foo.dll", b"binary content")])).expect("valid zip");
        let result = archive.extract("foo.dll");
        assert!(matches!(result, Err(ArchiveError::Entry { .. })));
    }
}
