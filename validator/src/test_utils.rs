//! Shared test utilities for the validator crate.
//!
//! Builders for in-memory ZIP archives, minimal PE images, manifests and
//! descriptors, plus stub implementations of the fetch, version and
//! reporting seams so the pipeline can run without network access.

use crate::config::Bitness;
use crate::fetch::{ArtifactFetcher, FetchError};
use crate::report::{Reporter, ValidationError};
use crate::version::{VersionError, VersionReader, VersionString};
use camino::Utf8Path;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Cursor, Write};

/// Marker preceding the version in a stub binary.
const VERSION_MARKER: &str = "VERSION:";

/// Draft-4 schema accepting the descriptors built by [`descriptor_json`].
pub const DESCRIPTOR_SCHEMA: &str = r#"{
    "$schema": "http://json-schema.org/draft-04/schema#",
    "type": "object",
    "required": ["npp-plugins"],
    "properties": {
        "npp-plugins": {
            "type": "array",
            "items": {
                "type": "object",
                "required": ["folder-name", "display-name", "version"],
                "properties": {
                    "folder-name": {"type": "string"},
                    "display-name": {"type": "string"},
                    "version": {"type": "string"},
                    "repository": {"type": "string", "format": "uri"}
                }
            }
        }
    }
}"#;

/// XSD accepting the manifests built by [`plugin_list_xml`].
pub const PLUGIN_LIST_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:simpleType name="versionType">
    <xs:restriction base="xs:string">
      <xs:pattern value="\d+(\.\d+){0,3}"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:element name="plugins">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="plugin" minOccurs="0" maxOccurs="unbounded">
          <xs:complexType>
            <xs:sequence>
              <xs:choice>
                <xs:element name="x64Version" type="versionType"/>
                <xs:element name="x86Version" type="versionType"/>
              </xs:choice>
              <xs:element name="download" type="xs:anyURI"/>
            </xs:sequence>
            <xs:attribute name="name" type="xs:string" use="required"/>
          </xs:complexType>
        </xs:element>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

/// Build a ZIP archive holding `entries` as `(name, content)` pairs.
///
/// # Panics
///
/// Panics if the in-memory archive cannot be written.
#[must_use]
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, content) in entries {
        writer.start_file(*name, options).expect("start zip entry");
        writer.write_all(content).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// Content of a stub binary whose version [`StubVersionReader`] reports.
#[must_use]
pub fn stub_binary(version: &str) -> Vec<u8> {
    format!("MZ stub {VERSION_MARKER}{version}\n").into_bytes()
}

/// File offset and RVA of the `.rsrc` section in images built by [`pe_image`].
const PE_RESOURCES: u32 = 0x200;

/// Size of the resource tree [`pe_image`] writes for a version resource.
const PE_RESOURCE_TREE: u32 = 0x58 + 92;

/// A minimal DLL image holding at most a `.rsrc` section.
///
/// `X64` builds a PE32+ image and `X86` a PE32 image. The section is mapped
/// at the same RVA as its file offset. With a `version` the image carries an
/// `RT_VERSION` resource whose `VS_FIXEDFILEINFO` reports it as the file
/// version; without one the image has no sections and no resources.
#[must_use]
pub fn pe_image(bitness: Bitness, version: Option<[u16; 4]>) -> Vec<u8> {
    let pe64 = bitness == Bitness::X64;
    let resources_len = if version.is_some() { PE_RESOURCE_TREE } else { 0 };
    let total = PE_RESOURCES + resources_len;
    let mut image = vec![0_u8; total as usize];

    put(&mut image, 0, b"MZ");
    put(&mut image, 0x3C, &0x40_u32.to_le_bytes());
    put(&mut image, 0x40, b"PE\0\0");

    let (machine, magic, optional_size): (u16, u16, u16) = if pe64 {
        (0x8664, 0x20B, 240)
    } else {
        (0x014C, 0x10B, 224)
    };
    let sections = u16::from(version.is_some());
    put(&mut image, 0x44, &machine.to_le_bytes());
    put(&mut image, 0x44 + 2, &sections.to_le_bytes());
    put(&mut image, 0x44 + 16, &optional_size.to_le_bytes());
    put(&mut image, 0x44 + 18, &0x2022_u16.to_le_bytes());

    let optional = 0x58;
    put(&mut image, optional, &magic.to_le_bytes());
    put(&mut image, optional + 32, &0x200_u32.to_le_bytes());
    put(&mut image, optional + 36, &0x200_u32.to_le_bytes());
    put(&mut image, optional + 56, &total.to_le_bytes());
    put(&mut image, optional + 60, &PE_RESOURCES.to_le_bytes());
    put(&mut image, optional + 68, &2_u16.to_le_bytes());
    let (rva_count_at, directories_at) = if pe64 { (108, 112) } else { (92, 96) };
    put(&mut image, optional + rva_count_at, &16_u32.to_le_bytes());

    if let Some(version) = version {
        let resource_entry = optional + directories_at + 2 * 8;
        put(&mut image, resource_entry, &PE_RESOURCES.to_le_bytes());
        put(&mut image, resource_entry + 4, &resources_len.to_le_bytes());

        let section = optional + usize::from(optional_size);
        put(&mut image, section, b".rsrc");
        put(&mut image, section + 8, &resources_len.to_le_bytes());
        put(&mut image, section + 12, &PE_RESOURCES.to_le_bytes());
        put(&mut image, section + 16, &resources_len.to_le_bytes());
        put(&mut image, section + 20, &PE_RESOURCES.to_le_bytes());
        put(&mut image, section + 36, &0x4000_0040_u32.to_le_bytes());

        write_version_resource(&mut image, version);
    }
    image
}

/// Write the `RT_VERSION` / ID 1 / en-US tree and its `VS_VERSIONINFO` block.
fn write_version_resource(image: &mut [u8], [major, minor, patch, build]: [u16; 4]) {
    const SUBDIRECTORY: u32 = 0x8000_0000;
    let base = PE_RESOURCES as usize;
    // (directory offset, entry id, target offset)
    let levels = [
        (0x00, 16, SUBDIRECTORY | 0x18),
        (0x18, 1, SUBDIRECTORY | 0x30),
        (0x30, 0x409, 0x48),
    ];
    for (directory, id, target) in levels {
        put(image, base + directory + 14, &1_u16.to_le_bytes());
        put(image, base + directory + 16, &u32::to_le_bytes(id));
        put(image, base + directory + 20, &u32::to_le_bytes(target));
    }
    put(image, base + 0x48, &(PE_RESOURCES + 0x58).to_le_bytes());
    put(image, base + 0x4C, &92_u32.to_le_bytes());

    let info = base + 0x58;
    put(image, info, &92_u16.to_le_bytes());
    put(image, info + 2, &52_u16.to_le_bytes());
    let key: Vec<u8> = "VS_VERSION_INFO"
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect();
    put(image, info + 6, &key);
    let fixed = info + 40;
    put(image, fixed, &0xFEEF_04BD_u32.to_le_bytes());
    put(image, fixed + 4, &0x0001_0000_u32.to_le_bytes());
    put(image, fixed + 8, &((u32::from(major) << 16) | u32::from(minor)).to_le_bytes());
    put(image, fixed + 12, &((u32::from(patch) << 16) | u32::from(build)).to_le_bytes());
}

fn put(image: &mut [u8], at: usize, bytes: &[u8]) {
    if let Some(slot) = image.get_mut(at..at + bytes.len()) {
        slot.copy_from_slice(bytes);
    }
}

/// A ZIP archive holding one stub binary at `entry_name`.
#[must_use]
pub fn plugin_zip(entry_name: &str, version: &str) -> Vec<u8> {
    zip_bytes(&[(entry_name, &stub_binary(version))])
}

/// Build a plugin-list manifest from `(name, version, url)` triples.
#[must_use]
pub fn plugin_list_xml(bitness: Bitness, plugins: &[(&str, &str, &str)]) -> String {
    let element = bitness.version_element();
    let body: String = plugins
        .iter()
        .map(|(name, version, url)| {
            format!(
                "  <plugin name=\"{name}\">\n    <{element}>{version}</{element}>\n    \
                 <download>{url}</download>\n  </plugin>\n"
            )
        })
        .collect();
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<plugins>\n{body}</plugins>\n")
}

/// Build a download-only manifest listing `urls`.
#[must_use]
pub fn legacy_manifest_xml(urls: &[&str]) -> String {
    let body: String = urls
        .iter()
        .map(|url| format!("  <download>{url}</download>\n"))
        .collect();
    format!("<plugins>\n{body}</plugins>\n")
}

/// Build a descriptor from `(folder_name, display_name, version)` triples.
#[must_use]
pub fn descriptor_json(entries: &[(&str, &str, &str)]) -> String {
    let plugins: Vec<serde_json::Value> = entries
        .iter()
        .map(|(folder, display, version)| {
            serde_json::json!({
                "folder-name": folder,
                "display-name": display,
                "version": version,
            })
        })
        .collect();
    serde_json::json!({ "npp-plugins": plugins }).to_string()
}

/// Fetcher answering from a fixed URL table and recording every request.
///
/// Unknown URLs fail with a transport error.
#[derive(Debug, Default)]
pub struct StubFetcher {
    responses: HashMap<String, Result<Vec<u8>, FetchError>>,
    requests: RefCell<Vec<String>>,
}

impl StubFetcher {
    /// Create a fetcher with no responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    #[must_use]
    pub fn with_body(mut self, url: &str, body: Vec<u8>) -> Self {
        self.responses.insert(url.to_owned(), Ok(body));
        self
    }

    /// Answer `url` with HTTP status `code`.
    #[must_use]
    pub fn with_status(mut self, url: &str, code: u16) -> Self {
        self.responses.insert(
            url.to_owned(),
            Err(FetchError::Status {
                url: url.to_owned(),
                code,
            }),
        );
        self
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl ArtifactFetcher for StubFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.borrow_mut().push(url.to_owned());
        self.responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| {
                Err(FetchError::Transport {
                    url: url.to_owned(),
                    reason: "no route to host".to_owned(),
                })
            })
    }
}

/// Version reader for binaries built by [`stub_binary`].
///
/// Files without the version marker report [`VersionError::NoVersionInfo`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StubVersionReader;

impl VersionReader for StubVersionReader {
    fn read_version(&self, path: &Utf8Path) -> Result<VersionString, VersionError> {
        let content = std::fs::read_to_string(path)?;
        let version = content
            .split_once(VERSION_MARKER)
            .and_then(|(_, rest)| rest.lines().next())
            .ok_or(VersionError::NoVersionInfo)?;
        version
            .parse::<VersionString>()
            .map(|parsed| parsed.normalized())
            .map_err(|_| VersionError::NoVersionInfo)
    }
}

/// Reporter keeping every message it receives.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    /// Messages in the order they were reported.
    pub messages: Vec<String>,
}

impl Reporter for CollectingReporter {
    fn report(&mut self, error: &ValidationError) {
        self.messages.push(error.message().to_owned());
    }
}
