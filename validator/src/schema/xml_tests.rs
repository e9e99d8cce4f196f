//! Unit tests for XSD validation.

use super::*;
use rstest::rstest;

const PLUGINS_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" elementFormDefault="qualified">
  <xs:annotation><xs:documentation>Plugin list</xs:documentation></xs:annotation>
  <xs:simpleType name="versionType">
    <xs:restriction base="xs:string">
      <xs:pattern value="\d+(\.\d+){0,3}"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:simpleType name="archType">
    <xs:restriction base="xs:token">
      <xs:enumeration value="x86"/>
      <xs:enumeration value="x64"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:complexType name="pluginType">
    <xs:sequence>
      <xs:element name="description" type="xs:string" minOccurs="0"/>
      <xs:choice>
        <xs:element name="x64Version" type="versionType"/>
        <xs:element name="x86Version" type="versionType"/>
      </xs:choice>
      <xs:element name="download" type="xs:anyURI"/>
    </xs:sequence>
    <xs:attribute name="name" type="xs:string" use="required"/>
    <xs:attribute name="arch" type="archType"/>
  </xs:complexType>
  <xs:element name="plugins">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="plugin" type="pluginType" maxOccurs="unbounded"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

fn check(xml: &str) -> Result<(), XmlSchemaError> {
    check_xml(
        Document::new("plugins64.xsd", PLUGINS_XSD),
        Document::new("plugins64.xml", xml),
    )
}

fn expect_invalid(xml: &str) -> String {
    match check(xml) {
        Err(XmlSchemaError::Invalid { reason, .. }) => reason,
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[test]
fn accepts_a_conforming_plugin_list() {
    let xml = r#"<?xml version="1.0"?>
        <plugins>
          <plugin name="ComparePlugin" arch="x64">
            <description>Compare two files</description>
            <x64Version>2.0.2</x64Version>
            <download>https://example.test/compare.zip</download>
          </plugin>
          <plugin name="NppExec">
            <x86Version>0.8</x86Version>
            <download>https://example.test/nppexec.zip</download>
          </plugin>
        </plugins>"#;
    assert_eq!(check(xml), Ok(()));
}

#[test]
fn attribute_groups_and_complex_content_are_accepted() {
    let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
        <xs:attributeGroup name="identity">
          <xs:attribute name="name" type="xs:string" use="required"/>
        </xs:attributeGroup>
        <xs:group name="release">
          <xs:sequence>
            <xs:element name="download" type="xs:anyURI"/>
          </xs:sequence>
        </xs:group>
        <xs:complexType name="baseEntry">
          <xs:sequence>
            <xs:element name="x64Version" type="xs:string"/>
          </xs:sequence>
          <xs:attributeGroup ref="identity"/>
        </xs:complexType>
        <xs:complexType name="pluginEntry">
          <xs:complexContent>
            <xs:extension base="baseEntry">
              <xs:group ref="release"/>
            </xs:extension>
          </xs:complexContent>
        </xs:complexType>
        <xs:element name="plugins">
          <xs:complexType>
            <xs:sequence>
              <xs:element name="plugin" type="pluginEntry" maxOccurs="unbounded"/>
            </xs:sequence>
          </xs:complexType>
        </xs:element>
    </xs:schema>"#;
    let xml = r#"<plugins><plugin name="A"><x64Version>1.0</x64Version>
        <download>https://a/a.zip</download></plugin></plugins>"#;

    let errors = validate_xml(Document::new("p.xsd", xsd), Document::new("p.xml", xml));
    assert!(errors.is_empty(), "{errors:?}");
}

#[rstest]
#[case::missing_download(
    r#"<plugins><plugin name="A"><x64Version>1.0</x64Version></plugin></plugins>"#,
    "download"
)]
#[case::missing_name(
    r#"<plugins><plugin><x64Version>1.0</x64Version><download>u</download></plugin></plugins>"#,
    "'name'"
)]
#[case::undeclared_attribute(
    r#"<plugins><plugin name="A" colour="red"><x64Version>1</x64Version><download>u</download></plugin></plugins>"#,
    "colour"
)]
#[case::bad_version(
    r#"<plugins><plugin name="A"><x64Version>1.x</x64Version><download>u</download></plugin></plugins>"#,
    "1.x"
)]
#[case::unknown_arch(
    r#"<plugins><plugin name="A" arch="arm64"><x64Version>1</x64Version><download>u</download></plugin></plugins>"#,
    "arm64"
)]
#[case::trailing_element(
    r#"<plugins><plugin name="A"><x64Version>1</x64Version><download>u</download><homepage>h</homepage></plugin></plugins>"#,
    "homepage"
)]
#[case::empty_list("<plugins/>", "plugin")]
#[case::wrong_root("<catalogue/>", "catalogue")]
fn violations_name_the_offending_node(#[case] xml: &str, #[case] fragment: &str) {
    let reason = expect_invalid(xml);
    assert!(reason.contains(fragment), "{reason}");
}

#[test]
fn diagnostics_carry_the_line_of_the_violation() {
    let reason = expect_invalid(
        "<plugins>\n\
         <plugin name=\"A\"><x64Version>1</x64Version><download>u</download></plugin>\n\
         <plugin name=\"B\"><x64Version>bad</x64Version><download>u</download></plugin>\n\
         </plugins>",
    );
    assert!(reason.starts_with("line 3: "), "{reason}");
}

#[test]
fn malformed_document_is_a_syntax_error() {
    let result = check("<plugins><plugin name=\"A\"></plugins>");
    assert!(
        matches!(result, Err(XmlSchemaError::DocumentSyntax { .. })),
        "{result:?}"
    );
}

#[test]
fn malformed_schema_is_a_schema_syntax_error() {
    let result = check_xml(
        Document::new("broken.xsd", "<xs:schema"),
        Document::new("plugins64.xml", "<plugins/>"),
    );
    assert!(matches!(result, Err(XmlSchemaError::SchemaSyntax { .. })));
}

#[test]
fn undefined_type_reference_does_not_compile() {
    let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
        <xs:element name="plugins" type="missingType"/>
    </xs:schema>"#;
    let result = check_xml(
        Document::new("odd.xsd", xsd),
        Document::new("plugins64.xml", "<plugins/>"),
    );
    match result {
        Err(XmlSchemaError::SchemaInvalid { name, reason }) => {
            assert_eq!(name, "odd.xsd");
            assert!(reason.contains("missingType"), "{reason}");
        }
        other => panic!("expected SchemaInvalid, got {other:?}"),
    }
}

#[test]
fn several_violations_are_reported_once_with_prefix() {
    let errors = validate_xml(
        Document::new("plugins64.xsd", PLUGINS_XSD),
        Document::new(
            "plugins64.xml",
            r#"<plugins>
                <plugin name="A"><x64Version>bad</x64Version><download>u</download></plugin>
                <plugin><x64Version>1</x64Version><download>u</download></plugin>
            </plugins>"#,
        ),
    );
    assert_eq!(errors.len(), 1);
    let message = errors[0].message();
    assert!(message.starts_with("validateXML - Document Invalid. plugins64.xml: "), "{message}");
}
