//! XML Schema Definition validation of the plugin manifest.
//!
//! Schemas are compiled and enforced by libxml2 through the `libxml` crate,
//! so any XSD 1.0 construct libxml2 understands is accepted. Both documents
//! are checked for well-formedness with `roxmltree` first, which gives syntax
//! errors a line and column in a stable format.
//!
//! Every diagnostic libxml2 emits for one run is folded into a single error.

use super::Document;
use crate::report::ValidationError;
use libxml::error::StructuredError;
use libxml::parser::Parser;
use libxml::schemas::{SchemaParserContext, SchemaValidationContext};

/// Errors arising from XSD validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XmlSchemaError {
    /// The schema document is not well-formed XML.
    #[error("{name}: schema cannot be parsed: {reason}")]
    SchemaSyntax {
        /// Schema display name.
        name: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// The schema is well-formed but libxml2 cannot compile it.
    #[error("{name}: schema cannot be compiled: {reason}")]
    SchemaInvalid {
        /// Schema display name.
        name: String,
        /// libxml2 diagnostics.
        reason: String,
    },

    /// The instance document is not well-formed XML.
    #[error("XML Syntax Error. {name} cannot be parsed: {reason}")]
    DocumentSyntax {
        /// Document display name.
        name: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// The instance document violates the schema.
    #[error("Document Invalid. {name}: {reason}")]
    Invalid {
        /// Document display name.
        name: String,
        /// libxml2 diagnostics.
        reason: String,
    },
}

/// Validate the XML `document` against the XSD `schema`.
///
/// Returns no errors on success and exactly one error otherwise.
///
/// # Examples
///
/// ```
/// use plugin_list_validator::schema::{Document, validate_xml};
///
/// let xsd = Document::new("list.xsd", r#"
///     <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
///       <xs:element name="plugins">
///         <xs:complexType>
///           <xs:sequence>
///             <xs:element name="download" type="xs:anyURI" maxOccurs="unbounded"/>
///           </xs:sequence>
///         </xs:complexType>
///       </xs:element>
///     </xs:schema>"#);
/// let xml = Document::new("list.xml", "<plugins><download>https://a/b.zip</download></plugins>");
/// assert!(validate_xml(xsd, xml).is_empty());
/// ```
#[must_use]
pub fn validate_xml(schema: Document<'_>, document: Document<'_>) -> Vec<ValidationError> {
    match check_xml(schema, document) {
        Ok(()) => {
            log::debug!("{} is valid against {}", document.name, schema.name);
            Vec::new()
        }
        Err(e) => vec![ValidationError::new(format!("validateXML - {e}"))],
    }
}

/// Validate and return the typed failure rather than a report record.
///
/// # Errors
///
/// Returns an [`XmlSchemaError`] when either document is malformed, the
/// schema does not compile, or the document does not conform.
pub fn check_xml(schema: Document<'_>, document: Document<'_>) -> Result<(), XmlSchemaError> {
    well_formed(schema.text).map_err(|reason| XmlSchemaError::SchemaSyntax {
        name: schema.name.to_owned(),
        reason,
    })?;
    well_formed(document.text).map_err(|reason| XmlSchemaError::DocumentSyntax {
        name: document.name.to_owned(),
        reason,
    })?;

    let mut schema_parser = SchemaParserContext::from_buffer(schema.text);
    let mut validator = SchemaValidationContext::from_parser(&mut schema_parser).map_err(
        |errors| XmlSchemaError::SchemaInvalid {
            name: schema.name.to_owned(),
            reason: describe(&errors),
        },
    )?;
    let instance = Parser::default()
        .parse_string(document.text)
        .map_err(|e| XmlSchemaError::DocumentSyntax {
            name: document.name.to_owned(),
            reason: format!("{e:?}"),
        })?;

    validator
        .validate_document(&instance)
        .map_err(|errors| XmlSchemaError::Invalid {
            name: document.name.to_owned(),
            reason: describe(&errors),
        })
}

fn well_formed(text: &str) -> Result<(), String> {
    roxmltree::Document::parse(text)
        .map(drop)
        .map_err(|e| e.to_string())
}

/// Join libxml2 diagnostics into one line, each prefixed by its source line.
fn describe(errors: &[StructuredError]) -> String {
    let messages: Vec<String> = errors
        .iter()
        .map(|error| {
            let message = error.message.as_deref().map_or("unknown error", str::trim);
            match error.line {
                Some(line) => format!("line {line}: {message}"),
                None => message.to_owned(),
            }
        })
        .collect();
    if messages.is_empty() {
        "rejected without a diagnostic".to_owned()
    } else {
        messages.join("; ")
    }
}

#[cfg(test)]
#[path = "xml_tests.rs"]
mod tests;
