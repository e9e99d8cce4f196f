//! Draft-4 JSON Schema validation of the plugin descriptor.

use super::Document;
use crate::report::ValidationError;
use serde_json::Value;

/// Validate `instance` against the Draft-4 `schema`, with format checks.
///
/// Returns one error per violation. A schema or instance that cannot be
/// parsed yields a single error naming that document and nothing else.
///
/// # Examples
///
/// ```
/// use plugin_list_validator::schema::{Document, validate_json};
///
/// let schema = Document::new("pl.schema", r#"{"type": "object", "required": ["name"]}"#);
/// let instance = Document::new("validate.json", r#"{"name": "list"}"#);
/// assert!(validate_json(schema, instance).is_empty());
/// ```
#[must_use]
pub fn validate_json(schema: Document<'_>, instance: Document<'_>) -> Vec<ValidationError> {
    let schema_value = match parse(schema) {
        Ok(value) => value,
        Err(err) => return vec![err],
    };
    let validator = match jsonschema::draft4::options()
        .should_validate_formats(true)
        .build(&schema_value)
    {
        Ok(validator) => validator,
        Err(e) => {
            return vec![ValidationError::new(format!(
                "{} - invalid schema: {e}",
                schema.name
            ))];
        }
    };
    let instance_value = match parse(instance) {
        Ok(value) => value,
        Err(err) => return vec![err],
    };

    let errors: Vec<_> = validator
        .iter_errors(&instance_value)
        .map(|violation| {
            let pointer = violation.instance_path.to_string();
            if pointer.is_empty() {
                ValidationError::new(violation.to_string())
            } else {
                ValidationError::new(format!("{pointer} - {violation}"))
            }
        })
        .collect();
    log::debug!(
        "{} checked against {}: {} violation(s)",
        instance.name,
        schema.name,
        errors.len()
    );
    errors
}

fn parse(document: Document<'_>) -> Result<Value, ValidationError> {
    serde_json::from_str(document.text)
        .map_err(|e| ValidationError::new(format!("{} - {e}", document.name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"{
        "$schema": "http://json-schema.org/draft-04/schema#",
        "type": "object",
        "required": ["name"],
        "properties": {
            "name": {"type": "string"},
            "version": {"type": "string"},
            "contact": {"type": "string", "format": "email"}
        }
    }"#;

    fn check(instance: &str) -> Vec<ValidationError> {
        validate_json(
            Document::new("pl.schema", SCHEMA),
            Document::new("validate.json", instance),
        )
    }

    #[test]
    fn valid_instance_has_no_errors() {
        let errors = check(r#"{"name": "list", "version": "1.0", "contact": "dev@example.com"}"#);
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn reports_every_violation_not_just_the_first() {
        let errors = check(r#"{"version": 2, "contact": "not-an-email"}"#);
        assert_eq!(errors.len(), 3, "{errors:?}");
    }

    #[test]
    fn violation_messages_carry_the_failing_location() {
        let errors = check(r#"{"name": "list", "version": 2}"#);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message().starts_with("/version - "), "{errors:?}");
    }

    #[test]
    fn malformed_instance_is_a_single_error_naming_the_file() {
        let errors = check("{\"name\": ");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message().starts_with("validate.json - "));
    }

    #[test]
    fn malformed_schema_is_a_single_error_naming_the_schema() {
        let errors = validate_json(
            Document::new("pl.schema", "{not json"),
            Document::new("validate.json", "also not json"),
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message().starts_with("pl.schema - "));
    }

    #[test]
    fn schema_that_is_not_a_draft4_schema_is_reported() {
        let errors = validate_json(
            Document::new("pl.schema", r#"{"type": 12}"#),
            Document::new("validate.json", "{}"),
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message().contains("invalid schema"));
    }
}
