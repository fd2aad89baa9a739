//! Structural validation of plain representations before they are persisted.

use serde_json::Value;
use std::sync::Arc;

use crate::error::PersistenceError;
use crate::migration::Plain;
use crate::model::DataType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: String,
    pub reason: String,
}

impl From<ValidationError> for PersistenceError {
    fn from(err: ValidationError) -> Self {
        PersistenceError::Validation {
            path: err.path,
            reason: err.reason,
        }
    }
}

/// Capability a repository either carries or does without.
///
/// Receives the plain form of an entity and returns it, possibly normalized,
/// or the first structural violation found.
pub trait Validator: Send + Sync {
    fn validate(&self, plain: Plain) -> Result<Plain, ValidationError>;
}

/// Repositories that persist whatever the entity serializes to.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoValidation;

impl Validator for NoValidation {
    fn validate(&self, plain: Plain) -> Result<Plain, ValidationError> {
        Ok(plain)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Field(String),
    Each,
}

fn parse_path(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        match part.strip_suffix("[]") {
            Some(field) => {
                segments.push(Segment::Field(field.to_string()));
                segments.push(Segment::Each);
            }
            None => segments.push(Segment::Field(part.to_string())),
        }
    }
    segments
}

/// Expected type of the value(s) at a path such as `environment.submodels`
/// or `sections[].id` (`[]` applies the rest of the path to every element).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    segments: Vec<Segment>,
    data_type: DataType,
    required: bool,
    default: Option<Value>,
}

impl FieldRule {
    pub fn required(path: &str, data_type: DataType) -> Self {
        Self {
            segments: parse_path(path),
            data_type,
            required: true,
            default: None,
        }
    }

    pub fn optional(path: &str, data_type: DataType) -> Self {
        Self {
            required: false,
            ..Self::required(path, data_type)
        }
    }

    /// Filled in when absent instead of failing.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn check(&self, value: &mut Value, segments: &[Segment], path: &str) -> Result<(), ValidationError> {
        match segments.split_first() {
            None => {
                if self.data_type.matches(value) {
                    Ok(())
                } else {
                    Err(ValidationError {
                        path: path.to_string(),
                        reason: format!(
                            "expected {:?}, found {}",
                            self.data_type,
                            DataType::describe(value)
                        ),
                    })
                }
            }
            Some((Segment::Field(name), rest)) => match value.as_object_mut() {
                Some(object) => self.check_field(object, name, rest, path),
                None => Err(ValidationError {
                    path: path.to_string(),
                    reason: format!("expected Object, found {}", DataType::describe(value)),
                }),
            },
            Some((Segment::Each, rest)) => {
                let Some(items) = value.as_array_mut() else {
                    return Err(ValidationError {
                        path: path.to_string(),
                        reason: format!("expected Array, found {}", DataType::describe(value)),
                    });
                };
                for (index, item) in items.iter_mut().enumerate() {
                    self.check(item, rest, &format!("{}[{}]", path, index))?;
                }
                Ok(())
            }
        }
    }

    fn check_field(&self, object: &mut Plain, name: &str, rest: &[Segment], path: &str) -> Result<(), ValidationError> {
        let field_path = if path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", path, name)
        };

        if let Some(child) = object.get_mut(name).filter(|child| !child.is_null()) {
            return self.check(child, rest, &field_path);
        }
        // a missing parent is reported by the parent's own rule
        if !rest.is_empty() {
            return Ok(());
        }

        match &self.default {
            Some(default) => {
                object.insert(name.to_string(), default.clone());
                Ok(())
            }
            None if self.required => Err(ValidationError {
                path: field_path,
                reason: "required field is missing".to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StructuralValidator {
    rules: Arc<Vec<FieldRule>>,
}

impl StructuralValidator {
    pub fn new(rules: Vec<FieldRule>) -> Self {
        Self {
            rules: Arc::new(rules),
        }
    }
}

impl Validator for StructuralValidator {
    fn validate(&self, mut plain: Plain) -> Result<Plain, ValidationError> {
        for rule in self.rules.iter() {
            if let Some((Segment::Field(name), rest)) = rule.segments.split_first() {
                rule.check_field(&mut plain, name, rest, "")?;
            }
        }
        Ok(plain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plain(value: Value) -> Plain {
        value.as_object().cloned().unwrap()
    }

    fn validator() -> StructuralValidator {
        StructuralValidator::new(vec![
            FieldRule::required("id", DataType::String),
            FieldRule::required("environment", DataType::Object),
            FieldRule::required("environment.submodels", DataType::StringList),
            FieldRule::optional("environment.conceptDescriptions", DataType::StringList)
                .with_default(json!([])),
            FieldRule::required("sections", DataType::Array),
            FieldRule::required("sections[].name", DataType::String),
            FieldRule::optional("templateId", DataType::String),
        ])
    }

    #[test]
    fn test_valid_plain_is_normalized() {
        let validated = validator()
            .validate(plain(json!({
                "id": "p-1",
                "environment": {"submodels": ["s1"]},
                "sections": [{"name": "General"}]
            })))
            .unwrap();
        assert_eq!(validated["environment"]["conceptDescriptions"], json!([]));
    }

    #[test]
    fn test_missing_required_field_reports_path() {
        let err = validator()
            .validate(plain(json!({"environment": {"submodels": []}, "sections": []})))
            .unwrap_err();
        assert_eq!(err.path, "id");
        assert_eq!(err.reason, "required field is missing");
    }

    #[test]
    fn test_type_mismatch_in_nested_field() {
        let err = validator()
            .validate(plain(json!({"id": "p", "environment": {"submodels": [1]}, "sections": []})))
            .unwrap_err();
        assert_eq!(err.path, "environment.submodels");
        assert!(err.reason.starts_with("expected StringList"));
    }

    #[test]
    fn test_array_element_path_has_index() {
        let err = validator()
            .validate(plain(json!({
                "id": "p",
                "environment": {"submodels": []},
                "sections": [{"name": "ok"}, {"name": 7}]
            })))
            .unwrap_err();
        assert_eq!(err.path, "sections[1].name");
    }

    #[test]
    fn test_null_optional_is_accepted() {
        assert!(validator()
            .validate(plain(json!({
                "id": "p",
                "environment": {"submodels": []},
                "sections": [],
                "templateId": null
            })))
            .is_ok());
    }

    #[test]
    fn test_validation_error_converts_to_persistence_error() {
        let err: PersistenceError = ValidationError {
            path: "sections[0].name".to_string(),
            reason: "required field is missing".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "validation failed at 'sections[0].name': required field is missing"
        );
    }
}
