use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::migration::arms::TEMPLATE_ARMS;
use crate::migration::MigrationArm;
use crate::model::{generate_id, iso_millis, now_millis, truncate_to_millis, DataType, Entity, Environment, Id, TenantScoped};
use crate::validation::{FieldRule, StructuralValidator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionType {
    Group,
    Repeatable,
}

/// Whether repeatable rows are filled once per model or per item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GranularityLevel {
    Model,
    Item,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: Id,
    pub name: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity_level: Option<GranularityLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Id>,
    #[serde(default)]
    pub sub_sections: Vec<Id>,
}

impl Section {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            section_type: SectionType::Group,
            granularity_level: None,
            parent_id: None,
            sub_sections: Vec::new(),
        }
    }

    pub fn repeatable(name: impl Into<String>, granularity_level: GranularityLevel) -> Self {
        Self {
            section_type: SectionType::Repeatable,
            granularity_level: Some(granularity_level),
            ..Self::group(name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    id: Id,
    name: String,
    #[serde(default)]
    description: String,
    organization_id: Id,
    #[serde(default)]
    created_by_user_id: Option<Id>,
    sections: Vec<Section>,
    environment: Environment,
    #[serde(with = "iso_millis")]
    created_at: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    updated_at: DateTime<Utc>,
}

impl Template {
    pub fn create(name: impl Into<String>, organization_id: impl Into<Id>, user_id: impl Into<Id>) -> Self {
        let now = now_millis();
        Self {
            id: generate_id(),
            name: name.into(),
            description: String::new(),
            organization_id: organization_id.into(),
            created_by_user_id: Some(user_id.into()),
            sections: Vec::new(),
            environment: Environment::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<Id>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = truncate_to_millis(created_at);
        self.updated_at = self.updated_at.max(self.created_at);
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self.updated_at = now_millis().max(self.created_at);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    pub fn created_by_user_id(&self) -> Option<&str> {
        self.created_by_user_id.as_deref()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn validator() -> StructuralValidator {
        StructuralValidator::new(vec![
            FieldRule::required("id", DataType::String),
            FieldRule::required("name", DataType::String),
            FieldRule::optional("description", DataType::String).with_default(json!("")),
            FieldRule::required("organizationId", DataType::String),
            FieldRule::optional("createdByUserId", DataType::String),
            FieldRule::required("sections", DataType::Array),
            FieldRule::required("sections[].id", DataType::String),
            FieldRule::required("sections[].name", DataType::String),
            FieldRule::required("sections[].type", DataType::String),
            FieldRule::optional("sections[].subSections", DataType::StringList),
            FieldRule::required("environment", DataType::Object),
            FieldRule::required("environment.assetAdministrationShells", DataType::StringList),
            FieldRule::required("environment.submodels", DataType::StringList),
            FieldRule::required("environment.conceptDescriptions", DataType::StringList),
            FieldRule::required("createdAt", DataType::Timestamp),
            FieldRule::required("updatedAt", DataType::Timestamp),
        ])
    }
}

impl Entity for Template {
    const COLLECTION: &'static str = "templates";
    const NAME: &'static str = "Template";
    const SCHEMA_VERSION: &'static str = "1.1.0";
    const MIGRATIONS: &'static [MigrationArm] = TEMPLATE_ARMS;

    fn id(&self) -> &str {
        &self.id
    }
}

impl TenantScoped for Template {
    fn owner(&self) -> &str {
        &self.organization_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Validator;

    #[test]
    fn test_sections_serialize_with_type_tag() {
        let template = Template::create("Laptop", "org-1", "user-1")
            .with_section(Section::group("General"))
            .with_section(Section::repeatable("Materials", GranularityLevel::Item));

        let plain = template.to_plain().unwrap();
        assert_eq!(plain["sections"][0]["type"], json!("Group"));
        assert!(plain["sections"][0].get("granularityLevel").is_none());
        assert_eq!(plain["sections"][1]["type"], json!("Repeatable"));
        assert_eq!(plain["sections"][1]["granularityLevel"], json!("Item"));
        assert!(Template::validator().validate(plain.clone()).is_ok());
        assert_eq!(Template::from_plain(plain).unwrap(), template);
    }

    #[test]
    fn test_validator_rejects_nameless_section() {
        let mut plain = Template::create("Laptop", "org-1", "user-1")
            .with_section(Section::group("General"))
            .to_plain()
            .unwrap();
        plain["sections"][0]
            .as_object_mut()
            .unwrap()
            .remove("name");

        let err = Template::validator().validate(plain).unwrap_err();
        assert_eq!(err.path, "sections[0].name");
    }
}
