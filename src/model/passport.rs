use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::migration::arms::PASSPORT_ARMS;
use crate::migration::MigrationArm;
use crate::model::{generate_id, iso_millis, now_millis, truncate_to_millis, DataType, Entity, Environment, Id, TenantScoped};
use crate::validation::{FieldRule, StructuralValidator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passport {
    id: Id,
    organization_id: Id,
    #[serde(default)]
    created_by_user_id: Option<Id>,
    #[serde(default)]
    template_id: Option<Id>,
    environment: Environment,
    #[serde(with = "iso_millis")]
    created_at: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    updated_at: DateTime<Utc>,
}

impl Passport {
    pub fn create(organization_id: impl Into<Id>) -> Self {
        let now = now_millis();
        Self {
            id: generate_id(),
            organization_id: organization_id.into(),
            created_by_user_id: None,
            template_id: None,
            environment: Environment::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<Id>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_created_by(mut self, user_id: impl Into<Id>) -> Self {
        self.created_by_user_id = Some(user_id.into());
        self
    }

    pub fn with_template(mut self, template_id: impl Into<Id>) -> Self {
        self.template_id = Some(template_id.into());
        self
    }

    /// Backdates creation; used when importing and in fixtures.
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

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    pub fn created_by_user_id(&self) -> Option<&str> {
        self.created_by_user_id.as_deref()
    }

    pub fn template_id(&self) -> Option<&str> {
        self.template_id.as_deref()
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
            FieldRule::required("organizationId", DataType::String),
            FieldRule::optional("createdByUserId", DataType::String),
            FieldRule::optional("templateId", DataType::String),
            FieldRule::required("environment", DataType::Object),
            FieldRule::required("environment.assetAdministrationShells", DataType::StringList),
            FieldRule::required("environment.submodels", DataType::StringList),
            FieldRule::optional("environment.conceptDescriptions", DataType::StringList).with_default(json!([])),
            FieldRule::required("createdAt", DataType::Timestamp),
            FieldRule::required("updatedAt", DataType::Timestamp),
        ])
    }
}

impl Entity for Passport {
    const COLLECTION: &'static str = "passports";
    const NAME: &'static str = "Passport";
    const SCHEMA_VERSION: &'static str = "1.1.0";
    const MIGRATIONS: &'static [MigrationArm] = PASSPORT_ARMS;

    fn id(&self) -> &str {
        &self.id
    }
}

impl TenantScoped for Passport {
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
    use chrono::TimeZone;

    #[test]
    fn test_created_at_is_truncated_to_millis() {
        let precise = Utc.timestamp_nanos(1_646_179_200_123_456_789);
        let passport = Passport::create("org-1").with_created_at(precise);
        assert_eq!(passport.created_at().timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn test_plain_shape() {
        let created_at = Utc.with_ymd_and_hms(2022, 3, 2, 0, 0, 0).unwrap();
        let passport = Passport::create("org-1")
            .with_id("p-1")
            .with_template("t-1")
            .with_created_at(created_at);

        let plain = passport.to_plain().unwrap();
        assert_eq!(plain["createdAt"], json!("2022-03-02T00:00:00.000Z"));
        assert_eq!(plain["organizationId"], json!("org-1"));
        assert_eq!(plain["createdByUserId"], json!(null));
        assert!(Passport::validator().validate(plain.clone()).is_ok());
        assert_eq!(Passport::from_plain(plain).unwrap(), passport);
    }

    #[test]
    fn test_environment_change_produces_new_passport() {
        let passport = Passport::create("org-1");
        let changed = passport
            .clone()
            .with_environment(passport.environment().add_shell("s1"));
        assert!(passport.environment().asset_administration_shells().is_empty());
        assert_eq!(changed.environment().asset_administration_shells(), ["s1".to_string()]);
        assert_eq!(changed.id(), passport.id());
    }
}
