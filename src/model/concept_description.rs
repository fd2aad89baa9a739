use serde::{Deserialize, Serialize};

use crate::migration::arms::CONCEPT_DESCRIPTION_ARMS;
use crate::migration::MigrationArm;
use crate::model::{generate_id, Entity, Id, LanguageText, Reference};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptDescription {
    id: Id,
    #[serde(default)]
    id_short: Option<String>,
    #[serde(default)]
    display_name: Vec<LanguageText>,
    #[serde(default)]
    description: Vec<LanguageText>,
    /// Required since 1.1.0.
    is_case_of: Vec<Reference>,
}

impl ConceptDescription {
    pub fn create(id_short: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            id_short: Some(id_short.into()),
            display_name: Vec::new(),
            description: Vec::new(),
            is_case_of: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<Id>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_description(mut self, text: LanguageText) -> Self {
        self.description.push(text);
        self
    }

    pub fn with_case_of(mut self, reference: Reference) -> Self {
        self.is_case_of.push(reference);
        self
    }

    pub fn id_short(&self) -> Option<&str> {
        self.id_short.as_deref()
    }

    pub fn display_name(&self) -> &[LanguageText] {
        &self.display_name
    }

    pub fn description(&self) -> &[LanguageText] {
        &self.description
    }

    pub fn is_case_of(&self) -> &[Reference] {
        &self.is_case_of
    }
}

impl Entity for ConceptDescription {
    const COLLECTION: &'static str = "concept_descriptions";
    const NAME: &'static str = "ConceptDescription";
    const SCHEMA_VERSION: &'static str = "1.1.0";
    const MIGRATIONS: &'static [MigrationArm] = CONCEPT_DESCRIPTION_ARMS;

    fn id(&self) -> &str {
        &self.id
    }
}
