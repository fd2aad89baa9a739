use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{generate_id, Entity, Id, LanguageText, Reference};

/// Submodel with its element tree kept as opaque JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submodel {
    id: Id,
    #[serde(default)]
    id_short: Option<String>,
    #[serde(default)]
    semantic_id: Option<Reference>,
    #[serde(default)]
    display_name: Vec<LanguageText>,
    #[serde(default)]
    description: Vec<LanguageText>,
    #[serde(default)]
    submodel_elements: Vec<Value>,
}

impl Submodel {
    pub fn create(id_short: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            id_short: Some(id_short.into()),
            semantic_id: None,
            display_name: Vec::new(),
            description: Vec::new(),
            submodel_elements: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<Id>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_semantic_id(mut self, semantic_id: Reference) -> Self {
        self.semantic_id = Some(semantic_id);
        self
    }

    pub fn with_element(mut self, element: Value) -> Self {
        self.submodel_elements.push(element);
        self
    }

    /// Same submodel under a fresh id.
    pub fn copy(&self) -> Self {
        Self {
            id: generate_id(),
            ..self.clone()
        }
    }

    pub fn id_short(&self) -> Option<&str> {
        self.id_short.as_deref()
    }

    pub fn semantic_id(&self) -> Option<&Reference> {
        self.semantic_id.as_ref()
    }

    pub fn display_name(&self) -> &[LanguageText] {
        &self.display_name
    }

    pub fn description(&self) -> &[LanguageText] {
        &self.description
    }

    pub fn submodel_elements(&self) -> &[Value] {
        &self.submodel_elements
    }

    /// Distinct `idShort`s of the top-level elements, in element order.
    pub fn element_id_shorts(&self) -> Vec<Id> {
        self.submodel_elements
            .iter()
            .filter_map(|element| element.get("idShort").and_then(Value::as_str))
            .unique()
            .map(str::to_string)
            .collect()
    }
}

impl Entity for Submodel {
    const COLLECTION: &'static str = "submodels";
    const NAME: &'static str = "Submodel";
    const SCHEMA_VERSION: &'static str = "1.0.0";

    fn id(&self) -> &str {
        &self.id
    }
}
