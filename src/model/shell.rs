use serde::{Deserialize, Serialize};

use crate::migration::arms::SHELL_ARMS;
use crate::migration::MigrationArm;
use crate::model::{generate_id, AssetInformation, Entity, Extension, Id, LanguageText, Reference, Submodel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetAdministrationShell {
    id: Id,
    #[serde(default)]
    id_short: Option<String>,
    asset_information: AssetInformation,
    display_name: Vec<LanguageText>,
    description: Vec<LanguageText>,
    extensions: Vec<Extension>,
    submodels: Vec<Reference>,
    #[serde(default)]
    derived_from: Option<Reference>,
}

impl AssetAdministrationShell {
    pub fn create(asset_information: AssetInformation) -> Self {
        Self {
            id: generate_id(),
            id_short: None,
            asset_information,
            display_name: Vec::new(),
            description: Vec::new(),
            extensions: Vec::new(),
            submodels: Vec::new(),
            derived_from: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<Id>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_id_short(mut self, id_short: impl Into<String>) -> Self {
        self.id_short = Some(id_short.into());
        self
    }

    pub fn with_display_name(mut self, text: LanguageText) -> Self {
        self.display_name.push(text);
        self
    }

    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Adds a model reference to the submodel unless one is already present.
    pub fn with_submodel(mut self, submodel_id: impl Into<Id>) -> Self {
        let reference = Reference::submodel(submodel_id);
        if !self.submodels.contains(&reference) {
            self.submodels.push(reference);
        }
        self
    }

    pub fn without_submodel(mut self, submodel_id: &str) -> Self {
        self.submodels
            .retain(|reference| !reference.keys.iter().any(|key| key.value == submodel_id));
        self
    }

    /// Same shell under a fresh id, referencing `submodels` instead of the
    /// original ones.
    pub fn copy(&self, submodels: &[Submodel]) -> Self {
        Self {
            id: generate_id(),
            submodels: submodels.iter().map(|submodel| Reference::submodel(submodel.id())).collect(),
            ..self.clone()
        }
    }

    pub fn id_short(&self) -> Option<&str> {
        self.id_short.as_deref()
    }

    pub fn asset_information(&self) -> &AssetInformation {
        &self.asset_information
    }

    pub fn display_name(&self) -> &[LanguageText] {
        &self.display_name
    }

    pub fn description(&self) -> &[LanguageText] {
        &self.description
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    pub fn submodels(&self) -> &[Reference] {
        &self.submodels
    }

    pub fn derived_from(&self) -> Option<&Reference> {
        self.derived_from.as_ref()
    }
}

impl Entity for AssetAdministrationShell {
    const COLLECTION: &'static str = "asset_administration_shells";
    const NAME: &'static str = "AssetAdministrationShell";
    const SCHEMA_VERSION: &'static str = "1.1.0";
    const MIGRATIONS: &'static [MigrationArm] = SHELL_ARMS;

    fn id(&self) -> &str {
        &self.id
    }
}
