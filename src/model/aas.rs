//! Value types shared by the Asset Administration Shell entities.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageText {
    pub language: String,
    pub text: String,
}

impl LanguageText {
    pub fn new(language: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Key {
    #[serde(rename = "type")]
    pub key_type: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceType {
    ExternalReference,
    ModelReference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "type")]
    pub reference_type: ReferenceType,
    pub keys: Vec<Key>,
}

impl Reference {
    /// Model reference pointing at a submodel by id.
    pub fn submodel(id: impl Into<String>) -> Self {
        Self {
            reference_type: ReferenceType::ModelReference,
            keys: vec![Key {
                key_type: "Submodel".to_string(),
                value: id.into(),
            }],
        }
    }

    pub fn external(value: impl Into<String>) -> Self {
        Self {
            reference_type: ReferenceType::ExternalReference,
            keys: vec![Key {
                key_type: "GlobalReference".to_string(),
                value: value.into(),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetKind {
    Instance,
    Type,
    Role,
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecificAssetId {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInformation {
    pub asset_kind: AssetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_asset_id: Option<String>,
    #[serde(default)]
    pub specific_asset_ids: Vec<SpecificAssetId>,
    pub default_thumbnails: Vec<Resource>,
}

impl AssetInformation {
    pub fn create(asset_kind: AssetKind) -> Self {
        Self {
            asset_kind,
            global_asset_id: None,
            specific_asset_ids: Vec::new(),
            default_thumbnails: Vec::new(),
        }
    }

    pub fn with_global_asset_id(mut self, global_asset_id: impl Into<String>) -> Self {
        self.global_asset_id = Some(global_asset_id.into());
        self
    }

    pub fn with_default_thumbnail(mut self, thumbnail: Resource) -> Self {
        self.default_thumbnails.push(thumbnail);
        self
    }
}
