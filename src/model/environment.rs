use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::model::Id;

/// Aggregate held by reference: three ordered lists of ids into the shell,
/// submodel and concept description collections.
///
/// Ids are unique within a list and keep insertion order. Stored lists are
/// deduplicated on the way in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredEnvironment")]
pub struct Environment {
    asset_administration_shells: Vec<Id>,
    submodels: Vec<Id>,
    concept_descriptions: Vec<Id>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEnvironment {
    asset_administration_shells: Vec<Id>,
    submodels: Vec<Id>,
    concept_descriptions: Vec<Id>,
}

impl From<StoredEnvironment> for Environment {
    fn from(stored: StoredEnvironment) -> Self {
        Self::create(
            stored.asset_administration_shells,
            stored.submodels,
            stored.concept_descriptions,
        )
    }
}

impl Environment {
    pub fn create(
        asset_administration_shells: impl IntoIterator<Item = Id>,
        submodels: impl IntoIterator<Item = Id>,
        concept_descriptions: impl IntoIterator<Item = Id>,
    ) -> Self {
        Self {
            asset_administration_shells: asset_administration_shells.into_iter().unique().collect(),
            submodels: submodels.into_iter().unique().collect(),
            concept_descriptions: concept_descriptions.into_iter().unique().collect(),
        }
    }

    pub fn asset_administration_shells(&self) -> &[Id] {
        &self.asset_administration_shells
    }

    pub fn submodels(&self) -> &[Id] {
        &self.submodels
    }

    pub fn concept_descriptions(&self) -> &[Id] {
        &self.concept_descriptions
    }

    pub fn add_shell(&self, id: impl Into<Id>) -> Self {
        let mut next = self.clone();
        push_unique(&mut next.asset_administration_shells, id.into());
        next
    }

    pub fn add_submodel(&self, id: impl Into<Id>) -> Self {
        let mut next = self.clone();
        push_unique(&mut next.submodels, id.into());
        next
    }

    pub fn add_concept_description(&self, id: impl Into<Id>) -> Self {
        let mut next = self.clone();
        push_unique(&mut next.concept_descriptions, id.into());
        next
    }

    pub fn remove_submodel(&self, id: &str) -> Self {
        let mut next = self.clone();
        next.submodels.retain(|existing| existing != id);
        next
    }

    /// Every referenced id, shells first.
    pub fn all_ids(&self) -> impl Iterator<Item = &Id> {
        self.asset_administration_shells
            .iter()
            .chain(self.submodels.iter())
            .chain(self.concept_descriptions.iter())
    }
}

fn push_unique(ids: &mut Vec<Id>, id: Id) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}
