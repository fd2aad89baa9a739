use itertools::Itertools;
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{PersistenceError, Result};
use crate::model::{
    AssetAdministrationShell, AssetInformation, AssetKind, ConceptDescription, Entity, Environment, Id, Submodel,
};
use crate::pagination::{Pagination, PagingResult};
use crate::store::{DocumentRepository, DocumentStore};

/// Ids an environment references whose documents no longer exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingReferences {
    pub asset_administration_shells: Vec<Id>,
    pub submodels: Vec<Id>,
    pub concept_descriptions: Vec<Id>,
}

impl DanglingReferences {
    pub fn is_empty(&self) -> bool {
        self.asset_administration_shells.is_empty()
            && self.submodels.is_empty()
            && self.concept_descriptions.is_empty()
    }
}

/// Reads and edits the documents an [`Environment`] points at.
pub struct EnvironmentService<S> {
    shells: DocumentRepository<AssetAdministrationShell, S>,
    submodels: DocumentRepository<Submodel, S>,
    concept_descriptions: DocumentRepository<ConceptDescription, S>,
}

impl<S> Clone for EnvironmentService<S> {
    fn clone(&self) -> Self {
        Self {
            shells: self.shells.clone(),
            submodels: self.submodels.clone(),
            concept_descriptions: self.concept_descriptions.clone(),
        }
    }
}

impl<S: DocumentStore + 'static> EnvironmentService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            shells: DocumentRepository::new(Arc::clone(&store)),
            submodels: DocumentRepository::new(Arc::clone(&store)),
            concept_descriptions: DocumentRepository::new(store),
        }
    }

    pub async fn shells_page(
        &self,
        environment: &Environment,
        pagination: &Pagination,
    ) -> Result<PagingResult<AssetAdministrationShell>> {
        let page = pagination.next_page(environment.asset_administration_shells())?;
        let items = self.shells.find_all_or_fail(page.ids).await?;
        debug!("Loaded {} shell(s) for page", items.len());
        Ok(PagingResult::create(page.next, items))
    }

    pub async fn submodels_page(&self, environment: &Environment, pagination: &Pagination) -> Result<PagingResult<Submodel>> {
        let page = pagination.next_page(environment.submodels())?;
        let items = self.submodels.find_all_or_fail(page.ids).await?;
        debug!("Loaded {} submodel(s) for page", items.len());
        Ok(PagingResult::create(page.next, items))
    }

    pub async fn concept_descriptions_page(
        &self,
        environment: &Environment,
        pagination: &Pagination,
    ) -> Result<PagingResult<ConceptDescription>> {
        let page = pagination.next_page(environment.concept_descriptions())?;
        let items = self.concept_descriptions.find_all_or_fail(page.ids).await?;
        debug!("Loaded {} concept description(s) for page", items.len());
        Ok(PagingResult::create(page.next, items))
    }

    /// Report referenced ids whose documents are missing, in list order.
    pub async fn dangling_references(&self, environment: &Environment) -> Result<DanglingReferences> {
        let shells = self.shells.find_by_ids(environment.asset_administration_shells()).await?;
        let submodels = self.submodels.find_by_ids(environment.submodels()).await?;
        let concept_descriptions = self
            .concept_descriptions
            .find_by_ids(environment.concept_descriptions())
            .await?;

        Ok(DanglingReferences {
            asset_administration_shells: absent(environment.asset_administration_shells(), |id| shells.contains_key(id)),
            submodels: absent(environment.submodels(), |id| submodels.contains_key(id)),
            concept_descriptions: absent(environment.concept_descriptions(), |id| {
                concept_descriptions.contains_key(id)
            }),
        })
    }

    /// Save a new shell of `asset_kind` and return an environment holding only it.
    pub async fn create_environment_with_empty_shell(&self, asset_kind: AssetKind) -> Result<Environment> {
        let shell = self
            .shells
            .save(&AssetAdministrationShell::create(AssetInformation::create(asset_kind)))
            .await?;
        Ok(Environment::default().add_shell(shell.id()))
    }

    /// A submodel of this environment; ids from elsewhere are not found.
    pub async fn submodel_by_id(&self, environment: &Environment, submodel_id: &str) -> Result<Submodel> {
        if !environment.submodels().iter().any(|id| id == submodel_id) {
            return Err(PersistenceError::NotFound(Submodel::NAME));
        }
        self.submodels.find_one_or_fail(submodel_id).await
    }

    /// Page through a submodel's top-level elements by `idShort`.
    pub async fn submodel_elements_page(
        &self,
        environment: &Environment,
        submodel_id: &str,
        pagination: &Pagination,
    ) -> Result<PagingResult<Value>> {
        let submodel = self.submodel_by_id(environment, submodel_id).await?;
        let id_shorts = submodel.element_id_shorts();
        let page = pagination.next_page(&id_shorts)?;

        let items = submodel
            .submodel_elements()
            .iter()
            .filter(|element| {
                element
                    .get("idShort")
                    .and_then(Value::as_str)
                    .map(|id_short| page.ids.iter().any(|id| id == id_short))
                    .unwrap_or(false)
            })
            .cloned()
            .collect_vec();
        debug!("Loaded {} element(s) of submodel {}", items.len(), submodel_id);
        Ok(PagingResult::create(page.next, items))
    }

    /// Persist `submodel`, reference it from the first shell and return the
    /// environment that includes it. Nothing is written when the environment
    /// has no shell.
    pub async fn add_submodel(&self, environment: &Environment, submodel: &Submodel) -> Result<(Environment, Submodel)> {
        let shell = self.first_shell(environment).await?;
        let saved = self.submodels.save(submodel).await?;
        self.shells.save(&shell.with_submodel(saved.id())).await?;
        Ok((environment.add_submodel(saved.id()), saved))
    }

    /// Delete the submodel document and return the environment without it.
    pub async fn delete_submodel(&self, environment: &Environment, submodel_id: &str) -> Result<Environment> {
        let submodel = self.submodel_by_id(environment, submodel_id).await?;
        let shell = self.first_shell(environment).await?;
        self.submodels.delete_by_id(submodel.id()).await?;
        self.shells.save(&shell.without_submodel(submodel.id())).await?;
        Ok(environment.remove_submodel(submodel.id()))
    }

    /// Copy the first shell and every submodel under fresh ids.
    ///
    /// Concept descriptions are shared, not copied. Returns the environment
    /// referencing the copies.
    pub async fn copy_environment(&self, environment: &Environment) -> Result<Environment> {
        let submodels = self.submodels.find_all_or_fail(environment.submodels()).await?;
        let shell = self.first_shell(environment).await?;

        let submodel_copies = submodels.iter().map(Submodel::copy).collect_vec();
        let shell_copy = self.shells.save(&shell.copy(&submodel_copies)).await?;
        let submodel_copies = self.submodels.save_all(submodel_copies).await?;
        info!(
            "Copied shell {} with {} submodel(s) to {}",
            shell.id(),
            submodel_copies.len(),
            shell_copy.id()
        );

        Ok(Environment::create(
            vec![shell_copy.id().to_string()],
            submodel_copies.iter().map(|submodel| submodel.id().to_string()),
            environment.concept_descriptions().iter().cloned(),
        ))
    }

    async fn first_shell(&self, environment: &Environment) -> Result<AssetAdministrationShell> {
        match environment.asset_administration_shells().first() {
            Some(id) => self.shells.find_one_or_fail(id).await,
            None => Err(PersistenceError::MissingShell),
        }
    }
}

fn absent(ids: &[Id], found: impl Fn(&str) -> bool) -> Vec<Id> {
    let mut missing: Vec<Id> = Vec::new();
    for id in ids {
        if !found(id.as_str()) && !missing.contains(id) {
            missing.push(id.clone());
        }
    }
    missing
}
