use anyhow::Context;
use itertools::Itertools;
use log::{debug, error, warn};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::error::{PersistenceError, Result};
use crate::model::{Entity, Id, Passport, TenantScoped, Template};
use crate::pagination::{keyset_continuation, keyset_query, Pagination, PagingResult};
use crate::store::traits::{DocumentStore, QueryFilter, StoredDocument};
use crate::validation::{NoValidation, StructuralValidator, Validator};

/// Versioned persistence for one entity type over any [`DocumentStore`].
///
/// Writes stamp `E::SCHEMA_VERSION`; reads run the stored document through
/// the entity's migration arms before rebuilding the domain value.
pub struct DocumentRepository<E, S, V = NoValidation> {
    store: Arc<S>,
    validator: V,
    _entity: PhantomData<fn() -> E>,
}

pub type PassportRepository<S> = DocumentRepository<Passport, S, StructuralValidator>;
pub type TemplateRepository<S> = DocumentRepository<Template, S, StructuralValidator>;

impl<E, S, V: Clone> Clone for DocumentRepository<E, S, V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            validator: self.validator.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity, S: DocumentStore> DocumentRepository<E, S, NoValidation> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_validator(store, NoValidation)
    }
}

impl<E: Entity, S: DocumentStore, V: Validator> DocumentRepository<E, S, V> {
    pub fn with_validator(store: Arc<S>, validator: V) -> Self {
        Self {
            store,
            validator,
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Upsert `entity` and return it as read back from the store.
    ///
    /// Every field of the current shape overwrites the stored one, cleared
    /// optionals included (they are written as `null`). Keys the current shape
    /// no longer has are left in place.
    pub async fn save(&self, entity: &E) -> Result<E> {
        let id = entity.id();
        let existing = self
            .store
            .find_by_id(E::COLLECTION, id)
            .await
            .with_context(|| format!("Failed to load {} {} before save", E::NAME, id))?;

        let plain = self.validator.validate(entity.to_plain()?)?;

        let mut document = existing.unwrap_or_else(|| StoredDocument::new(id, E::SCHEMA_VERSION));
        document.body.extend(plain);
        document.schema_version = E::SCHEMA_VERSION.to_string();

        self.store
            .upsert_by_id(E::COLLECTION, document)
            .await
            .with_context(|| format!("Failed to save {} {}", E::NAME, id))?;

        self.find_one_or_fail(id).await
    }

    pub async fn find_one(&self, id: &str) -> Result<Option<E>> {
        let document = self
            .store
            .find_by_id(E::COLLECTION, id)
            .await
            .with_context(|| format!("Failed to load {} {}", E::NAME, id))?;

        let Some(document) = document else {
            return Ok(None);
        };
        self.to_domain(document).map(Some)
    }

    pub async fn find_one_or_fail(&self, id: &str) -> Result<E> {
        self.find_one(id)
            .await?
            .ok_or(PersistenceError::NotFound(E::NAME))
    }

    /// Entities for `ids` keyed by id. Ids without a document are left out.
    pub async fn find_by_ids(&self, ids: &[Id]) -> Result<HashMap<Id, E>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let filter = QueryFilter::new().ids(ids.iter().unique().cloned().collect());
        let documents = self
            .store
            .query(E::COLLECTION, &filter, &[], None)
            .await
            .with_context(|| format!("Failed to load {} documents by id", E::NAME))?;

        let mut found = HashMap::with_capacity(documents.len());
        for document in documents {
            let entity = self.to_domain(document)?;
            found.insert(entity.id().to_string(), entity);
        }

        let missing = ids
            .iter()
            .filter(|id| !found.contains_key(id.as_str()))
            .unique()
            .collect_vec();
        if !missing.is_empty() {
            warn!(
                "Omitting {} missing {} id(s): {}",
                missing.len(),
                E::NAME,
                missing.iter().join(", ")
            );
        }

        Ok(found)
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let deleted = self
            .store
            .delete_by_id(E::COLLECTION, id)
            .await
            .with_context(|| format!("Failed to delete {} {}", E::NAME, id))?;
        Ok(deleted)
    }

    fn to_domain(&self, document: StoredDocument) -> Result<E> {
        let plain = E::migration_resolver().resolve(&document);
        E::from_plain(plain).map_err(|e| {
            error!(
                "Corrupt {} document {} with schema version {}: {}",
                E::NAME,
                document.id,
                document.schema_version,
                e
            );
            PersistenceError::CorruptDocument {
                id: document.id.clone(),
                tag: document.schema_version.clone(),
                reason: e.to_string(),
            }
        })
    }
}

impl<E, S, V> DocumentRepository<E, S, V>
where
    E: Entity,
    S: DocumentStore + 'static,
    V: Validator + Clone + 'static,
{
    /// Load every id concurrently, keeping the order of `ids`.
    ///
    /// The first failure is returned and the outstanding reads are aborted.
    pub async fn find_all_or_fail(&self, ids: &[Id]) -> Result<Vec<E>> {
        let mut tasks = JoinSet::new();
        for (index, id) in ids.iter().enumerate() {
            let repository = self.clone();
            let id = id.clone();
            tasks.spawn(async move { (index, repository.find_one_or_fail(&id).await) });
        }

        let mut slots: Vec<Option<E>> = std::iter::repeat_with(|| None).take(ids.len()).collect();
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined.with_context(|| format!("{} read task failed", E::NAME))?;
            slots[index] = Some(result?);
        }

        Ok(slots.into_iter().flatten().collect())
    }

    /// Save every entity concurrently and return them as read back, in order.
    pub async fn save_all(&self, entities: Vec<E>) -> Result<Vec<E>> {
        let count = entities.len();
        let mut tasks = JoinSet::new();
        for (index, entity) in entities.into_iter().enumerate() {
            let repository = self.clone();
            tasks.spawn(async move { (index, repository.save(&entity).await) });
        }

        let mut slots: Vec<Option<E>> = std::iter::repeat_with(|| None).take(count).collect();
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined.with_context(|| format!("{} save task failed", E::NAME))?;
            slots[index] = Some(result?);
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

impl<E: TenantScoped, S: DocumentStore, V: Validator> DocumentRepository<E, S, V> {
    /// One keyset page of the owner's documents, newest first.
    pub async fn find_all_by_owner(&self, owner: &str, pagination: &Pagination) -> Result<PagingResult<E>> {
        let query = keyset_query(E::OWNER_FIELD, owner, pagination)?;
        let documents = self
            .store
            .query(E::COLLECTION, &query.filter, &query.sort, Some(query.limit))
            .await
            .with_context(|| format!("Failed to list {} documents of {}", E::NAME, owner))?;

        let items = documents
            .into_iter()
            .map(|document| self.to_domain(document))
            .collect::<Result<Vec<_>>>()?;
        debug!("Listed {} {} document(s) for {}", items.len(), E::NAME, owner);

        let next = keyset_continuation(pagination, items.last().map(|item| (item.created_at(), item.id())))?;
        Ok(PagingResult::create(next, items))
    }
}

impl<S: DocumentStore> PassportRepository<S> {
    /// Repository carrying the passport field rules.
    pub fn create(store: Arc<S>) -> Self {
        Self::with_validator(store, Passport::validator())
    }

    pub async fn find_all_by_organization_id(
        &self,
        organization_id: &str,
        pagination: &Pagination,
    ) -> Result<PagingResult<Passport>> {
        self.find_all_by_owner(organization_id, pagination).await
    }
}

impl<S: DocumentStore> TemplateRepository<S> {
    pub fn create(store: Arc<S>) -> Self {
        Self::with_validator(store, Template::validator())
    }

    pub async fn find_all_by_organization_id(
        &self,
        organization_id: &str,
        pagination: &Pagination,
    ) -> Result<PagingResult<Template>> {
        self.find_all_by_owner(organization_id, pagination).await
    }
}
