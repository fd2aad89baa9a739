use axum::{routing::get, Router};
use std::sync::Arc;

use crate::api::handlers::{self, AppState};
use crate::store::DocumentStore;

pub fn create_router<S: DocumentStore + 'static>() -> Router<Arc<AppState<S>>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Keyset-paged collections
        .route(
            "/organizations/:org_id/passports",
            get(handlers::list_passports::<S>),
        )
        .route(
            "/organizations/:org_id/templates",
            get(handlers::list_templates::<S>),
        )
        .route(
            "/organizations/:org_id/passports/:passport_id",
            get(handlers::get_passport::<S>),
        )
        // Environment id lists
        .route(
            "/organizations/:org_id/passports/:passport_id/shells",
            get(handlers::list_passport_shells::<S>),
        )
        .route(
            "/organizations/:org_id/passports/:passport_id/submodels",
            get(handlers::list_passport_submodels::<S>),
        )
        .route(
            "/organizations/:org_id/passports/:passport_id/submodels/:submodel_id/submodel-elements",
            get(handlers::list_passport_submodel_elements::<S>),
        )
        .route(
            "/organizations/:org_id/passports/:passport_id/concept-descriptions",
            get(handlers::list_passport_concept_descriptions::<S>),
        )
}
