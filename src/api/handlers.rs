use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::PersistenceError;
use crate::logic::EnvironmentService;
use crate::model::{Entity, Id, Passport};
use crate::pagination::{Pagination, PagingResponse, PagingResult};
use crate::store::{DocumentStore, PassportRepository, TemplateRepository};

/// Repositories and services shared by every handler.
pub struct AppState<S> {
    pub passports: PassportRepository<S>,
    pub templates: TemplateRepository<S>,
    pub environments: EnvironmentService<S>,
}

impl<S: DocumentStore + 'static> AppState<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            passports: PassportRepository::create(Arc::clone(&store)),
            templates: TemplateRepository::create(Arc::clone(&store)),
            environments: EnvironmentService::new(store),
        }
    }
}

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Status class for each persistence failure.
pub fn error_response(err: PersistenceError) -> ApiError {
    let status = match &err {
        PersistenceError::NotFound(_) => StatusCode::NOT_FOUND,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        PersistenceError::CorruptDocument { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        _ => {
            error!("Request failed: {:#}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse::new(&err.to_string())))
}

/// `?cursor=&limit=` of every listing route.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

impl PageQuery {
    fn pagination(self) -> Result<Pagination, ApiError> {
        Pagination::new(self.cursor, self.limit).map_err(error_response)
    }
}

fn page_response<T: Serialize>(page: PagingResult<T>) -> Result<Json<PagingResponse>, ApiError> {
    page.to_plain()
        .map(Json)
        .map_err(|e| error_response(PersistenceError::Serialization(e)))
}

async fn load_passport<S: DocumentStore + 'static>(
    state: &AppState<S>,
    org_id: &str,
    passport_id: &str,
) -> Result<Passport, ApiError> {
    let passport = state
        .passports
        .find_one_or_fail(passport_id)
        .await
        .map_err(error_response)?;

    // another tenant's passport is indistinguishable from a missing one
    if passport.organization_id() != org_id {
        return Err(error_response(PersistenceError::NotFound(Passport::NAME)));
    }
    Ok(passport)
}

pub async fn list_passports<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(org_id): Path<Id>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagingResponse>, ApiError> {
    let pagination = query.pagination()?;
    let page = state
        .passports
        .find_all_by_organization_id(&org_id, &pagination)
        .await
        .map_err(error_response)?;
    page_response(page)
}

pub async fn list_templates<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(org_id): Path<Id>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagingResponse>, ApiError> {
    let pagination = query.pagination()?;
    let page = state
        .templates
        .find_all_by_organization_id(&org_id, &pagination)
        .await
        .map_err(error_response)?;
    page_response(page)
}

pub async fn get_passport<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((org_id, passport_id)): Path<(Id, Id)>,
) -> Result<Json<Value>, ApiError> {
    let passport = load_passport(&state, &org_id, &passport_id).await?;
    let plain = passport.to_plain().map_err(error_response)?;
    Ok(Json(Value::Object(plain)))
}

pub async fn list_passport_shells<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((org_id, passport_id)): Path<(Id, Id)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagingResponse>, ApiError> {
    let pagination = query.pagination()?;
    let passport = load_passport(&state, &org_id, &passport_id).await?;
    let page = state
        .environments
        .shells_page(passport.environment(), &pagination)
        .await
        .map_err(error_response)?;
    page_response(page)
}

pub async fn list_passport_submodels<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((org_id, passport_id)): Path<(Id, Id)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagingResponse>, ApiError> {
    let pagination = query.pagination()?;
    let passport = load_passport(&state, &org_id, &passport_id).await?;
    let page = state
        .environments
        .submodels_page(passport.environment(), &pagination)
        .await
        .map_err(error_response)?;
    page_response(page)
}

pub async fn list_passport_concept_descriptions<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((org_id, passport_id)): Path<(Id, Id)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagingResponse>, ApiError> {
    let pagination = query.pagination()?;
    let passport = load_passport(&state, &org_id, &passport_id).await?;
    let page = state
        .environments
        .concept_descriptions_page(passport.environment(), &pagination)
        .await
        .map_err(error_response)?;
    page_response(page)
}

pub async fn list_passport_submodel_elements<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((org_id, passport_id, submodel_id)): Path<(Id, Id, Id)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagingResponse>, ApiError> {
    let pagination = query.pagination()?;
    let passport = load_passport(&state, &org_id, &passport_id).await?;
    let page = state
        .environments
        .submodel_elements_page(passport.environment(), &submodel_id, &pagination)
        .await
        .map_err(error_response)?;
    page_response(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::routes::create_router;
    use crate::model::{AssetAdministrationShell, AssetInformation, AssetKind, Environment, Submodel};
    use crate::pagination::encode_cursor;
    use crate::store::{DocumentRepository, MemoryDocumentStore, StoredDocument};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use axum::Router;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tower::ServiceExt;

    async fn app_with_passports() -> (Router, Arc<MemoryDocumentStore>) {
        let store = Arc::new(MemoryDocumentStore::new());
        let state = AppState::new(Arc::clone(&store));

        let shells: DocumentRepository<AssetAdministrationShell, _> = DocumentRepository::new(Arc::clone(&store));
        for id in ["s1", "s2", "s3"] {
            shells
                .save(&AssetAdministrationShell::create(AssetInformation::create(AssetKind::Instance)).with_id(id))
                .await
                .unwrap();
        }

        for (id, day) in [("p1", 1), ("p2", 2), ("p3", 3)] {
            let passport = Passport::create("org-1")
                .with_id(id)
                .with_created_at(Utc.with_ymd_and_hms(2022, 1, day, 0, 0, 0).unwrap())
                .with_environment(Environment::create(
                    ["s1", "s2", "s3"].map(String::from),
                    Vec::new(),
                    Vec::new(),
                ));
            state.passports.save(&passport).await.unwrap();
        }

        (create_router().with_state(Arc::new(state)), store)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app_with_passports().await;
        let (status, body) = get(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("healthy"));
    }

    #[tokio::test]
    async fn test_list_passports_newest_first() {
        let (app, _) = app_with_passports().await;
        let (status, body) = get(app, "/organizations/org-1/passports?limit=2").await;

        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = body["result"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["p3", "p2"]);
        assert_eq!(
            body["paging_metadata"]["cursor"],
            json!(encode_cursor(Utc.with_ymd_and_hms(2022, 1, 2, 0, 0, 0).unwrap(), "p2").unwrap())
        );
    }

    #[tokio::test]
    async fn test_empty_template_listing_has_null_cursor() {
        let (app, _) = app_with_passports().await;
        let (status, body) = get(app, "/organizations/org-1/templates").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"result": [], "paging_metadata": {"cursor": null}}));
    }

    #[tokio::test]
    async fn test_malformed_cursor_is_bad_request() {
        let (app, _) = app_with_passports().await;
        let (status, body) = get(app, "/organizations/org-1/passports?cursor=%25%25").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("malformed cursor"));
    }

    #[tokio::test]
    async fn test_zero_limit_is_bad_request() {
        let (app, _) = app_with_passports().await;
        let (status, _) = get(app, "/organizations/org-1/passports?limit=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_passport_of_other_organization_is_not_found() {
        let (app, _) = app_with_passports().await;
        let (status, body) = get(app.clone(), "/organizations/org-2/passports/p1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], json!("Passport not found"));

        let (status, body) = get(app, "/organizations/org-1/passports/p1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["createdAt"], json!("2022-01-01T00:00:00.000Z"));
    }

    #[tokio::test]
    async fn test_shell_pages_follow_environment_order() {
        let (app, _) = app_with_passports().await;
        let (status, body) = get(app.clone(), "/organizations/org-1/passports/p1/shells?limit=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"][0]["id"], json!("s1"));
        assert_eq!(body["paging_metadata"]["cursor"], json!("s2"));

        let (_, body) = get(app.clone(), "/organizations/org-1/passports/p1/shells?limit=2&cursor=s2").await;
        assert_eq!(body["result"].as_array().unwrap().len(), 1);
        assert_eq!(body["paging_metadata"]["cursor"], json!("s3"));

        let (status, _) = get(app, "/organizations/org-1/passports/p1/shells?cursor=nope").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_empty_submodel_and_concept_description_pages() {
        let (app, _) = app_with_passports().await;
        for uri in [
            "/organizations/org-1/passports/p2/submodels",
            "/organizations/org-1/passports/p2/concept-descriptions",
        ] {
            let (status, body) = get(app.clone(), uri).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["result"], json!([]));
        }
    }

    #[tokio::test]
    async fn test_submodel_elements_page() {
        let (app, store) = app_with_passports().await;
        let environments = EnvironmentService::new(Arc::clone(&store));
        let passports = PassportRepository::create(Arc::clone(&store));
        let passport = passports.find_one_or_fail("p1").await.unwrap();
        let (environment, _) = environments
            .add_submodel(
                passport.environment(),
                &Submodel::create("Carbon")
                    .with_id("m1")
                    .with_element(json!({"idShort": "total"}))
                    .with_element(json!({"idShort": "scope1"})),
            )
            .await
            .unwrap();
        passports.save(&passport.with_environment(environment)).await.unwrap();

        let (status, body) = get(
            app.clone(),
            "/organizations/org-1/passports/p1/submodels/m1/submodel-elements?limit=1",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], json!([{"idShort": "total"}]));
        assert_eq!(body["paging_metadata"]["cursor"], json!("total"));

        let (status, _) = get(app, "/organizations/org-1/passports/p2/submodels/m1/submodel-elements").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_corrupt_document_is_server_error() {
        let (app, store) = app_with_passports().await;
        store.insert_raw(
            "passports",
            StoredDocument {
                id: "broken".to_string(),
                schema_version: "1.1.0".to_string(),
                body: json!({"organizationId": "org-1", "environment": 42})
                    .as_object()
                    .cloned()
                    .unwrap(),
            },
        );

        let (status, body) = get(app, "/organizations/org-1/passports/broken").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("broken"));
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(error_response(PersistenceError::NotFound("Template")).0, StatusCode::NOT_FOUND);
        assert_eq!(error_response(PersistenceError::InvalidLimit).0, StatusCode::BAD_REQUEST);
        assert_eq!(
            error_response(PersistenceError::Validation {
                path: "id".to_string(),
                reason: "required field is missing".to_string(),
            })
            .0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_response(PersistenceError::MissingShell).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            error_response(PersistenceError::Store(anyhow::anyhow!("connection reset"))).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
