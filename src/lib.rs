pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod migration;
pub mod model;
pub mod pagination;
pub mod store;
pub mod validation;

// Export API types
pub use api::handlers;
pub use api::routes;

pub use error::{PersistenceError, Result};
pub use logic::{DanglingReferences, EnvironmentService};
pub use pagination::{Pagination, PagingResult};

// Export store types
pub use store::{
    DocumentRepository, DocumentStore, MemoryDocumentStore, PassportRepository, PostgresDocumentStore,
    TemplateRepository,
};

use std::sync::Arc;

use crate::api::handlers::AppState;
use crate::config::{AppConfig, StorageBackend};

/// Router serving the listing API over `store`.
pub fn app<S: DocumentStore + 'static>(store: Arc<S>) -> axum::Router {
    api::routes::create_router().with_state(Arc::new(AppState::new(store)))
}

/// Open the configured store and serve until the listener closes.
pub async fn run_server(config: &AppConfig) -> anyhow::Result<()> {
    use axum::serve;
    use tokio::net::TcpListener;

    let router = match config.storage.backend {
        StorageBackend::Postgres => {
            log::info!("Connecting to PostgreSQL...");
            let database_url = config.database_url()?;
            let postgres_store = PostgresDocumentStore::new(&database_url, config.max_connections()).await?;

            log::info!("Running database migrations...");
            postgres_store.migrate().await?;

            app(Arc::new(postgres_store))
        }
        StorageBackend::Memory => {
            log::warn!("Using in-memory storage; documents are lost on exit");
            app(Arc::new(MemoryDocumentStore::new()))
        }
    };

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("dpp-store listening on http://{}", bind_address);

    serve(listener, router).await?;

    Ok(())
}
