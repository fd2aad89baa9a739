use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder, Row};

use crate::store::traits::{DocumentStore, QueryFilter, SortDirection, SortField, SortKey, StoredDocument};

/// Document store backed by a single JSONB `documents` table keyed by
/// `(collection, id)`.
#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn row_to_document(row: &sqlx::postgres::PgRow) -> Result<StoredDocument> {
    let body: Value = row.try_get("body").context("Failed to read document body")?;
    let Value::Object(body) = body else {
        anyhow::bail!("Document body is not a JSON object");
    };

    Ok(StoredDocument {
        id: row.try_get("id").context("Failed to read document id")?,
        schema_version: row
            .try_get("schema_version")
            .context("Failed to read document schema version")?,
        body,
    })
}

fn push_sort(builder: &mut QueryBuilder<'_, Postgres>, sort: &[SortKey]) {
    if sort.is_empty() {
        return;
    }
    builder.push(" ORDER BY ");
    for (index, key) in sort.iter().enumerate() {
        if index > 0 {
            builder.push(", ");
        }
        builder.push(match key.field {
            SortField::CreatedAt => "created_at",
            SortField::Id => "id COLLATE \"C\"",
        });
        builder.push(match (key.field, key.direction) {
            (SortField::CreatedAt, SortDirection::Descending) => " DESC NULLS LAST",
            (SortField::CreatedAt, SortDirection::Ascending) => " ASC NULLS LAST",
            (SortField::Id, SortDirection::Descending) => " DESC",
            (SortField::Id, SortDirection::Ascending) => " ASC",
        });
    }
}

/// `SELECT` over one collection with every filter condition, the sort and the
/// limit bound as parameters.
fn build_query(
    collection: &str,
    filter: &QueryFilter,
    sort: &[SortKey],
    limit: Option<usize>,
) -> Result<QueryBuilder<'static, Postgres>> {
    let mut builder: QueryBuilder<'static, Postgres> =
        QueryBuilder::new("SELECT id, schema_version, body FROM documents WHERE collection = ");
    builder.push_bind(collection.to_string());

    for (field, value) in &filter.field_equals {
        builder.push(" AND body ->> ");
        builder.push_bind(field.clone());
        builder.push(" = ");
        builder.push_bind(value.clone());
    }

    if let Some(ids) = &filter.ids {
        builder.push(" AND id = ANY(");
        builder.push_bind(ids.clone());
        builder.push(")");
    }

    if let Some(position) = &filter.older_than {
        builder.push(" AND (created_at < ");
        builder.push_bind(position.created_at);
        builder.push(" OR (created_at = ");
        builder.push_bind(position.created_at);
        builder.push(" AND id COLLATE \"C\" < ");
        builder.push_bind(position.id.clone());
        builder.push("))");
    }

    push_sort(&mut builder, sort);

    if let Some(limit) = limit {
        builder.push(" LIMIT ");
        builder.push_bind(i64::try_from(limit).context("Query limit out of range")?);
    }

    Ok(builder)
}

#[async_trait::async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>> {
        let row = sqlx::query(
            "SELECT id, schema_version, body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch document")?;

        let Some(row) = row else {
            return Ok(None);
        };

        row_to_document(&row).map(Some)
    }

    async fn upsert_by_id(&self, collection: &str, document: StoredDocument) -> Result<()> {
        let created_at: Option<DateTime<Utc>> = document.created_at();

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, schema_version, created_at, body)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (collection, id) DO UPDATE SET
                schema_version = EXCLUDED.schema_version,
                created_at = EXCLUDED.created_at,
                body = EXCLUDED.body,
                updated_at = NOW()
            "#,
        )
        .bind(collection)
        .bind(&document.id)
        .bind(&document.schema_version)
        .bind(created_at)
        .bind(Value::Object(document.body))
        .execute(&self.pool)
        .await
        .context("Failed to upsert document")?;

        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filter: &QueryFilter,
        sort: &[SortKey],
        limit: Option<usize>,
    ) -> Result<Vec<StoredDocument>> {
        let mut builder = build_query(collection, filter, sort, limit)?;

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .context("Failed to query documents")?;

        rows.iter().map(row_to_document).collect()
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete document")?;

        Ok(result.rows_affected() > 0)
    }
}
