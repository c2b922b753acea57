use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{Collection, DocumentStore, StoreError};

const INSERT_SQL: &str = "INSERT INTO documents (id, collection, data) VALUES ($1, $2, $3)";

/// Upsert keyed on the full document identity.
const UPSERT_SQL: &str = r#"
    INSERT INTO documents (id, collection, data)
    VALUES ($1, $2, $3)
    ON CONFLICT (collection, id) DO UPDATE
        SET data = EXCLUDED.data,
            updated_at = NOW()
"#;

const SELECT_SQL: &str = "SELECT data FROM documents WHERE collection = $1 AND id = $2";

/// Document store backed by the `documents` JSONB table.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn add_record(&self, collection: Collection, record: Value) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(INSERT_SQL)
            .bind(&id)
            .bind(collection.as_str())
            .bind(&record)
            .execute(&self.pool)
            .await?;

        debug!("Added {}/{}", collection.as_str(), id);
        Ok(id)
    }

    async fn set_record(
        &self,
        collection: Collection,
        id: &str,
        record: Value,
    ) -> Result<(), StoreError> {
        sqlx::query(UPSERT_SQL)
            .bind(id)
            .bind(collection.as_str())
            .bind(&record)
            .execute(&self.pool)
            .await?;

        debug!("Wrote {}/{}", collection.as_str(), id);
        Ok(())
    }

    async fn get_record(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Value>, StoreError> {
        Ok(sqlx::query_scalar::<_, Value>(SELECT_SQL)
            .bind(collection.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }
}
