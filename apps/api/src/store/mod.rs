//! Document store: the persistence port for interview, feedback and transcript records.
//!
//! Records are schemaless JSON documents addressed by `(collection, id)`.
//! `PgDocumentStore` is the production backend.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod postgres;

pub use postgres::PgDocumentStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Malformed record in {collection}/{id}: {source}")]
    Malformed {
        collection: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Named collections. Each maps to a logical table of documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Interviews,
    Feedback,
    Transcripts,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Interviews => "interviews",
            Collection::Feedback => "feedback",
            Collection::Transcripts => "transcripts",
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a new record and returns its generated identifier.
    async fn add_record(&self, collection: Collection, record: Value) -> Result<String, StoreError>;

    /// Writes a record under a caller-chosen identifier, replacing any existing one.
    async fn set_record(
        &self,
        collection: Collection,
        id: &str,
        record: Value,
    ) -> Result<(), StoreError>;

    async fn get_record(&self, collection: Collection, id: &str)
        -> Result<Option<Value>, StoreError>;
}

/// Reads a record and deserializes it into `T`.
pub async fn get_typed<T: serde::de::DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: Collection,
    id: &str,
) -> Result<Option<T>, StoreError> {
    let Some(value) = store.get_record(collection, id).await? else {
        return Ok(None);
    };
    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| StoreError::Malformed {
            collection: collection.as_str(),
            id: id.to_string(),
            source,
        })
}
