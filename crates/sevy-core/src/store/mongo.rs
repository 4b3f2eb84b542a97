use std::collections::HashMap;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Client, Collection};
use tracing::{info, warn};

use crate::config::MongoConfig;
use crate::error::StoreError;

use super::{Counter, CounterStore};

/// MongoDB-backed counter store.
///
/// The stats collection holds loosely-structured documents where each
/// document carries at most one of the known counter fields; `fetch_all`
/// joins them into a single map in application logic.
pub struct MongoCounterStore {
    collection: Collection<Document>,
}

impl MongoCounterStore {
    /// Build the store. One client per process; the driver maintains the
    /// connection pool underneath, so callers hold this for the process
    /// lifetime instead of reconnecting per request.
    pub async fn connect(config: &MongoConfig) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(config.uri())
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))?;

        // The driver connects lazily. Ping now so bad credentials show up
        // in the startup log rather than as the first failed query; a
        // failed ping is not fatal because later queries retry anyway.
        match client.database("admin").run_command(doc! { "ping": 1 }).await {
            Ok(_) => info!("Connected to MongoDB at {}", config.server_address),
            Err(e) => warn!("MongoDB ping failed (will retry on use): {e}"),
        }

        let collection = client
            .database(&config.database)
            .collection(&config.collection);
        Ok(Self { collection })
    }
}

#[async_trait]
impl CounterStore for MongoCounterStore {
    async fn fetch_all(&self) -> Result<HashMap<Counter, i64>, StoreError> {
        let mut cursor = self
            .collection
            .find(doc! {})
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut counters = HashMap::new();
        while let Some(document) = cursor
            .try_next()
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?
        {
            for counter in Counter::ALL {
                if let Some(value) = numeric_field(&document, counter.field()) {
                    counters.insert(counter, value);
                }
            }
        }

        Ok(counters)
    }

    async fn increment(&self, counter: Counter) -> Result<(), StoreError> {
        let field = counter.field();

        let mut filter = Document::new();
        filter.insert(field, doc! { "$exists": true });
        let mut bump = Document::new();
        bump.insert(field, 1i64);

        let result = self
            .collection
            .update_one(filter, doc! { "$inc": bump })
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        if result.matched_count == 0 {
            warn!("No document holds counter {field}; increment dropped");
        }
        Ok(())
    }
}

/// Read a counter field that may have been written as any BSON numeric type.
fn numeric_field(document: &Document, field: &str) -> Option<i64> {
    match document.get(field) {
        Some(Bson::Int64(n)) => Some(*n),
        Some(Bson::Int32(n)) => Some(i64::from(*n)),
        Some(Bson::Double(n)) => Some(*n as i64),
        _ => None,
    }
}
