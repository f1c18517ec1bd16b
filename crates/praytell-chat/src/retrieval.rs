//! Nearest-text lookups against a store category

use praytell_core::{
    CategoryConfig, ContextRecord, ContextStore, Error, NearTextQuery, RecordFields, Result,
};
use praytell_telemetry::{RetrievalSpanAttributes, trace_retrieval};
use std::sync::Arc;

/// Number of records fetched when the caller does not say otherwise
pub const DEFAULT_CONTEXT_LIMIT: usize = 3;

/// Finds the stored records semantically closest to a query
#[derive(Clone)]
pub struct ContextRetrievalService {
    store: Arc<dyn ContextStore>,
    category: CategoryConfig,
}

impl ContextRetrievalService {
    pub fn new(store: Arc<dyn ContextStore>, category: CategoryConfig) -> Self {
        Self { store, category }
    }

    pub fn category(&self) -> &CategoryConfig {
        &self.category
    }

    /// Up to `k` records, nearest first, projected through the category's
    /// field mapping.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ContextRecord>> {
        let hits = self.search(query, k).await?;
        Ok(hits
            .iter()
            .map(|fields| ContextRecord::from_fields(fields, &self.category))
            .collect())
    }

    /// Bodies of up to `k` nearest records.
    pub async fn similar(&self, query: &str, k: usize) -> Result<Vec<String>> {
        Ok(self
            .retrieve(query, k)
            .await?
            .into_iter()
            .map(|record| record.body)
            .collect())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<RecordFields>> {
        if k == 0 {
            return Err(Error::validation("Result limit must be at least 1"));
        }

        let request = NearTextQuery {
            category: self.category.class_name.clone(),
            fields: self.category.fields(),
            concepts: vec![query.to_string()],
            limit: k,
        };

        let mut hits = self
            .store
            .nearest_text(request)
            .await
            .map_err(|e| Error::Retrieval(e.to_string()))?;
        hits.truncate(k);

        trace_retrieval(RetrievalSpanAttributes {
            store: self.store.name().to_string(),
            category: self.category.class_name.clone(),
            query: query.to_string(),
            limit: k as i64,
            hits: hits.len() as i64,
        });

        Ok(hits)
    }
}
