use std::sync::Arc;

use serde_json::Value;

use super::catalog::ListingStore;
use crate::marketplace::StoreError;

/// Pass-through CRUD over the listings table. No validation beyond the
/// presence of a JSON body, and no authorization; any caller may mutate any
/// listing.
pub struct ListingCatalog<S> {
    store: Arc<S>,
}

impl<S> ListingCatalog<S>
where
    S: ListingStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn create(&self, listing: Value) -> Result<Vec<Value>, StoreError> {
        self.store.insert(listing).await
    }

    pub async fn list(&self) -> Result<Vec<Value>, StoreError> {
        self.store.list().await
    }

    /// The stored row, or JSON null when the id is unknown.
    pub async fn get(&self, id: &str) -> Result<Value, StoreError> {
        let mut rows = self.store.fetch(id).await?;
        if rows.is_empty() {
            Ok(Value::Null)
        } else {
            Ok(rows.swap_remove(0))
        }
    }

    pub async fn update(&self, id: &str, patch: Value) -> Result<Vec<Value>, StoreError> {
        self.store.update(id, patch).await
    }

    pub async fn delete(&self, id: &str) -> Result<Vec<Value>, StoreError> {
        self.store.delete(id).await
    }
}
