use async_trait::async_trait;
use serde_json::Value;

use crate::marketplace::StoreError;

/// Storage abstraction over the raw `properties` table. Rows are arbitrary
/// JSON documents stored verbatim; mutating calls answer with the affected
/// rows, matching the representation the hosted store returns.
#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn insert(&self, listing: Value) -> Result<Vec<Value>, StoreError>;
    async fn list(&self) -> Result<Vec<Value>, StoreError>;
    async fn fetch(&self, id: &str) -> Result<Vec<Value>, StoreError>;
    async fn update(&self, id: &str, patch: Value) -> Result<Vec<Value>, StoreError>;
    async fn delete(&self, id: &str) -> Result<Vec<Value>, StoreError>;
}
