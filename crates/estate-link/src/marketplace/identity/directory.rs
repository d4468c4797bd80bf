use async_trait::async_trait;

use super::domain::{AgentProfile, SellerProfile, UserRecord};
use crate::marketplace::StoreError;

/// Storage abstraction over the user and role-profile tables.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn insert_user(&self, user: &UserRecord) -> Result<UserRecord, StoreError>;
    async fn fetch_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError>;
    async fn insert_seller_profile(&self, profile: &SellerProfile) -> Result<(), StoreError>;
    async fn insert_agent_profile(&self, profile: &AgentProfile) -> Result<(), StoreError>;
    async fn fetch_seller_profile(
        &self,
        user_id: &str,
    ) -> Result<Option<SellerProfile>, StoreError>;
    async fn fetch_agent_profile(&self, user_id: &str)
        -> Result<Option<AgentProfile>, StoreError>;
}
