use async_trait::async_trait;

use super::domain::{
    ContactAccessGrant, CreditAccount, CreditTransaction, NewContactAccess, NewCreditTransaction,
};
use crate::marketplace::StoreError;

/// Storage abstraction over the credit tables: balance counters, the
/// append-only transaction log, and contact-access grants.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    async fn fetch_account(&self, agent_id: &str) -> Result<Option<CreditAccount>, StoreError>;
    async fn insert_account(&self, account: &CreditAccount) -> Result<CreditAccount, StoreError>;
    /// Guarded balance write: succeeds only while the stored balance still
    /// equals `expected`; a lost race reports `StoreError::Conflict`.
    async fn update_balance(
        &self,
        agent_id: &str,
        expected: i64,
        new_balance: i64,
    ) -> Result<CreditAccount, StoreError>;
    async fn insert_transaction(
        &self,
        transaction: &NewCreditTransaction,
    ) -> Result<CreditTransaction, StoreError>;
    /// All ledger rows for the agent, newest first.
    async fn transactions_for(&self, agent_id: &str) -> Result<Vec<CreditTransaction>, StoreError>;
    async fn fetch_access(
        &self,
        agent_id: &str,
        property_id: &str,
    ) -> Result<Option<ContactAccessGrant>, StoreError>;
    async fn insert_access(
        &self,
        access: &NewContactAccess,
    ) -> Result<ContactAccessGrant, StoreError>;
}
