use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::domain::{
    ContactAccessView, CreditAccount, CreditTransaction, LedgerPolicy, NewContactAccess,
    NewCreditTransaction, PaymentMethod, PurchaseReceipt, TransactionKind,
};
use super::ledger::CreditLedger;
use crate::marketplace::identity::{IdentityProvider, ProviderError, UserDirectory, UserType};
use crate::marketplace::StoreError;

/// Service applying the credit tariff for agents. Every operation resolves
/// the caller's token first and rejects non-agent roles.
pub struct CreditService<P, D, L> {
    provider: Arc<P>,
    directory: Arc<D>,
    ledger: Arc<L>,
    policy: LedgerPolicy,
}

impl<P, D, L> CreditService<P, D, L>
where
    P: IdentityProvider + 'static,
    D: UserDirectory + 'static,
    L: CreditLedger + 'static,
{
    pub fn new(provider: Arc<P>, directory: Arc<D>, ledger: Arc<L>) -> Self {
        Self::with_policy(provider, directory, ledger, LedgerPolicy::default())
    }

    pub fn with_policy(
        provider: Arc<P>,
        directory: Arc<D>,
        ledger: Arc<L>,
        policy: LedgerPolicy,
    ) -> Self {
        Self {
            provider,
            directory,
            ledger,
            policy,
        }
    }

    /// Current credit account, lazily created with balance 0 when absent.
    pub async fn balance(&self, token: &str) -> Result<CreditAccount, CreditError> {
        let agent_id = self.resolve_agent(token).await?;

        if let Some(account) = self.ledger.fetch_account(&agent_id).await? {
            return Ok(account);
        }

        let created = self
            .ledger
            .insert_account(&CreditAccount {
                agent_id,
                balance: 0,
            })
            .await?;
        Ok(created)
    }

    /// Top up the balance. Payment execution is stubbed: a fresh payment id
    /// is generated and the receipt always reports `completed`. The purchase
    /// transaction is recorded first, then the balance is raised with a
    /// guarded update (or the account row is created at `amount`).
    pub async fn purchase(
        &self,
        token: &str,
        amount: i64,
        method: PaymentMethod,
    ) -> Result<PurchaseReceipt, CreditError> {
        let agent_id = self.resolve_agent(token).await?;

        let payment_id = Uuid::new_v4().to_string();
        let transaction = self
            .ledger
            .insert_transaction(&NewCreditTransaction {
                agent_id: agent_id.clone(),
                amount,
                transaction_type: TransactionKind::Purchase,
                description: format!("Purchase of {amount} credits ({})", method.label()),
                payment_id: Some(payment_id.clone()),
                created_at: Utc::now(),
            })
            .await?;

        match self.ledger.fetch_account(&agent_id).await? {
            Some(account) => {
                self.ledger
                    .update_balance(&agent_id, account.balance, account.balance + amount)
                    .await?;
            }
            None => {
                self.ledger
                    .insert_account(&CreditAccount {
                        agent_id: agent_id.clone(),
                        balance: amount,
                    })
                    .await?;
            }
        }

        Ok(PurchaseReceipt {
            payment_id,
            amount,
            total_price: amount * self.policy.credit_price,
            currency: self.policy.currency.to_string(),
            payment_method: method,
            status: "completed".to_string(),
            transaction_id: transaction.id,
        })
    }

    /// Spend credits to unlock seller contact details for one property.
    /// Idempotent per (agent, property): an existing grant is returned
    /// unchanged without a debit. The balance decrement is guarded on the
    /// previously read value; a lost race surfaces as a conflict and no
    /// grant row is written.
    pub async fn unlock_contact(
        &self,
        token: &str,
        property_id: &str,
    ) -> Result<ContactAccessView, CreditError> {
        let agent_id = self.resolve_agent(token).await?;

        if let Some(existing) = self.ledger.fetch_access(&agent_id, property_id).await? {
            return Ok(ContactAccessView {
                access_id: existing.id,
                property_id: property_id.to_string(),
                status: existing.status,
                granted_at: existing.granted_at,
                credits_used: None,
                credits_remaining: None,
            });
        }

        let cost = self.policy.access_cost;
        let balance = self
            .ledger
            .fetch_account(&agent_id)
            .await?
            .map(|account| account.balance)
            .unwrap_or(0);

        if balance < cost {
            return Err(CreditError::InsufficientCredits {
                required: cost,
                available: balance,
            });
        }

        let transaction = self
            .ledger
            .insert_transaction(&NewCreditTransaction {
                agent_id: agent_id.clone(),
                amount: -cost,
                transaction_type: TransactionKind::Usage,
                description: format!("Contact access for property {property_id}"),
                payment_id: None,
                created_at: Utc::now(),
            })
            .await?;

        let remaining = balance - cost;
        self.ledger
            .update_balance(&agent_id, balance, remaining)
            .await?;

        let granted_at = Utc::now();
        let grant = self
            .ledger
            .insert_access(&NewContactAccess {
                agent_id,
                property_id: property_id.to_string(),
                granted_at,
                status: "active".to_string(),
                credit_transaction_id: transaction.id,
            })
            .await?;

        Ok(ContactAccessView {
            access_id: grant.id,
            property_id: property_id.to_string(),
            status: grant.status,
            granted_at,
            credits_used: Some(cost),
            credits_remaining: Some(remaining),
        })
    }

    /// All ledger rows for the caller, newest first.
    pub async fn history(&self, token: &str) -> Result<Vec<CreditTransaction>, CreditError> {
        let agent_id = self.resolve_agent(token).await?;
        let transactions = self.ledger.transactions_for(&agent_id).await?;
        Ok(transactions)
    }

    async fn resolve_agent(&self, token: &str) -> Result<String, CreditError> {
        let account = self.provider.authenticated_account(token).await?;
        let user = self
            .directory
            .fetch_user(&account.id)
            .await?
            .ok_or(CreditError::ProfileMissing)?;

        if user.user_type != UserType::Agent {
            return Err(CreditError::AgentsOnly);
        }

        Ok(user.id)
    }
}

/// Error raised by the credit service.
#[derive(Debug, thiserror::Error)]
pub enum CreditError {
    #[error("only agents can work with credits")]
    AgentsOnly,
    #[error("insufficient credits: {required} required, {available} available")]
    InsufficientCredits { required: i64, available: i64 },
    #[error("user profile not found")]
    ProfileMissing,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
