use async_trait::async_trait;
use chrono::Utc;
use estate_link::marketplace::credits::{
    ContactAccessGrant, CreditAccount, CreditLedger, CreditTransaction, NewContactAccess,
    NewCreditTransaction,
};
use estate_link::marketplace::identity::{
    AgentProfile, IdentityProvider, ProviderAccount, ProviderError, ProviderSession,
    SellerProfile, UserDirectory, UserRecord,
};
use estate_link::marketplace::listings::ListingStore;
use estate_link::marketplace::StoreError;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    /// Outcome of the startup probe against the hosted backend.
    pub(crate) supabase_connected: bool,
}

#[derive(Clone)]
struct StoredAccount {
    account: ProviderAccount,
    password: String,
}

/// Identity lookup seeded for federated demo sign-ins.
#[derive(Clone)]
pub(crate) struct FederatedIdentity {
    pub(crate) user_id: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) first_sign_in: bool,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryIdentityProvider {
    accounts: Arc<Mutex<HashMap<String, StoredAccount>>>,
    sessions: Arc<Mutex<HashMap<String, ProviderAccount>>>,
    federated: Arc<Mutex<HashMap<String, FederatedIdentity>>>,
    sequence: Arc<AtomicU64>,
}

impl InMemoryIdentityProvider {
    fn next(&self, prefix: &str) -> String {
        let n = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{n}")
    }

    pub(crate) fn seed_federated_identity(&self, id_token: &str, identity: FederatedIdentity) {
        self.federated
            .lock()
            .expect("federated mutex poisoned")
            .insert(id_token.to_string(), identity);
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderAccount, ProviderError> {
        let mut guard = self.accounts.lock().expect("account mutex poisoned");
        if guard.contains_key(email) {
            return Err(ProviderError::Rejected(
                "email address already registered".to_string(),
            ));
        }
        let now = Utc::now();
        let account = ProviderAccount {
            id: self.next("user"),
            email: Some(email.to_string()),
            full_name: None,
            provider: Some("email".to_string()),
            created_at: Some(now),
            updated_at: Some(now),
        };
        guard.insert(
            email.to_string(),
            StoredAccount {
                account: account.clone(),
                password: password.to_string(),
            },
        );
        Ok(account)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderSession, ProviderError> {
        let account = {
            let guard = self.accounts.lock().expect("account mutex poisoned");
            match guard.get(email) {
                Some(stored) if stored.password == password => stored.account.clone(),
                _ => return Err(ProviderError::InvalidCredentials),
            }
        };
        let token = self.next("token");
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .insert(token.clone(), account.clone());
        Ok(ProviderSession {
            account,
            access_token: token,
        })
    }

    async fn sign_in_with_id_token(
        &self,
        provider: &str,
        id_token: &str,
    ) -> Result<ProviderSession, ProviderError> {
        let identity = {
            let guard = self.federated.lock().expect("federated mutex poisoned");
            guard
                .get(id_token)
                .cloned()
                .ok_or_else(|| ProviderError::Rejected("id token not recognised".to_string()))?
        };
        let created = Utc::now();
        let updated = if identity.first_sign_in {
            created
        } else {
            created + chrono::Duration::seconds(60)
        };
        let account = ProviderAccount {
            id: identity.user_id,
            email: Some(identity.email),
            full_name: Some(identity.full_name),
            provider: Some(provider.to_string()),
            created_at: Some(created),
            updated_at: Some(updated),
        };
        let token = self.next("token");
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .insert(token.clone(), account.clone());
        Ok(ProviderSession {
            account,
            access_token: token,
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        let removed = self
            .sessions
            .lock()
            .expect("session mutex poisoned")
            .remove(access_token);
        if removed.is_none() {
            return Err(ProviderError::InvalidToken);
        }
        Ok(())
    }

    async fn authenticated_account(
        &self,
        access_token: &str,
    ) -> Result<ProviderAccount, ProviderError> {
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .get(access_token)
            .cloned()
            .ok_or(ProviderError::InvalidToken)
    }

    async fn delete_account(&self, user_id: &str) -> Result<(), ProviderError> {
        self.accounts
            .lock()
            .expect("account mutex poisoned")
            .retain(|_, stored| stored.account.id != user_id);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryUserDirectory {
    users: Arc<Mutex<HashMap<String, UserRecord>>>,
    sellers: Arc<Mutex<HashMap<String, SellerProfile>>>,
    agents: Arc<Mutex<HashMap<String, AgentProfile>>>,
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn insert_user(&self, user: &UserRecord) -> Result<UserRecord, StoreError> {
        let mut guard = self.users.lock().expect("user mutex poisoned");
        if guard.contains_key(&user.id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(user.id.clone(), user.clone());
        Ok(user.clone())
    }

    async fn fetch_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        let guard = self.users.lock().expect("user mutex poisoned");
        Ok(guard.get(user_id).cloned())
    }

    async fn insert_seller_profile(&self, profile: &SellerProfile) -> Result<(), StoreError> {
        let mut guard = self.sellers.lock().expect("seller mutex poisoned");
        if guard.contains_key(&profile.user_id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn insert_agent_profile(&self, profile: &AgentProfile) -> Result<(), StoreError> {
        let mut guard = self.agents.lock().expect("agent mutex poisoned");
        if guard.contains_key(&profile.user_id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn fetch_seller_profile(
        &self,
        user_id: &str,
    ) -> Result<Option<SellerProfile>, StoreError> {
        let guard = self.sellers.lock().expect("seller mutex poisoned");
        Ok(guard.get(user_id).cloned())
    }

    async fn fetch_agent_profile(
        &self,
        user_id: &str,
    ) -> Result<Option<AgentProfile>, StoreError> {
        let guard = self.agents.lock().expect("agent mutex poisoned");
        Ok(guard.get(user_id).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryCreditLedger {
    accounts: Arc<Mutex<HashMap<String, i64>>>,
    transactions: Arc<Mutex<Vec<CreditTransaction>>>,
    grants: Arc<Mutex<Vec<ContactAccessGrant>>>,
    sequence: Arc<AtomicU64>,
}

impl InMemoryCreditLedger {
    fn next(&self, prefix: &str) -> String {
        let n = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{n}")
    }
}

#[async_trait]
impl CreditLedger for InMemoryCreditLedger {
    async fn fetch_account(&self, agent_id: &str) -> Result<Option<CreditAccount>, StoreError> {
        let guard = self.accounts.lock().expect("account mutex poisoned");
        Ok(guard.get(agent_id).map(|balance| CreditAccount {
            agent_id: agent_id.to_string(),
            balance: *balance,
        }))
    }

    async fn insert_account(&self, account: &CreditAccount) -> Result<CreditAccount, StoreError> {
        let mut guard = self.accounts.lock().expect("account mutex poisoned");
        if guard.contains_key(&account.agent_id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(account.agent_id.clone(), account.balance);
        Ok(account.clone())
    }

    async fn update_balance(
        &self,
        agent_id: &str,
        expected: i64,
        new_balance: i64,
    ) -> Result<CreditAccount, StoreError> {
        let mut guard = self.accounts.lock().expect("account mutex poisoned");
        match guard.get_mut(agent_id) {
            Some(balance) if *balance == expected => {
                *balance = new_balance;
                Ok(CreditAccount {
                    agent_id: agent_id.to_string(),
                    balance: new_balance,
                })
            }
            Some(_) => Err(StoreError::Conflict),
            None => Err(StoreError::NotFound),
        }
    }

    async fn insert_transaction(
        &self,
        transaction: &NewCreditTransaction,
    ) -> Result<CreditTransaction, StoreError> {
        let row = CreditTransaction {
            id: self.next("txn"),
            agent_id: transaction.agent_id.clone(),
            amount: transaction.amount,
            transaction_type: transaction.transaction_type,
            description: transaction.description.clone(),
            payment_id: transaction.payment_id.clone(),
            created_at: transaction.created_at,
        };
        self.transactions
            .lock()
            .expect("transaction mutex poisoned")
            .push(row.clone());
        Ok(row)
    }

    async fn transactions_for(&self, agent_id: &str) -> Result<Vec<CreditTransaction>, StoreError> {
        let guard = self.transactions.lock().expect("transaction mutex poisoned");
        Ok(guard
            .iter()
            .filter(|row| row.agent_id == agent_id)
            .rev()
            .cloned()
            .collect())
    }

    async fn fetch_access(
        &self,
        agent_id: &str,
        property_id: &str,
    ) -> Result<Option<ContactAccessGrant>, StoreError> {
        let guard = self.grants.lock().expect("grant mutex poisoned");
        Ok(guard
            .iter()
            .find(|grant| grant.agent_id == agent_id && grant.property_id == property_id)
            .cloned())
    }

    async fn insert_access(
        &self,
        access: &NewContactAccess,
    ) -> Result<ContactAccessGrant, StoreError> {
        let mut guard = self.grants.lock().expect("grant mutex poisoned");
        if guard
            .iter()
            .any(|grant| grant.agent_id == access.agent_id && grant.property_id == access.property_id)
        {
            return Err(StoreError::Conflict);
        }
        let row = ContactAccessGrant {
            id: self.next("access"),
            agent_id: access.agent_id.clone(),
            property_id: access.property_id.clone(),
            granted_at: access.granted_at,
            status: access.status.clone(),
            credit_transaction_id: access.credit_transaction_id.clone(),
        };
        guard.push(row.clone());
        Ok(row)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryListingStore {
    rows: Arc<Mutex<Vec<Value>>>,
    sequence: Arc<AtomicU64>,
}

fn listing_id_matches(row: &Value, id: &str) -> bool {
    row.get("id").and_then(Value::as_str) == Some(id)
}

#[async_trait]
impl ListingStore for InMemoryListingStore {
    async fn insert(&self, mut listing: Value) -> Result<Vec<Value>, StoreError> {
        if let Some(object) = listing.as_object_mut() {
            if !object.contains_key("id") {
                let n = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
                object.insert("id".to_string(), Value::String(format!("prop-{n}")));
            }
        }
        self.rows
            .lock()
            .expect("listing mutex poisoned")
            .push(listing.clone());
        Ok(vec![listing])
    }

    async fn list(&self) -> Result<Vec<Value>, StoreError> {
        Ok(self.rows.lock().expect("listing mutex poisoned").clone())
    }

    async fn fetch(&self, id: &str) -> Result<Vec<Value>, StoreError> {
        let guard = self.rows.lock().expect("listing mutex poisoned");
        Ok(guard
            .iter()
            .filter(|row| listing_id_matches(row, id))
            .cloned()
            .collect())
    }

    async fn update(&self, id: &str, patch: Value) -> Result<Vec<Value>, StoreError> {
        let mut guard = self.rows.lock().expect("listing mutex poisoned");
        let mut updated = Vec::new();
        for row in guard.iter_mut().filter(|row| listing_id_matches(row, id)) {
            if let (Some(target), Some(changes)) = (row.as_object_mut(), patch.as_object()) {
                for (key, value) in changes {
                    target.insert(key.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<Vec<Value>, StoreError> {
        let mut guard = self.rows.lock().expect("listing mutex poisoned");
        let removed = guard
            .iter()
            .filter(|row| listing_id_matches(row, id))
            .cloned()
            .collect();
        guard.retain(|row| !listing_id_matches(row, id));
        Ok(removed)
    }
}
