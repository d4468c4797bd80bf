use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{Duration, Utc};
use serde_json::Value;

use crate::marketplace::credits::{
    credits_router, ContactAccessGrant, CreditAccount, CreditLedger, CreditService,
    CreditTransaction, NewContactAccess, NewCreditTransaction,
};
use crate::marketplace::identity::{
    identity_router, AgentProfile, IdentityProvider, IdentityService, NewRegistration,
    ProviderAccount, ProviderError, ProviderSession, SellerProfile, UserDirectory, UserRecord,
    UserType,
};
use crate::marketplace::listings::{listings_router, ListingCatalog, ListingStore};
use crate::marketplace::StoreError;

pub(super) const SELLER_EMAIL: &str = "seller@example.com";
pub(super) const AGENT_EMAIL: &str = "agent@example.com";
pub(super) const PASSWORD: &str = "correct-horse";

pub(super) fn registration(user_type: UserType, email: &str) -> NewRegistration {
    NewRegistration {
        email: email.to_string(),
        password: PASSWORD.to_string(),
        user_type,
        full_name: "Test User".to_string(),
        phone: Some("+420601112233".to_string()),
    }
}

#[derive(Clone)]
pub(super) struct GoogleAccount {
    pub(super) user_id: String,
    pub(super) email: String,
    pub(super) full_name: String,
    pub(super) first_sign_in: bool,
}

pub(super) fn google_account(first_sign_in: bool) -> GoogleAccount {
    GoogleAccount {
        user_id: "google-user-9".to_string(),
        email: "buyer@gmail.com".to_string(),
        full_name: "Eva Cerna".to_string(),
        first_sign_in,
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryProvider {
    accounts: Arc<Mutex<HashMap<String, (ProviderAccount, String)>>>,
    sessions: Arc<Mutex<HashMap<String, ProviderAccount>>>,
    federated: Arc<Mutex<HashMap<String, GoogleAccount>>>,
    deleted: Arc<Mutex<Vec<String>>>,
    sequence: Arc<AtomicU64>,
}

impl MemoryProvider {
    fn next(&self, prefix: &str) -> String {
        let n = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{n}")
    }

    pub(super) fn seed_google(&self, id_token: &str, account: GoogleAccount) {
        self.federated
            .lock()
            .expect("federated mutex poisoned")
            .insert(id_token.to_string(), account);
    }

    pub(super) fn account_count(&self) -> usize {
        self.accounts.lock().expect("account mutex poisoned").len()
    }

    pub(super) fn deleted_ids(&self) -> Vec<String> {
        self.deleted.lock().expect("deleted mutex poisoned").clone()
    }
}

#[async_trait]
impl IdentityProvider for MemoryProvider {
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
        guard.insert(email.to_string(), (account.clone(), password.to_string()));
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
                Some((account, stored)) if stored == password => account.clone(),
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
            created + Duration::seconds(60)
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
        self.deleted
            .lock()
            .expect("deleted mutex poisoned")
            .push(user_id.to_string());
        self.accounts
            .lock()
            .expect("account mutex poisoned")
            .retain(|_, (account, _)| account.id != user_id);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryDirectory {
    users: Arc<Mutex<HashMap<String, UserRecord>>>,
    sellers: Arc<Mutex<HashMap<String, SellerProfile>>>,
    agents: Arc<Mutex<HashMap<String, AgentProfile>>>,
}

impl MemoryDirectory {
    pub(super) fn agent_profile_count(&self) -> usize {
        self.agents.lock().expect("agent mutex poisoned").len()
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
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

/// Directory stub whose writes always fail, for the compensation path.
pub(super) struct OfflineDirectory;

#[async_trait]
impl UserDirectory for OfflineDirectory {
    async fn insert_user(&self, _user: &UserRecord) -> Result<UserRecord, StoreError> {
        Err(StoreError::Unavailable("directory offline".to_string()))
    }

    async fn fetch_user(&self, _user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(None)
    }

    async fn insert_seller_profile(&self, _profile: &SellerProfile) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("directory offline".to_string()))
    }

    async fn insert_agent_profile(&self, _profile: &AgentProfile) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("directory offline".to_string()))
    }

    async fn fetch_seller_profile(
        &self,
        _user_id: &str,
    ) -> Result<Option<SellerProfile>, StoreError> {
        Ok(None)
    }

    async fn fetch_agent_profile(
        &self,
        _user_id: &str,
    ) -> Result<Option<AgentProfile>, StoreError> {
        Ok(None)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryLedger {
    accounts: Arc<Mutex<HashMap<String, i64>>>,
    transactions: Arc<Mutex<Vec<CreditTransaction>>>,
    grants: Arc<Mutex<Vec<ContactAccessGrant>>>,
    sequence: Arc<AtomicU64>,
    conflict_next_write: Arc<AtomicBool>,
}

impl MemoryLedger {
    fn next(&self, prefix: &str) -> String {
        let n = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{n}")
    }

    /// The next guarded balance write behaves as if another writer won.
    pub(super) fn force_balance_conflict(&self) {
        self.conflict_next_write.store(true, Ordering::Relaxed);
    }

    pub(super) fn balance_of(&self, agent_id: &str) -> Option<i64> {
        self.accounts
            .lock()
            .expect("account mutex poisoned")
            .get(agent_id)
            .copied()
    }

    pub(super) fn transaction_count(&self) -> usize {
        self.transactions
            .lock()
            .expect("transaction mutex poisoned")
            .len()
    }

    pub(super) fn grant_count(&self) -> usize {
        self.grants.lock().expect("grant mutex poisoned").len()
    }
}

#[async_trait]
impl CreditLedger for MemoryLedger {
    async fn fetch_account(&self, agent_id: &str) -> Result<Option<CreditAccount>, StoreError> {
        Ok(self.balance_of(agent_id).map(|balance| CreditAccount {
            agent_id: agent_id.to_string(),
            balance,
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
        if self.conflict_next_write.swap(false, Ordering::Relaxed) {
            return Err(StoreError::Conflict);
        }
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
pub(super) struct MemoryListings {
    rows: Arc<Mutex<Vec<Value>>>,
    sequence: Arc<AtomicU64>,
}

fn listing_id_matches(row: &Value, id: &str) -> bool {
    row.get("id").and_then(Value::as_str) == Some(id)
}

#[async_trait]
impl ListingStore for MemoryListings {
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

/// Listing stub whose every call fails, for the opaque-500 path.
pub(super) struct FailingListings;

#[async_trait]
impl ListingStore for FailingListings {
    async fn insert(&self, _listing: Value) -> Result<Vec<Value>, StoreError> {
        Err(StoreError::Unavailable("listing store offline".to_string()))
    }

    async fn list(&self) -> Result<Vec<Value>, StoreError> {
        Err(StoreError::Unavailable("listing store offline".to_string()))
    }

    async fn fetch(&self, _id: &str) -> Result<Vec<Value>, StoreError> {
        Err(StoreError::Unavailable("listing store offline".to_string()))
    }

    async fn update(&self, _id: &str, _patch: Value) -> Result<Vec<Value>, StoreError> {
        Err(StoreError::Unavailable("listing store offline".to_string()))
    }

    async fn delete(&self, _id: &str) -> Result<Vec<Value>, StoreError> {
        Err(StoreError::Unavailable("listing store offline".to_string()))
    }
}

pub(super) fn build_services() -> (
    IdentityService<MemoryProvider, MemoryDirectory, MemoryLedger>,
    CreditService<MemoryProvider, MemoryDirectory, MemoryLedger>,
    Arc<MemoryProvider>,
    Arc<MemoryDirectory>,
    Arc<MemoryLedger>,
) {
    let provider = Arc::new(MemoryProvider::default());
    let directory = Arc::new(MemoryDirectory::default());
    let ledger = Arc::new(MemoryLedger::default());
    let identity = IdentityService::new(provider.clone(), directory.clone(), ledger.clone());
    let credits = CreditService::new(provider.clone(), directory.clone(), ledger.clone());
    (identity, credits, provider, directory, ledger)
}

pub(super) async fn signed_in_agent(
    identity: &IdentityService<MemoryProvider, MemoryDirectory, MemoryLedger>,
) -> (String, String) {
    let user = identity
        .register(registration(UserType::Agent, AGENT_EMAIL))
        .await
        .expect("agent registers");
    let session = identity
        .login(AGENT_EMAIL, PASSWORD)
        .await
        .expect("agent signs in");
    (user.id, session.access_token)
}

pub(super) fn identity_router_for(
    identity: IdentityService<MemoryProvider, MemoryDirectory, MemoryLedger>,
) -> axum::Router {
    identity_router(Arc::new(identity))
}

pub(super) fn credits_router_for(
    credits: CreditService<MemoryProvider, MemoryDirectory, MemoryLedger>,
) -> axum::Router {
    credits_router(Arc::new(credits))
}

pub(super) fn listings_router_for(store: Arc<MemoryListings>) -> axum::Router {
    listings_router(Arc::new(ListingCatalog::new(store)))
}

pub(super) fn post_json(uri: &str, body: &Value) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::post(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub(super) fn post_json_as(
    uri: &str,
    token: &str,
    body: &Value,
) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::post(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .header(
            axum::http::header::AUTHORIZATION,
            format!("Bearer {token}"),
        )
        .body(axum::body::Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub(super) fn get_as(uri: &str, token: &str) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::get(uri)
        .header(
            axum::http::header::AUTHORIZATION,
            format!("Bearer {token}"),
        )
        .body(axum::body::Body::empty())
        .unwrap()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
