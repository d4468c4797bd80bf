//! Adapter for the hosted Supabase project: GoTrue authentication endpoints
//! and PostgREST table access behind the marketplace gateway traits, so one
//! shared handle serves every service.

pub(crate) mod wire;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::SupabaseConfig;
use crate::marketplace::credits::{
    ContactAccessGrant, CreditAccount, CreditLedger, CreditTransaction, NewContactAccess,
    NewCreditTransaction,
};
use crate::marketplace::identity::{
    AgentProfile, IdentityProvider, ProviderAccount, ProviderError, ProviderSession,
    SellerProfile, UserDirectory, UserRecord,
};
use crate::marketplace::listings::ListingStore;
use crate::marketplace::StoreError;

/// Shared handle to the hosted backend, constructed once at startup from the
/// two configuration secrets and injected into every service.
pub struct SupabaseClient {
    http: Client,
    auth_url: String,
    rest_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Build with a caller-supplied HTTP client (timeouts, proxies).
    pub fn with_client(http: Client, config: &SupabaseConfig) -> Self {
        let base = config.url.trim_end_matches('/');
        Self {
            http,
            auth_url: format!("{base}/auth/v1"),
            rest_url: format!("{base}/rest/v1"),
            api_key: config.api_key.clone(),
        }
    }

    /// One-shot probe of the provider health endpoint. The server runs this
    /// at startup and reports the outcome as `supabase_connected`.
    pub async fn health(&self) -> bool {
        let result = self
            .http
            .get(format!("{}/health", self.auth_url))
            .header("apikey", &self.api_key)
            .send()
            .await;
        matches!(result, Ok(response) if response.status().is_success())
    }

    async fn auth_failure(response: Response) -> ProviderError {
        let fallback = format!("HTTP {}", response.status().as_u16());
        let payload = response
            .json::<wire::AuthErrorPayload>()
            .await
            .unwrap_or_default();
        ProviderError::Rejected(payload.describe(fallback))
    }

    async fn store_failure(response: Response) -> StoreError {
        let status = response.status();
        let payload = response
            .json::<wire::StoreErrorPayload>()
            .await
            .unwrap_or_default();
        // 23505 is the unique-violation code reported by the table store.
        if status == StatusCode::CONFLICT || payload.code.as_deref() == Some("23505") {
            return StoreError::Conflict;
        }
        StoreError::Unavailable(
            payload
                .message
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
        )
    }

    async fn decode_rows<T>(response: Response) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        if !response.status().is_success() {
            return Err(Self::store_failure(response).await);
        }
        response
            .json::<Vec<T>>()
            .await
            .map_err(|err| StoreError::Malformed(err.to_string()))
    }

    async fn table_select<T>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        let response = self
            .http
            .get(format!("{}/{table}", self.rest_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&[("select", "*")])
            .query(filters)
            .send()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Self::decode_rows(response).await
    }

    async fn table_insert<B, T>(&self, table: &str, body: &B) -> Result<Vec<T>, StoreError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let response = self
            .http
            .post(format!("{}/{table}", self.rest_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Self::decode_rows(response).await
    }

    async fn table_update<B, T>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        body: &B,
    ) -> Result<Vec<T>, StoreError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let response = self
            .http
            .patch(format!("{}/{table}", self.rest_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=representation")
            .query(filters)
            .json(body)
            .send()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Self::decode_rows(response).await
    }

    async fn table_delete<T>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        let response = self
            .http
            .delete(format!("{}/{table}", self.rest_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=representation")
            .query(filters)
            .send()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Self::decode_rows(response).await
    }

    fn single_row<T>(mut rows: Vec<T>) -> Result<T, StoreError> {
        if rows.is_empty() {
            Err(StoreError::Malformed(
                "representation missing the written row".to_string(),
            ))
        } else {
            Ok(rows.swap_remove(0))
        }
    }

    fn first_row<T>(mut rows: Vec<T>) -> Option<T> {
        if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderAccount, ProviderError> {
        let response = self
            .http
            .post(format!("{}/signup", self.auth_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&wire::PasswordGrant { email, password })
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::auth_failure(response).await);
        }

        let payload = response
            .json::<wire::SignUpPayload>()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        Ok(payload.into_user().into())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderSession, ProviderError> {
        let response = self
            .http
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&wire::PasswordGrant { email, password })
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(ProviderError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(Self::auth_failure(response).await);
        }

        let payload = response
            .json::<wire::SessionPayload>()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        Ok(payload.into())
    }

    async fn sign_in_with_id_token(
        &self,
        provider: &str,
        id_token: &str,
    ) -> Result<ProviderSession, ProviderError> {
        let response = self
            .http
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", "id_token")])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&wire::IdTokenGrant { provider, id_token })
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::auth_failure(response).await);
        }

        let payload = response
            .json::<wire::SessionPayload>()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        Ok(payload.into())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        let response = self
            .http
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProviderError::InvalidToken);
        }
        if !status.is_success() {
            return Err(Self::auth_failure(response).await);
        }
        Ok(())
    }

    async fn authenticated_account(
        &self,
        access_token: &str,
    ) -> Result<ProviderAccount, ProviderError> {
        let response = self
            .http
            .get(format!("{}/user", self.auth_url))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProviderError::InvalidToken);
        }
        if !status.is_success() {
            return Err(Self::auth_failure(response).await);
        }

        let payload = response
            .json::<wire::UserPayload>()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        Ok(payload.into())
    }

    async fn delete_account(&self, user_id: &str) -> Result<(), ProviderError> {
        let response = self
            .http
            .delete(format!("{}/admin/users/{user_id}", self.auth_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::auth_failure(response).await);
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for SupabaseClient {
    async fn insert_user(&self, user: &UserRecord) -> Result<UserRecord, StoreError> {
        let rows = self.table_insert("users", user).await?;
        Self::single_row(rows)
    }

    async fn fetch_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        let rows = self
            .table_select("users", &[("id", format!("eq.{user_id}"))])
            .await?;
        Ok(Self::first_row(rows))
    }

    async fn insert_seller_profile(&self, profile: &SellerProfile) -> Result<(), StoreError> {
        let _rows: Vec<SellerProfile> = self.table_insert("seller_profiles", profile).await?;
        Ok(())
    }

    async fn insert_agent_profile(&self, profile: &AgentProfile) -> Result<(), StoreError> {
        let _rows: Vec<AgentProfile> = self.table_insert("agent_profiles", profile).await?;
        Ok(())
    }

    async fn fetch_seller_profile(
        &self,
        user_id: &str,
    ) -> Result<Option<SellerProfile>, StoreError> {
        let rows = self
            .table_select("seller_profiles", &[("user_id", format!("eq.{user_id}"))])
            .await?;
        Ok(Self::first_row(rows))
    }

    async fn fetch_agent_profile(
        &self,
        user_id: &str,
    ) -> Result<Option<AgentProfile>, StoreError> {
        let rows = self
            .table_select("agent_profiles", &[("user_id", format!("eq.{user_id}"))])
            .await?;
        Ok(Self::first_row(rows))
    }
}

#[async_trait]
impl CreditLedger for SupabaseClient {
    async fn fetch_account(&self, agent_id: &str) -> Result<Option<CreditAccount>, StoreError> {
        let rows = self
            .table_select("agent_credits", &[("agent_id", format!("eq.{agent_id}"))])
            .await?;
        Ok(Self::first_row(rows))
    }

    async fn insert_account(&self, account: &CreditAccount) -> Result<CreditAccount, StoreError> {
        let rows = self.table_insert("agent_credits", account).await?;
        Self::single_row(rows)
    }

    async fn update_balance(
        &self,
        agent_id: &str,
        expected: i64,
        new_balance: i64,
    ) -> Result<CreditAccount, StoreError> {
        let rows: Vec<CreditAccount> = self
            .table_update(
                "agent_credits",
                &[
                    ("agent_id", format!("eq.{agent_id}")),
                    ("balance", format!("eq.{expected}")),
                ],
                &json!({ "balance": new_balance }),
            )
            .await?;
        // Zero affected rows means the guard value went stale.
        rows.into_iter().next().ok_or(StoreError::Conflict)
    }

    async fn insert_transaction(
        &self,
        transaction: &NewCreditTransaction,
    ) -> Result<CreditTransaction, StoreError> {
        let rows = self
            .table_insert("credit_transactions", transaction)
            .await?;
        Self::single_row(rows)
    }

    async fn transactions_for(&self, agent_id: &str) -> Result<Vec<CreditTransaction>, StoreError> {
        self.table_select(
            "credit_transactions",
            &[
                ("agent_id", format!("eq.{agent_id}")),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn fetch_access(
        &self,
        agent_id: &str,
        property_id: &str,
    ) -> Result<Option<ContactAccessGrant>, StoreError> {
        let rows = self
            .table_select(
                "contact_access",
                &[
                    ("agent_id", format!("eq.{agent_id}")),
                    ("property_id", format!("eq.{property_id}")),
                ],
            )
            .await?;
        Ok(Self::first_row(rows))
    }

    async fn insert_access(
        &self,
        access: &NewContactAccess,
    ) -> Result<ContactAccessGrant, StoreError> {
        let rows = self.table_insert("contact_access", access).await?;
        Self::single_row(rows)
    }
}

#[async_trait]
impl ListingStore for SupabaseClient {
    async fn insert(&self, listing: Value) -> Result<Vec<Value>, StoreError> {
        self.table_insert("properties", &listing).await
    }

    async fn list(&self) -> Result<Vec<Value>, StoreError> {
        self.table_select("properties", &[]).await
    }

    async fn fetch(&self, id: &str) -> Result<Vec<Value>, StoreError> {
        self.table_select("properties", &[("id", format!("eq.{id}"))])
            .await
    }

    async fn update(&self, id: &str, patch: Value) -> Result<Vec<Value>, StoreError> {
        self.table_update("properties", &[("id", format!("eq.{id}"))], &patch)
            .await
    }

    async fn delete(&self, id: &str) -> Result<Vec<Value>, StoreError> {
        self.table_delete("properties", &[("id", format!("eq.{id}"))])
            .await
    }
}
