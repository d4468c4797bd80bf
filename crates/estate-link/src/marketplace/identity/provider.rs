use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Account snapshot reported by the hosted identity provider.
#[derive(Debug, Clone)]
pub struct ProviderAccount {
    pub id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub provider: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProviderAccount {
    /// First-sign-in heuristic: the provider reports a federated account whose
    /// creation and update timestamps still match. Best effort only; the
    /// provider exposes no explicit first-sign-in flag.
    pub fn first_sign_in_via(&self, provider: &str) -> bool {
        self.provider.as_deref() == Some(provider)
            && self.created_at.is_some()
            && self.created_at == self.updated_at
    }
}

/// Session established by the provider: the account plus its opaque token.
#[derive(Debug, Clone)]
pub struct ProviderSession {
    pub account: ProviderAccount,
    pub access_token: String,
}

/// Gateway to the hosted identity provider so the services can be exercised
/// against an in-memory fake.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str)
        -> Result<ProviderAccount, ProviderError>;
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderSession, ProviderError>;
    async fn sign_in_with_id_token(
        &self,
        provider: &str,
        id_token: &str,
    ) -> Result<ProviderSession, ProviderError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError>;
    async fn authenticated_account(
        &self,
        access_token: &str,
    ) -> Result<ProviderAccount, ProviderError>;
    /// Admin-scoped deletion, used only as best-effort compensation when
    /// registration fails after the provider account exists.
    async fn delete_account(&self, user_id: &str) -> Result<(), ProviderError>;
}

/// Error enumeration for identity-provider failures.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid or expired access token")]
    InvalidToken,
    #[error("identity provider rejected the request: {0}")]
    Rejected(String),
    #[error("identity provider unreachable: {0}")]
    Transport(String),
}
