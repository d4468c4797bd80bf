use std::sync::Arc;

use tracing::warn;

use super::directory::UserDirectory;
use super::domain::{
    AgentProfile, CurrentUser, FederatedLogin, LoginSession, NewRegistration, ProfileView,
    RegisteredUser, SellerProfile, UserRecord, UserType,
};
use super::provider::{IdentityProvider, ProviderError};
use crate::marketplace::credits::{CreditAccount, CreditLedger};
use crate::marketplace::StoreError;

const GOOGLE_PROVIDER: &str = "google";

/// Service composing the identity provider, the user directory, and the
/// credit ledger (agents receive a zero-balance account at registration).
pub struct IdentityService<P, D, L> {
    provider: Arc<P>,
    directory: Arc<D>,
    ledger: Arc<L>,
}

impl<P, D, L> IdentityService<P, D, L>
where
    P: IdentityProvider + 'static,
    D: UserDirectory + 'static,
    L: CreditLedger + 'static,
{
    pub fn new(provider: Arc<P>, directory: Arc<D>, ledger: Arc<L>) -> Self {
        Self {
            provider,
            directory,
            ledger,
        }
    }

    /// Register a new account: provider sign-up, then the `users` row,
    /// exactly one role profile, and a zero-balance credit account for
    /// agents. Any failure after the provider account exists triggers
    /// best-effort deletion of that account before the error is returned.
    pub async fn register(
        &self,
        registration: NewRegistration,
    ) -> Result<RegisteredUser, IdentityError> {
        let NewRegistration {
            email,
            password,
            user_type,
            full_name,
            phone,
        } = registration;

        let account = self.provider.sign_up(&email, &password).await?;

        let record = UserRecord {
            id: account.id.clone(),
            email,
            user_type,
            full_name,
            phone: Some(phone.unwrap_or_default()),
            status: "active".to_string(),
            auth_provider: "email".to_string(),
        };

        match self.provision(record).await {
            Ok(user) => Ok(RegisteredUser {
                id: user.id,
                email: user.email,
                user_type: user.user_type,
                full_name: user.full_name,
            }),
            Err(error) => {
                // Compensation only; the account may legitimately be gone already.
                if let Err(cleanup) = self.provider.delete_account(&account.id).await {
                    warn!(
                        user_id = %account.id,
                        error = %cleanup,
                        "failed to remove provider account after registration error"
                    );
                }
                Err(error)
            }
        }
    }

    /// Password login: provider grant, then the `users` row. A provider
    /// account without a matching row is an inconsistent state and fails.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession, IdentityError> {
        let session = self
            .provider
            .sign_in_with_password(email, password)
            .await?;
        let user = self
            .directory
            .fetch_user(&session.account.id)
            .await?
            .ok_or(IdentityError::ProfileMissing)?;

        Ok(LoginSession {
            user,
            access_token: session.access_token,
        })
    }

    /// Google id-token login. First-time sign-ins (timestamp heuristic, see
    /// `ProviderAccount::first_sign_in_via`) must declare a user type and run
    /// the same provisioning sequence as `register`; returning users are
    /// fetched from the directory.
    pub async fn login_with_google(
        &self,
        id_token: &str,
        user_type: Option<&str>,
    ) -> Result<FederatedLogin, IdentityError> {
        let session = self
            .provider
            .sign_in_with_id_token(GOOGLE_PROVIDER, id_token)
            .await?;
        let account = session.account;
        let is_new_user = account.first_sign_in_via(GOOGLE_PROVIDER);

        let user = if is_new_user {
            let declared = user_type.ok_or(IdentityError::UserTypeRequired)?;
            let user_type =
                UserType::parse(declared).ok_or(IdentityError::InvalidUserType)?;

            self.provision(UserRecord {
                id: account.id.clone(),
                email: account.email.clone().unwrap_or_default(),
                user_type,
                full_name: account.full_name.clone().unwrap_or_default(),
                phone: None,
                status: "active".to_string(),
                auth_provider: GOOGLE_PROVIDER.to_string(),
            })
            .await?
        } else {
            self.directory
                .fetch_user(&account.id)
                .await?
                .ok_or(IdentityError::ProfileMissing)?
        };

        Ok(FederatedLogin {
            user,
            access_token: session.access_token,
            is_new_user,
        })
    }

    /// Invalidate the presented session with the provider; a missing token is
    /// a no-op.
    pub async fn logout(&self, token: Option<&str>) -> Result<(), IdentityError> {
        let Some(token) = token else {
            return Ok(());
        };
        self.provider.sign_out(token).await?;
        Ok(())
    }

    /// Resolve the token to the `users` row and attach the role profile plus,
    /// for agents, the credit account.
    pub async fn current_user(&self, token: &str) -> Result<CurrentUser, IdentityError> {
        let account = self.provider.authenticated_account(token).await?;
        let user = self
            .directory
            .fetch_user(&account.id)
            .await?
            .ok_or(IdentityError::ProfileMissing)?;

        let mut profile = None;
        let mut credits = None;
        match user.user_type {
            UserType::Seller => {
                profile = self
                    .directory
                    .fetch_seller_profile(&user.id)
                    .await?
                    .map(ProfileView::Seller);
            }
            UserType::Agent => {
                profile = self
                    .directory
                    .fetch_agent_profile(&user.id)
                    .await?
                    .map(ProfileView::Agent);
                credits = self.ledger.fetch_account(&user.id).await?;
            }
        }

        Ok(CurrentUser {
            user,
            profile,
            credits,
        })
    }

    /// Insert the `users` row and the role-specific rows it implies.
    async fn provision(&self, record: UserRecord) -> Result<UserRecord, IdentityError> {
        let stored = self.directory.insert_user(&record).await?;

        match record.user_type {
            UserType::Seller => {
                self.directory
                    .insert_seller_profile(&SellerProfile {
                        user_id: record.id.clone(),
                    })
                    .await?;
            }
            UserType::Agent => {
                self.directory
                    .insert_agent_profile(&AgentProfile {
                        user_id: record.id.clone(),
                        average_rating: 0.0,
                        successful_transactions: 0,
                    })
                    .await?;
                self.ledger
                    .insert_account(&CreditAccount {
                        agent_id: record.id.clone(),
                        balance: 0,
                    })
                    .await?;
            }
        }

        Ok(stored)
    }
}

/// Error raised by the identity service.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid user type, allowed values: seller, agent")]
    InvalidUserType,
    #[error("a user type is required for a first-time sign-in")]
    UserTypeRequired,
    #[error("user profile not found")]
    ProfileMissing,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
