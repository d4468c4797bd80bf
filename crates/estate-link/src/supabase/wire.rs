//! Wire DTOs for the hosted backend: GoTrue grant bodies and session/user
//! payloads, plus the PostgREST error body. Shapes match the documented
//! endpoints exactly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::marketplace::identity::{ProviderAccount, ProviderSession};

#[derive(Debug, Serialize)]
pub(crate) struct PasswordGrant<'a> {
    pub(crate) email: &'a str,
    pub(crate) password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct IdTokenGrant<'a> {
    pub(crate) provider: &'a str,
    pub(crate) id_token: &'a str,
}

/// Token-grant response: the opaque access token plus the account snapshot.
#[derive(Debug, Deserialize)]
pub(crate) struct SessionPayload {
    pub(crate) access_token: String,
    pub(crate) user: UserPayload,
}

/// Account object as the provider reports it.
#[derive(Debug, Deserialize)]
pub(crate) struct UserPayload {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) app_metadata: AppMetadata,
    #[serde(default)]
    pub(crate) user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AppMetadata {
    #[serde(default)]
    pub(crate) provider: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UserMetadata {
    #[serde(default)]
    pub(crate) full_name: Option<String>,
}

/// `/signup` answers with a full session when the project auto-confirms, or a
/// bare user while e-mail confirmation is pending.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SignUpPayload {
    Session(SessionPayload),
    User(UserPayload),
}

impl SignUpPayload {
    pub(crate) fn into_user(self) -> UserPayload {
        match self {
            SignUpPayload::Session(session) => session.user,
            SignUpPayload::User(user) => user,
        }
    }
}

/// Error body returned by the auth endpoints. Field names vary across
/// provider versions, so every candidate is optional.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AuthErrorPayload {
    #[serde(default)]
    pub(crate) error_description: Option<String>,
    #[serde(default)]
    pub(crate) msg: Option<String>,
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) error: Option<String>,
}

impl AuthErrorPayload {
    pub(crate) fn describe(self, fallback: String) -> String {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
            .unwrap_or(fallback)
    }
}

/// Error body returned by the table endpoints.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct StoreErrorPayload {
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) code: Option<String>,
}

impl From<UserPayload> for ProviderAccount {
    fn from(user: UserPayload) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.user_metadata.full_name,
            provider: user.app_metadata.provider,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<SessionPayload> for ProviderSession {
    fn from(session: SessionPayload) -> Self {
        Self {
            account: session.user.into(),
            access_token: session.access_token,
        }
    }
}
