use serde::{Deserialize, Serialize};

use crate::marketplace::credits::CreditAccount;

/// Role a marketplace account holds. Exactly one role profile exists per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Seller,
    Agent,
}

impl UserType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "seller" => Some(Self::Seller),
            "agent" => Some(Self::Agent),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Seller => "seller",
            Self::Agent => "agent",
        }
    }
}

/// Row in the `users` table; the same shape doubles as the insert body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub user_type: UserType,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub status: String,
    pub auth_provider: String,
}

/// Row in `seller_profiles`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerProfile {
    pub user_id: String,
}

/// Row in `agent_profiles`, zero-initialised at registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub user_id: String,
    pub average_rating: f64,
    pub successful_transactions: i64,
}

/// Input to `register`; field presence is validated at the router boundary.
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub email: String,
    pub password: String,
    pub user_type: UserType,
    pub full_name: String,
    pub phone: Option<String>,
}

/// Response payload for a successful registration.
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredUser {
    pub id: String,
    pub email: String,
    pub user_type: UserType,
    pub full_name: String,
}

/// Session established by the password login flow.
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub user: UserRecord,
    pub access_token: String,
}

/// Federated login result carrying the first-sign-in flag.
#[derive(Debug, Clone)]
pub struct FederatedLogin {
    pub user: UserRecord,
    pub access_token: String,
    pub is_new_user: bool,
}

/// Role-specific attachment on the current-user view.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProfileView {
    Seller(SellerProfile),
    Agent(AgentProfile),
}

/// Current-user payload: the user row plus role-specific attachments.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    #[serde(flatten)]
    pub user: UserRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<CreditAccount>,
}
