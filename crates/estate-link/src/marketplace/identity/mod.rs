//! User registration, password and Google id-token login, session
//! introspection, and sign-out against the hosted identity provider.

pub mod directory;
pub mod domain;
pub mod provider;
pub mod router;
pub mod service;

pub use directory::UserDirectory;
pub use domain::{
    AgentProfile, CurrentUser, FederatedLogin, LoginSession, NewRegistration, ProfileView,
    RegisteredUser, SellerProfile, UserRecord, UserType,
};
pub use provider::{IdentityProvider, ProviderAccount, ProviderError, ProviderSession};
pub use router::identity_router;
pub use service::{IdentityError, IdentityService};
