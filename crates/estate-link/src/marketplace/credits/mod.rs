//! Credit-based paywall for agents: balance, top-up, consumption gating
//! seller-contact access, and transaction history.

pub mod domain;
pub mod ledger;
pub mod router;
pub mod service;

pub use domain::{
    ContactAccessGrant, ContactAccessView, CreditAccount, CreditTransaction, LedgerPolicy,
    NewContactAccess, NewCreditTransaction, PaymentMethod, PurchaseReceipt, TransactionKind,
};
pub use ledger::CreditLedger;
pub use router::credits_router;
pub use service::{CreditError, CreditService};
