use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mutable balance counter, one row per agent in `agent_credits`. The balance
/// is not derived from the transaction log; the two can drift if a multi-step
/// write fails midway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditAccount {
    pub agent_id: String,
    pub balance: i64,
}

/// Ledger entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Purchase,
    Usage,
}

/// Append-only row in `credit_transactions`. Positive amounts are purchases,
/// negative amounts are consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: String,
    pub agent_id: String,
    pub amount: i64,
    pub transaction_type: TransactionKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert body for a ledger row; the store assigns the row id.
#[derive(Debug, Clone, Serialize)]
pub struct NewCreditTransaction {
    pub agent_id: String,
    pub amount: i64,
    pub transaction_type: TransactionKind,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Row in `contact_access`: at most one active grant per (agent, property).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactAccessGrant {
    pub id: String,
    pub agent_id: String,
    pub property_id: String,
    pub granted_at: DateTime<Utc>,
    pub status: String,
    pub credit_transaction_id: String,
}

/// Insert body for a grant; the store assigns the row id.
#[derive(Debug, Clone, Serialize)]
pub struct NewContactAccess {
    pub agent_id: String,
    pub property_id: String,
    pub granted_at: DateTime<Utc>,
    pub status: String,
    pub credit_transaction_id: String,
}

/// Accepted payment methods for the stubbed gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    BankTransfer,
}

impl PaymentMethod {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "card" => Some(Self::Card),
            "bank_transfer" => Some(Self::BankTransfer),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::BankTransfer => "bank_transfer",
        }
    }
}

/// Fixed tariff applied by the ledger.
#[derive(Debug, Clone)]
pub struct LedgerPolicy {
    /// Price of one credit in the fixed currency.
    pub credit_price: i64,
    /// Credits consumed by one contact-access grant.
    pub access_cost: i64,
    pub currency: &'static str,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            credit_price: 50,
            access_cost: 5,
            currency: "CZK",
        }
    }
}

/// Receipt reported after a (stubbed) successful payment.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub payment_id: String,
    pub amount: i64,
    pub total_price: i64,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub status: String,
    pub transaction_id: String,
}

/// Grant view returned by the unlock flow. The repeat-access path reports the
/// existing grant without the two cost fields.
#[derive(Debug, Clone, Serialize)]
pub struct ContactAccessView {
    pub access_id: String,
    pub property_id: String,
    pub status: String,
    pub granted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits_used: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits_remaining: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_method_parses_published_values() {
        assert_eq!(PaymentMethod::parse("card"), Some(PaymentMethod::Card));
        assert_eq!(
            PaymentMethod::parse("bank_transfer"),
            Some(PaymentMethod::BankTransfer)
        );
        assert_eq!(PaymentMethod::parse("crypto"), None);
    }

    #[test]
    fn usage_transaction_body_omits_payment_id() {
        let body = NewCreditTransaction {
            agent_id: "a-1".to_string(),
            amount: -5,
            transaction_type: TransactionKind::Usage,
            description: "Contact access for property p-1".to_string(),
            payment_id: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&body).expect("serializes");
        assert!(json.get("payment_id").is_none());
        assert_eq!(json["transaction_type"], "usage");
        assert_eq!(json["amount"], -5);
    }

    #[test]
    fn repeat_access_view_hides_cost_fields() {
        let view = ContactAccessView {
            access_id: "acc-1".to_string(),
            property_id: "p-1".to_string(),
            status: "active".to_string(),
            granted_at: Utc::now(),
            credits_used: None,
            credits_remaining: None,
        };

        let json = serde_json::to_value(&view).expect("serializes");
        assert!(json.get("credits_used").is_none());
        assert!(json.get("credits_remaining").is_none());
    }
}
