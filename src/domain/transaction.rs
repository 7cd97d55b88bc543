//! Transaction domain entity.
//! The authoritative ledger record of one payment attempt.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix of the synthetic reference a transaction carries until the
/// provider assigns a real one.
pub const LOCAL_REFERENCE_PREFIX: &str = "local_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gateway {
    Stripe,
    Paystack,
    Flutterwave,
}

impl Gateway {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gateway::Stripe => "STRIPE",
            Gateway::Paystack => "PAYSTACK",
            Gateway::Flutterwave => "FLUTTERWAVE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "STRIPE" => Some(Gateway::Stripe),
            "PAYSTACK" => Some(Gateway::Paystack),
            "FLUTTERWAVE" => Some(Gateway::Flutterwave),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(TransactionStatus::Pending),
            "COMPLETED" => Some(TransactionStatus::Completed),
            "FAILED" => Some(TransactionStatus::Failed),
            "REFUNDED" => Some(TransactionStatus::Refunded),
            _ => None,
        }
    }

    /// FAILED and REFUNDED accept nothing; COMPLETED accepts only REFUNDED.
    pub fn can_transition(&self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Pending, TransactionStatus::Completed)
                | (TransactionStatus::Pending, TransactionStatus::Failed)
                | (TransactionStatus::Completed, TransactionStatus::Refunded)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Failed | TransactionStatus::Refunded)
    }
}

/// One payment attempt. Amount and currency are fixed at creation; only the
/// gateway reference and status change afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub amount: BigDecimal,
    pub currency: String,
    pub gateway: Gateway,
    pub gateway_reference: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        user_id: Uuid,
        course_id: Uuid,
        amount: BigDecimal,
        currency: String,
        gateway: Gateway,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            amount,
            currency,
            gateway,
            gateway_reference: format!("{}{}", LOCAL_REFERENCE_PREFIX, Uuid::new_v4().simple()),
            status: TransactionStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_placeholder_reference(&self) -> bool {
        self.gateway_reference.starts_with(LOCAL_REFERENCE_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_reaches_both_outcomes() {
        assert!(TransactionStatus::Pending.can_transition(TransactionStatus::Completed));
        assert!(TransactionStatus::Pending.can_transition(TransactionStatus::Failed));
    }

    #[test]
    fn completed_only_admits_refund() {
        assert!(TransactionStatus::Completed.can_transition(TransactionStatus::Refunded));
        assert!(!TransactionStatus::Completed.can_transition(TransactionStatus::Failed));
        assert!(!TransactionStatus::Completed.can_transition(TransactionStatus::Pending));
    }

    #[test]
    fn terminal_states_admit_nothing() {
        for terminal in [TransactionStatus::Failed, TransactionStatus::Refunded] {
            assert!(terminal.is_terminal());
            for next in [
                TransactionStatus::Pending,
                TransactionStatus::Completed,
                TransactionStatus::Failed,
                TransactionStatus::Refunded,
            ] {
                assert!(!terminal.can_transition(next));
            }
        }
    }

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Completed,
            TransactionStatus::Failed,
            TransactionStatus::Refunded,
        ] {
            assert_eq!(TransactionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TransactionStatus::parse("UNKNOWN"), None);
    }

    #[test]
    fn new_transaction_starts_pending_with_placeholder() {
        let tx = Transaction::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            BigDecimal::from(50),
            "USD".to_string(),
            Gateway::Stripe,
        );
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert!(tx.has_placeholder_reference());
    }
}
