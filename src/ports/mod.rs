//! Storage and collaborator ports. Adapters live in `crate::adapters`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Course, Enrollment, Transaction, TransactionStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a conditional status transition.
#[derive(Debug, Clone)]
pub enum Transition {
    /// This caller won the compare-and-set; the row now holds the new status.
    Applied(Transaction),
    /// The row was no longer in the expected status. Carries the current row
    /// so the caller can distinguish duplicate delivery from out-of-order
    /// delivery.
    Superseded(Transaction),
}

/// The authoritative record of payment attempts.
#[async_trait]
pub trait TransactionLedger: Send + Sync {
    async fn insert(&self, tx: &Transaction) -> StoreResult<Transaction>;

    async fn get(&self, id: Uuid) -> StoreResult<Transaction>;

    /// Replace the local placeholder reference with the provider's real one.
    /// A reference that is already real is left untouched.
    async fn set_gateway_reference(&self, id: Uuid, reference: &str) -> StoreResult<()>;

    /// Atomic single-row compare-and-set: the status moves from `from` to
    /// `to` only if the row still holds `from`. Concurrent webhook
    /// deliveries serialize here.
    async fn transition(
        &self,
        id: Uuid,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> StoreResult<Transition>;

    async fn list_by_status(&self, status: TransactionStatus) -> StoreResult<Vec<Transaction>>;

    /// Bulk-fail PENDING rows created before `cutoff`. Returns the number of
    /// rows expired.
    async fn expire_pending_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}

/// Membership records. Owned by this store; the ledger drives writes.
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// The ACTIVE-or-COMPLETED enrollment for (user, course), if any.
    async fn find_current(&self, user_id: Uuid, course_id: Uuid)
        -> StoreResult<Option<Enrollment>>;

    /// Idempotent insert: if a current enrollment already exists for the
    /// pair, it is returned unchanged instead of erroring or duplicating.
    async fn insert_or_get(&self, enrollment: &Enrollment) -> StoreResult<Enrollment>;
}

/// Read-only view of the course catalog.
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    /// The course, only if it exists and is PUBLISHED.
    async fn find_published(&self, id: Uuid) -> StoreResult<Option<Course>>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

/// External identity service. Resolves a bearer token to a user.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn resolve_bearer(&self, token: &str) -> StoreResult<Option<AuthUser>>;
}
