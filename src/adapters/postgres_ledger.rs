//! Postgres implementation of the transaction ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Gateway, Transaction, TransactionStatus, LOCAL_REFERENCE_PREFIX};
use crate::ports::{StoreError, StoreResult, TransactionLedger, Transition};

#[derive(Clone)]
pub struct PostgresTransactionLedger {
    pool: PgPool,
}

impl PostgresTransactionLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionLedger for PostgresTransactionLedger {
    async fn insert(&self, tx: &Transaction) -> StoreResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            INSERT INTO transactions (
                id, user_id, course_id, amount, currency,
                gateway, gateway_reference, status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, user_id, course_id, amount, currency,
                gateway, gateway_reference, status, created_at, updated_at
            "#,
        )
        .bind(tx.id)
        .bind(tx.user_id)
        .bind(tx.course_id)
        .bind(&tx.amount)
        .bind(&tx.currency)
        .bind(tx.gateway.as_str())
        .bind(&tx.gateway_reference)
        .bind(tx.status.as_str())
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from)?;

        row.into_domain()
    }

    async fn get(&self, id: Uuid) -> StoreResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        row.map(|r| r.into_domain())
            .transpose()?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn set_gateway_reference(&self, id: Uuid, reference: &str) -> StoreResult<()> {
        // Only a placeholder may be replaced; a real provider reference is
        // never overwritten.
        sqlx::query(
            r#"
            UPDATE transactions
            SET gateway_reference = $2, updated_at = NOW()
            WHERE id = $1 AND gateway_reference LIKE $3
            "#,
        )
        .bind(id)
        .bind(reference)
        .bind(format!("{LOCAL_REFERENCE_PREFIX}%"))
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(())
    }

    async fn transition(
        &self,
        id: Uuid,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> StoreResult<Transition> {
        if !from.can_transition(to) {
            return Err(StoreError::Conflict(format!(
                "illegal transition {} -> {}",
                from.as_str(),
                to.as_str()
            )));
        }

        let updated = sqlx::query_as::<_, TransactionRow>(
            r#"
            UPDATE transactions
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING id, user_id, course_id, amount, currency,
                gateway, gateway_reference, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        if let Some(row) = updated {
            return Ok(Transition::Applied(row.into_domain()?));
        }

        // Lost the compare-and-set (or the row never existed); report the
        // current row so the caller can classify the delivery.
        let current = self.get(id).await?;
        Ok(Transition::Superseded(current))
    }

    async fn list_by_status(&self, status: TransactionStatus) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions WHERE status = $1 ORDER BY created_at",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;

        rows.into_iter().map(|r| r.into_domain()).collect()
    }

    async fn expire_pending_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = $2, updated_at = NOW()
            WHERE status = $1 AND created_at < $3
            "#,
        )
        .bind(TransactionStatus::Pending.as_str())
        .bind(TransactionStatus::Failed.as_str())
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(result.rows_affected())
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    amount: sqlx::types::BigDecimal,
    currency: String,
    gateway: String,
    gateway_reference: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_domain(self) -> StoreResult<Transaction> {
        let gateway = Gateway::parse(&self.gateway)
            .ok_or_else(|| StoreError::Backend(format!("unknown gateway '{}'", self.gateway)))?;
        let status = TransactionStatus::parse(&self.status)
            .ok_or_else(|| StoreError::Backend(format!("unknown status '{}'", self.status)))?;

        Ok(Transaction {
            id: self.id,
            user_id: self.user_id,
            course_id: self.course_id,
            amount: self.amount,
            currency: self.currency,
            gateway,
            gateway_reference: self.gateway_reference,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
