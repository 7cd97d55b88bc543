//! Periodic repair of the two gaps webhooks can leave behind: COMPLETED
//! transactions whose finalization failed mid-flight, and PENDING
//! transactions whose provider never called back.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use crate::domain::TransactionStatus;
use crate::ports::{EnrollmentStore, StoreResult, TransactionLedger};
use crate::services::EnrollmentService;

pub struct MaintenanceSweep {
    ledger: Arc<dyn TransactionLedger>,
    enrollments: Arc<dyn EnrollmentStore>,
    finalizer: Arc<EnrollmentService>,
    pending_max_age: chrono::Duration,
}

impl MaintenanceSweep {
    pub fn new(
        ledger: Arc<dyn TransactionLedger>,
        enrollments: Arc<dyn EnrollmentStore>,
        finalizer: Arc<EnrollmentService>,
        pending_max_age: chrono::Duration,
    ) -> Self {
        Self {
            ledger,
            enrollments,
            finalizer,
            pending_max_age,
        }
    }

    /// Re-run finalization for every COMPLETED transaction lacking a current
    /// enrollment. The transaction state is the source of truth; the
    /// enrollment is a derived side effect that may lag.
    pub async fn repair_unfinalized(&self) -> StoreResult<u64> {
        let completed = self
            .ledger
            .list_by_status(TransactionStatus::Completed)
            .await?;

        let mut repaired = 0;
        for tx in completed {
            if self
                .enrollments
                .find_current(tx.user_id, tx.course_id)
                .await?
                .is_none()
            {
                self.finalizer.finalize(tx.user_id, tx.course_id).await?;
                tracing::warn!(
                    transaction_id = %tx.id,
                    user_id = %tx.user_id,
                    course_id = %tx.course_id,
                    "repaired missing enrollment for completed transaction"
                );
                repaired += 1;
            }
        }

        Ok(repaired)
    }

    /// Fail PENDING transactions older than the configured age so abandoned
    /// attempts do not linger forever.
    pub async fn expire_stale_pending(&self) -> StoreResult<u64> {
        self.expire_before(Utc::now() - self.pending_max_age).await
    }

    pub async fn expire_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let expired = self.ledger.expire_pending_older_than(cutoff).await?;
        if expired > 0 {
            tracing::info!(expired, "expired stale pending transactions");
        }
        Ok(expired)
    }

    pub async fn run_once(&self) {
        if let Err(err) = self.repair_unfinalized().await {
            tracing::error!(error = %err, "enrollment repair sweep failed");
        }
        if let Err(err) = self.expire_stale_pending().await {
            tracing::error!(error = %err, "pending expiry sweep failed");
        }
    }

    /// Spawn the sweep on a fixed interval for the lifetime of the process.
    pub fn spawn(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                self.run_once().await;
            }
        })
    }
}
