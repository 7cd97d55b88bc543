//! Webhook reconciliation. Provider adapters reduce notifications to
//! [`PaymentEvent`]s; everything in this module is provider-agnostic.
//!
//! Delivery is at-least-once and possibly out of order, so every transition
//! here must be safe to apply more than once. The conditional update in the
//! ledger is the serialization point: of N concurrent deliveries for one
//! transaction, exactly one observes `Applied` and runs the side effects.

use std::sync::Arc;

use crate::domain::TransactionStatus;
use crate::error::AppError;
use crate::gateways::{EventOutcome, PaymentEvent, PaymentGateway};
use crate::ports::{StoreError, TransactionLedger, Transition};
use crate::services::EnrollmentService;

pub struct Reconciler {
    ledger: Arc<dyn TransactionLedger>,
    finalizer: Arc<EnrollmentService>,
}

impl Reconciler {
    pub fn new(ledger: Arc<dyn TransactionLedger>, finalizer: Arc<EnrollmentService>) -> Self {
        Self { ledger, finalizer }
    }

    /// Full webhook path: authenticate, normalize, reconcile. Verification
    /// failures abort before any state is read or written.
    pub async fn handle_webhook(
        &self,
        gateway: &dyn PaymentGateway,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<(), AppError> {
        gateway.verify(payload, signature)?;

        let Some(event) = gateway.normalize(payload)? else {
            tracing::debug!(
                provider = gateway.name(),
                "webhook event carries no payment outcome, acknowledging"
            );
            return Ok(());
        };

        self.process(gateway.name(), &event).await
    }

    pub async fn process(&self, provider: &str, event: &PaymentEvent) -> Result<(), AppError> {
        match event.outcome {
            EventOutcome::Succeeded => self.apply_success(provider, event).await,
            EventOutcome::Failed => {
                self.apply_transition(
                    provider,
                    event,
                    TransactionStatus::Pending,
                    TransactionStatus::Failed,
                )
                .await
            }
            EventOutcome::Refunded => {
                self.apply_transition(
                    provider,
                    event,
                    TransactionStatus::Completed,
                    TransactionStatus::Refunded,
                )
                .await
            }
        }
    }

    async fn apply_success(&self, provider: &str, event: &PaymentEvent) -> Result<(), AppError> {
        match self
            .ledger
            .transition(
                event.transaction_id,
                TransactionStatus::Pending,
                TransactionStatus::Completed,
            )
            .await
        {
            Ok(Transition::Applied(tx)) => {
                tracing::info!(
                    transaction_id = %tx.id,
                    provider,
                    provider_event_id = %event.provider_event_id,
                    "transaction completed"
                );
                if let Err(err) = self.finalizer.finalize(event.user_id, event.course_id).await {
                    // The COMPLETED transition is already committed and is
                    // the source of truth; the maintenance sweep repairs the
                    // missing enrollment.
                    tracing::error!(
                        transaction_id = %tx.id,
                        error = %err,
                        "enrollment finalization failed after completion"
                    );
                    return Err(err.into());
                }
                Ok(())
            }
            Ok(Transition::Superseded(tx)) => {
                tracing::info!(
                    transaction_id = %tx.id,
                    provider,
                    status = tx.status.as_str(),
                    provider_event_id = %event.provider_event_id,
                    "duplicate success notification acknowledged"
                );
                Ok(())
            }
            Err(StoreError::NotFound(_)) => Err(AppError::Validation(format!(
                "notification references unknown transaction {}",
                event.transaction_id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn apply_transition(
        &self,
        provider: &str,
        event: &PaymentEvent,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Result<(), AppError> {
        match self.ledger.transition(event.transaction_id, from, to).await {
            Ok(Transition::Applied(tx)) => {
                tracing::info!(
                    transaction_id = %tx.id,
                    provider,
                    status = to.as_str(),
                    provider_event_id = %event.provider_event_id,
                    "transaction transitioned"
                );
                Ok(())
            }
            Ok(Transition::Superseded(tx)) => {
                // Duplicate or out-of-order delivery. A failure notification
                // arriving after completion lands here and must not revert
                // the terminal state.
                tracing::info!(
                    transaction_id = %tx.id,
                    provider,
                    status = tx.status.as_str(),
                    attempted = to.as_str(),
                    "notification superseded by current state, acknowledging"
                );
                Ok(())
            }
            Err(StoreError::NotFound(_)) => Err(AppError::Validation(format!(
                "notification references unknown transaction {}",
                event.transaction_id
            ))),
            Err(err) => Err(err.into()),
        }
    }
}
