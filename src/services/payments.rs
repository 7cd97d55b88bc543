//! Payment initiation: precondition checks, ledger insert, provider call.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Gateway, Transaction};
use crate::error::AppError;
use crate::gateways::{Continuation, GatewayRegistry, PaymentRequest};
use crate::ports::{AuthUser, CourseCatalog, EnrollmentStore, TransactionLedger};

#[derive(Debug)]
pub struct InitiatePayment {
    pub course_id: Uuid,
    pub gateway: Gateway,
    pub currency: Option<String>,
    pub return_url: Option<String>,
}

#[derive(Debug)]
pub struct PaymentInitiated {
    pub transaction_id: Uuid,
    pub gateway_reference: String,
    pub continuation: Continuation,
}

pub struct PaymentService {
    ledger: Arc<dyn TransactionLedger>,
    catalog: Arc<dyn CourseCatalog>,
    enrollments: Arc<dyn EnrollmentStore>,
    gateways: Arc<GatewayRegistry>,
}

impl PaymentService {
    pub fn new(
        ledger: Arc<dyn TransactionLedger>,
        catalog: Arc<dyn CourseCatalog>,
        enrollments: Arc<dyn EnrollmentStore>,
        gateways: Arc<GatewayRegistry>,
    ) -> Self {
        Self {
            ledger,
            catalog,
            enrollments,
            gateways,
        }
    }

    /// Preconditions are checked in order; the first failure wins. The
    /// ledger row is inserted before the provider call so the attempt is
    /// auditable even if the call never returns.
    pub async fn initiate(
        &self,
        user: &AuthUser,
        input: InitiatePayment,
    ) -> Result<PaymentInitiated, AppError> {
        let course = self
            .catalog
            .find_published(input.course_id)
            .await?
            .ok_or_else(|| AppError::NotFound("course not found or not available".to_string()))?;

        if course.is_free() {
            return Err(AppError::Validation("course is free".to_string()));
        }

        if self
            .enrollments
            .find_current(user.id, course.id)
            .await?
            .is_some()
        {
            return Err(AppError::Validation(
                "already enrolled in this course".to_string(),
            ));
        }

        let currency = input.currency.unwrap_or_else(|| course.currency.clone());
        let tx = Transaction::new(
            user.id,
            course.id,
            course.price.clone(),
            currency,
            input.gateway,
        );
        let tx = self.ledger.insert(&tx).await?;

        let request = PaymentRequest {
            transaction_id: tx.id,
            user_id: user.id,
            course_id: course.id,
            amount: tx.amount.clone(),
            currency: tx.currency.clone(),
            customer_email: user.email.clone(),
            return_url: input.return_url,
        };

        let initiated = match self.gateways.select(input.gateway).initiate(&request).await {
            Ok(initiated) => initiated,
            Err(err) => {
                // The provider attempt never completed, so the row stays
                // PENDING with its placeholder reference; a retry starts a
                // fresh transaction.
                tracing::error!(
                    transaction_id = %tx.id,
                    provider = err.provider(),
                    error = %err,
                    "payment initiation failed at the gateway"
                );
                return Err(AppError::Gateway(err));
            }
        };

        self.ledger
            .set_gateway_reference(tx.id, &initiated.reference)
            .await?;

        tracing::info!(
            transaction_id = %tx.id,
            provider = %input.gateway.as_str(),
            reference = %initiated.reference,
            "payment initiated"
        );

        Ok(PaymentInitiated {
            transaction_id: tx.id,
            gateway_reference: initiated.reference,
            continuation: initiated.continuation,
        })
    }
}
