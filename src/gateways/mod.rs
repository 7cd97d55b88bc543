//! Payment gateway adapters.
//!
//! Each provider implements [`PaymentGateway`]: `initiate` turns a generic
//! payment request into a provider call and `verify`/`normalize` turn a raw
//! webhook delivery into a provider-agnostic [`PaymentEvent`]. Providers are
//! selected by enum dispatch through [`GatewayRegistry`].

pub mod client;
pub mod flutterwave;
pub mod paystack;
pub mod stripe;

use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::Gateway;

pub use flutterwave::FlutterwaveGateway;
pub use paystack::PaystackGateway;
pub use stripe::StripeGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{provider} rejected the request: {detail}")]
    Rejected {
        provider: &'static str,
        detail: String,
    },

    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} circuit breaker is open")]
    CircuitOpen { provider: &'static str },

    #[error("{provider} returned an unexpected response: {detail}")]
    InvalidResponse {
        provider: &'static str,
        detail: String,
    },

    #[error("amount not representable for {provider}: {detail}")]
    Amount {
        provider: &'static str,
        detail: String,
    },
}

impl GatewayError {
    pub fn provider(&self) -> &'static str {
        match self {
            GatewayError::Rejected { provider, .. }
            | GatewayError::Transport { provider, .. }
            | GatewayError::CircuitOpen { provider }
            | GatewayError::InvalidResponse { provider, .. }
            | GatewayError::Amount { provider, .. } => provider,
        }
    }
}

/// Webhook authenticity failures. Permanent for the payload in question.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("missing signature header")]
    MissingSignature,

    #[error("malformed signature header: {0}")]
    MalformedSignature(String),

    #[error("signature mismatch")]
    Mismatch,

    #[error("signature timestamp outside tolerance")]
    StaleTimestamp,

    #[error("unparseable payload: {0}")]
    MalformedPayload(String),
}

/// Generic payment-intent request handed to an adapter. The correlation
/// fields are embedded in a provider-visible metadata container so the async
/// notification can be mapped back without a side lookup table.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub transaction_id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub amount: BigDecimal,
    pub currency: String,
    pub customer_email: String,
    pub return_url: Option<String>,
}

/// Client-facing continuation data, shaped by the provider's flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    Redirect(String),
    ClientSecret(String),
}

#[derive(Debug, Clone)]
pub struct InitiatedPayment {
    pub reference: String,
    pub continuation: Continuation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Succeeded,
    Failed,
    Refunded,
}

/// A provider notification reduced to the fields the reconciler needs. The
/// identifiers come from the correlation metadata round-tripped through the
/// provider, never from a bare provider transaction id.
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub transaction_id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub outcome: EventOutcome,
    pub provider_event_id: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn initiate(&self, request: &PaymentRequest) -> Result<InitiatedPayment, GatewayError>;

    /// Authenticate a raw webhook delivery against the provider's signing
    /// scheme. Must be called before `normalize`.
    fn verify(&self, payload: &[u8], signature: Option<&str>) -> Result<(), VerificationError>;

    /// Reduce a verified payload to a [`PaymentEvent`]. `None` means the
    /// event carries no payment outcome for this core (unrelated event type
    /// or missing correlation metadata) and should be acknowledged as-is.
    fn normalize(&self, payload: &[u8]) -> Result<Option<PaymentEvent>, VerificationError>;
}

/// Enum-dispatched adapter lookup.
pub struct GatewayRegistry {
    stripe: Arc<dyn PaymentGateway>,
    paystack: Arc<dyn PaymentGateway>,
    flutterwave: Arc<dyn PaymentGateway>,
}

impl GatewayRegistry {
    pub fn new(
        stripe: Arc<dyn PaymentGateway>,
        paystack: Arc<dyn PaymentGateway>,
        flutterwave: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            stripe,
            paystack,
            flutterwave,
        }
    }

    pub fn select(&self, gateway: Gateway) -> &Arc<dyn PaymentGateway> {
        match gateway {
            Gateway::Stripe => &self.stripe,
            Gateway::Paystack => &self.paystack,
            Gateway::Flutterwave => &self.flutterwave,
        }
    }
}

/// Correlation metadata as serialized into provider requests.
#[derive(Debug, Serialize)]
pub struct CorrelationMetadata {
    pub transaction_id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
}

impl CorrelationMetadata {
    pub fn from_request(request: &PaymentRequest) -> Self {
        Self {
            transaction_id: request.transaction_id,
            user_id: request.user_id,
            course_id: request.course_id,
        }
    }
}

/// Pull the round-tripped correlation identifiers out of a provider metadata
/// container. A container without the expected keys yields `None` (the event
/// cannot be mapped to a ledger row and is ignored); keys that are present
/// but not valid UUIDs are treated as a malformed payload.
pub(crate) fn parse_correlation(
    container: &serde_json::Value,
) -> Result<Option<(Uuid, Uuid, Uuid)>, VerificationError> {
    let (Some(tx), Some(user), Some(course)) = (
        container.get("transaction_id").and_then(|v| v.as_str()),
        container.get("user_id").and_then(|v| v.as_str()),
        container.get("course_id").and_then(|v| v.as_str()),
    ) else {
        return Ok(None);
    };

    let parse = |field: &str, value: &str| {
        Uuid::parse_str(value).map_err(|_| {
            VerificationError::MalformedPayload(format!("{field} is not a valid UUID"))
        })
    };

    Ok(Some((
        parse("transaction_id", tx)?,
        parse("user_id", user)?,
        parse("course_id", course)?,
    )))
}

/// Convert a major-unit decimal amount to integer minor units (cents, kobo).
/// Rejects amounts with more than two decimal places rather than rounding
/// money silently.
pub(crate) fn to_minor_units(amount: &BigDecimal) -> Option<i64> {
    let scaled = amount * BigDecimal::from(100);
    let truncated = scaled.with_scale(0);
    if truncated != scaled {
        return None;
    }
    truncated.to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_amounts_convert_to_minor_units() {
        let amount: BigDecimal = "50".parse().unwrap();
        assert_eq!(to_minor_units(&amount), Some(5000));
    }

    #[test]
    fn two_decimal_places_convert_exactly() {
        let amount: BigDecimal = "19.99".parse().unwrap();
        assert_eq!(to_minor_units(&amount), Some(1999));
    }

    #[test]
    fn sub_cent_amounts_are_rejected() {
        let amount: BigDecimal = "10.005".parse().unwrap();
        assert_eq!(to_minor_units(&amount), None);
    }

    #[test]
    fn trailing_zeros_do_not_matter() {
        let amount: BigDecimal = "25.50".parse().unwrap();
        assert_eq!(to_minor_units(&amount), Some(2550));
    }
}
