//! Stripe adapter. Card-network flow: the client finishes payment with a
//! client secret rather than a redirect.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::client::GatewayHttpClient;
use super::{
    parse_correlation, to_minor_units, Continuation, EventOutcome, GatewayError, InitiatedPayment,
    PaymentEvent, PaymentGateway, PaymentRequest, VerificationError,
};

type HmacSha256 = Hmac<Sha256>;

const PROVIDER: &str = "stripe";

/// Maximum accepted age of a signed notification, in seconds.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub struct StripeGateway {
    client: GatewayHttpClient,
    webhook_secret: String,
}

impl StripeGateway {
    pub fn new(
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
        webhook_secret: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: GatewayHttpClient::new(PROVIDER, base_url, secret_key, timeout),
            webhook_secret: webhook_secret.into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn initiate(&self, request: &PaymentRequest) -> Result<InitiatedPayment, GatewayError> {
        let amount = to_minor_units(&request.amount).ok_or_else(|| GatewayError::Amount {
            provider: PROVIDER,
            detail: format!("{} has sub-cent precision", request.amount),
        })?;

        let form = vec![
            ("amount".to_string(), amount.to_string()),
            ("currency".to_string(), request.currency.to_lowercase()),
            ("receipt_email".to_string(), request.customer_email.clone()),
            (
                "metadata[transaction_id]".to_string(),
                request.transaction_id.to_string(),
            ),
            (
                "metadata[user_id]".to_string(),
                request.user_id.to_string(),
            ),
            (
                "metadata[course_id]".to_string(),
                request.course_id.to_string(),
            ),
        ];

        let body = self.client.post_form("/v1/payment_intents", form).await?;

        let reference = body
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| GatewayError::InvalidResponse {
                provider: PROVIDER,
                detail: "payment intent response missing id".to_string(),
            })?
            .to_string();
        let client_secret = body
            .get("client_secret")
            .and_then(|v| v.as_str())
            .ok_or_else(|| GatewayError::InvalidResponse {
                provider: PROVIDER,
                detail: "payment intent response missing client_secret".to_string(),
            })?
            .to_string();

        Ok(InitiatedPayment {
            reference,
            continuation: Continuation::ClientSecret(client_secret),
        })
    }

    fn verify(&self, payload: &[u8], signature: Option<&str>) -> Result<(), VerificationError> {
        let header = signature.ok_or(VerificationError::MissingSignature)?;

        let mut timestamp: Option<i64> = None;
        let mut candidates: Vec<&str> = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => {
                    timestamp = Some(value.parse().map_err(|_| {
                        VerificationError::MalformedSignature("non-numeric timestamp".to_string())
                    })?);
                }
                Some(("v1", value)) => candidates.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            VerificationError::MalformedSignature("missing timestamp element".to_string())
        })?;
        if candidates.is_empty() {
            return Err(VerificationError::MalformedSignature(
                "missing v1 element".to_string(),
            ));
        }

        if (Utc::now().timestamp() - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
            return Err(VerificationError::StaleTimestamp);
        }

        for candidate in candidates {
            let Ok(decoded) = hex::decode(candidate) else {
                continue;
            };
            let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
                .map_err(|e| VerificationError::MalformedSignature(e.to_string()))?;
            mac.update(timestamp.to_string().as_bytes());
            mac.update(b".");
            mac.update(payload);
            if mac.verify_slice(&decoded).is_ok() {
                return Ok(());
            }
        }

        Err(VerificationError::Mismatch)
    }

    fn normalize(&self, payload: &[u8]) -> Result<Option<PaymentEvent>, VerificationError> {
        let event: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| VerificationError::MalformedPayload(e.to_string()))?;

        let outcome = match event.get("type").and_then(|v| v.as_str()) {
            Some("payment_intent.succeeded") => EventOutcome::Succeeded,
            Some("payment_intent.payment_failed") => EventOutcome::Failed,
            Some("charge.refunded") => EventOutcome::Refunded,
            _ => return Ok(None),
        };

        let object = event
            .pointer("/data/object")
            .ok_or_else(|| VerificationError::MalformedPayload("missing data.object".to_string()))?;
        let metadata = object
            .get("metadata")
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        let Some((transaction_id, user_id, course_id)) = parse_correlation(&metadata)? else {
            return Ok(None);
        };

        let provider_event_id = event
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(Some(PaymentEvent {
            transaction_id,
            user_id,
            course_id,
            outcome,
            provider_event_id,
        }))
    }
}
