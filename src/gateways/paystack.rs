//! Paystack adapter. Redirect flow: the client is sent to a hosted
//! authorization page. Notifications are signed with HMAC-SHA512 over the
//! raw body, keyed by the API secret.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha512;

use super::client::GatewayHttpClient;
use super::{
    parse_correlation, to_minor_units, Continuation, CorrelationMetadata, EventOutcome,
    GatewayError, InitiatedPayment, PaymentEvent, PaymentGateway, PaymentRequest,
    VerificationError,
};

type HmacSha512 = Hmac<Sha512>;

const PROVIDER: &str = "paystack";

pub struct PaystackGateway {
    client: GatewayHttpClient,
    secret_key: String,
}

impl PaystackGateway {
    pub fn new(
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let secret_key = secret_key.into();
        Self {
            client: GatewayHttpClient::new(PROVIDER, base_url, secret_key.clone(), timeout),
            secret_key,
        }
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn initiate(&self, request: &PaymentRequest) -> Result<InitiatedPayment, GatewayError> {
        let amount = to_minor_units(&request.amount).ok_or_else(|| GatewayError::Amount {
            provider: PROVIDER,
            detail: format!("{} has sub-unit precision", request.amount),
        })?;

        let mut body = json!({
            "email": request.customer_email,
            "amount": amount,
            "currency": request.currency,
            "metadata": CorrelationMetadata::from_request(request),
        });
        if let Some(return_url) = &request.return_url {
            body["callback_url"] = json!(return_url);
        }

        let response = self
            .client
            .post_json("/transaction/initialize", body)
            .await?;

        let data = response
            .get("data")
            .ok_or_else(|| GatewayError::InvalidResponse {
                provider: PROVIDER,
                detail: "initialize response missing data".to_string(),
            })?;
        let authorization_url = data
            .get("authorization_url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| GatewayError::InvalidResponse {
                provider: PROVIDER,
                detail: "initialize response missing authorization_url".to_string(),
            })?
            .to_string();
        let reference = data
            .get("reference")
            .and_then(|v| v.as_str())
            .ok_or_else(|| GatewayError::InvalidResponse {
                provider: PROVIDER,
                detail: "initialize response missing reference".to_string(),
            })?
            .to_string();

        Ok(InitiatedPayment {
            reference,
            continuation: Continuation::Redirect(authorization_url),
        })
    }

    fn verify(&self, payload: &[u8], signature: Option<&str>) -> Result<(), VerificationError> {
        let header = signature.ok_or(VerificationError::MissingSignature)?;
        let decoded = hex::decode(header)
            .map_err(|_| VerificationError::MalformedSignature("not hex".to_string()))?;

        let mut mac = HmacSha512::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| VerificationError::MalformedSignature(e.to_string()))?;
        mac.update(payload);
        mac.verify_slice(&decoded)
            .map_err(|_| VerificationError::Mismatch)
    }

    fn normalize(&self, payload: &[u8]) -> Result<Option<PaymentEvent>, VerificationError> {
        let event: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| VerificationError::MalformedPayload(e.to_string()))?;

        let outcome = match event.get("event").and_then(|v| v.as_str()) {
            Some("charge.success") => EventOutcome::Succeeded,
            Some("charge.failed") => EventOutcome::Failed,
            _ => return Ok(None),
        };

        let data = event
            .get("data")
            .ok_or_else(|| VerificationError::MalformedPayload("missing data".to_string()))?;
        let metadata = data
            .get("metadata")
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        let Some((transaction_id, user_id, course_id)) = parse_correlation(&metadata)? else {
            return Ok(None);
        };

        let provider_event_id = match data.get("id") {
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => data
                .get("reference")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        };

        Ok(Some(PaymentEvent {
            transaction_id,
            user_id,
            course_id,
            outcome,
            provider_event_id,
        }))
    }
}
