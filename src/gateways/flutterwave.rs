//! Flutterwave adapter. Redirect flow; notifications carry a static
//! `verif-hash` header configured in the provider dashboard rather than a
//! per-payload signature.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use sha2::{Digest, Sha256};

use super::client::GatewayHttpClient;
use super::{
    parse_correlation, Continuation, CorrelationMetadata, EventOutcome, GatewayError,
    InitiatedPayment, PaymentEvent, PaymentGateway, PaymentRequest, VerificationError,
};

const PROVIDER: &str = "flutterwave";

pub struct FlutterwaveGateway {
    client: GatewayHttpClient,
    webhook_hash: String,
}

impl FlutterwaveGateway {
    pub fn new(
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
        webhook_hash: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: GatewayHttpClient::new(PROVIDER, base_url, secret_key, timeout),
            webhook_hash: webhook_hash.into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for FlutterwaveGateway {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn initiate(&self, request: &PaymentRequest) -> Result<InitiatedPayment, GatewayError> {
        // Flutterwave takes major units and wants a merchant-supplied
        // reference up front; that reference is what the webhook echoes back.
        let tx_ref = format!("flw_{}", request.transaction_id.simple());

        let mut body = json!({
            "tx_ref": tx_ref,
            "amount": request.amount.to_string(),
            "currency": request.currency,
            "customer": {
                "email": request.customer_email,
            },
            "meta": CorrelationMetadata::from_request(request),
        });
        if let Some(return_url) = &request.return_url {
            body["redirect_url"] = json!(return_url);
        }

        let response = self.client.post_json("/v3/payments", body).await?;

        let link = response
            .pointer("/data/link")
            .and_then(|v| v.as_str())
            .ok_or_else(|| GatewayError::InvalidResponse {
                provider: PROVIDER,
                detail: "payment response missing data.link".to_string(),
            })?
            .to_string();

        Ok(InitiatedPayment {
            reference: tx_ref,
            continuation: Continuation::Redirect(link),
        })
    }

    fn verify(&self, _payload: &[u8], signature: Option<&str>) -> Result<(), VerificationError> {
        let header = signature.ok_or(VerificationError::MissingSignature)?;

        // Constant-time comparison via digest equality; the header itself is
        // a shared secret, not a function of the payload.
        let presented = Sha256::digest(header.as_bytes());
        let expected = Sha256::digest(self.webhook_hash.as_bytes());
        if presented == expected {
            Ok(())
        } else {
            Err(VerificationError::Mismatch)
        }
    }

    fn normalize(&self, payload: &[u8]) -> Result<Option<PaymentEvent>, VerificationError> {
        let event: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| VerificationError::MalformedPayload(e.to_string()))?;

        if event.get("event").and_then(|v| v.as_str()) != Some("charge.completed") {
            return Ok(None);
        }

        let data = event
            .get("data")
            .ok_or_else(|| VerificationError::MalformedPayload("missing data".to_string()))?;
        let meta = data.get("meta").cloned().unwrap_or(serde_json::Value::Null);

        let Some((transaction_id, user_id, course_id)) = parse_correlation(&meta)? else {
            return Ok(None);
        };

        let outcome = match data.get("status").and_then(|v| v.as_str()) {
            Some("successful") => EventOutcome::Succeeded,
            _ => EventOutcome::Failed,
        };

        let provider_event_id = match data.get("id") {
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => data
                .get("tx_ref")
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
