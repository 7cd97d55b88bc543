//! Shared HTTP client for provider APIs: bearer auth, bounded timeout and a
//! circuit breaker so a degraded provider fails fast instead of tying up
//! request handlers.

use std::time::Duration;

use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};

use super::GatewayError;

const BREAKER_CONSECUTIVE_FAILURES: u32 = 3;
const BREAKER_RESET_MIN_SECS: u64 = 60;
const BREAKER_RESET_MAX_SECS: u64 = 120;

pub struct GatewayHttpClient {
    provider: &'static str,
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
    breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

enum RequestBody {
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

impl GatewayHttpClient {
    pub fn new(
        provider: &'static str,
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(BREAKER_RESET_MIN_SECS),
            Duration::from_secs(BREAKER_RESET_MAX_SECS),
        );
        let policy = failure_policy::consecutive_failures(BREAKER_CONSECUTIVE_FAILURES, backoff);
        let breaker = Config::new().failure_policy(policy).build();

        Self {
            provider,
            client,
            base_url: base_url.into(),
            secret_key: secret_key.into(),
            breaker,
        }
    }

    pub async fn post_json(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        self.post(path, RequestBody::Json(body)).await
    }

    pub async fn post_form(
        &self,
        path: &str,
        form: Vec<(String, String)>,
    ) -> Result<serde_json::Value, GatewayError> {
        self.post(path, RequestBody::Form(form)).await
    }

    async fn post(
        &self,
        path: &str,
        body: RequestBody,
    ) -> Result<serde_json::Value, GatewayError> {
        let provider = self.provider;
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let client = self.client.clone();
        let secret_key = self.secret_key.clone();

        let result = self
            .breaker
            .call(async move {
                let request = client.post(&url).bearer_auth(&secret_key);
                let request = match &body {
                    RequestBody::Json(value) => request.json(value),
                    RequestBody::Form(pairs) => request.form(pairs),
                };

                let response = request
                    .send()
                    .await
                    .map_err(|source| GatewayError::Transport { provider, source })?;

                let status = response.status();
                let text = response
                    .text()
                    .await
                    .map_err(|source| GatewayError::Transport { provider, source })?;

                if !status.is_success() {
                    return Err(GatewayError::Rejected {
                        provider,
                        detail: format!("{status}: {text}"),
                    });
                }

                serde_json::from_str(&text).map_err(|e| GatewayError::InvalidResponse {
                    provider,
                    detail: format!("invalid JSON body: {e}"),
                })
            })
            .await;

        match result {
            Ok(value) => Ok(value),
            Err(FailsafeError::Rejected) => Err(GatewayError::CircuitOpen { provider }),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}
