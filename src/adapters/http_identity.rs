//! HTTP client for the external user directory. Resolves bearer tokens to
//! platform identities.

use std::time::Duration;

use async_trait::async_trait;

use crate::ports::{AuthUser, StoreError, StoreResult, UserDirectory};

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Clone)]
pub struct HttpUserDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUserDirectory {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn resolve_bearer(&self, token: &str) -> StoreResult<Option<AuthUser>> {
        let url = format!("{}/auth/v1/user", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("identity service unreachable: {e}")))?;

        let status = response.status();
        if status.is_success() {
            let user = response
                .json::<AuthUser>()
                .await
                .map_err(|e| StoreError::Backend(format!("invalid identity response: {e}")))?;
            Ok(Some(user))
        } else if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            Ok(None)
        } else {
            Err(StoreError::Backend(format!(
                "identity service returned {status}"
            )))
        }
    }
}
