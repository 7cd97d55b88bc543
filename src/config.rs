use std::env;

use anyhow::{Context, Result};
use dotenvy::dotenv;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub identity_service_url: String,

    pub stripe_api_url: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,

    pub paystack_api_url: String,
    pub paystack_secret_key: String,

    pub flutterwave_api_url: String,
    pub flutterwave_secret_key: String,
    pub flutterwave_webhook_hash: String,

    pub gateway_timeout_secs: u64,

    pub api_throttle_max_requests: u64,
    pub api_throttle_window_secs: u64,
    pub webhook_throttle_max_requests: u64,
    pub webhook_throttle_window_secs: u64,

    pub pending_max_age_hours: i64,
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load .env file if present

        let config = Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            identity_service_url: env::var("IDENTITY_SERVICE_URL")
                .context("IDENTITY_SERVICE_URL must be set")?,

            stripe_api_url: env::var("STRIPE_API_URL")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY")
                .context("STRIPE_SECRET_KEY must be set")?,
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")
                .context("STRIPE_WEBHOOK_SECRET must be set")?,

            paystack_api_url: env::var("PAYSTACK_API_URL")
                .unwrap_or_else(|_| "https://api.paystack.co".to_string()),
            paystack_secret_key: env::var("PAYSTACK_SECRET_KEY")
                .context("PAYSTACK_SECRET_KEY must be set")?,

            flutterwave_api_url: env::var("FLUTTERWAVE_API_URL")
                .unwrap_or_else(|_| "https://api.flutterwave.com".to_string()),
            flutterwave_secret_key: env::var("FLUTTERWAVE_SECRET_KEY")
                .context("FLUTTERWAVE_SECRET_KEY must be set")?,
            flutterwave_webhook_hash: env::var("FLUTTERWAVE_WEBHOOK_HASH")
                .context("FLUTTERWAVE_WEBHOOK_HASH must be set")?,

            gateway_timeout_secs: env::var("GATEWAY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,

            api_throttle_max_requests: env::var("API_THROTTLE_MAX_REQUESTS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,
            api_throttle_window_secs: env::var("API_THROTTLE_WINDOW_SECS")
                .unwrap_or_else(|_| "900".to_string())
                .parse()?,
            webhook_throttle_max_requests: env::var("WEBHOOK_THROTTLE_MAX_REQUESTS")
                .unwrap_or_else(|_| "50".to_string())
                .parse()?,
            webhook_throttle_window_secs: env::var("WEBHOOK_THROTTLE_WINDOW_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()?,

            pending_max_age_hours: env::var("PENDING_MAX_AGE_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()?,
            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.server_port == 0 {
            anyhow::bail!("SERVER_PORT must be greater than 0");
        }

        url::Url::parse(&self.identity_service_url)
            .context("IDENTITY_SERVICE_URL is not a valid URL")?;
        url::Url::parse(&self.stripe_api_url).context("STRIPE_API_URL is not a valid URL")?;
        url::Url::parse(&self.paystack_api_url).context("PAYSTACK_API_URL is not a valid URL")?;
        url::Url::parse(&self.flutterwave_api_url)
            .context("FLUTTERWAVE_API_URL is not a valid URL")?;

        if self.pending_max_age_hours <= 0 {
            anyhow::bail!("PENDING_MAX_AGE_HOURS must be positive");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server_port: 3000,
            database_url: "postgres://localhost:5432/coursepay".to_string(),
            identity_service_url: "https://identity.example.com".to_string(),
            stripe_api_url: "https://api.stripe.com".to_string(),
            stripe_secret_key: "sk_test".to_string(),
            stripe_webhook_secret: "whsec_test".to_string(),
            paystack_api_url: "https://api.paystack.co".to_string(),
            paystack_secret_key: "sk_test".to_string(),
            flutterwave_api_url: "https://api.flutterwave.com".to_string(),
            flutterwave_secret_key: "FLWSECK_TEST".to_string(),
            flutterwave_webhook_hash: "hash".to_string(),
            gateway_timeout_secs: 30,
            api_throttle_max_requests: 100,
            api_throttle_window_secs: 900,
            webhook_throttle_max_requests: 50,
            webhook_throttle_window_secs: 60,
            pending_max_age_hours: 24,
            sweep_interval_secs: 300,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn rejects_invalid_identity_url() {
        let mut config = base_config();
        config.identity_service_url = "not-a-url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_pending_age() {
        let mut config = base_config();
        config.pending_max_age_hours = 0;
        assert!(config.validate().is_err());
    }
}
