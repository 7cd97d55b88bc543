//! Request-level input validation, kept apart from domain invariants.

use std::fmt;

use crate::error::AppError;

pub const CURRENCY_CODE_LEN: usize = 3;
pub const RETURN_URL_MAX_LEN: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// ISO 4217 alpha-3, upper case.
pub fn validate_currency(code: &str) -> Result<(), ValidationError> {
    if code.len() != CURRENCY_CODE_LEN || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::new(
            "currency",
            "must be a three-letter upper-case ISO code",
        ));
    }

    Ok(())
}

pub fn validate_url(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.len() > RETURN_URL_MAX_LEN {
        return Err(ValidationError::new(field, "too long"));
    }

    let parsed = url::Url::parse(value).map_err(|_| ValidationError::new(field, "not a valid URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::new(field, "must be http or https"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_iso_currency_codes() {
        assert!(validate_currency("USD").is_ok());
        assert!(validate_currency("NGN").is_ok());
        assert!(validate_currency("GHS").is_ok());
    }

    #[test]
    fn rejects_malformed_currency_codes() {
        assert!(validate_currency("usd").is_err());
        assert!(validate_currency("US").is_err());
        assert!(validate_currency("DOLLARS").is_err());
        assert!(validate_currency("U$D").is_err());
    }

    #[test]
    fn accepts_https_return_urls() {
        assert!(validate_url("return_url", "https://app.example.com/payment/callback").is_ok());
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(validate_url("return_url", "javascript:alert(1)").is_err());
        assert!(validate_url("return_url", "not a url").is_err());
    }
}
