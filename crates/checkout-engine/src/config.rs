//! # Engine Configuration
//!
//! Configuration for the checkout engine.
//! Values are loaded from environment variables (and `.env` when present).

use checkout_core::CheckoutError;
use std::env;
use std::time::Duration;

const DEFAULT_MERCHANT_NAME: &str = "Checkout";
const DEFAULT_COUNTRY_CODE: &str = "US";
const DEFAULT_PROCESSING_RELEASE_MS: u64 = 3_000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Checkout engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the checkout details / purchase services
    pub api_base_url: String,

    /// Label on wallet sheets
    pub merchant_name: String,

    /// ISO 3166 country of the merchant
    pub country_code: String,

    /// How long a payment button stays busy after a click
    pub processing_release: Duration,

    /// HTTP timeout for the service adapters
    pub request_timeout: Duration,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `CHECKOUT_API_BASE_URL`
    ///
    /// Optional:
    /// - `CHECKOUT_MERCHANT_NAME`
    /// - `CHECKOUT_COUNTRY_CODE`
    /// - `CHECKOUT_PROCESSING_RELEASE_MS`
    /// - `CHECKOUT_REQUEST_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, CheckoutError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let api_base_url = env::var("CHECKOUT_API_BASE_URL").map_err(|_| {
            CheckoutError::Configuration("CHECKOUT_API_BASE_URL not set".to_string())
        })?;

        if !api_base_url.starts_with("https://") && !api_base_url.starts_with("http://") {
            return Err(CheckoutError::Configuration(
                "CHECKOUT_API_BASE_URL must start with http:// or https://".to_string(),
            ));
        }

        let processing_release_ms = parse_env("CHECKOUT_PROCESSING_RELEASE_MS")?
            .unwrap_or(DEFAULT_PROCESSING_RELEASE_MS);
        let request_timeout_secs =
            parse_env("CHECKOUT_REQUEST_TIMEOUT_SECS")?.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            merchant_name: env::var("CHECKOUT_MERCHANT_NAME")
                .unwrap_or_else(|_| DEFAULT_MERCHANT_NAME.to_string()),
            country_code: env::var("CHECKOUT_COUNTRY_CODE")
                .unwrap_or_else(|_| DEFAULT_COUNTRY_CODE.to_string()),
            processing_release: Duration::from_millis(processing_release_ms),
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(api_base_url: impl Into<String>) -> Self {
        let api_base_url: String = api_base_url.into();
        Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            merchant_name: DEFAULT_MERCHANT_NAME.to_string(),
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            processing_release: Duration::from_millis(DEFAULT_PROCESSING_RELEASE_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Builder: set merchant label
    pub fn with_merchant_name(mut self, name: impl Into<String>) -> Self {
        self.merchant_name = name.into();
        self
    }

    /// Builder: set merchant country
    pub fn with_country_code(mut self, code: impl Into<String>) -> Self {
        self.country_code = code.into();
        self
    }

    /// Builder: set busy-release delay
    pub fn with_processing_release(mut self, delay: Duration) -> Self {
        self.processing_release = delay;
        self
    }

    /// Builder: set HTTP timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn details_url(&self) -> String {
        format!("{}/api/v1/checkout/details", self.api_base_url)
    }

    pub fn purchase_url(&self) -> String {
        format!("{}/api/v1/checkout/purchase", self.api_base_url)
    }
}

fn parse_env(key: &str) -> Result<Option<u64>, CheckoutError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CheckoutError::Configuration(format!("{} must be a number", key))),
        Err(_) => Ok(None),
    }
}
