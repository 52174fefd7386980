//! # HTTP Adapters
//!
//! reqwest implementations of the identity and submission ports.
//!
//! The details endpoint answers with a loosely-shaped document; it is
//! converted into [`CheckoutIdentity`] here, and inconsistent combinations
//! (authenticated without a buyer, a guest with a vaulted card) are rejected
//! rather than guessed at.

use crate::config::EngineConfig;
use async_trait::async_trait;
use checkout_core::{
    Buyer, CheckoutDetails, CheckoutError, CheckoutIdentity, CheckoutIdentityProvider,
    CheckoutResult, IdentitySelectors, NotReadyReason, PurchaseIntent, PurchaseReceipt,
    PurchaseSubmitter, Purchasable, SavedInstrument,
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info, instrument};

fn build_client(config: &EngineConfig) -> CheckoutResult<Client> {
    Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| CheckoutError::Configuration(format!("HTTP client: {}", e)))
}

/// Fetches checkout details from `GET {base}/api/v1/checkout/details`
pub struct HttpIdentityProvider {
    config: EngineConfig,
    client: Client,
}

impl HttpIdentityProvider {
    pub fn new(config: EngineConfig) -> CheckoutResult<Self> {
        let client = build_client(&config)?;
        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> CheckoutResult<Self> {
        Self::new(EngineConfig::from_env()?)
    }
}

#[async_trait]
impl CheckoutIdentityProvider for HttpIdentityProvider {
    #[instrument(skip(self, selectors), fields(purchasable_id = ?selectors.purchasable_id))]
    async fn fetch(&self, selectors: &IdentitySelectors) -> CheckoutResult<CheckoutIdentity> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(id) = selectors.purchasable_id.as_deref() {
            query.push(("purchasableId", id));
        }
        if let Some(kind) = selectors.purchasable_type {
            query.push(("type", kind.as_str()));
        }
        if let Some(code) = selectors.promo_code.as_deref() {
            query.push(("promoCode", code));
        }

        let response = self
            .client
            .get(self.config.details_url())
            .query(&query)
            .send()
            .await
            .map_err(|e| CheckoutError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            info!("Checkout details require login");
            return Ok(CheckoutIdentity::NotReady(NotReadyReason::LoginRequired));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CheckoutError::Transport(e.to_string()))?;

        if !status.is_success() {
            error!("Checkout details error: {} - {}", status, body);
            return Err(CheckoutError::Transport(format!(
                "status: {} {}",
                status.as_u16(),
                body
            )));
        }

        let document: IdentityDocument = serde_json::from_str(&body)
            .map_err(|e| CheckoutError::InvalidResponse(format!("checkout details: {}", e)))?;
        let identity = document.into_identity()?;

        debug!(variant = identity.variant_name(), "Fetched checkout identity");
        Ok(identity)
    }
}

/// Posts purchase intents to `POST {base}/api/v1/checkout/purchase`
pub struct HttpPurchaseSubmitter {
    config: EngineConfig,
    client: Client,
}

impl HttpPurchaseSubmitter {
    pub fn new(config: EngineConfig) -> CheckoutResult<Self> {
        let client = build_client(&config)?;
        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> CheckoutResult<Self> {
        Self::new(EngineConfig::from_env()?)
    }
}

#[async_trait]
impl PurchaseSubmitter for HttpPurchaseSubmitter {
    #[instrument(
        skip(self, intent),
        fields(attempt_id = %intent.attempt_id, purchasable_id = %intent.purchasable_id)
    )]
    async fn submit(&self, intent: &PurchaseIntent) -> CheckoutResult<PurchaseReceipt> {
        let response = self
            .client
            .post(self.config.purchase_url())
            .header("Idempotency-Key", &intent.attempt_id)
            .json(intent)
            .send()
            .await
            .map_err(|e| CheckoutError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CheckoutError::Transport(e.to_string()))?;

        if !status.is_success() {
            error!("Purchase submission error: {} - {}", status, body);
            return Err(submission_error(status, &body));
        }

        let receipt: PurchaseReceipt = serde_json::from_str(&body)
            .map_err(|e| CheckoutError::InvalidResponse(format!("purchase receipt: {}", e)))?;

        info!(payment_id = %receipt.payment_id, "Purchase accepted");
        Ok(receipt)
    }
}

/// Structured rejections keep their code; anything else keeps the status so
/// the classifier hides it
fn submission_error(status: StatusCode, body: &str) -> CheckoutError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => CheckoutError::Submission {
            code: envelope.error.code,
            message: envelope.error.message,
        },
        Err(_) => CheckoutError::Submission {
            code: None,
            message: format!("status: {} {}", status.as_u16(), body),
        },
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum DetailsStatus {
    Ready,
    NotReady,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityDocument {
    status: DetailsStatus,
    #[serde(default)]
    authenticated: bool,
    #[serde(default)]
    auto_authenticated: bool,
    #[serde(default)]
    buyer: Option<Buyer>,
    #[serde(default)]
    saved_instrument: Option<SavedInstrument>,
    #[serde(default)]
    purchasables: Vec<Purchasable>,
    #[serde(default)]
    default_purchasable: Option<Purchasable>,
    #[serde(default)]
    not_ready_reason: Option<NotReadyReason>,
}

impl IdentityDocument {
    fn into_identity(self) -> CheckoutResult<CheckoutIdentity> {
        if self.status == DetailsStatus::NotReady {
            return Ok(CheckoutIdentity::NotReady(
                self.not_ready_reason.unwrap_or(NotReadyReason::Loading),
            ));
        }

        if self.purchasables.is_empty() && self.default_purchasable.is_none() {
            return Ok(CheckoutIdentity::NotReady(NotReadyReason::NoPurchasables));
        }

        let details = CheckoutDetails {
            purchasables: self.purchasables,
            default_purchasable: self.default_purchasable,
        };

        match (self.authenticated, self.auto_authenticated, self.buyer) {
            (true, true, _) => Err(CheckoutError::InvalidResponse(
                "buyer is both authenticated and auto-authenticated".to_string(),
            )),
            (true, false, Some(buyer)) => Ok(CheckoutIdentity::ReadyAuthenticated {
                details,
                buyer,
                saved_instrument: self.saved_instrument,
            }),
            (false, true, Some(buyer)) => {
                if self.saved_instrument.is_some() {
                    debug!("Ignoring saved instrument for auto-authenticated buyer");
                }
                Ok(CheckoutIdentity::ReadyAutoAuthenticated { details, buyer })
            }
            (true, false, None) | (false, true, None) => Err(CheckoutError::InvalidResponse(
                "authenticated response without buyer".to_string(),
            )),
            (false, false, _) if self.saved_instrument.is_some() => Err(
                CheckoutError::InvalidResponse("guest response with a saved instrument".to_string()),
            ),
            (false, false, _) => Ok(CheckoutIdentity::ReadyGuest { details }),
        }
    }
}
