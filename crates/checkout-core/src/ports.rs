//! # Collaborator Ports
//!
//! Traits for everything the engine consumes but does not implement: the
//! identity and submission services, the anti-abuse challenge, the shared
//! tokenization client and the platform wallets.
//!
//! ```text
//! ┌──────────────────────────┐     ┌───────────────────────────┐
//! │ TokenizationClientFactory│────▶│ TokenizationClient (1x)   │
//! └──────────────────────────┘     └─────────────┬─────────────┘
//!                                                │ shared
//!                          ┌─────────────────────┼─────────────────────┐
//!                          ▼                     ▼                     ▼
//!                 WalletProviderFactory   WalletProviderFactory     card / saved
//!                   (Apple Pay)             (Google Pay)            tokenization
//!                          │                     │
//!                          ▼                     ▼
//!                   WalletInstance ──create_session()──▶ WalletSession
//! ```

use crate::error::{CheckoutError, CheckoutResult};
use crate::identity::{CheckoutIdentity, IdentitySelectors, SavedInstrument};
use crate::intent::{PurchaseIntent, PurchaseReceipt, WalletKind};
use crate::section::{FieldSet, SensitiveField};
use crate::wallet::{MerchantSession, PaymentCompletion, WalletAuthorization, WalletPaymentRequest};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Fetches who is buying and what is on offer
#[async_trait]
pub trait CheckoutIdentityProvider: Send + Sync {
    async fn fetch(&self, selectors: &IdentitySelectors) -> CheckoutResult<CheckoutIdentity>;
}

/// Submits a purchase intent
#[async_trait]
pub trait PurchaseSubmitter: Send + Sync {
    async fn submit(&self, intent: &PurchaseIntent) -> CheckoutResult<PurchaseReceipt>;
}

/// Bot-mitigation challenge token
#[async_trait]
pub trait AntiAbuseTokenProvider: Send + Sync {
    async fn fetch(&self) -> CheckoutResult<String>;

    /// An empty token is tolerated; the submission service decides
    async fn fetch_or_empty(&self) -> String {
        match self.fetch().await {
            Ok(token) => token,
            Err(e) => {
                warn!("Anti-abuse token unavailable: {}", e);
                String::new()
            }
        }
    }
}

/// Card inputs ready for tokenization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardFields {
    pub number: String,
    pub expiration: String,
    pub security_code: String,
    pub cardholder_name: Option<String>,
    pub postal_code: Option<String>,
}

impl CardFields {
    /// Collect card-entry inputs; missing hosted fields are a local error
    pub fn from_field_set(fields: &FieldSet) -> CheckoutResult<Self> {
        let required = [
            (SensitiveField::CardNumber, "card number"),
            (SensitiveField::Expiration, "expiration date"),
            (SensitiveField::SecurityCode, "security code"),
        ];
        let missing: Vec<String> = required
            .iter()
            .filter(|(field, _)| fields.get(*field).is_none())
            .map(|(_, name)| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(CheckoutError::MissingFields { fields: missing });
        }

        let value = |field| fields.get(field).map(str::to_string).unwrap_or_default();
        Ok(Self {
            number: value(SensitiveField::CardNumber),
            expiration: value(SensitiveField::Expiration),
            security_code: value(SensitiveField::SecurityCode),
            cardholder_name: fields.get(SensitiveField::CardholderName).map(str::to_string),
            postal_code: fields.get(SensitiveField::PostalCode).map(str::to_string),
        })
    }
}

/// Shared tokenization client; turns raw credentials into nonces
#[async_trait]
pub trait TokenizationClient: Send + Sync {
    async fn tokenize_card(&self, card: &CardFields) -> CheckoutResult<String>;

    async fn tokenize_saved_instrument(
        &self,
        instrument: &SavedInstrument,
        security_code: Option<&str>,
    ) -> CheckoutResult<String>;
}

pub type SharedTokenizationClient = Arc<dyn TokenizationClient>;

/// Creates the tokenization client (called at most once per flow)
#[async_trait]
pub trait TokenizationClientFactory: Send + Sync {
    async fn get_client(&self) -> CheckoutResult<SharedTokenizationClient>;
}

/// A live platform wallet sheet
pub trait WalletSession: Send {
    /// Show the sheet. Must run in the same synchronous turn as the gesture.
    fn begin(&mut self) -> CheckoutResult<()>;

    fn complete_merchant_validation(&mut self, session: MerchantSession) -> CheckoutResult<()>;

    fn complete_payment(&mut self, completion: PaymentCompletion);

    fn abort(&mut self);
}

/// Pre-created wallet instance
#[async_trait]
pub trait WalletInstance: Send + Sync {
    fn wallet(&self) -> WalletKind;

    /// Create a session. Synchronous: a suspension before this call makes
    /// the platform reject the session.
    fn create_session(&self, request: &WalletPaymentRequest)
        -> CheckoutResult<Box<dyn WalletSession>>;

    async fn validate_merchant(&self, validation_url: &str) -> CheckoutResult<MerchantSession>;

    async fn tokenize(&self, authorization: &WalletAuthorization) -> CheckoutResult<String>;
}

pub type SharedWalletInstance = Arc<dyn WalletInstance>;

/// Creates one wallet's instance from the shared client
#[async_trait]
pub trait WalletProviderFactory: Send + Sync {
    fn wallet(&self) -> WalletKind;

    /// `Ok(None)` when the platform does not support this wallet
    async fn create_instance(
        &self,
        client: SharedTokenizationClient,
    ) -> CheckoutResult<Option<SharedWalletInstance>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::{SectionMachine, SectionState};

    struct FailingChallenge;

    #[async_trait]
    impl AntiAbuseTokenProvider for FailingChallenge {
        async fn fetch(&self) -> CheckoutResult<String> {
            Err(CheckoutError::Transport("challenge script blocked".into()))
        }
    }

    #[tokio::test]
    async fn test_anti_abuse_failure_yields_empty_token() {
        assert_eq!(FailingChallenge.fetch_or_empty().await, "");
    }

    #[test]
    fn test_card_fields_require_hosted_inputs() {
        let mut machine = SectionMachine::new(SectionState::CardEntry);
        machine.enter(SensitiveField::CardNumber, "tok_num").unwrap();

        match CardFields::from_field_set(machine.fields(SectionState::CardEntry)) {
            Err(CheckoutError::MissingFields { fields }) => {
                assert_eq!(fields, vec!["expiration date", "security code"])
            }
            other => panic!("unexpected: {other:?}"),
        }

        machine.enter(SensitiveField::Expiration, "tok_exp").unwrap();
        machine.enter(SensitiveField::SecurityCode, "tok_cvv").unwrap();
        let card = CardFields::from_field_set(machine.fields(SectionState::CardEntry)).unwrap();
        assert_eq!(card.number, "tok_num");
        assert!(card.postal_code.is_none());
    }
}
