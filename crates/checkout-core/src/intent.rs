//! # Purchase Intent
//!
//! The submission payload for one payment attempt, and the builder that
//! assembles it. An intent is built fresh per attempt and dropped once the
//! attempt resolves.
//!
//! The submitted id/type is chosen in this order:
//!
//! 1. an explicit selection that matches a candidate: id, type and price all
//!    come from that candidate, never mixed with a stale URL type
//! 2. the id/type supplied in the page URL
//! 3. the [resolver](crate::resolver) default

use crate::error::{CheckoutError, CheckoutResult};
use crate::identity::CheckoutIdentity;
use crate::purchasable::{Currency, Purchasable, PurchasableKind};
use crate::resolver::resolve_for_identity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Platform wallets with gesture-sensitive session APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletKind {
    ApplePay,
    GooglePay,
}

impl WalletKind {
    /// Name shown to buyers
    pub fn display_name(&self) -> &'static str {
        match self {
            WalletKind::ApplePay => "Apple Pay",
            WalletKind::GooglePay => "Google Pay",
        }
    }
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// How the buyer is paying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "wallet")]
pub enum PaymentMethod {
    Card,
    SavedInstrument,
    Wallet(WalletKind),
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Card => f.write_str("card"),
            PaymentMethod::SavedInstrument => f.write_str("saved instrument"),
            PaymentMethod::Wallet(wallet) => write!(f, "{}", wallet),
        }
    }
}

/// Promotion and lead attribution flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseFlags {
    /// Returning buyer restarting a lapsed plan
    #[serde(default)]
    pub reactivation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_source: Option<String>,
}

/// Payer identity shared by a wallet sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayerDetails {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Purchasable named in the page URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTarget {
    pub id: String,
    pub kind: Option<PurchasableKind>,
}

impl UrlTarget {
    pub fn new(id: impl Into<String>, kind: Option<PurchasableKind>) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// Which signal decided the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSource {
    Selection,
    Url,
    Default,
}

/// The single purchasable an attempt charges for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub purchasable: Purchasable,
    pub kind: PurchasableKind,
    pub source: TargetSource,
}

/// Resolve what this attempt is buying. Synchronous, so wallet handlers can
/// capture it before any suspension.
pub fn resolve_target(
    identity: &CheckoutIdentity,
    explicit_selection: Option<&str>,
    url: Option<&UrlTarget>,
) -> CheckoutResult<ResolvedTarget> {
    let details = identity.details().ok_or(CheckoutError::MissingProduct)?;

    if let Some(selected) = explicit_selection
        .and_then(|id| details.purchasables.iter().find(|p| p.id == id))
    {
        return Ok(ResolvedTarget {
            purchasable: selected.clone(),
            kind: selected.kind,
            source: TargetSource::Selection,
        });
    }

    if let Some(url) = url {
        match details.find(&url.id) {
            Some(found) => {
                return Ok(ResolvedTarget {
                    purchasable: found.clone(),
                    kind: url.kind.unwrap_or(found.kind),
                    source: TargetSource::Url,
                });
            }
            None => warn!(url_id = %url.id, "URL purchasable not offered, using default"),
        }
    }

    resolve_for_identity(identity, None)
        .map(|p| ResolvedTarget {
            purchasable: p.clone(),
            kind: p.kind,
            source: TargetSource::Default,
        })
        .ok_or(CheckoutError::MissingProduct)
}

impl ResolvedTarget {
    /// Attach payment proof to produce the submission payload
    pub fn into_intent(self, proof: PaymentProof) -> PurchaseIntent {
        let purchasable = self.purchasable;
        PurchaseIntent {
            attempt_id: Uuid::new_v4().to_string(),
            purchasable_id: purchasable.id.clone(),
            purchasable_type: self.kind,
            price_cents: purchasable.price_cents,
            currency_code: purchasable.currency(),
            duration_seconds: purchasable.duration_seconds(),
            installment_count: purchasable
                .installments
                .as_ref()
                .map(|plan| plan.count)
                .filter(|count| *count > 1),
            method: proof.method,
            payment_nonce: proof.nonce,
            anti_abuse_token: proof.anti_abuse_token,
            promo_code: proof.promo_code,
            flags: proof.flags,
            payer: proof.payer,
            created_at: Utc::now(),
        }
    }
}

/// Everything about an attempt that is not the purchasable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentProof {
    pub method: PaymentMethod,
    pub nonce: String,
    /// Empty when the challenge could not be fetched
    pub anti_abuse_token: String,
    pub promo_code: Option<String>,
    pub flags: PurchaseFlags,
    pub payer: Option<PayerDetails>,
}

impl PaymentProof {
    pub fn new(method: PaymentMethod, nonce: impl Into<String>) -> Self {
        Self {
            method,
            nonce: nonce.into(),
            anti_abuse_token: String::new(),
            promo_code: None,
            flags: PurchaseFlags::default(),
            payer: None,
        }
    }

    pub fn with_anti_abuse_token(mut self, token: impl Into<String>) -> Self {
        self.anti_abuse_token = token.into();
        self
    }

    pub fn with_promo_code(mut self, code: Option<String>) -> Self {
        self.promo_code = code.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_flags(mut self, flags: PurchaseFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_payer(mut self, payer: PayerDetails) -> Self {
        self.payer = Some(payer);
        self
    }
}

/// Submission payload for one attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseIntent {
    /// Fresh per attempt; sent as the idempotency key
    pub attempt_id: String,
    pub purchasable_id: String,
    pub purchasable_type: PurchasableKind,
    pub price_cents: i64,
    pub currency_code: Currency,
    pub duration_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installment_count: Option<u32>,
    pub method: PaymentMethod,
    pub payment_nonce: String,
    pub anti_abuse_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
    #[serde(default)]
    pub flags: PurchaseFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<PayerDetails>,
    pub created_at: DateTime<Utc>,
}

/// Builds a [`PurchaseIntent`] from the page signals and payment proof
#[derive(Debug, Clone)]
pub struct PurchaseIntentBuilder {
    selection: Option<String>,
    url: Option<UrlTarget>,
    proof: PaymentProof,
}

impl PurchaseIntentBuilder {
    pub fn new(proof: PaymentProof) -> Self {
        Self {
            selection: None,
            url: None,
            proof,
        }
    }

    /// Builder: explicit selection made on the page
    pub fn selection(mut self, id: Option<impl Into<String>>) -> Self {
        self.selection = id.map(Into::into);
        self
    }

    /// Builder: id/type from the page URL
    pub fn url_target(mut self, id: Option<impl Into<String>>, kind: Option<PurchasableKind>) -> Self {
        self.url = id.map(|id| UrlTarget::new(id, kind));
        self
    }

    pub fn build(self, identity: &CheckoutIdentity) -> CheckoutResult<PurchaseIntent> {
        let target = resolve_target(identity, self.selection.as_deref(), self.url.as_ref())?;
        debug!(
            purchasable_id = %target.purchasable.id,
            source = ?target.source,
            method = %self.proof.method,
            "Built purchase intent"
        );
        Ok(target.into_intent(self.proof))
    }
}

/// What the submission service returns on success
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    pub payment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{CheckoutDetails, NotReadyReason};

    fn identity() -> CheckoutIdentity {
        CheckoutIdentity::ReadyGuest {
            details: CheckoutDetails::new(vec![
                Purchasable::subscription("S", 2900, 4),
                Purchasable::package("U", 19900, 10),
                Purchasable::subscription("L", 9900, 12).with_currency(Currency::EUR),
            ]),
        }
    }

    fn proof() -> PaymentProof {
        PaymentProof::new(PaymentMethod::Card, "nonce-123").with_anti_abuse_token("aa-tok")
    }

    #[test]
    fn test_selection_beats_url() {
        let intent = PurchaseIntentBuilder::new(proof())
            .selection(Some("S"))
            .url_target(Some("U"), Some(PurchasableKind::Package))
            .build(&identity())
            .unwrap();

        assert_eq!(intent.purchasable_id, "S");
        assert_eq!(intent.purchasable_type, PurchasableKind::Subscription);
        assert_eq!(intent.price_cents, 2900);
        assert_eq!(intent.duration_seconds, 4 * 3600);
    }

    #[test]
    fn test_url_used_when_selection_invalid() {
        let intent = PurchaseIntentBuilder::new(proof())
            .selection(Some("nope"))
            .url_target(Some("U"), None)
            .build(&identity())
            .unwrap();

        assert_eq!(intent.purchasable_id, "U");
        assert_eq!(intent.purchasable_type, PurchasableKind::Package);
        assert_eq!(intent.price_cents, 19900);
        assert_eq!(intent.duration_seconds, 10 * 3600);
    }

    #[test]
    fn test_unknown_url_falls_back_to_default() {
        let target = resolve_target(&identity(), None, Some(&UrlTarget::new("gone", None))).unwrap();
        assert_eq!(target.source, TargetSource::Default);
        assert_eq!(target.purchasable.id, "S");
    }

    #[test]
    fn test_missing_product_when_not_ready() {
        let result = PurchaseIntentBuilder::new(proof())
            .selection(Some("S"))
            .build(&CheckoutIdentity::NotReady(NotReadyReason::Loading));
        assert_eq!(result.unwrap_err(), CheckoutError::MissingProduct);
    }

    #[test]
    fn test_missing_product_when_nothing_offered() {
        let empty = CheckoutIdentity::ReadyGuest {
            details: CheckoutDetails::default(),
        };
        let result = PurchaseIntentBuilder::new(proof()).build(&empty);
        assert_eq!(result.unwrap_err(), CheckoutError::MissingProduct);
    }

    #[test]
    fn test_currency_and_proof_carried() {
        let intent = PurchaseIntentBuilder::new(
            proof()
                .with_promo_code(Some("SPRING".into()))
                .with_flags(PurchaseFlags {
                    reactivation: true,
                    lead_source: None,
                }),
        )
        .selection(Some("L"))
        .build(&identity())
        .unwrap();

        assert_eq!(intent.currency_code, Currency::EUR);
        assert_eq!(intent.payment_nonce, "nonce-123");
        assert_eq!(intent.anti_abuse_token, "aa-tok");
        assert_eq!(intent.promo_code.as_deref(), Some("SPRING"));
        assert!(intent.flags.reactivation);
    }

    #[test]
    fn test_blank_promo_dropped() {
        let p = proof().with_promo_code(Some("  ".into()));
        assert!(p.promo_code.is_none());
    }

    #[test]
    fn test_each_attempt_gets_fresh_id() {
        let a = PurchaseIntentBuilder::new(proof()).build(&identity()).unwrap();
        let b = PurchaseIntentBuilder::new(proof()).build(&identity()).unwrap();
        assert_ne!(a.attempt_id, b.attempt_id);
    }

    #[test]
    fn test_intent_wire_shape() {
        let intent = PurchaseIntentBuilder::new(PaymentProof::new(
            PaymentMethod::Wallet(WalletKind::ApplePay),
            "n",
        ))
        .build(&identity())
        .unwrap();
        let json = serde_json::to_value(&intent).unwrap();

        assert_eq!(json["purchasableId"], "S");
        assert_eq!(json["currencyCode"], "USD");
        assert_eq!(json["method"]["type"], "wallet");
        assert_eq!(json["method"]["wallet"], "apple_pay");
        assert!(json.get("promoCode").is_none());
    }
}
