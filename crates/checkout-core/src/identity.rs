//! # Checkout Identity
//!
//! Who is buying, and what they may buy. Supplied once per page load by the
//! identity provider and replaced wholesale after a login or refetch.

use crate::purchasable::{Purchasable, PurchasableKind};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Why checkout cannot render yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotReadyReason {
    /// Details still being fetched
    Loading,
    /// Details request failed
    FetchFailed,
    /// Server returned no purchasables for the requested selectors
    NoPurchasables,
    /// The buyer must sign in before continuing
    LoginRequired,
}

/// Authenticated buyer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buyer {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// A previously vaulted card tied to an authenticated buyer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedInstrument {
    /// Vault token, exchanged for a nonce at payment time
    pub token: String,
    #[serde(default)]
    pub card_type: Option<String>,
    pub last_four: String,
    /// 1-12
    pub expiration_month: u32,
    pub expiration_year: i32,
}

impl SavedInstrument {
    /// Cards stay valid through the last day of their expiry month
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        (self.expiration_year, self.expiration_month) < (now.year(), now.month())
    }

    /// "Visa •••• 4242"
    pub fn label(&self) -> String {
        match &self.card_type {
            Some(card_type) => format!("{} •••• {}", card_type, self.last_four),
            None => format!("•••• {}", self.last_four),
        }
    }
}

/// Candidate purchasables plus the server's default choice
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutDetails {
    #[serde(default)]
    pub purchasables: Vec<Purchasable>,
    #[serde(default)]
    pub default_purchasable: Option<Purchasable>,
}

impl CheckoutDetails {
    pub fn new(purchasables: Vec<Purchasable>) -> Self {
        Self {
            purchasables,
            default_purchasable: None,
        }
    }

    /// Builder: set the server default
    pub fn with_default(mut self, purchasable: Purchasable) -> Self {
        self.default_purchasable = Some(purchasable);
        self
    }

    /// Find a purchasable by id among candidates, then the default
    pub fn find(&self, id: &str) -> Option<&Purchasable> {
        self.purchasables
            .iter()
            .find(|p| p.id == id)
            .or_else(|| self.default_purchasable.as_ref().filter(|p| p.id == id))
    }
}

/// Selectors sent when fetching the identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentitySelectors {
    pub purchasable_id: Option<String>,
    pub purchasable_type: Option<PurchasableKind>,
    pub promo_code: Option<String>,
}

/// Checkout identity, matched exhaustively wherever it is consumed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutIdentity {
    NotReady(NotReadyReason),
    ReadyGuest {
        details: CheckoutDetails,
    },
    ReadyAuthenticated {
        details: CheckoutDetails,
        buyer: Buyer,
        saved_instrument: Option<SavedInstrument>,
    },
    /// Signed in implicitly (e.g. via an emailed link); no vaulted card
    ReadyAutoAuthenticated {
        details: CheckoutDetails,
        buyer: Buyer,
    },
}

impl CheckoutIdentity {
    pub fn details(&self) -> Option<&CheckoutDetails> {
        match self {
            CheckoutIdentity::NotReady(_) => None,
            CheckoutIdentity::ReadyGuest { details }
            | CheckoutIdentity::ReadyAuthenticated { details, .. }
            | CheckoutIdentity::ReadyAutoAuthenticated { details, .. } => Some(details),
        }
    }

    pub fn buyer(&self) -> Option<&Buyer> {
        match self {
            CheckoutIdentity::NotReady(_) | CheckoutIdentity::ReadyGuest { .. } => None,
            CheckoutIdentity::ReadyAuthenticated { buyer, .. }
            | CheckoutIdentity::ReadyAutoAuthenticated { buyer, .. } => Some(buyer),
        }
    }

    /// Only explicitly authenticated buyers may reuse a vaulted card
    pub fn saved_instrument(&self) -> Option<&SavedInstrument> {
        match self {
            CheckoutIdentity::ReadyAuthenticated {
                saved_instrument, ..
            } => saved_instrument.as_ref(),
            CheckoutIdentity::NotReady(_)
            | CheckoutIdentity::ReadyGuest { .. }
            | CheckoutIdentity::ReadyAutoAuthenticated { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        !matches!(self, CheckoutIdentity::NotReady(_))
    }

    pub fn is_authenticated(&self) -> bool {
        match self {
            CheckoutIdentity::ReadyAuthenticated { .. }
            | CheckoutIdentity::ReadyAutoAuthenticated { .. } => true,
            CheckoutIdentity::NotReady(_) | CheckoutIdentity::ReadyGuest { .. } => false,
        }
    }

    /// Short label for logs
    pub fn variant_name(&self) -> &'static str {
        match self {
            CheckoutIdentity::NotReady(_) => "not_ready",
            CheckoutIdentity::ReadyGuest { .. } => "guest",
            CheckoutIdentity::ReadyAuthenticated { .. } => "authenticated",
            CheckoutIdentity::ReadyAutoAuthenticated { .. } => "auto_authenticated",
        }
    }
}

/// Saved-card reuse requires an authenticated buyer, an unexpired card and a
/// purchasable that allows it
pub fn reusable_instrument<'a>(
    identity: &'a CheckoutIdentity,
    purchasable: Option<&Purchasable>,
    now: DateTime<Utc>,
) -> Option<&'a SavedInstrument> {
    let purchasable = purchasable?;
    if !purchasable.permits_saved_instrument() {
        return None;
    }
    identity
        .saved_instrument()
        .filter(|instrument| !instrument.is_expired_at(now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn card(month: u32, year: i32) -> SavedInstrument {
        SavedInstrument {
            token: "vault_tok".into(),
            card_type: Some("Visa".into()),
            last_four: "4242".into(),
            expiration_month: month,
            expiration_year: year,
        }
    }

    fn buyer() -> Buyer {
        Buyer {
            id: "b_1".into(),
            email: "ada@example.com".into(),
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
        }
    }

    fn march_2027() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2027, 3, 31, 23, 0, 0).unwrap()
    }

    #[test]
    fn test_card_valid_through_expiry_month() {
        assert!(!card(3, 2027).is_expired_at(march_2027()));
        assert!(card(2, 2027).is_expired_at(march_2027()));
        assert!(card(12, 2026).is_expired_at(march_2027()));
        assert!(!card(1, 2028).is_expired_at(march_2027()));
    }

    #[test]
    fn test_card_label() {
        assert_eq!(card(1, 2030).label(), "Visa •••• 4242");
    }

    #[test]
    fn test_only_authenticated_exposes_instrument() {
        let details = CheckoutDetails::default();
        let auth = CheckoutIdentity::ReadyAuthenticated {
            details: details.clone(),
            buyer: buyer(),
            saved_instrument: Some(card(1, 2030)),
        };
        let auto = CheckoutIdentity::ReadyAutoAuthenticated {
            details,
            buyer: buyer(),
        };

        assert!(auth.saved_instrument().is_some());
        assert!(auto.saved_instrument().is_none());
        assert!(auto.is_authenticated());
        assert!(!CheckoutIdentity::NotReady(NotReadyReason::Loading).is_ready());
    }

    #[test]
    fn test_reusable_instrument_rules() {
        let plan = Purchasable::subscription("basic", 2900, 4);
        let package = Purchasable::package("hours", 9900, 10);
        let identity = CheckoutIdentity::ReadyAuthenticated {
            details: CheckoutDetails::new(vec![plan.clone()]),
            buyer: buyer(),
            saved_instrument: Some(card(6, 2027)),
        };

        assert!(reusable_instrument(&identity, Some(&plan), march_2027()).is_some());
        assert!(reusable_instrument(&identity, Some(&package), march_2027()).is_none());
        assert!(reusable_instrument(&identity, None, march_2027()).is_none());

        let later = Utc.with_ymd_and_hms(2027, 7, 1, 0, 0, 0).unwrap();
        assert!(reusable_instrument(&identity, Some(&plan), later).is_none());
    }

    #[test]
    fn test_find_checks_default() {
        let details = CheckoutDetails::new(vec![Purchasable::subscription("a", 100, 4)])
            .with_default(Purchasable::subscription("hidden", 200, 4));
        assert_eq!(details.find("a").map(|p| p.price_cents), Some(100));
        assert_eq!(details.find("hidden").map(|p| p.price_cents), Some(200));
        assert!(details.find("nope").is_none());
    }
}
