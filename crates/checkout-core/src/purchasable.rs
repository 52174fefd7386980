//! # Purchasable Types
//!
//! Priced catalog entries offered on the checkout page: subscription tiers,
//! hour packages and quotes. The candidate list arrives with the checkout
//! details and is immutable for the session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entitlement granted when a purchasable does not state its hours
pub const DEFAULT_ENTITLED_HOURS: u32 = 4;

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    JPY,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::CAD => "CAD",
            Currency::AUD => "AUD",
            Currency::JPY => "JPY",
        }
    }

    /// Returns the number of decimal places for this currency
    /// (JPY has 0 decimals, the others have 2)
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::CAD => "C$",
            Currency::AUD => "A$",
            Currency::JPY => "¥",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            "CAD" => Ok(Currency::CAD),
            "AUD" => Ok(Currency::AUD),
            "JPY" => Ok(Currency::JPY),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

/// Amount in the smallest currency unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in smallest currency unit (cents for USD)
    pub amount: i64,
    /// Currency
    pub currency: Currency,
}

impl Price {
    /// Create a price from smallest unit (cents)
    pub fn from_cents(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Decimal string without symbol, as wallet APIs expect ("29.99")
    pub fn decimal_string(&self) -> String {
        let places = self.currency.decimal_places() as u32;
        if places == 0 {
            return self.amount.to_string();
        }
        let divisor = 10_i64.pow(places);
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.abs();
        format!(
            "{}{}.{:0width$}",
            sign,
            abs / divisor,
            abs % divisor,
            width = places as usize
        )
    }

    /// Format for display (e.g., "$10.00")
    pub fn display(&self) -> String {
        format!("{}{}", self.currency.symbol(), self.decimal_string())
    }
}

/// What kind of thing is being bought
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchasableKind {
    /// Recurring plan
    Subscription,
    /// Block of hours
    Package,
    /// Custom quote
    Quote,
}

impl PurchasableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchasableKind::Subscription => "subscription",
            PurchasableKind::Package => "package",
            PurchasableKind::Quote => "quote",
        }
    }
}

impl fmt::Display for PurchasableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchasableKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subscription" | "plan" => Ok(PurchasableKind::Subscription),
            "package" | "hours" => Ok(PurchasableKind::Package),
            "quote" => Ok(PurchasableKind::Quote),
            other => Err(format!("unknown purchasable type: {other}")),
        }
    }
}

/// Installment schedule for purchasables billed in more than one payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installments {
    /// Number of scheduled payments
    pub count: u32,
    /// Charged at checkout
    pub first_amount_cents: i64,
    /// Charged on each later installment
    pub second_amount_cents: i64,
}

/// A priced catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchasable {
    /// Unique identifier
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    pub kind: PurchasableKind,

    pub price_cents: i64,

    /// Strike-through price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_price_cents: Option<i64>,

    /// Missing currency means USD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<Currency>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entitled_hours: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installments: Option<Installments>,

    #[serde(default)]
    pub is_package: bool,
}

impl Purchasable {
    /// Create a subscription tier
    pub fn subscription(id: impl Into<String>, price_cents: i64, entitled_hours: u32) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            kind: PurchasableKind::Subscription,
            price_cents,
            previous_price_cents: None,
            currency_code: None,
            entitled_hours: Some(entitled_hours),
            installments: None,
            is_package: false,
        }
    }

    /// Create a one-time hours package
    pub fn package(id: impl Into<String>, price_cents: i64, entitled_hours: u32) -> Self {
        Self {
            kind: PurchasableKind::Package,
            is_package: true,
            ..Self::subscription(id, price_cents, entitled_hours)
        }
    }

    /// Builder: set display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder: set currency
    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency_code = Some(currency);
        self
    }

    /// Builder: set installment schedule
    pub fn with_installments(mut self, count: u32, first_cents: i64, second_cents: i64) -> Self {
        self.installments = Some(Installments {
            count,
            first_amount_cents: first_cents,
            second_amount_cents: second_cents,
        });
        self
    }

    pub fn currency(&self) -> Currency {
        self.currency_code.unwrap_or_default()
    }

    pub fn price(&self) -> Price {
        Price::from_cents(self.price_cents, self.currency())
    }

    pub fn hours(&self) -> u32 {
        self.entitled_hours.unwrap_or(DEFAULT_ENTITLED_HOURS)
    }

    pub fn duration_seconds(&self) -> u64 {
        u64::from(self.hours()) * 3600
    }

    /// Billed across more than one scheduled payment
    pub fn is_installment_bearing(&self) -> bool {
        self.installments.as_ref().is_some_and(|plan| plan.count > 1)
    }

    /// Saved cards are never reused for packages or installment plans
    pub fn permits_saved_instrument(&self) -> bool {
        !self.is_package && !self.is_installment_bearing()
    }

    /// Amount charged right now: first installment, or the full price
    pub fn amount_due_now(&self) -> Price {
        let cents = match &self.installments {
            Some(plan) if plan.count > 1 => plan.first_amount_cents,
            _ => self.price_cents,
        };
        Price::from_cents(cents, self.currency())
    }

    /// Amount charged on each later cycle
    pub fn recurring_amount(&self) -> Price {
        let cents = match &self.installments {
            Some(plan) if plan.count > 1 => plan.second_amount_cents,
            _ => self.price_cents,
        };
        Price::from_cents(cents, self.currency())
    }

    /// Everything except a one-time, single-payment package bills again later
    pub fn bills_again(&self) -> bool {
        !(self.is_package && !self.is_installment_bearing())
    }
}
