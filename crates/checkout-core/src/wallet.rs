//! # Wallet Payment Types
//!
//! Provider-neutral shapes exchanged with platform wallet sheets.

use crate::error::{CheckoutError, CheckoutResult};
use crate::intent::PayerDetails;
use crate::purchasable::{Currency, Price, Purchasable};
use serde::{Deserialize, Serialize};

/// Line shown on the wallet sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletLineItem {
    pub label: String,
    /// Decimal string ("29.99")
    pub amount: String,
}

impl WalletLineItem {
    pub fn new(label: impl Into<String>, price: Price) -> Self {
        Self {
            label: label.into(),
            amount: price.decimal_string(),
        }
    }
}

/// Recurring billing unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Month,
}

/// Recurring-billing descriptor attached to non-one-time purchases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringDescriptor {
    pub description: String,
    pub billing_agreement: String,
    pub regular_billing: WalletLineItem,
    pub interval: BillingInterval,
    pub interval_count: u32,
    /// Installment plans end after this many payments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_payments: Option<u32>,
}

/// Contact fields the sheet must collect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContactField {
    Email,
    Name,
}

/// Request handed to the wallet when creating a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletPaymentRequest {
    pub country_code: String,
    pub currency_code: Currency,
    pub total: WalletLineItem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring: Option<RecurringDescriptor>,
    pub required_contact_fields: Vec<ContactField>,
}

impl WalletPaymentRequest {
    /// Charge the amount due now; describe later charges when there are any
    pub fn for_purchasable(
        purchasable: &Purchasable,
        merchant_name: &str,
        country_code: &str,
    ) -> Self {
        let recurring = purchasable.bills_again().then(|| {
            let recurring_amount = purchasable.recurring_amount();
            let total_payments = purchasable
                .installments
                .as_ref()
                .map(|plan| plan.count)
                .filter(|count| *count > 1);
            let agreement = match total_payments {
                Some(count) => format!(
                    "You will be charged {} per month for {} payments.",
                    recurring_amount.display(),
                    count
                ),
                None => format!(
                    "You will be charged {} per month until you cancel.",
                    recurring_amount.display()
                ),
            };
            RecurringDescriptor {
                description: display_name(purchasable, merchant_name),
                billing_agreement: agreement,
                regular_billing: WalletLineItem::new(merchant_name, recurring_amount),
                interval: BillingInterval::Month,
                interval_count: 1,
                total_payments,
            }
        });

        Self {
            country_code: country_code.to_string(),
            currency_code: purchasable.currency(),
            total: WalletLineItem::new(merchant_name, purchasable.amount_due_now()),
            recurring,
            required_contact_fields: vec![ContactField::Email, ContactField::Name],
        }
    }
}

fn display_name(purchasable: &Purchasable, merchant_name: &str) -> String {
    if purchasable.name.is_empty() {
        merchant_name.to_string()
    } else {
        purchasable.name.clone()
    }
}

/// Opaque merchant session returned by the validation round trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantSession(pub serde_json::Value);

/// How the session should close
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentCompletion {
    Success,
    Failure,
}

/// Authorized payment delivered by the wallet sheet
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAuthorization {
    /// Encrypted payment data, passed to tokenization untouched
    pub payment_data: serde_json::Value,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl WalletAuthorization {
    /// Payer identity; every required field must be present and non-blank
    pub fn payer(&self) -> CheckoutResult<PayerDetails> {
        fn present(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        let email = present(&self.email);
        let first_name = present(&self.given_name);
        let last_name = present(&self.family_name);

        let mut missing = Vec::new();
        if email.is_none() {
            missing.push("email".to_string());
        }
        if first_name.is_none() {
            missing.push("given name".to_string());
        }
        if last_name.is_none() {
            missing.push("family name".to_string());
        }

        match (email, first_name, last_name) {
            (Some(email), Some(first_name), Some(last_name)) => Ok(PayerDetails {
                email,
                first_name,
                last_name,
                phone: present(&self.phone),
            }),
            _ => Err(CheckoutError::MissingFields { fields: missing }),
        }
    }
}
