//! # checkout-wasm
//!
//! WebAssembly bindings for the checkout engine.
//!
//! This crate exposes the pure, synchronous pieces of `checkout-core` to
//! browser hosts:
//! - Purchasable resolution (selection > default > popular tier > first)
//! - Price formatting and the amount charged now
//! - Wallet payment requests
//! - Buyer-safe error messages
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { resolve_purchasable, classify_error_message } from 'checkout-wasm';
//!
//! await init();
//!
//! const target = resolve_purchasable(details, selectedId);
//! console.log(classify_error_message('card_declined', rawMessage));
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build --target web
//! ```

use checkout_core::{
    classify_message, resolve, CheckoutDetails, CheckoutIdentity, Currency, Price, Purchasable,
    WalletPaymentRequest,
};
use wasm_bindgen::prelude::*;

/// Purchasable handle for hosts that do not want to pass JSON around
#[wasm_bindgen]
pub struct WasmPurchasable {
    inner: Purchasable,
}

#[wasm_bindgen]
impl WasmPurchasable {
    #[wasm_bindgen(constructor)]
    pub fn new(id: String, name: String, price_cents: i64, entitled_hours: u32) -> Self {
        Self {
            inner: Purchasable::subscription(id, price_cents, entitled_hours).with_name(name),
        }
    }

    /// Builder: split into scheduled payments
    pub fn with_installments(self, count: u32, first_cents: i64, second_cents: i64) -> Self {
        Self {
            inner: self.inner.with_installments(count, first_cents, second_cents),
        }
    }

    #[wasm_bindgen(getter)]
    pub fn id(&self) -> String {
        self.inner.id.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn name(&self) -> String {
        self.inner.name.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn price_cents(&self) -> i64 {
        self.inner.price_cents
    }

    /// First installment, or the full price
    #[wasm_bindgen]
    pub fn amount_due_now_cents(&self) -> i64 {
        self.inner.amount_due_now().amount
    }

    #[wasm_bindgen]
    pub fn duration_seconds(&self) -> u64 {
        self.inner.duration_seconds()
    }

    /// Format the amount charged now for display
    #[wasm_bindgen]
    pub fn format_due_now(&self) -> String {
        self.inner.amount_due_now().display()
    }

    #[wasm_bindgen]
    pub fn permits_saved_instrument(&self) -> bool {
        self.inner.permits_saved_instrument()
    }
}

/// Pick the purchasable a payment would charge for.
///
/// `details` is the `{ purchasables, defaultPurchasable }` document from the
/// checkout details service. Returns `null` when nothing is on offer.
#[wasm_bindgen]
pub fn resolve_purchasable(details: JsValue, selection: Option<String>) -> Result<JsValue, JsValue> {
    let details: CheckoutDetails = serde_wasm_bindgen::from_value(details)
        .map_err(|e| JsValue::from_str(&format!("Invalid checkout details: {}", e)))?;

    match resolve_in(&details, selection.as_deref()) {
        Some(purchasable) => serde_wasm_bindgen::to_value(&purchasable)
            .map_err(|e| JsValue::from_str(&e.to_string())),
        None => Ok(JsValue::NULL),
    }
}

/// Build the request handed to a wallet sheet for a purchasable
#[wasm_bindgen]
pub fn wallet_payment_request(
    purchasable: JsValue,
    merchant_name: &str,
    country_code: &str,
) -> Result<JsValue, JsValue> {
    let purchasable: Purchasable = serde_wasm_bindgen::from_value(purchasable)
        .map_err(|e| JsValue::from_str(&format!("Invalid purchasable: {}", e)))?;

    let request = WalletPaymentRequest::for_purchasable(&purchasable, merchant_name, country_code);
    serde_wasm_bindgen::to_value(&request).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Format an amount in the smallest unit of a currency ("$29.99")
#[wasm_bindgen]
pub fn format_price(cents: i64, currency: &str) -> Result<String, JsValue> {
    format_in(cents, currency).map_err(|e| JsValue::from_str(&e))
}

/// Map a backend code / raw message to something safe to show a buyer
#[wasm_bindgen]
pub fn classify_error_message(code: Option<String>, message: &str) -> String {
    classify_message(code.as_deref(), message)
}

/// Validate a purchasable ID format
#[wasm_bindgen]
pub fn validate_purchasable_id(purchasable_id: &str) -> bool {
    !purchasable_id.is_empty()
        && purchasable_id.len() <= 100
        && purchasable_id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

/// Log to browser console
#[wasm_bindgen]
pub fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn resolve_in(details: &CheckoutDetails, selection: Option<&str>) -> Option<Purchasable> {
    // the browser only ever resolves for a page that already has details
    let identity = CheckoutIdentity::ReadyGuest {
        details: details.clone(),
    };
    resolve(
        &identity,
        &details.purchasables,
        details.default_purchasable.as_ref(),
        selection,
    )
    .cloned()
}

fn format_in(cents: i64, currency: &str) -> Result<String, String> {
    let currency: Currency = currency.parse()?;
    Ok(Price::from_cents(cents, currency).display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::UNKNOWN_ERROR_MESSAGE;

    #[test]
    fn test_purchasable_amounts() {
        let plan = WasmPurchasable::new("split".into(), "Split".into(), 40000, 8)
            .with_installments(2, 25000, 15000);
        assert_eq!(plan.amount_due_now_cents(), 25000);
        assert_eq!(plan.format_due_now(), "$250.00");
        assert_eq!(plan.duration_seconds(), 8 * 3600);
        assert!(!plan.permits_saved_instrument());
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_in(1999, "usd").unwrap(), "$19.99");
        assert_eq!(format_in(1000, "JPY").unwrap(), "¥1000");
        assert!(format_in(100, "XYZ").is_err());
    }

    #[test]
    fn test_resolve_prefers_selection_then_default() {
        let details = CheckoutDetails::new(vec![
            Purchasable::subscription("a", 2900, 4),
            Purchasable::subscription("b", 4900, 8),
        ])
        .with_default(Purchasable::subscription("b", 4900, 8));

        assert_eq!(resolve_in(&details, Some("a")).unwrap().id, "a");
        assert_eq!(resolve_in(&details, None).unwrap().id, "b");
        assert!(resolve_in(&CheckoutDetails::default(), None).is_none());
    }

    #[test]
    fn test_classify_error_message() {
        assert_eq!(
            classify_error_message(None, "status: 503 Service Unavailable"),
            UNKNOWN_ERROR_MESSAGE
        );
        assert_eq!(
            classify_error_message(None, "Promo code limit reached"),
            "Promo code limit reached"
        );
    }

    #[test]
    fn test_validate_purchasable_id() {
        assert!(validate_purchasable_id("pro-monthly"));
        assert!(validate_purchasable_id("hours_10"));
        assert!(!validate_purchasable_id(""));
        assert!(!validate_purchasable_id("invalid id"));
    }
}
