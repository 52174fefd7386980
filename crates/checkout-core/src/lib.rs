//! # checkout-core
//!
//! Core types, resolution rules and ports for the checkout orchestration
//! engine.
//!
//! This crate provides:
//! - `CheckoutIdentity`, the tagged union describing who is buying
//! - `Purchasable` and the resolver that picks the one being charged
//! - `PurchaseIntentBuilder` for consistent submission payloads
//! - `SectionMachine` for the payment surfaces and their sensitive fields
//! - `classify` for buyer-safe error messages
//! - port traits for every external collaborator
//!
//! Nothing here suspends; async orchestration lives in `checkout-engine`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use checkout_core::{PaymentMethod, PaymentProof, PurchaseIntentBuilder};
//!
//! let intent = PurchaseIntentBuilder::new(PaymentProof::new(PaymentMethod::Card, nonce))
//!     .selection(selected_id)
//!     .url_target(url_id, url_type)
//!     .build(&identity)?;
//!
//! let receipt = submitter.submit(&intent).await?;
//! ```

pub mod classify;
pub mod error;
pub mod identity;
pub mod intent;
pub mod options;
pub mod ports;
pub mod purchasable;
pub mod resolver;
pub mod section;
pub mod wallet;

// Re-exports for convenience
pub use classify::{classify, classify_message, UNKNOWN_ERROR_MESSAGE};
pub use error::{CheckoutError, CheckoutResult, ErrorKind};
pub use identity::{
    reusable_instrument, Buyer, CheckoutDetails, CheckoutIdentity, IdentitySelectors,
    NotReadyReason, SavedInstrument,
};
pub use intent::{
    resolve_target, PayerDetails, PaymentMethod, PaymentProof, PurchaseFlags, PurchaseIntent,
    PurchaseIntentBuilder, PurchaseReceipt, ResolvedTarget, TargetSource, UrlTarget, WalletKind,
};
pub use options::{CheckoutOptions, Theme};
pub use ports::{
    AntiAbuseTokenProvider, CardFields, CheckoutIdentityProvider, PurchaseSubmitter,
    SharedTokenizationClient, SharedWalletInstance, TokenizationClient,
    TokenizationClientFactory, WalletInstance, WalletProviderFactory, WalletSession,
};
pub use purchasable::{Currency, Installments, Price, Purchasable, PurchasableKind};
pub use resolver::{resolve, resolve_for_identity, POPULAR_TIER_HOURS};
pub use section::{
    initial_state, FieldSet, SectionAction, SectionMachine, SectionState, SensitiveField,
};
pub use wallet::{
    MerchantSession, PaymentCompletion, RecurringDescriptor, WalletAuthorization,
    WalletLineItem, WalletPaymentRequest,
};
