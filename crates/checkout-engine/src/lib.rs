//! # checkout-engine
//!
//! Async checkout orchestration on tokio.
//!
//! This crate composes the pure pieces of `checkout-core` into a working
//! checkout surface:
//!
//! 1. **ProviderBootstrapper** - one shared tokenization client, wallet
//!    instances pre-created in the background
//!    - Single-flight client creation
//!    - Monotonic per-wallet readiness
//!
//! 2. **ProcessingGuard** - short busy window after every payment click
//!
//! 3. **WalletSessionOrchestrator** - gesture-preserving wallet sheets
//!    - Synchronous `begin`, async sheet callbacks
//!
//! 4. **CheckoutFlow** - card, saved-card and wallet payments sharing one
//!    guard and one error slot
//!
//! 5. **HttpIdentityProvider / HttpPurchaseSubmitter** - reqwest adapters
//!    for the checkout services
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use checkout_engine::{CheckoutCollaborators, CheckoutFlow, EngineConfig, HttpIdentityProvider, HttpPurchaseSubmitter};
//! use checkout_core::{CheckoutOptions, WalletKind};
//!
//! let config = EngineConfig::from_env()?;
//! let flow = Arc::new(CheckoutFlow::new(
//!     CheckoutCollaborators {
//!         identity_provider: Arc::new(HttpIdentityProvider::new(config.clone())?),
//!         submitter: Arc::new(HttpPurchaseSubmitter::new(config.clone())?),
//!         anti_abuse,
//!         tokenization,
//!         wallets,
//!         events,
//!     },
//!     CheckoutOptions::default(),
//!     &config,
//! ));
//!
//! flow.start().await?;
//!
//! // In the wallet button's click handler, without awaiting first:
//! let mut attempt = flow.begin_wallet(WalletKind::ApplePay)?;
//!
//! // Later, for each sheet callback:
//! let outcome = flow.handle_wallet_event(&mut attempt, event).await;
//! ```

pub mod attempt;
pub mod bootstrap;
pub mod config;
pub mod flow;
pub mod guard;
pub mod http;
pub mod wallet;

#[cfg(test)]
mod testing;

pub use attempt::{AttemptOutcome, ErrorSlot, RelevanceToken, Visibility};
pub use bootstrap::ProviderBootstrapper;
pub use config::EngineConfig;
pub use flow::{CheckoutCollaborators, CheckoutEvents, CheckoutFlow};
pub use guard::{GuardTicket, ProcessingGuard};
pub use http::{HttpIdentityProvider, HttpPurchaseSubmitter};
pub use wallet::{WalletAttempt, WalletEvent, WalletInvocation, WalletSessionOrchestrator};
