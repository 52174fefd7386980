//! # Wallet Session Orchestrator
//!
//! Drives Apple Pay / Google Pay sheets from click to submission.
//!
//! [`WalletSessionOrchestrator::begin`] is a plain `fn`: platforms reject a
//! session created after the click handler has yielded, so everything up to
//! `session.begin()` runs in the same synchronous turn. It only reads state
//! prepared earlier (the pre-created instance, the resolved purchasable).
//!
//! What happens after the sheet is open arrives as [`WalletEvent`]s and is
//! handled asynchronously by [`WalletSessionOrchestrator::handle_event`].

use crate::attempt::{AttemptOutcome, ErrorSlot, RelevanceToken, Visibility};
use crate::bootstrap::ProviderBootstrapper;
use crate::config::EngineConfig;
use crate::guard::{GuardTicket, ProcessingGuard};
use checkout_core::{
    resolve_target, AntiAbuseTokenProvider, CheckoutError, CheckoutIdentity, CheckoutResult,
    PaymentCompletion, PaymentMethod, PaymentProof, PurchaseFlags, PurchaseSubmitter,
    ResolvedTarget, SharedWalletInstance, UrlTarget, WalletAuthorization, WalletKind,
    WalletPaymentRequest, WalletSession,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Page state captured when the wallet button is clicked
#[derive(Debug, Clone, Default)]
pub struct WalletInvocation {
    /// Already true when terms gating is skipped
    pub terms_accepted: bool,
    pub selection: Option<String>,
    pub url: Option<UrlTarget>,
    pub promo_code: Option<String>,
    pub flags: PurchaseFlags,
}

/// Callbacks delivered by an open wallet sheet
#[derive(Debug, Clone)]
pub enum WalletEvent {
    ValidateMerchant { validation_url: String },
    PaymentAuthorized(WalletAuthorization),
    Cancelled,
}

/// An open wallet sheet and what it is paying for
pub struct WalletAttempt {
    wallet: WalletKind,
    instance: SharedWalletInstance,
    session: Box<dyn WalletSession>,
    target: ResolvedTarget,
    promo_code: Option<String>,
    flags: PurchaseFlags,
    relevance: RelevanceToken,
    ticket: GuardTicket,
    authorizing: bool,
    closed: bool,
}

impl WalletAttempt {
    pub fn wallet(&self) -> WalletKind {
        self.wallet
    }

    pub fn target(&self) -> &ResolvedTarget {
        &self.target
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the sheet the way the current phase requires
    fn close_failed(&mut self) {
        if self.closed {
            return;
        }
        if self.authorizing {
            self.session.complete_payment(PaymentCompletion::Failure);
        } else {
            self.session.abort();
        }
        self.closed = true;
    }
}

impl std::fmt::Debug for WalletAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletAttempt")
            .field("wallet", &self.wallet)
            .field("purchasable_id", &self.target.purchasable.id)
            .field("authorizing", &self.authorizing)
            .field("closed", &self.closed)
            .finish()
    }
}

pub struct WalletSessionOrchestrator {
    bootstrapper: Arc<ProviderBootstrapper>,
    submitter: Arc<dyn PurchaseSubmitter>,
    anti_abuse: Arc<dyn AntiAbuseTokenProvider>,
    guard: ProcessingGuard,
    errors: ErrorSlot,
    visibility: Visibility,
    merchant_name: String,
    country_code: String,
}

impl WalletSessionOrchestrator {
    pub fn new(
        bootstrapper: Arc<ProviderBootstrapper>,
        submitter: Arc<dyn PurchaseSubmitter>,
        anti_abuse: Arc<dyn AntiAbuseTokenProvider>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            bootstrapper,
            submitter,
            anti_abuse,
            guard: ProcessingGuard::new(config.processing_release),
            errors: ErrorSlot::new(),
            visibility: Visibility::new(),
            merchant_name: config.merchant_name.clone(),
            country_code: config.country_code.clone(),
        }
    }

    /// Builder: share the guard, error slot and visibility of a larger flow
    pub fn with_shared_state(
        mut self,
        guard: ProcessingGuard,
        errors: ErrorSlot,
        visibility: Visibility,
    ) -> Self {
        self.guard = guard;
        self.errors = errors;
        self.visibility = visibility;
        self
    }

    pub fn guard(&self) -> &ProcessingGuard {
        &self.guard
    }

    pub fn errors(&self) -> &ErrorSlot {
        &self.errors
    }

    /// Open a wallet sheet. Never suspends; call it directly from the click
    /// handler. On failure no session is left open, the error slot holds the
    /// classified message and the guard is released.
    pub fn begin(
        &self,
        wallet: WalletKind,
        identity: &CheckoutIdentity,
        invocation: &WalletInvocation,
    ) -> CheckoutResult<WalletAttempt> {
        self.guard.invoke(|ticket| {
            self.errors.clear();
            self.open_session(wallet, identity, invocation, ticket)
                .inspect_err(|e| {
                    self.errors.set(e);
                    self.guard.release_attempt(ticket);
                })
        })
    }

    fn open_session(
        &self,
        wallet: WalletKind,
        identity: &CheckoutIdentity,
        invocation: &WalletInvocation,
        ticket: GuardTicket,
    ) -> CheckoutResult<WalletAttempt> {
        if !invocation.terms_accepted {
            return Err(CheckoutError::TermsNotAccepted);
        }

        let instance = self.bootstrapper.instance(wallet).ok_or_else(|| {
            info!(target: "checkout::signal", %wallet, "Wallet clicked without an instance");
            CheckoutError::ProviderUnavailable {
                provider: wallet.display_name().to_string(),
            }
        })?;

        let target = resolve_target(
            identity,
            invocation.selection.as_deref(),
            invocation.url.as_ref(),
        )?;
        let request = WalletPaymentRequest::for_purchasable(
            &target.purchasable,
            &self.merchant_name,
            &self.country_code,
        );

        let mut session = instance.create_session(&request)?;
        if let Err(e) = session.begin() {
            session.abort();
            return Err(e);
        }

        info!(
            %wallet,
            purchasable_id = %target.purchasable.id,
            amount = %request.total.amount,
            recurring = request.recurring.is_some(),
            "Wallet session started"
        );

        Ok(WalletAttempt {
            wallet,
            instance,
            session,
            target,
            promo_code: invocation.promo_code.clone(),
            flags: invocation.flags.clone(),
            relevance: self.visibility.token(),
            ticket,
            authorizing: false,
            closed: false,
        })
    }

    /// Handle one sheet callback. Every error closes the sheet, lands in the
    /// error slot and releases the guard.
    #[instrument(skip(self, attempt, event), fields(wallet = %attempt.wallet))]
    pub async fn handle_event(&self, attempt: &mut WalletAttempt, event: WalletEvent) -> AttemptOutcome {
        if attempt.closed {
            debug!("Event for a closed wallet session ignored");
            return AttemptOutcome::Discarded;
        }

        let result = match event {
            WalletEvent::ValidateMerchant { validation_url } => {
                self.validate_merchant(attempt, &validation_url).await
            }
            WalletEvent::PaymentAuthorized(authorization) => {
                self.authorize(attempt, &authorization).await
            }
            WalletEvent::Cancelled => {
                // the platform already closed the sheet
                attempt.closed = true;
                Err(CheckoutError::UserCancelled)
            }
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                attempt.close_failed();
                if !attempt.relevance.is_relevant() {
                    warn!("Wallet attempt failed after the checkout was hidden: {}", e);
                    return AttemptOutcome::Discarded;
                }
                let outcome = match self.errors.set(&e) {
                    Some(message) => AttemptOutcome::Failed(message),
                    None => AttemptOutcome::Cancelled,
                };
                self.guard.release_attempt(attempt.ticket);
                outcome
            }
        }
    }

    async fn validate_merchant(
        &self,
        attempt: &mut WalletAttempt,
        validation_url: &str,
    ) -> CheckoutResult<AttemptOutcome> {
        let merchant_session = attempt.instance.validate_merchant(validation_url).await?;
        attempt.session.complete_merchant_validation(merchant_session)?;
        debug!("Merchant validated");
        Ok(AttemptOutcome::Pending)
    }

    async fn authorize(
        &self,
        attempt: &mut WalletAttempt,
        authorization: &WalletAuthorization,
    ) -> CheckoutResult<AttemptOutcome> {
        attempt.authorizing = true;

        let payer = authorization.payer()?;
        let nonce = attempt.instance.tokenize(authorization).await?;
        let anti_abuse_token = self.anti_abuse.fetch_or_empty().await;

        let proof = PaymentProof::new(PaymentMethod::Wallet(attempt.wallet), nonce)
            .with_anti_abuse_token(anti_abuse_token)
            .with_promo_code(attempt.promo_code.clone())
            .with_flags(attempt.flags.clone())
            .with_payer(payer);
        let intent = attempt.target.clone().into_intent(proof);

        let receipt = self.submitter.submit(&intent).await?;
        attempt.session.complete_payment(PaymentCompletion::Success);
        attempt.closed = true;

        if !attempt.relevance.is_relevant() {
            warn!(payment_id = %receipt.payment_id, "Wallet payment finished after the checkout was hidden");
            return Ok(AttemptOutcome::Discarded);
        }

        info!(
            payment_id = %receipt.payment_id,
            purchasable_id = %intent.purchasable_id,
            "Wallet payment submitted"
        );
        Ok(AttemptOutcome::Paid(receipt))
    }
}
