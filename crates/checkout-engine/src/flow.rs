//! # Checkout Flow
//!
//! One checkout surface: the identity, what the buyer selected, the payment
//! sections and every way to pay. All payment paths share one processing
//! guard, one error slot and one visibility generation.
//!
//! ```text
//!   click ──▶ guard.invoke ──▶ resolve target (sync) ──▶ tokenize ──▶ anti-abuse ──▶ submit
//!                 │                                                                   │
//!                 └──────────── error slot + release ◀──── Err ───────────────────────┤
//!                                                     on_payment_success ◀──── Ok ────┘
//! ```
//!
//! The flow is meant to be shared (`Arc<CheckoutFlow>`): page state lives
//! behind a mutex that is never held across a suspension, so hiding the
//! surface or editing a field works while a payment is in flight.

use crate::attempt::{AttemptOutcome, ErrorSlot, RelevanceToken, Visibility};
use crate::bootstrap::ProviderBootstrapper;
use crate::config::EngineConfig;
use crate::guard::{GuardTicket, ProcessingGuard};
use crate::wallet::{WalletAttempt, WalletEvent, WalletInvocation, WalletSessionOrchestrator};
use checkout_core::{
    resolve_target, reusable_instrument, AntiAbuseTokenProvider, CardFields, CheckoutError,
    CheckoutIdentity, CheckoutIdentityProvider, CheckoutOptions, CheckoutResult,
    IdentitySelectors, NotReadyReason, PaymentMethod, PaymentProof, PurchaseFlags,
    PurchaseReceipt, PurchaseSubmitter, Purchasable, ResolvedTarget, SectionMachine,
    SectionState, SensitiveField, Theme, TokenizationClientFactory, UrlTarget, WalletKind,
    WalletProviderFactory,
};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Callbacks exposed to the host page
pub trait CheckoutEvents: Send + Sync {
    fn on_payment_success(&self, receipt: &PurchaseReceipt, method: PaymentMethod);

    /// Buyer signed in from inside checkout
    fn on_login_success(&self) {}
}

/// External collaborators a flow is wired to
pub struct CheckoutCollaborators {
    pub identity_provider: Arc<dyn CheckoutIdentityProvider>,
    pub submitter: Arc<dyn PurchaseSubmitter>,
    pub anti_abuse: Arc<dyn AntiAbuseTokenProvider>,
    pub tokenization: Arc<dyn TokenizationClientFactory>,
    pub wallets: Vec<Arc<dyn WalletProviderFactory>>,
    pub events: Arc<dyn CheckoutEvents>,
}

struct FlowState {
    identity: CheckoutIdentity,
    selection: Option<String>,
    url: Option<UrlTarget>,
    promo_code: Option<String>,
    flags: PurchaseFlags,
    terms_accepted: bool,
    section: SectionMachine,
}

/// What a non-wallet attempt charges for, captured before the first await
struct PendingOrder {
    target: ResolvedTarget,
    promo_code: Option<String>,
    flags: PurchaseFlags,
}

impl FlowState {
    fn target(&self) -> CheckoutResult<ResolvedTarget> {
        resolve_target(&self.identity, self.selection.as_deref(), self.url.as_ref())
    }

    fn pending_order(&self) -> CheckoutResult<PendingOrder> {
        Ok(PendingOrder {
            target: self.target()?,
            promo_code: self.promo_code.clone(),
            flags: self.flags.clone(),
        })
    }

    fn require_surface(&self, expected: SectionState) -> CheckoutResult<()> {
        if self.section.state() != expected {
            return Err(CheckoutError::InactiveSurface {
                surface: expected.to_string(),
            });
        }
        Ok(())
    }

    fn selectors(&self) -> IdentitySelectors {
        IdentitySelectors {
            purchasable_id: self
                .selection
                .clone()
                .or_else(|| self.url.as_ref().map(|url| url.id.clone())),
            purchasable_type: self.url.as_ref().and_then(|url| url.kind),
            promo_code: self.promo_code.clone(),
        }
    }
}

pub struct CheckoutFlow {
    options: CheckoutOptions,
    identity_provider: Arc<dyn CheckoutIdentityProvider>,
    submitter: Arc<dyn PurchaseSubmitter>,
    anti_abuse: Arc<dyn AntiAbuseTokenProvider>,
    events: Arc<dyn CheckoutEvents>,
    bootstrapper: Arc<ProviderBootstrapper>,
    wallets: WalletSessionOrchestrator,
    guard: ProcessingGuard,
    errors: ErrorSlot,
    visibility: Visibility,
    state: Mutex<FlowState>,
}

impl CheckoutFlow {
    pub fn new(
        collaborators: CheckoutCollaborators,
        options: CheckoutOptions,
        config: &EngineConfig,
    ) -> Self {
        let bootstrapper = Arc::new(ProviderBootstrapper::new(
            collaborators.tokenization,
            collaborators.wallets,
        ));
        let wallets = WalletSessionOrchestrator::new(
            Arc::clone(&bootstrapper),
            Arc::clone(&collaborators.submitter),
            Arc::clone(&collaborators.anti_abuse),
            config,
        );
        let guard = wallets.guard().clone();
        let errors = wallets.errors().clone();
        let visibility = Visibility::new();
        let wallets = wallets.with_shared_state(guard.clone(), errors.clone(), visibility.clone());

        let state = FlowState {
            identity: CheckoutIdentity::NotReady(NotReadyReason::Loading),
            selection: options.preselected_purchasable_id.clone(),
            url: None,
            promo_code: None,
            flags: PurchaseFlags::default(),
            terms_accepted: false,
            section: SectionMachine::new(SectionState::MethodPicker),
        };

        Self {
            options,
            identity_provider: collaborators.identity_provider,
            submitter: collaborators.submitter,
            anti_abuse: collaborators.anti_abuse,
            events: collaborators.events,
            bootstrapper,
            wallets,
            guard,
            errors,
            visibility,
            state: Mutex::new(state),
        }
    }

    /// Builder: purchasable named in the page URL
    pub fn with_url_target(mut self, url: UrlTarget) -> Self {
        self.state_mut().url = Some(url);
        self
    }

    /// Builder: promo code carried by the page
    pub fn with_promo_code(mut self, code: impl Into<String>) -> Self {
        self.state_mut().promo_code = Some(code.into());
        self
    }

    /// Builder: reactivation / attribution flags
    pub fn with_flags(mut self, flags: PurchaseFlags) -> Self {
        self.state_mut().flags = flags;
        self
    }

    /// Kick off wallet bootstrap in the background and load the identity
    pub async fn start(&self) -> CheckoutResult<JoinHandle<()>> {
        let bootstrap = self.bootstrapper.spawn_initialize();
        self.refresh_identity().await?;
        Ok(bootstrap)
    }

    /// Re-fetch the identity. A failed fetch leaves the flow not ready.
    #[instrument(skip(self))]
    pub async fn refresh_identity(&self) -> CheckoutResult<()> {
        let selectors = self.state().selectors();
        match self.identity_provider.fetch(&selectors).await {
            Ok(identity) => {
                self.replace_identity(identity);
                Ok(())
            }
            Err(e) => {
                warn!("Checkout identity fetch failed: {}", e);
                self.replace_identity(CheckoutIdentity::NotReady(NotReadyReason::FetchFailed));
                Err(e)
            }
        }
    }

    /// Swap in a new identity and recompute the active section
    pub fn replace_identity(&self, identity: CheckoutIdentity) {
        let mut state = self.state();
        let previous = std::mem::replace(&mut state.identity, identity);
        let target = state.target().ok();
        let state = &mut *state;
        let section = state.section.on_identity_changed(
            &previous,
            &state.identity,
            target.as_ref().map(|t| &t.purchasable),
            Utc::now(),
        );
        info!(
            from = previous.variant_name(),
            to = state.identity.variant_name(),
            %section,
            "Checkout identity replaced"
        );
    }

    /// Buyer signed in from inside checkout
    pub async fn login_succeeded(&self) -> CheckoutResult<()> {
        self.events.on_login_success();
        self.refresh_identity().await
    }

    pub fn select_purchasable(&self, id: impl Into<String>) -> SectionState {
        self.errors.clear();
        let mut state = self.state();
        state.selection = Some(id.into());
        let target = state.target().ok();
        let state = &mut *state;
        let section = state.section.on_selection_changed(
            &state.identity,
            target.as_ref().map(|t| &t.purchasable),
            Utc::now(),
        );
        debug!(%section, "Selection changed");
        section
    }

    pub fn use_different_method(&self) -> CheckoutResult<SectionState> {
        self.errors.clear();
        self.state().section.use_different_method()
    }

    pub fn pay_by_card(&self) -> CheckoutResult<SectionState> {
        self.errors.clear();
        self.state().section.pay_by_card()
    }

    pub fn back(&self) -> CheckoutResult<SectionState> {
        self.errors.clear();
        self.state().section.back()
    }

    /// Record input on the active section; editing clears the error
    pub fn enter_field(&self, field: SensitiveField, value: impl Into<String>) -> CheckoutResult<()> {
        self.errors.clear();
        self.state().section.enter(field, value)
    }

    pub fn accept_terms(&self, accepted: bool) {
        self.state().terms_accepted = accepted;
    }

    /// Hosting surface shown or hidden. Hiding releases the guard, drops every
    /// sensitive input and makes in-flight results irrelevant.
    pub fn set_visible(&self, visible: bool) {
        if visible {
            return;
        }
        self.guard.on_hidden();
        self.state().section.clear_all();
        self.visibility.hide();
    }

    /// Pay with the card entered in the card section
    pub async fn pay_with_card(&self) -> AttemptOutcome {
        let (relevance, ticket) = self.begin_attempt();
        let result = self.submit_card().await;
        self.finish(PaymentMethod::Card, relevance, ticket, result)
    }

    /// Pay with the buyer's vaulted card
    pub async fn pay_with_saved_instrument(&self) -> AttemptOutcome {
        let (relevance, ticket) = self.begin_attempt();
        let result = self.submit_saved_instrument().await;
        self.finish(PaymentMethod::SavedInstrument, relevance, ticket, result)
    }

    /// Open a wallet sheet. Call directly from the click handler.
    pub fn begin_wallet(&self, wallet: WalletKind) -> CheckoutResult<WalletAttempt> {
        let state = self.state();
        let invocation = WalletInvocation {
            terms_accepted: self.terms_satisfied(&state),
            selection: state.selection.clone(),
            url: state.url.clone(),
            promo_code: state.promo_code.clone(),
            flags: state.flags.clone(),
        };
        self.wallets.begin(wallet, &state.identity, &invocation)
    }

    pub async fn handle_wallet_event(
        &self,
        attempt: &mut WalletAttempt,
        event: WalletEvent,
    ) -> AttemptOutcome {
        let outcome = self.wallets.handle_event(attempt, event).await;
        if let AttemptOutcome::Paid(receipt) = &outcome {
            self.events
                .on_payment_success(receipt, PaymentMethod::Wallet(attempt.wallet()));
        }
        outcome
    }

    pub fn current_error(&self) -> Option<String> {
        self.errors.current()
    }

    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }

    pub fn wallets(&self) -> Vec<WalletKind> {
        self.bootstrapper.wallets()
    }

    pub fn wallet_ready(&self, wallet: WalletKind) -> bool {
        self.bootstrapper.is_ready(wallet)
    }

    pub fn wallet_readiness(&self, wallet: WalletKind) -> Option<watch::Receiver<bool>> {
        self.bootstrapper.readiness(wallet)
    }

    pub fn providers(&self) -> &Arc<ProviderBootstrapper> {
        &self.bootstrapper
    }

    pub fn identity(&self) -> CheckoutIdentity {
        self.state().identity.clone()
    }

    pub fn section_state(&self) -> SectionState {
        self.state().section.state()
    }

    /// Whether a section currently holds any input
    pub fn has_input(&self, section: SectionState) -> bool {
        !self.state().section.fields(section).is_empty()
    }

    /// The purchasable a payment would charge for right now
    pub fn resolved_purchasable(&self) -> Option<Purchasable> {
        self.state().target().ok().map(|target| target.purchasable)
    }

    pub fn theme(&self) -> Theme {
        self.options.theme
    }

    fn begin_attempt(&self) -> (RelevanceToken, GuardTicket) {
        self.guard.invoke(|ticket| {
            self.errors.clear();
            (self.visibility.token(), ticket)
        })
    }

    async fn submit_card(&self) -> CheckoutResult<PurchaseReceipt> {
        let (card, order) = {
            let state = self.state();
            self.require_terms(&state)?;
            state.require_surface(SectionState::CardEntry)?;
            let card = CardFields::from_field_set(state.section.fields(SectionState::CardEntry))?;
            (card, state.pending_order()?)
        };

        let client = self.bootstrapper.client().await?;
        let nonce = client.tokenize_card(&card).await?;
        self.submit(order, PaymentProof::new(PaymentMethod::Card, nonce))
            .await
    }

    async fn submit_saved_instrument(&self) -> CheckoutResult<PurchaseReceipt> {
        let (instrument, security_code, order) = {
            let state = self.state();
            self.require_terms(&state)?;
            state.require_surface(SectionState::ReuseSaved)?;
            let order = state.pending_order()?;
            let instrument = reusable_instrument(
                &state.identity,
                Some(&order.target.purchasable),
                Utc::now(),
            )
            .cloned()
            .ok_or_else(|| CheckoutError::InactiveSurface {
                surface: SectionState::ReuseSaved.to_string(),
            })?;
            let security_code = state
                .section
                .fields(SectionState::ReuseSaved)
                .get(SensitiveField::SecurityCode)
                .map(str::to_string);
            (instrument, security_code, order)
        };

        let client = self.bootstrapper.client().await?;
        let nonce = client
            .tokenize_saved_instrument(&instrument, security_code.as_deref())
            .await?;
        self.submit(order, PaymentProof::new(PaymentMethod::SavedInstrument, nonce))
            .await
    }

    async fn submit(&self, order: PendingOrder, proof: PaymentProof) -> CheckoutResult<PurchaseReceipt> {
        let anti_abuse_token = self.anti_abuse.fetch_or_empty().await;
        let proof = proof
            .with_anti_abuse_token(anti_abuse_token)
            .with_promo_code(order.promo_code)
            .with_flags(order.flags);
        let intent = order.target.into_intent(proof);

        debug!(
            purchasable_id = %intent.purchasable_id,
            price_cents = intent.price_cents,
            method = %intent.method,
            "Submitting purchase"
        );
        self.submitter.submit(&intent).await
    }

    fn finish(
        &self,
        method: PaymentMethod,
        relevance: RelevanceToken,
        ticket: GuardTicket,
        result: CheckoutResult<PurchaseReceipt>,
    ) -> AttemptOutcome {
        if !relevance.is_relevant() {
            match &result {
                Ok(receipt) => warn!(
                    %method,
                    payment_id = %receipt.payment_id,
                    "Payment finished after the checkout was hidden"
                ),
                Err(e) => warn!(%method, "Payment failed after the checkout was hidden: {}", e),
            }
            return AttemptOutcome::Discarded;
        }

        match result {
            Ok(receipt) => {
                info!(%method, payment_id = %receipt.payment_id, "Payment succeeded");
                self.events.on_payment_success(&receipt, method);
                AttemptOutcome::Paid(receipt)
            }
            Err(e) => {
                let outcome = match self.errors.set(&e) {
                    Some(message) => AttemptOutcome::Failed(message),
                    None => AttemptOutcome::Cancelled,
                };
                self.guard.release_attempt(ticket);
                outcome
            }
        }
    }

    fn terms_satisfied(&self, state: &FlowState) -> bool {
        self.options.skip_terms_gating || state.terms_accepted
    }

    fn require_terms(&self, state: &FlowState) -> CheckoutResult<()> {
        if self.terms_satisfied(state) {
            Ok(())
        } else {
            Err(CheckoutError::TermsNotAccepted)
        }
    }

    fn state(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&mut self) -> &mut FlowState {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }
}
