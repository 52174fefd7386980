//! In-memory collaborators for unit tests.

use crate::flow::CheckoutEvents;
use async_trait::async_trait;
use checkout_core::{
    AntiAbuseTokenProvider, Buyer, CardFields, CheckoutDetails, CheckoutError, CheckoutIdentity,
    CheckoutIdentityProvider, CheckoutResult, IdentitySelectors, MerchantSession,
    PaymentCompletion, PaymentMethod, PurchaseIntent, PurchaseReceipt, PurchaseSubmitter,
    Purchasable, SavedInstrument, SharedTokenizationClient, SharedWalletInstance,
    TokenizationClient, TokenizationClientFactory, WalletAuthorization, WalletInstance, WalletKind,
    WalletPaymentRequest, WalletProviderFactory, WalletSession,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub struct FakeTokenizationClient;

#[async_trait]
impl TokenizationClient for FakeTokenizationClient {
    async fn tokenize_card(&self, card: &CardFields) -> CheckoutResult<String> {
        Ok(format!("card-nonce:{}", card.number))
    }

    async fn tokenize_saved_instrument(
        &self,
        instrument: &SavedInstrument,
        security_code: Option<&str>,
    ) -> CheckoutResult<String> {
        Ok(format!(
            "saved-nonce:{}:{}",
            instrument.token,
            security_code.unwrap_or("-")
        ))
    }
}

#[derive(Default)]
pub struct FakeClientFactory {
    pub calls: AtomicUsize,
    fail: bool,
}

impl FakeClientFactory {
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }
}

#[async_trait]
impl TokenizationClientFactory for FakeClientFactory {
    async fn get_client(&self) -> CheckoutResult<SharedTokenizationClient> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail {
            return Err(CheckoutError::Transport("client script failed to load".into()));
        }
        Ok(Arc::new(FakeTokenizationClient))
    }
}

/// Calls a wallet session received, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    Created { total: String, recurring: bool },
    Begin,
    MerchantValidated,
    Completed(PaymentCompletion),
    Aborted,
}

pub struct FakeWalletSession {
    log: Arc<Mutex<Vec<SessionCall>>>,
}

impl WalletSession for FakeWalletSession {
    fn begin(&mut self) -> CheckoutResult<()> {
        self.log.lock().unwrap().push(SessionCall::Begin);
        Ok(())
    }

    fn complete_merchant_validation(&mut self, _session: MerchantSession) -> CheckoutResult<()> {
        self.log.lock().unwrap().push(SessionCall::MerchantValidated);
        Ok(())
    }

    fn complete_payment(&mut self, completion: PaymentCompletion) {
        self.log.lock().unwrap().push(SessionCall::Completed(completion));
    }

    fn abort(&mut self) {
        self.log.lock().unwrap().push(SessionCall::Aborted);
    }
}

pub struct FakeWalletInstance {
    kind: WalletKind,
    pub log: Arc<Mutex<Vec<SessionCall>>>,
    pub fail_validation: bool,
}

impl FakeWalletInstance {
    pub fn calls(&self) -> Vec<SessionCall> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletInstance for FakeWalletInstance {
    fn wallet(&self) -> WalletKind {
        self.kind
    }

    fn create_session(
        &self,
        request: &WalletPaymentRequest,
    ) -> CheckoutResult<Box<dyn WalletSession>> {
        self.log.lock().unwrap().push(SessionCall::Created {
            total: request.total.amount.clone(),
            recurring: request.recurring.is_some(),
        });
        Ok(Box::new(FakeWalletSession {
            log: Arc::clone(&self.log),
        }))
    }

    async fn validate_merchant(&self, validation_url: &str) -> CheckoutResult<MerchantSession> {
        if self.fail_validation {
            return Err(CheckoutError::MerchantValidation(format!(
                "status: 502 from {validation_url}"
            )));
        }
        Ok(MerchantSession(serde_json::json!({ "merchantSessionIdentifier": "ms_1" })))
    }

    async fn tokenize(&self, _authorization: &WalletAuthorization) -> CheckoutResult<String> {
        Ok(format!("{}-nonce", self.kind.display_name()))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum InstanceBehavior {
    Create,
    Unsupported,
    Fail,
    Hang,
}

pub struct FakeWalletFactory {
    kind: WalletKind,
    behavior: InstanceBehavior,
    pub calls: AtomicUsize,
    pub instance: Arc<FakeWalletInstance>,
}

impl FakeWalletFactory {
    pub fn new(kind: WalletKind, behavior: InstanceBehavior) -> Arc<Self> {
        Self::with_instance(
            kind,
            behavior,
            FakeWalletInstance {
                kind,
                log: Arc::default(),
                fail_validation: false,
            },
        )
    }

    pub fn with_instance(
        kind: WalletKind,
        behavior: InstanceBehavior,
        instance: FakeWalletInstance,
    ) -> Arc<Self> {
        Arc::new(Self {
            kind,
            behavior,
            calls: AtomicUsize::new(0),
            instance: Arc::new(instance),
        })
    }

    pub fn failing_validation(kind: WalletKind) -> Arc<Self> {
        Self::with_instance(
            kind,
            InstanceBehavior::Create,
            FakeWalletInstance {
                kind,
                log: Arc::default(),
                fail_validation: true,
            },
        )
    }
}

#[async_trait]
impl WalletProviderFactory for FakeWalletFactory {
    fn wallet(&self) -> WalletKind {
        self.kind
    }

    async fn create_instance(
        &self,
        _client: SharedTokenizationClient,
    ) -> CheckoutResult<Option<SharedWalletInstance>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            InstanceBehavior::Create => {
                Ok(Some(Arc::clone(&self.instance) as SharedWalletInstance))
            }
            InstanceBehavior::Unsupported => Ok(None),
            InstanceBehavior::Fail => Err(CheckoutError::Transport("sdk rejected".into())),
            InstanceBehavior::Hang => futures::future::pending().await,
        }
    }
}

pub struct FakeSubmitter {
    result: Mutex<CheckoutResult<PurchaseReceipt>>,
    pub submitted: Mutex<Vec<PurchaseIntent>>,
    /// When set, submissions wait for a permit before answering
    pub gate: Option<Arc<Notify>>,
}

impl FakeSubmitter {
    pub fn accepting() -> Arc<Self> {
        Self::returning(Ok(PurchaseReceipt {
            payment_id: "pay_1".into(),
            destination_path: Some("/welcome".into()),
        }))
    }

    pub fn returning(result: CheckoutResult<PurchaseReceipt>) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(result),
            submitted: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    pub fn gated() -> (Arc<Self>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let submitter = Arc::new(Self {
            result: Mutex::new(Ok(PurchaseReceipt {
                payment_id: "pay_gated".into(),
                destination_path: None,
            })),
            submitted: Mutex::new(Vec::new()),
            gate: Some(Arc::clone(&gate)),
        });
        (submitter, gate)
    }

    pub fn intents(&self) -> Vec<PurchaseIntent> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl PurchaseSubmitter for FakeSubmitter {
    async fn submit(&self, intent: &PurchaseIntent) -> CheckoutResult<PurchaseReceipt> {
        self.submitted.lock().unwrap().push(intent.clone());
        match &self.gate {
            Some(gate) => gate.notified().await,
            None => tokio::task::yield_now().await,
        }
        self.result.lock().unwrap().clone()
    }
}

pub struct FakeAntiAbuse(pub Option<&'static str>);

#[async_trait]
impl AntiAbuseTokenProvider for FakeAntiAbuse {
    async fn fetch(&self) -> CheckoutResult<String> {
        self.0
            .map(str::to_string)
            .ok_or_else(|| CheckoutError::Transport("challenge failed".into()))
    }
}

pub struct FakeIdentityProvider {
    pub identity: Mutex<CheckoutResult<CheckoutIdentity>>,
    pub fetches: AtomicUsize,
}

impl FakeIdentityProvider {
    pub fn returning(identity: CheckoutResult<CheckoutIdentity>) -> Arc<Self> {
        Arc::new(Self {
            identity: Mutex::new(identity),
            fetches: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CheckoutIdentityProvider for FakeIdentityProvider {
    async fn fetch(&self, _selectors: &IdentitySelectors) -> CheckoutResult<CheckoutIdentity> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.identity.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct RecordingEvents {
    pub successes: Mutex<Vec<(PurchaseReceipt, PaymentMethod)>>,
    pub logins: AtomicUsize,
}

impl CheckoutEvents for RecordingEvents {
    fn on_payment_success(&self, receipt: &PurchaseReceipt, method: PaymentMethod) {
        self.successes.lock().unwrap().push((receipt.clone(), method));
    }

    fn on_login_success(&self) {
        self.logins.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn buyer() -> Buyer {
    Buyer {
        id: "b_1".into(),
        email: "ada@example.com".into(),
        first_name: Some("Ada".into()),
        last_name: Some("Lovelace".into()),
    }
}

pub fn saved_card() -> SavedInstrument {
    SavedInstrument {
        token: "vault_1".into(),
        card_type: Some("Visa".into()),
        last_four: "4242".into(),
        expiration_month: 12,
        expiration_year: 2099,
    }
}

pub fn catalog() -> CheckoutDetails {
    CheckoutDetails::new(vec![
        Purchasable::subscription("basic", 2900, 4).with_name("Basic"),
        Purchasable::subscription("pro", 4900, 8).with_name("Pro"),
        Purchasable::package("hours-10", 19900, 10),
        Purchasable::subscription("split", 40000, 8).with_installments(2, 25000, 15000),
    ])
}

pub fn guest() -> CheckoutIdentity {
    CheckoutIdentity::ReadyGuest { details: catalog() }
}

pub fn authenticated() -> CheckoutIdentity {
    CheckoutIdentity::ReadyAuthenticated {
        details: catalog(),
        buyer: buyer(),
        saved_instrument: Some(saved_card()),
    }
}

pub fn wallet_authorization() -> WalletAuthorization {
    WalletAuthorization {
        payment_data: serde_json::json!({ "token": "encrypted" }),
        email: Some("ada@example.com".into()),
        given_name: Some("Ada".into()),
        family_name: Some("Lovelace".into()),
        phone: None,
    }
}
