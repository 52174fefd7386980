//! # Provider Bootstrapper
//!
//! Creates the shared tokenization client once and pre-creates every wallet
//! instance in the background, independently of user action.
//!
//! Readiness means "decision made", not "available": a wallet becomes ready
//! whether its instance was created, unsupported or failed. The buyer sees
//! the wallet button immediately and only gets "not available" when they
//! actually click it. Nothing spins forever.

use checkout_core::{
    CheckoutResult, SharedTokenizationClient, SharedWalletInstance, TokenizationClientFactory,
    WalletKind, WalletProviderFactory,
};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{watch, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

struct WalletSlot {
    factory: Arc<dyn WalletProviderFactory>,
    instance: OnceCell<Option<SharedWalletInstance>>,
    ready: watch::Sender<bool>,
}

/// Owns the tokenization client and wallet instances for one checkout flow
pub struct ProviderBootstrapper {
    client_factory: Arc<dyn TokenizationClientFactory>,
    client: OnceCell<SharedTokenizationClient>,
    slots: Vec<WalletSlot>,
}

impl ProviderBootstrapper {
    pub fn new(
        client_factory: Arc<dyn TokenizationClientFactory>,
        wallet_factories: Vec<Arc<dyn WalletProviderFactory>>,
    ) -> Self {
        let slots = wallet_factories
            .into_iter()
            .map(|factory| WalletSlot {
                factory,
                instance: OnceCell::new(),
                ready: watch::Sender::new(false),
            })
            .collect();

        Self {
            client_factory,
            client: OnceCell::new(),
            slots,
        }
    }

    /// Shared tokenization client. Concurrent first callers wait on the same
    /// in-flight creation; a failed creation is retried by the next caller.
    pub async fn client(&self) -> CheckoutResult<SharedTokenizationClient> {
        self.client
            .get_or_try_init(|| async {
                info!("Creating tokenization client");
                self.client_factory.get_client().await
            })
            .await
            .map(Arc::clone)
    }

    /// Pre-create every wallet instance concurrently. Repeat calls reuse the
    /// cached outcome.
    #[instrument(skip(self), fields(wallets = self.slots.len()))]
    pub async fn initialize(&self) {
        join_all(self.slots.iter().map(|slot| self.initialize_slot(slot))).await;
    }

    /// Run [`initialize`](Self::initialize) in the background
    pub fn spawn_initialize(self: &Arc<Self>) -> JoinHandle<()> {
        let bootstrapper = Arc::clone(self);
        tokio::spawn(async move { bootstrapper.initialize().await })
    }

    async fn initialize_slot(&self, slot: &WalletSlot) {
        let wallet = slot.factory.wallet();
        slot.instance
            .get_or_init(|| async {
                let client = match self.client().await {
                    Ok(client) => client,
                    Err(e) => {
                        warn!(%wallet, "Tokenization client unavailable: {}", e);
                        return None;
                    }
                };
                match slot.factory.create_instance(client).await {
                    Ok(Some(instance)) => {
                        info!(%wallet, "Wallet instance created");
                        Some(instance)
                    }
                    Ok(None) => {
                        info!(%wallet, "Wallet not supported on this device");
                        None
                    }
                    Err(e) => {
                        warn!(%wallet, "Wallet instance creation failed: {}", e);
                        None
                    }
                }
            })
            .await;

        // monotonic: only ever flips to true
        slot.ready.send_replace(true);
        debug!(%wallet, "Wallet ready");
    }

    /// Wallets this flow offers
    pub fn wallets(&self) -> Vec<WalletKind> {
        self.slots.iter().map(|slot| slot.factory.wallet()).collect()
    }

    pub fn is_ready(&self, wallet: WalletKind) -> bool {
        self.slot(wallet).is_some_and(|slot| *slot.ready.borrow())
    }

    /// Watch a wallet's readiness
    pub fn readiness(&self, wallet: WalletKind) -> Option<watch::Receiver<bool>> {
        self.slot(wallet).map(|slot| slot.ready.subscribe())
    }

    /// Pre-created instance; never suspends
    pub fn instance(&self, wallet: WalletKind) -> Option<SharedWalletInstance> {
        self.slot(wallet)
            .and_then(|slot| slot.instance.get())
            .and_then(|instance| instance.clone())
    }

    fn slot(&self, wallet: WalletKind) -> Option<&WalletSlot> {
        self.slots.iter().find(|slot| slot.factory.wallet() == wallet)
    }
}
