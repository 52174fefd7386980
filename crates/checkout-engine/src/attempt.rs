//! # Attempt Bookkeeping
//!
//! The single "current error" slot every payment method writes to, the
//! outcome of an attempt, and the relevance token that lets in-flight calls
//! finish while their results are dropped once the surface is hidden.

use checkout_core::{classify, CheckoutError, PurchaseReceipt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

/// How a payment attempt (or one wallet callback) ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Submission accepted
    Paid(PurchaseReceipt),
    /// Error written to the slot; carries the classified message
    Failed(String),
    /// Wallet sheet dismissed
    Cancelled,
    /// Wallet callback handled, session still open
    Pending,
    /// Finished after the surface was hidden; result dropped
    Discarded,
}

/// One error message at a time; newer errors replace older ones
#[derive(Debug, Clone, Default)]
pub struct ErrorSlot {
    current: Arc<Mutex<Option<String>>>,
}

impl ErrorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify and store an error, returning the stored message.
    /// Cancellation is recorded as a signal and leaves the slot untouched.
    pub fn set(&self, error: &CheckoutError) -> Option<String> {
        if !error.is_user_visible() {
            info!(target: "checkout::signal", kind = ?error.kind(), "Not surfaced: {}", error);
            return None;
        }
        let message = classify(error);
        warn!(kind = ?error.kind(), "Checkout error: {}", error);
        *self.lock() = Some(message.clone());
        Some(message)
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    pub fn current(&self) -> Option<String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Visibility generations of the hosting surface
#[derive(Debug, Clone, Default)]
pub struct Visibility {
    generation: Arc<AtomicU64>,
}

impl Visibility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture at the start of an attempt
    pub fn token(&self) -> RelevanceToken {
        RelevanceToken {
            generation: Arc::clone(&self.generation),
            captured: self.generation.load(Ordering::SeqCst),
        }
    }

    /// Invalidate every token captured so far
    pub fn hide(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// "Still relevant" flag captured by an in-flight attempt
#[derive(Debug, Clone)]
pub struct RelevanceToken {
    generation: Arc<AtomicU64>,
    captured: u64,
}

impl RelevanceToken {
    pub fn is_relevant(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.captured
    }
}
