//! # Checkout Error Types
//!
//! Typed error handling for the checkout orchestration engine.
//! All checkout operations return `Result<T, CheckoutError>`.
//!
//! Errors never escape a payment method: each one is caught at the
//! orchestration boundary, passed through [`crate::classify`] and written
//! to the flow's single error slot.

use thiserror::Error;

/// Broad category of a [`CheckoutError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Resolved client-side, never submitted (terms, missing wallet fields)
    LocalValidation,
    /// Wallet instance absent at invocation
    ProviderUnavailable,
    /// Returned by the purchase submission service
    Submission,
    /// Wallet sheet dismissed by the user
    UserCancelled,
    /// Nothing could be resolved as the thing being bought
    MissingProduct,
    /// Transport, tokenization, configuration and wiring failures
    Infrastructure,
}

/// Core error type for all checkout operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// Terms of service must be accepted before paying
    #[error("Please accept the terms of service to continue.")]
    TermsNotAccepted,

    /// Required payer or card details were not provided
    #[error("Some required details are missing: {}", fields.join(", "))]
    MissingFields { fields: Vec<String> },

    /// Wallet instance was not created during bootstrap
    #[error("{provider} not available")]
    ProviderUnavailable { provider: String },

    /// Purchase submission rejected
    #[error("{message}")]
    Submission {
        code: Option<String>,
        message: String,
    },

    /// User dismissed the wallet sheet
    #[error("Payment cancelled")]
    UserCancelled,

    /// No purchasable could be resolved
    #[error("No product selected for purchase")]
    MissingProduct,

    /// Network/HTTP error talking to a collaborator
    #[error("Network error: {0}")]
    Transport(String),

    /// Payment credentials could not be tokenized
    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    /// Wallet merchant validation failed
    #[error("Merchant validation failed: {0}")]
    MerchantValidation(String),

    /// A collaborator answered with something we cannot interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration errors (missing env vars, bad URLs)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Section transition not allowed from the current surface
    #[error("Cannot {action} from {from}")]
    InvalidTransition { from: String, action: String },

    /// Field input addressed to a surface that is not active
    #[error("The {surface} section is not active")]
    InactiveSurface { surface: String },
}

impl CheckoutError {
    /// Shorthand for a submission error carrying a backend code
    pub fn submission(code: impl Into<String>, message: impl Into<String>) -> Self {
        CheckoutError::Submission {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Category used by the error slot and logging
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::TermsNotAccepted | CheckoutError::MissingFields { .. } => {
                ErrorKind::LocalValidation
            }
            CheckoutError::ProviderUnavailable { .. } => ErrorKind::ProviderUnavailable,
            CheckoutError::Submission { .. } => ErrorKind::Submission,
            CheckoutError::UserCancelled => ErrorKind::UserCancelled,
            CheckoutError::MissingProduct => ErrorKind::MissingProduct,
            CheckoutError::Transport(_)
            | CheckoutError::Tokenization(_)
            | CheckoutError::MerchantValidation(_)
            | CheckoutError::InvalidResponse(_)
            | CheckoutError::Configuration(_)
            | CheckoutError::InvalidTransition { .. }
            | CheckoutError::InactiveSurface { .. } => ErrorKind::Infrastructure,
        }
    }

    /// Cancellation is recorded, never displayed
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, CheckoutError::UserCancelled)
    }

    /// Backend error code, when the submission service supplied one
    pub fn backend_code(&self) -> Option<&str> {
        match self {
            CheckoutError::Submission { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Raw message before classification
    pub fn raw_message(&self) -> String {
        match self {
            CheckoutError::Submission { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for checkout operations
pub type CheckoutResult<T> = Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            CheckoutError::TermsNotAccepted.kind(),
            ErrorKind::LocalValidation
        );
        assert_eq!(
            CheckoutError::MissingFields {
                fields: vec!["email".into()]
            }
            .kind(),
            ErrorKind::LocalValidation
        );
        assert_eq!(
            CheckoutError::ProviderUnavailable {
                provider: "Apple Pay".into()
            }
            .kind(),
            ErrorKind::ProviderUnavailable
        );
        assert_eq!(
            CheckoutError::Transport("timeout".into()).kind(),
            ErrorKind::Infrastructure
        );
    }

    #[test]
    fn test_cancellation_is_not_user_visible() {
        assert!(!CheckoutError::UserCancelled.is_user_visible());
        assert!(CheckoutError::MissingProduct.is_user_visible());
    }

    #[test]
    fn test_provider_unavailable_message() {
        let err = CheckoutError::ProviderUnavailable {
            provider: "Google Pay".into(),
        };
        assert_eq!(err.to_string(), "Google Pay not available");
    }

    #[test]
    fn test_backend_code() {
        let err = CheckoutError::submission("card_declined", "Do not honor");
        assert_eq!(err.backend_code(), Some("card_declined"));
        assert_eq!(err.raw_message(), "Do not honor");
        assert_eq!(CheckoutError::MissingProduct.backend_code(), None);
    }

    #[test]
    fn test_missing_fields_message() {
        let err = CheckoutError::MissingFields {
            fields: vec!["email".into(), "family name".into()],
        };
        assert_eq!(
            err.to_string(),
            "Some required details are missing: email, family name"
        );
    }
}
