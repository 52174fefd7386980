//! # Error Classifier
//!
//! Maps any checkout failure to a message that is safe to show a buyer.
//!
//! 1. A known backend code wins and maps to its curated message.
//! 2. Otherwise the raw message is checked for technical noise (markup
//!    payloads, HTTP 4xx/5xx mentions, network/timeout/DNS or JSON decode
//!    signatures). Noise, or an empty message, becomes [`UNKNOWN_ERROR_MESSAGE`].
//! 3. Anything else is already human-readable and passes through unchanged.

use crate::error::CheckoutError;
use regex::Regex;
use std::sync::LazyLock;

/// Shown whenever the underlying failure is not fit for display
pub const UNKNOWN_ERROR_MESSAGE: &str =
    "Something went wrong while processing your payment. Please try again or use a different payment method.";

/// Backend code → buyer-facing message
static BACKEND_MESSAGES: &[(&str, &str)] = &[
    (
        "card_declined",
        "Your card was declined. Please try a different card or payment method.",
    ),
    (
        "insufficient_funds",
        "Your card has insufficient funds. Please use a different payment method.",
    ),
    (
        "expired_card",
        "Your card has expired. Please use a different card.",
    ),
    (
        "incorrect_cvv",
        "The security code you entered is incorrect.",
    ),
    (
        "incorrect_postal_code",
        "The postal code does not match your card.",
    ),
    (
        "processor_declined",
        "Your bank declined this payment. Please contact your bank or try another method.",
    ),
    (
        "duplicate_transaction",
        "This payment was already submitted. Please check your email for a receipt before trying again.",
    ),
    (
        "risk_rejected",
        "We could not verify this payment. Please try a different payment method.",
    ),
    (
        "anti_abuse_failed",
        "We could not verify your browser. Please refresh the page and try again.",
    ),
    (
        "invalid_promo_code",
        "This promo code is invalid or has expired.",
    ),
    (
        "purchasable_unavailable",
        "This plan is no longer available. Please choose another option.",
    ),
    (
        "already_subscribed",
        "You already have an active subscription.",
    ),
];

static MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(<\s*(!doctype|html|head|body)\b|text/html|unexpected token\s*'?<)")
        .expect("markup pattern is valid")
});

static HTTP_STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(status|http|code)\s*(code)?\s*[:=]?\s*[45]\d{2}\b")
        .expect("status pattern is valid")
});

static HTTP_REASON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\b[45]\d{2}\b\s*:?\s*(internal server error|bad gateway|service unavailable|gateway timeout|bad request|unauthorized|forbidden|not found)|\b(error|failed:)\s*[45]\d{2}\b)",
    )
    .expect("reason pattern is valid")
});

static NETWORK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(network\s*error|failed to fetch|load failed|timed?\s*out|timeout|etimedout|econnrefused|econnreset|enotfound|getaddrinfo|\bdns\b|connection (refused|reset|closed))",
    )
    .expect("network pattern is valid")
});

static JSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(json\.parse|unexpected end of json|is not valid json|unexpected token .* in json|expected value at line|error decoding response body)",
    )
    .expect("json pattern is valid")
});

/// Look up the curated message for a backend code
pub fn backend_message(code: &str) -> Option<&'static str> {
    BACKEND_MESSAGES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, message)| *message)
}

/// True when the message looks like a technical failure rather than prose
pub fn is_technical_noise(message: &str) -> bool {
    MARKUP_RE.is_match(message)
        || HTTP_STATUS_RE.is_match(message)
        || HTTP_REASON_RE.is_match(message)
        || NETWORK_RE.is_match(message)
        || JSON_RE.is_match(message)
}

/// Classify a code/message pair. Never fails.
pub fn classify_message(code: Option<&str>, message: &str) -> String {
    if let Some(mapped) = code.and_then(backend_message) {
        return mapped.to_string();
    }

    let trimmed = message.trim();
    if trimmed.is_empty() || is_technical_noise(trimmed) {
        return UNKNOWN_ERROR_MESSAGE.to_string();
    }

    message.to_string()
}

/// Classify a checkout error into a buyer-facing message
pub fn classify(error: &CheckoutError) -> String {
    classify_message(error.backend_code(), &error.raw_message())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mention_is_hidden() {
        let err = CheckoutError::Submission {
            code: None,
            message: "Request failed, status: 503".into(),
        };
        assert_eq!(classify(&err), UNKNOWN_ERROR_MESSAGE);
    }

    #[test]
    fn test_known_code_maps_to_message() {
        let err = CheckoutError::submission("card_declined", "Gateway Rejected: avs");
        assert_eq!(
            classify(&err),
            "Your card was declined. Please try a different card or payment method."
        );
    }

    #[test]
    fn test_unknown_code_falls_back_to_message() {
        let err = CheckoutError::submission("weird_code", "Your promo has already been used.");
        assert_eq!(classify(&err), "Your promo has already been used.");
    }

    #[test]
    fn test_plain_message_passes_through() {
        let err = CheckoutError::Submission {
            code: None,
            message: "Your account is locked. Contact support.".into(),
        };
        assert_eq!(classify(&err), "Your account is locked. Contact support.");
    }

    #[test]
    fn test_empty_message_is_unknown() {
        assert_eq!(classify_message(None, "   "), UNKNOWN_ERROR_MESSAGE);
    }

    #[test]
    fn test_noise_signatures() {
        let noisy = [
            "<!DOCTYPE html><html><body>Bad Gateway</body></html>",
            "Unexpected token '<', \"<html>\" is not valid JSON",
            "HTTP 502 Bad Gateway",
            "Request failed with status code 404",
            "NetworkError when attempting to fetch resource.",
            "Failed to fetch",
            "operation timed out",
            "dns error: failed to lookup address information",
            "expected value at line 1 column 1",
            "error decoding response body",
            "connect ECONNREFUSED 127.0.0.1:443",
            "500 Internal Server Error",
            "Request failed: 503 Service Unavailable",
            "Error 502: Bad Gateway",
        ];
        for message in noisy {
            assert!(is_technical_noise(message), "not flagged: {message}");
            assert_eq!(classify_message(None, message), UNKNOWN_ERROR_MESSAGE);
        }
    }

    #[test]
    fn test_transport_errors_are_hidden() {
        let err = CheckoutError::Transport("connection reset by peer".into());
        assert_eq!(classify(&err), UNKNOWN_ERROR_MESSAGE);
    }

    #[test]
    fn test_local_validation_messages_pass_through() {
        assert_eq!(
            classify(&CheckoutError::TermsNotAccepted),
            "Please accept the terms of service to continue."
        );
        assert_eq!(
            classify(&CheckoutError::ProviderUnavailable {
                provider: "Apple Pay".into()
            }),
            "Apple Pay not available"
        );
    }

    #[test]
    fn test_numbers_outside_status_context_pass_through() {
        let msg = "Only 404 seats remain in this cohort.";
        assert_eq!(classify_message(None, msg), msg);

        let msg = "Error processing 12 items: please retry later.";
        assert_eq!(classify_message(None, msg), msg);
    }

    #[test]
    fn test_pass_through_keeps_message_unchanged() {
        let msg = "  Promo code limit reached.\n";
        assert_eq!(classify_message(None, msg), msg);
    }
}
