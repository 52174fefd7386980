//! # Purchasable Resolver
//!
//! Chooses the purchasable every payment method charges for. Precedence:
//!
//! 1. explicit selection, when it names one of the candidates
//! 2. the server's default purchasable
//! 3. the candidate in the most-popular tier ([`POPULAR_TIER_HOURS`])
//! 4. the first candidate
//!
//! All payment methods go through this function so the displayed price and
//! the charged price can never diverge.

use crate::identity::CheckoutIdentity;
use crate::purchasable::Purchasable;

/// Entitled hours of the tier marketed as most popular.
///
/// If the catalog's popular tier moves, this fallback silently stops
/// matching and resolution falls through to the first candidate.
pub const POPULAR_TIER_HOURS: u32 = 4;

/// Resolve the effective purchasable. A not-ready identity never resolves.
pub fn resolve<'a>(
    identity: &CheckoutIdentity,
    candidates: &'a [Purchasable],
    default_purchasable: Option<&'a Purchasable>,
    explicit_selection: Option<&str>,
) -> Option<&'a Purchasable> {
    if !identity.is_ready() {
        return None;
    }

    if let Some(selected) =
        explicit_selection.and_then(|id| candidates.iter().find(|p| p.id == id))
    {
        return Some(selected);
    }

    default_purchasable
        .or_else(|| {
            candidates
                .iter()
                .find(|p| p.entitled_hours == Some(POPULAR_TIER_HOURS))
        })
        .or_else(|| candidates.first())
}

/// Resolve against the candidates and default carried by the identity
pub fn resolve_for_identity<'a>(
    identity: &'a CheckoutIdentity,
    explicit_selection: Option<&str>,
) -> Option<&'a Purchasable> {
    let details = identity.details()?;
    resolve(
        identity,
        &details.purchasables,
        details.default_purchasable.as_ref(),
        explicit_selection,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{CheckoutDetails, NotReadyReason};

    fn guest(details: CheckoutDetails) -> CheckoutIdentity {
        CheckoutIdentity::ReadyGuest { details }
    }

    fn ab() -> Vec<Purchasable> {
        vec![
            Purchasable::subscription("A", 2900, 4),
            Purchasable::subscription("B", 4900, 8),
        ]
    }

    #[test]
    fn test_selection_beats_default() {
        let candidates = ab();
        let identity = guest(CheckoutDetails::new(candidates.clone()));
        let default = &candidates[1];

        let chosen = resolve(&identity, &candidates, Some(default), Some("A")).unwrap();
        assert_eq!(chosen.id, "A");

        let chosen = resolve(&identity, &candidates, Some(default), None).unwrap();
        assert_eq!(chosen.id, "B");
    }

    #[test]
    fn test_unknown_selection_is_ignored() {
        let candidates = ab();
        let identity = guest(CheckoutDetails::new(candidates.clone()));

        let chosen = resolve(&identity, &candidates, Some(&candidates[1]), Some("Z")).unwrap();
        assert_eq!(chosen.id, "B");
    }

    #[test]
    fn test_popular_tier_fallback() {
        let candidates = vec![
            Purchasable::subscription("X", 3900, 6),
            Purchasable::subscription("Y", 2900, 4),
        ];
        let identity = guest(CheckoutDetails::new(candidates.clone()));

        let chosen = resolve(&identity, &candidates, None, None).unwrap();
        assert_eq!(chosen.id, "Y");
    }

    #[test]
    fn test_first_candidate_fallback() {
        let candidates = vec![
            Purchasable::subscription("X", 3900, 6),
            Purchasable::subscription("W", 5900, 10),
        ];
        let identity = guest(CheckoutDetails::new(candidates.clone()));

        assert_eq!(resolve(&identity, &candidates, None, None).unwrap().id, "X");
        assert!(resolve(&identity, &[], None, None).is_none());
    }

    #[test]
    fn test_not_ready_never_resolves() {
        let candidates = ab();
        let identity = CheckoutIdentity::NotReady(NotReadyReason::Loading);
        assert!(resolve(&identity, &candidates, Some(&candidates[0]), Some("A")).is_none());
        assert!(resolve_for_identity(&identity, Some("A")).is_none());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let candidates = ab();
        let identity = guest(CheckoutDetails::new(candidates.clone()));
        let first = resolve(&identity, &candidates, None, Some("B")).cloned();
        for _ in 0..10 {
            assert_eq!(resolve(&identity, &candidates, None, Some("B")).cloned(), first);
        }
    }

    #[test]
    fn test_resolve_for_identity_uses_details() {
        let candidates = ab();
        let identity =
            guest(CheckoutDetails::new(candidates.clone()).with_default(candidates[1].clone()));
        assert_eq!(resolve_for_identity(&identity, None).unwrap().id, "B");
        assert_eq!(resolve_for_identity(&identity, Some("A")).unwrap().id, "A");
    }
}
