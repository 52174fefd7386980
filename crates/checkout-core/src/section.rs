//! # Section State Machine
//!
//! Tracks which payment surface is active. Surfaces are toggled, not torn
//! down, so every exit clears the exited surface's sensitive inputs; a hidden
//! form must never keep card data or let autofill bleed into it.
//!
//! ```text
//!   ReuseSaved ──use different method──▶ MethodPicker ──pay by card──▶ CardEntry
//!                                             ▲                            │
//!                                             └────────────back────────────┘
//! ```
//!
//! No network calls happen here.

use crate::error::{CheckoutError, CheckoutResult};
use crate::identity::{reusable_instrument, CheckoutIdentity};
use crate::purchasable::Purchasable;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Active payment surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionState {
    ReuseSaved,
    MethodPicker,
    CardEntry,
}

impl fmt::Display for SectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SectionState::ReuseSaved => "saved card",
            SectionState::MethodPicker => "payment method",
            SectionState::CardEntry => "card entry",
        })
    }
}

/// User-driven section changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionAction {
    UseDifferentMethod,
    PayByCard,
    Back,
}

impl fmt::Display for SectionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SectionAction::UseDifferentMethod => "use a different method",
            SectionAction::PayByCard => "pay by card",
            SectionAction::Back => "go back",
        })
    }
}

/// Inputs that hold PCI-relevant or personal data
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SensitiveField {
    CardNumber,
    Expiration,
    SecurityCode,
    CardholderName,
    PostalCode,
}

impl SensitiveField {
    /// Hosted (tokenized) fields vs. plain text inputs
    pub fn is_tokenized(&self) -> bool {
        matches!(
            self,
            SensitiveField::CardNumber | SensitiveField::Expiration | SensitiveField::SecurityCode
        )
    }

    /// Whether this field is rendered on the given surface
    pub fn belongs_to(&self, state: SectionState) -> bool {
        match state {
            SectionState::ReuseSaved => matches!(
                self,
                SensitiveField::SecurityCode | SensitiveField::PostalCode
            ),
            SectionState::MethodPicker => false,
            SectionState::CardEntry => true,
        }
    }
}

/// Field values for one surface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    values: BTreeMap<SensitiveField, String>,
}

impl FieldSet {
    pub fn get(&self, field: SensitiveField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn tokenized(&self) -> impl Iterator<Item = (SensitiveField, &str)> {
        self.values
            .iter()
            .filter(|(field, _)| field.is_tokenized())
            .map(|(field, value)| (*field, value.as_str()))
    }

    fn set(&mut self, field: SensitiveField, value: String) {
        if value.is_empty() {
            self.values.remove(&field);
        } else {
            self.values.insert(field, value);
        }
    }

    fn clear(&mut self) {
        self.values.clear();
    }
}

/// Initial surface: reuse the saved card when the buyer, card and
/// purchasable all allow it; otherwise the method picker
pub fn initial_state(
    identity: &CheckoutIdentity,
    resolved: Option<&Purchasable>,
    now: DateTime<Utc>,
) -> SectionState {
    if reusable_instrument(identity, resolved, now).is_some() {
        SectionState::ReuseSaved
    } else {
        SectionState::MethodPicker
    }
}

/// Active surface plus the inputs of the surfaces that hold any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMachine {
    state: SectionState,
    reuse_fields: FieldSet,
    card_fields: FieldSet,
}

impl SectionMachine {
    pub fn new(state: SectionState) -> Self {
        Self {
            state,
            reuse_fields: FieldSet::default(),
            card_fields: FieldSet::default(),
        }
    }

    /// Start in the state [`initial_state`] picks
    pub fn for_identity(
        identity: &CheckoutIdentity,
        resolved: Option<&Purchasable>,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(initial_state(identity, resolved, now))
    }

    pub fn state(&self) -> SectionState {
        self.state
    }

    /// Fields of a surface; always empty for inactive surfaces
    pub fn fields(&self, state: SectionState) -> &FieldSet {
        match state {
            SectionState::ReuseSaved => &self.reuse_fields,
            SectionState::CardEntry => &self.card_fields,
            SectionState::MethodPicker => {
                static EMPTY: FieldSet = FieldSet {
                    values: BTreeMap::new(),
                };
                &EMPTY
            }
        }
    }

    /// Apply a user action, clearing the exited surface
    pub fn apply(&mut self, action: SectionAction) -> CheckoutResult<SectionState> {
        let next = match (self.state, action) {
            (SectionState::ReuseSaved, SectionAction::UseDifferentMethod) => {
                SectionState::MethodPicker
            }
            (SectionState::MethodPicker, SectionAction::PayByCard) => SectionState::CardEntry,
            (SectionState::CardEntry, SectionAction::Back) => SectionState::MethodPicker,
            (from, action) => {
                return Err(CheckoutError::InvalidTransition {
                    from: from.to_string(),
                    action: action.to_string(),
                })
            }
        };
        self.transition_to(next);
        Ok(next)
    }

    pub fn use_different_method(&mut self) -> CheckoutResult<SectionState> {
        self.apply(SectionAction::UseDifferentMethod)
    }

    pub fn pay_by_card(&mut self) -> CheckoutResult<SectionState> {
        self.apply(SectionAction::PayByCard)
    }

    pub fn back(&mut self) -> CheckoutResult<SectionState> {
        self.apply(SectionAction::Back)
    }

    /// Identity replaced after login/refetch. The initial surface is
    /// recomputed when a guest becomes authenticated or when a saved card
    /// becomes reusable that was not before.
    pub fn on_identity_changed(
        &mut self,
        previous: &CheckoutIdentity,
        current: &CheckoutIdentity,
        resolved: Option<&Purchasable>,
        now: DateTime<Utc>,
    ) -> SectionState {
        let logged_in = !previous.is_authenticated() && current.is_authenticated();
        let card_now_reusable = reusable_instrument(previous, resolved, now).is_none()
            && reusable_instrument(current, resolved, now).is_some();
        if logged_in || card_now_reusable {
            self.transition_to(initial_state(current, resolved, now));
        } else if self.state == SectionState::ReuseSaved
            && reusable_instrument(current, resolved, now).is_none()
        {
            self.transition_to(SectionState::MethodPicker);
        }
        self.state
    }

    /// Selection changed; leave the saved-card surface if it no longer applies
    pub fn on_selection_changed(
        &mut self,
        identity: &CheckoutIdentity,
        resolved: Option<&Purchasable>,
        now: DateTime<Utc>,
    ) -> SectionState {
        if self.state == SectionState::ReuseSaved
            && reusable_instrument(identity, resolved, now).is_none()
        {
            self.transition_to(SectionState::MethodPicker);
        }
        self.state
    }

    /// Record input on the active surface
    pub fn enter(&mut self, field: SensitiveField, value: impl Into<String>) -> CheckoutResult<()> {
        if !field.belongs_to(self.state) {
            return Err(CheckoutError::InactiveSurface {
                surface: self.state.to_string(),
            });
        }
        match self.state {
            SectionState::ReuseSaved => self.reuse_fields.set(field, value.into()),
            SectionState::CardEntry => self.card_fields.set(field, value.into()),
            SectionState::MethodPicker => {}
        }
        Ok(())
    }

    /// Drop every input, e.g. when the whole checkout is hidden
    pub fn clear_all(&mut self) {
        self.reuse_fields.clear();
        self.card_fields.clear();
    }

    fn transition_to(&mut self, next: SectionState) {
        if next == self.state {
            return;
        }
        match self.state {
            SectionState::ReuseSaved => self.reuse_fields.clear(),
            SectionState::CardEntry => self.card_fields.clear(),
            SectionState::MethodPicker => {}
        }
        debug!(from = %self.state, to = %next, "Section transition");
        self.state = next;
    }
}
