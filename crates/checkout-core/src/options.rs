//! # Checkout Options
//!
//! Declarative inputs of a checkout surface. Usually embedded by the host
//! page; can also be loaded from `config/checkout.toml`.

use serde::{Deserialize, Serialize};

/// Cosmetic theme toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutOptions {
    /// Purchasable chosen before checkout opened
    #[serde(default)]
    pub preselected_purchasable_id: Option<String>,

    /// Reactivation variant: buyer already accepted the terms
    #[serde(default)]
    pub skip_terms_gating: bool,

    #[serde(default)]
    pub theme: Theme,
}

impl CheckoutOptions {
    /// Builder: pre-select a purchasable
    pub fn with_preselected(mut self, id: impl Into<String>) -> Self {
        self.preselected_purchasable_id = Some(id.into());
        self
    }

    /// Builder: skip the terms checkbox
    pub fn skipping_terms(mut self) -> Self {
        self.skip_terms_gating = true;
        self
    }

    /// Load options from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}
