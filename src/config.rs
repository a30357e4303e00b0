//! Expansion configuration.
//!
//! Marker names and the module names used in generated code. Defaults match
//! the Flex runtime; every field can be overridden from JSON or with the
//! `with_*` builders.

use serde::{Deserialize, Serialize};

use crate::diagnostics::DEFAULT_DOMAIN;
use crate::syntax::ir::bare_name;

/// Errors loading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Attribute names that drive the pass, without the leading `@`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerNames {
    pub feature: String,
    pub outlet: String,
    pub action: String,
    pub destination: String,
    pub fetched: String,
    pub presentation: String,
}

impl Default for MarkerNames {
    fn default() -> Self {
        Self {
            feature: "Feature".into(),
            outlet: "Outlet".into(),
            action: "Action".into(),
            destination: "Destination".into(),
            fetched: "Fetched".into(),
            presentation: "Presentation".into(),
        }
    }
}

impl MarkerNames {
    /// Attributes with no expansion of their own; stripped from the output.
    pub fn member_markers(&self) -> [&str; 3] {
        [
            self.outlet.as_str(),
            self.action.as_str(),
            self.destination.as_str(),
        ]
    }

    fn all(&self) -> [&str; 6] {
        [
            self.feature.as_str(),
            self.outlet.as_str(),
            self.action.as_str(),
            self.destination.as_str(),
            self.fetched.as_str(),
            self.presentation.as_str(),
        ]
    }
}

/// Configuration for one expansion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    pub markers: MarkerNames,
    /// Module that declares `Feature`, `WithOutlets` and friends.
    pub runtime_module: String,
    /// Module that declares `View` and `Binding`.
    pub ui_module: String,
    /// Global actor the proxies are isolated to.
    pub global_actor: String,
    /// Suffix of generated backing storage: `_count` + `Storage`.
    pub storage_suffix: String,
    pub diagnostic_domain: String,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            markers: MarkerNames::default(),
            runtime_module: "Flex".into(),
            ui_module: "SwiftUI".into(),
            global_actor: "MainActor".into(),
            storage_suffix: "Storage".into(),
            diagnostic_domain: DEFAULT_DOMAIN.into(),
        }
    }
}

impl ExpansionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Marker and module names must be usable as Swift identifiers, and
    /// markers must be distinct.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = self.markers.all();
        let modules = [
            self.runtime_module.as_str(),
            self.ui_module.as_str(),
            self.global_actor.as_str(),
        ];
        for name in names.iter().chain(modules.iter()) {
            if !is_identifier(name) {
                return Err(ConfigError::Invalid(format!("'{name}' is not an identifier")));
            }
        }
        for (i, name) in names.iter().enumerate() {
            if names[i + 1..].contains(name) {
                return Err(ConfigError::Invalid(format!("marker '{name}' is used twice")));
            }
        }
        if self.storage_suffix.is_empty() {
            return Err(ConfigError::Invalid("storage suffix must not be empty".into()));
        }
        Ok(())
    }

    pub fn with_markers(mut self, markers: MarkerNames) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_runtime_module(mut self, module: impl Into<String>) -> Self {
        self.runtime_module = module.into();
        self
    }

    pub fn with_ui_module(mut self, module: impl Into<String>) -> Self {
        self.ui_module = module.into();
        self
    }

    pub fn with_global_actor(mut self, actor: impl Into<String>) -> Self {
        self.global_actor = actor.into();
        self
    }

    pub fn with_storage_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.storage_suffix = suffix.into();
        self
    }

    pub fn with_diagnostic_domain(mut self, domain: impl Into<String>) -> Self {
        self.diagnostic_domain = domain.into();
        self
    }

    /// `Flex.Feature`
    pub fn runtime_type(&self, name: &str) -> String {
        format!("{}.{name}", self.runtime_module)
    }

    /// `SwiftUI.View`
    pub fn ui_type(&self, name: &str) -> String {
        format!("{}.{name}", self.ui_module)
    }

    /// `_countStorage`; `` `default` `` gives `_defaultStorage`.
    pub fn storage_name(&self, property: &str) -> String {
        format!("_{}{}", bare_name(property), self.storage_suffix)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}
