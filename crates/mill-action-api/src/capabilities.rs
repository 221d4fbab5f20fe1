//! Provider capability flags
//!
//! Capabilities are auxiliary, provider-level facts computed once by the
//! engine and attached to every action the provider reports.

use serde::{Deserialize, Serialize};

/// Scope over which a provider can apply its actions in bulk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkApplyScope {
    /// Every occurrence in the current document
    Document,
    /// Every occurrence in the hosting project
    Project,
    /// Every occurrence in the workspace
    Workspace,
}

/// Declared bulk apply support
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BulkApplySupport {
    /// Supported scopes, in the order the provider prefers them
    pub scopes: Vec<BulkApplyScope>,
}

impl BulkApplySupport {
    /// Support for the given scopes
    pub fn new(scopes: impl IntoIterator<Item = BulkApplyScope>) -> Self {
        Self {
            scopes: scopes.into_iter().collect(),
        }
    }

    pub fn supports(&self, scope: BulkApplyScope) -> bool {
        self.scopes.contains(&scope)
    }
}

/// Capability information for a single provider
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCapabilities {
    /// Bulk apply support, `None` when the provider cannot apply in bulk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bulk_apply: Option<BulkApplySupport>,
}

impl ProviderCapabilities {
    /// Creates a new `ProviderCapabilities` with nothing supported.
    ///
    /// This is also what the engine caches when capability analysis fails.
    pub const fn none() -> Self {
        Self { bulk_apply: None }
    }

    /// Enable bulk apply support
    pub fn with_bulk_apply(mut self, support: BulkApplySupport) -> Self {
        self.bulk_apply = Some(support);
        self
    }

    /// Whether the provider can apply its actions in bulk at any scope
    pub fn supports_bulk_apply(&self) -> bool {
        self.bulk_apply
            .as_ref()
            .is_some_and(|support| !support.scopes.is_empty())
    }
}
