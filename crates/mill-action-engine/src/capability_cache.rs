//! Process-wide provider capability cache
//!
//! Capabilities are computed once per provider by a [`CapabilityAnalyzer`]
//! and shared by every later request. Entries are inserted if absent and each
//! holds a `OnceLock`, so concurrent first lookups for one provider observe a
//! single computed value.

use dashmap::DashMap;
use mill_action_api::{ActionProvider, ProviderCapabilities, ProviderId, ProviderResult};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Provider-independent capability analysis
pub trait CapabilityAnalyzer: Send + Sync {
    fn analyze(&self, provider: &dyn ActionProvider) -> ProviderResult<ProviderCapabilities>;
}

/// Reads the bulk apply support a provider declares
#[derive(Debug, Default, Clone, Copy)]
pub struct BulkApplyAnalyzer;

impl CapabilityAnalyzer for BulkApplyAnalyzer {
    fn analyze(&self, provider: &dyn ActionProvider) -> ProviderResult<ProviderCapabilities> {
        Ok(match provider.bulk_apply_support() {
            Some(support) => ProviderCapabilities::none().with_bulk_apply(support),
            None => ProviderCapabilities::none(),
        })
    }
}

type Slot = Arc<OnceLock<Arc<ProviderCapabilities>>>;

pub struct CapabilityCache {
    analyzer: Arc<dyn CapabilityAnalyzer>,
    entries: DashMap<ProviderId, Slot>,
}

impl CapabilityCache {
    pub fn new(analyzer: Arc<dyn CapabilityAnalyzer>) -> Self {
        Self {
            analyzer,
            entries: DashMap::new(),
        }
    }

    /// Capabilities of `provider`, computing them on first use.
    ///
    /// A failing or panicking analysis is cached as
    /// [`ProviderCapabilities::none`].
    pub fn capability_of(&self, provider: &dyn ActionProvider) -> Arc<ProviderCapabilities> {
        let id = provider.descriptor().id();

        // Clone the slot out so no map shard lock is held while analyzing.
        let slot: Slot = match self.entries.get(id) {
            Some(slot) => Arc::clone(slot.value()),
            None => Arc::clone(self.entries.entry(id.clone()).or_default().value()),
        };

        Arc::clone(slot.get_or_init(|| Arc::new(self.compute(provider))))
    }

    /// Whether capabilities for `provider` have been computed
    pub fn contains(&self, provider: &ProviderId) -> bool {
        self.entries
            .get(provider)
            .is_some_and(|slot| slot.get().is_some())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn compute(&self, provider: &dyn ActionProvider) -> ProviderCapabilities {
        let id = provider.descriptor().id();
        match catch_unwind(AssertUnwindSafe(|| self.analyzer.analyze(provider))) {
            Ok(Ok(capabilities)) => {
                debug!(
                    provider = %id,
                    bulk_apply = capabilities.supports_bulk_apply(),
                    "Computed provider capabilities"
                );
                capabilities
            }
            Ok(Err(e)) => {
                warn!(provider = %id, error = %e, "Capability analysis failed");
                ProviderCapabilities::none()
            }
            Err(_) => {
                warn!(provider = %id, "Capability analysis panicked");
                ProviderCapabilities::none()
            }
        }
    }
}

impl Default for CapabilityCache {
    fn default() -> Self {
        Self::new(Arc::new(BulkApplyAnalyzer))
    }
}

impl std::fmt::Debug for CapabilityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}
