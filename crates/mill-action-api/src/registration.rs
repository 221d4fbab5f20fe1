//! Static provider registration
//!
//! Providers announce themselves at link time through `inventory`, so the
//! engine can build its registry without a hand-maintained list.

use crate::ActionProvider;
use std::sync::Arc;

/// Describes a provider to the core system.
///
/// This struct is created by the `mill_action_provider!` macro and collected
/// at link-time by the `inventory` crate.
pub struct ProviderRegistration {
    /// Provider name; must match the name in the provider's descriptor
    pub name: &'static str,
    /// Creates the provider instance
    pub factory: fn() -> Arc<dyn ActionProvider>,
}

// Collect all provider registrations into a static collection.
inventory::collect!(ProviderRegistration);

/// Returns an iterator over all registered providers.
///
/// Iteration order depends on the linker; callers that need a stable order
/// must sort.
pub fn iter_registrations() -> impl Iterator<Item = &'static ProviderRegistration> {
    inventory::iter::<ProviderRegistration>.into_iter()
}

/// A macro for providers to register themselves.
///
/// ```ignore
/// mill_action_provider! {
///     name: "add-missing-import",
///     factory: || std::sync::Arc::new(AddMissingImport::new()),
/// }
/// ```
#[macro_export]
macro_rules! mill_action_provider {
    (
        name: $name:expr,
        factory: $factory:expr $(,)?
    ) => {
        $crate::inventory::submit! {
            $crate::ProviderRegistration {
                name: $name,
                factory: $factory,
            }
        }
    };
}
