//! Provider registry with lazily built per-language ordering

use crate::ordering::linearize;
use mill_action_api::{iter_registrations, ActionProvider, ProviderDescriptor, ProviderId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Ordered providers for one language
pub type LanguageGroup = Arc<[Arc<dyn ActionProvider>]>;

/// Registry of globally registered providers
///
/// Holds providers in registration order. Per-language groups are computed
/// on first lookup and cached for the lifetime of the registry; later
/// lookups do no ordering work.
pub struct ProviderRegistry {
    /// Providers in registration order
    providers: Vec<Arc<dyn ActionProvider>>,
    /// Language tag to ordered providers, built once
    groups: OnceLock<HashMap<String, LanguageGroup>>,
}

impl ProviderRegistry {
    /// Create a registry from providers in registration order.
    ///
    /// Later providers reusing an earlier provider's name are dropped.
    pub fn new(providers: impl IntoIterator<Item = Arc<dyn ActionProvider>>) -> Self {
        let mut seen: HashSet<ProviderId> = HashSet::new();
        let mut unique = Vec::new();

        for provider in providers {
            let id = provider.descriptor().id().clone();
            if seen.insert(id.clone()) {
                unique.push(provider);
            } else {
                warn!(provider = %id, "Provider is already registered, ignoring duplicate");
            }
        }

        debug!(providers = unique.len(), "Created provider registry");
        Self {
            providers: unique,
            groups: OnceLock::new(),
        }
    }

    /// Create a registry from every provider submitted with
    /// `mill_action_provider!`.
    ///
    /// Registration order is name order, since link-time collection order is
    /// not stable across builds.
    pub fn from_inventory() -> Self {
        let mut registrations: Vec<_> = iter_registrations().collect();
        registrations.sort_by_key(|registration| registration.name);

        let providers = registrations.into_iter().filter_map(|registration| {
            let provider = (registration.factory)();
            if provider.descriptor().name() != registration.name {
                warn!(
                    registered = %registration.name,
                    descriptor = %provider.descriptor().name(),
                    "Registration name does not match provider descriptor, skipping"
                );
                return None;
            }
            Some(provider)
        });

        Self::new(providers)
    }

    /// Ordered providers declaring `language`; empty when none do.
    pub fn providers_for(&self, language: &str) -> LanguageGroup {
        self.groups()
            .get(language)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Languages with at least one provider
    pub fn languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = self.groups().keys().cloned().collect();
        languages.sort();
        languages
    }

    /// Get a provider by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ActionProvider>> {
        self.providers
            .iter()
            .find(|provider| provider.descriptor().name() == name)
            .cloned()
    }

    /// Provider names in registration order
    pub fn provider_names(&self) -> Vec<String> {
        self.providers
            .iter()
            .map(|provider| provider.descriptor().name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn groups(&self) -> &HashMap<String, LanguageGroup> {
        self.groups.get_or_init(|| build_groups(&self.providers))
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.provider_names())
            .field("built", &self.groups.get().is_some())
            .finish()
    }
}

/// Group providers by declared language, then order each group.
fn build_groups(providers: &[Arc<dyn ActionProvider>]) -> HashMap<String, LanguageGroup> {
    let mut members: HashMap<&str, Vec<&Arc<dyn ActionProvider>>> = HashMap::new();
    for provider in providers {
        for language in provider.descriptor().declared_languages() {
            members.entry(language.as_str()).or_default().push(provider);
        }
    }

    let groups: HashMap<String, LanguageGroup> = members
        .into_iter()
        .map(|(language, group)| {
            let descriptors: Vec<&ProviderDescriptor> =
                group.iter().map(|provider| provider.descriptor()).collect();
            let ordered: Vec<Arc<dyn ActionProvider>> = linearize(&descriptors)
                .into_iter()
                .map(|index| Arc::clone(group[index]))
                .collect();

            debug!(
                language = %language,
                order = ?ordered.iter().map(|p| p.descriptor().name()).collect::<Vec<_>>(),
                "Ordered language group"
            );
            (language.to_string(), LanguageGroup::from(ordered))
        })
        .collect();

    info!(
        languages = groups.len(),
        providers = providers.len(),
        "Built provider language groups"
    );
    groups
}
