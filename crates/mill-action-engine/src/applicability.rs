//! Applicability filtering
//!
//! Narrows the registry's ordered group for a language down to the providers
//! whose document constraints match the request target, then appends the
//! project-scoped providers supplied by a [`ProjectProviderSource`].

use crate::registry::ProviderRegistry;
use dashmap::DashMap;
use mill_action_api::{ActionProvider, DocumentTarget, RequestContext};
use std::sync::Arc;
use tracing::debug;

/// Supplies providers tied to the project hosting a document
pub trait ProjectProviderSource: Send + Sync {
    /// Project-scoped providers for `document`, in the order they should run
    fn providers_for(&self, document: &DocumentTarget) -> Vec<Arc<dyn ActionProvider>>;
}

/// Source with no project-scoped providers
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProjectProviders;

impl ProjectProviderSource for NoProjectProviders {
    fn providers_for(&self, _document: &DocumentTarget) -> Vec<Arc<dyn ActionProvider>> {
        Vec::new()
    }
}

/// In-memory project provider channel keyed by project id
#[derive(Default)]
pub struct ProjectProviders {
    projects: DashMap<String, Vec<Arc<dyn ActionProvider>>>,
}

impl ProjectProviders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider for `project`, after any already registered
    pub fn register(&self, project: impl Into<String>, provider: Arc<dyn ActionProvider>) {
        let project = project.into();
        debug!(
            project = %project,
            provider = %provider.descriptor().name(),
            "Registered project provider"
        );
        self.projects.entry(project).or_default().push(provider);
    }

    /// Drop every provider registered for `project`, returning how many there were
    pub fn unregister_project(&self, project: &str) -> usize {
        self.projects
            .remove(project)
            .map(|(_, providers)| providers.len())
            .unwrap_or(0)
    }

    /// Number of providers registered for `project`
    pub fn count(&self, project: &str) -> usize {
        self.projects
            .get(project)
            .map(|providers| providers.len())
            .unwrap_or(0)
    }
}

impl ProjectProviderSource for ProjectProviders {
    fn providers_for(&self, document: &DocumentTarget) -> Vec<Arc<dyn ActionProvider>> {
        let Some(project) = document.project.as_deref() else {
            return Vec::new();
        };
        self.projects
            .get(project)
            .map(|providers| providers.value().clone())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for ProjectProviders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectProviders")
            .field("projects", &self.projects.len())
            .finish()
    }
}

/// Providers applicable to `context`, globally registered ones first.
///
/// Interactive requests never see project-scoped providers.
pub fn applicable_providers(
    registry: &ProviderRegistry,
    project: &dyn ProjectProviderSource,
    context: &RequestContext,
) -> Vec<Arc<dyn ActionProvider>> {
    let document = context.document();

    let mut applicable: Vec<Arc<dyn ActionProvider>> = registry
        .providers_for(context.language())
        .iter()
        .filter(|provider| provider.descriptor().matches_document(document))
        .cloned()
        .collect();
    let global = applicable.len();

    if !context.is_interactive() {
        applicable.extend(project.providers_for(document).into_iter().filter(|provider| {
            let descriptor = provider.descriptor();
            descriptor.handles_language(context.language()) && descriptor.matches_document(document)
        }));
    }

    debug!(
        language = %context.language(),
        global,
        project = applicable.len() - global,
        mode = %context.mode(),
        "Resolved applicable providers"
    );
    applicable
}
